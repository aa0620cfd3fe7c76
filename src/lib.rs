#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub(crate) mod api;
pub mod app;
pub mod auth;
pub(crate) mod clients;
pub mod config;
pub mod healthcheck;
pub mod observability;
pub mod server;
pub mod store;
pub mod util;
