pub(crate) mod account;
pub(crate) mod analyse;
pub(crate) mod auth;
pub(crate) mod error;
pub(crate) mod extract;
pub(crate) mod health;
pub(crate) mod issues;
pub(crate) mod metrics;

use axum::{
    Router,
    routing::{get, post},
};

use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/analyse_comments/{source}", post(analyse::analyse_comments))
        .route("/analyser", get(issues::list_issues))
        .route("/issues", post(issues::create_issue))
        .route("/issues/{id}", get(issues::get_issue))
        .route("/issues/{id}/update", post(issues::update_issue))
        .route("/issues/{id}/delete", post(issues::delete_issue))
        .route("/account", get(account::account))
        .with_state(state)
}
