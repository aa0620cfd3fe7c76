pub(crate) mod retry;
pub mod rounding;
