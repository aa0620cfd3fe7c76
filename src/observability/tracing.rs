use anyhow::{Error, Result};
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Whether events are emitted as JSON. `RUST_LOG_FORMAT=json` is the default.
fn use_json(format: Option<&str>) -> bool {
    format.is_none_or(|value| value.eq_ignore_ascii_case("json"))
}

/// Initialize the tracing subscriber once per process.
///
/// # Errors
/// Fails when another global subscriber is already installed.
pub fn init() -> Result<()> {
    TRACING_INIT.get_or_try_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let json = use_json(std::env::var("RUST_LOG_FORMAT").ok().as_deref());

        let registry = tracing_subscriber::registry().with(env_filter);
        let installed = if json {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_current_span(true)
                        .with_target(false),
                )
                .try_init()
        } else {
            registry.with(fmt::layer()).try_init()
        };
        installed.map_err(|e: tracing_subscriber::util::TryInitError| Error::msg(e.to_string()))?;

        info!(json, "tracing initialized");
        Ok::<(), Error>(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_the_default_format() {
        assert!(use_json(None));
        assert!(use_json(Some("json")));
        assert!(use_json(Some("JSON")));
        assert!(!use_json(Some("pretty")));
        assert!(!use_json(Some("")));
    }
}
