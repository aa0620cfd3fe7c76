use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use comment_analyser::{
    app::{ComponentRegistry, build_router},
    config::Config,
    healthcheck::healthcheck_with_port,
    observability,
    server,
    store::{SqliteSettings, SqliteStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<String>()
                    .map(String::as_str)
            })
            .unwrap_or("unknown panic payload");

        if let Some(location) = panic_info.location() {
            error!(
                thread = thread_name,
                file = location.file(),
                line = location.line(),
                column = location.column(),
                message,
                "panic occurred"
            );
        } else {
            error!(
                thread = thread_name,
                message, "panic occurred without location information"
            );
        }
    }));

    let config = Config::from_env().context("failed to load configuration")?;

    match std::env::args().nth(1).as_deref() {
        Some("healthcheck") => {
            healthcheck_with_port(config.http_bind().port()).await?;
            Ok(())
        }
        Some("init-db") => init_db(&config).await,
        Some(other) => anyhow::bail!("unknown command: {other}"),
        None => {
            // Tracing initialization is handled by Telemetry::new()
            let registry = ComponentRegistry::build(&config)
                .await
                .context("failed to build component registry")?;
            server::serve(build_router(Arc::new(registry)), config.http_bind()).await
        }
    }
}

/// Drop and recreate every table, then seed the classifications.
async fn init_db(config: &Config) -> anyhow::Result<()> {
    observability::tracing::init()?;
    let store = SqliteStore::connect_lazy(&SqliteSettings {
        url: config.database_url().to_string(),
        max_connections: config.database_max_connections(),
        acquire_timeout: config.database_acquire_timeout(),
    })?;
    store.reset_schema().await?;
    info!(database_url = config.database_url(), "initialized the database");
    Ok(())
}
