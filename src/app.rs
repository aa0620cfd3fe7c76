use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::{
    analysis::{BatchPredictor, ClassificationRegistry, CommentAnalyser, CommentFetcher},
    api,
    auth::{PasswordHasher, SessionStore},
    clients::{YoutubeClient, YoutubeConfig},
    config::Config,
    observability::Telemetry,
    store::{SqliteSettings, SqliteStore},
    util::retry::RetryConfig,
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

/// Shared services behind every request.
pub struct ComponentRegistry {
    telemetry: Telemetry,
    store: Arc<SqliteStore>,
    analyser: Arc<CommentAnalyser>,
    sessions: Arc<SessionStore>,
    password_hasher: PasswordHasher,
}

impl AppState {
    pub(crate) fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self { registry }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn store(&self) -> &SqliteStore {
        &self.registry.store
    }

    pub(crate) fn analyser(&self) -> Arc<CommentAnalyser> {
        Arc::clone(&self.registry.analyser)
    }

    pub(crate) fn sessions(&self) -> &SessionStore {
        &self.registry.sessions
    }

    pub(crate) fn password_hasher(&self) -> PasswordHasher {
        self.registry.password_hasher
    }
}

impl ComponentRegistry {
    /// Build every service from configuration and prepare the database schema.
    ///
    /// # Errors
    /// Fails when telemetry, the database pool or the YouTube client cannot
    /// be initialised.
    pub async fn build(config: &Config) -> Result<Self> {
        let telemetry = Telemetry::new()?;

        let store = SqliteStore::connect_lazy(&SqliteSettings {
            url: config.database_url().to_string(),
            max_connections: config.database_max_connections(),
            acquire_timeout: config.database_acquire_timeout(),
        })?;
        store
            .init_schema()
            .await
            .context("failed to prepare database schema")?;

        let youtube = YoutubeClient::new(YoutubeConfig {
            base_url: config.youtube_api_base_url().to_string(),
            api_key: config.youtube_api_key().map(ToString::to_string),
            connect_timeout: config.youtube_connect_timeout(),
            total_timeout: config.youtube_total_timeout(),
            retry: RetryConfig::new(
                config.http_max_retries(),
                config.http_backoff_base_ms(),
                config.http_backoff_cap_ms(),
            ),
        })
        .context("failed to build YouTube client")?;

        Ok(Self::assemble(
            telemetry,
            store,
            Arc::new(youtube),
            config.classifier_model_path().clone(),
            config.classification_threshold(),
            config.session_ttl(),
        )
        .with_password_iterations(config.password_hash_iterations()))
    }

    /// Build from ready-made parts without installing a global subscriber.
    ///
    /// # Errors
    /// Fails when the metrics cannot be registered.
    pub fn from_parts(
        store: SqliteStore,
        fetcher: Arc<dyn CommentFetcher>,
        model_path: PathBuf,
        threshold: f64,
        session_ttl: Duration,
    ) -> Result<Self> {
        let telemetry = Telemetry::metrics_only()?;
        Ok(Self::assemble(
            telemetry,
            store,
            fetcher,
            model_path,
            threshold,
            session_ttl,
        ))
    }

    fn assemble(
        telemetry: Telemetry,
        store: SqliteStore,
        fetcher: Arc<dyn CommentFetcher>,
        model_path: PathBuf,
        threshold: f64,
        session_ttl: Duration,
    ) -> Self {
        let store = Arc::new(store);
        let analyser = Arc::new(CommentAnalyser::new(
            fetcher,
            Arc::new(BatchPredictor::default()),
            Arc::clone(&store) as Arc<dyn ClassificationRegistry>,
            model_path,
            threshold,
            telemetry.metrics_arc(),
        ));

        Self {
            telemetry,
            store,
            analyser,
            sessions: Arc::new(SessionStore::new(session_ttl)),
            password_hasher: PasswordHasher::default(),
        }
    }

    /// Replace the work factor used for newly hashed passwords.
    #[must_use]
    pub fn with_password_iterations(mut self, iterations: u32) -> Self {
        self.password_hasher = PasswordHasher::new(iterations);
        self
    }

    #[must_use]
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    #[must_use]
    pub fn analyser(&self) -> &CommentAnalyser {
        &self.analyser
    }

    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}

pub fn build_router(registry: Arc<ComponentRegistry>) -> Router {
    let state = AppState::new(registry);
    api::router(state).layer(TraceLayer::new_for_http())
}
