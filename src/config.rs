use std::{env, fs, net::SocketAddr, path::PathBuf, time::Duration};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    database_url: String,
    database_max_connections: u32,
    database_acquire_timeout: Duration,
    classifier_model_path: PathBuf,
    classification_threshold: f64,
    youtube_api_base_url: String,
    youtube_api_key: Option<String>,
    youtube_connect_timeout: Duration,
    youtube_total_timeout: Duration,
    http_max_retries: usize,
    http_backoff_base_ms: u64,
    http_backoff_cap_ms: u64,
    session_ttl: Duration,
    password_hash_iterations: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// Read and validate the service settings from the environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a value fails to parse or is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_bind = parse_socket_addr("COMMENT_ANALYSER_HTTP_BIND", "0.0.0.0:5000")?;

        // Database
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://comment_analyser.sqlite".to_string());
        let database_max_connections = parse_u32("DATABASE_MAX_CONNECTIONS", 5)?;
        if database_max_connections == 0 {
            return Err(ConfigError::Invalid {
                name: "DATABASE_MAX_CONNECTIONS",
                source: anyhow::anyhow!("must be greater than zero"),
            });
        }
        let database_acquire_timeout = parse_duration_secs("DATABASE_ACQUIRE_TIMEOUT_SECS", 30)?;

        // Classifier
        let classifier_model_path = PathBuf::from(
            env::var("CLASSIFIER_MODEL_PATH").unwrap_or_else(|_| "model/classifier.json".to_string()),
        );
        let classification_threshold = parse_threshold("CLASSIFICATION_THRESHOLD", 0.5)?;

        // YouTube Data API
        let youtube_api_base_url = env::var("YOUTUBE_API_BASE_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/youtube/v3/".to_string());
        let youtube_api_key = optional_env_or_file("YOUTUBE_API_KEY")?;
        let youtube_connect_timeout = parse_duration_ms("YOUTUBE_CONNECT_TIMEOUT_MS", 3000)?;
        let youtube_total_timeout = parse_duration_ms("YOUTUBE_TOTAL_TIMEOUT_MS", 30000)?;

        // Retry settings (exponential backoff + jitter)
        let http_max_retries = parse_usize("HTTP_MAX_RETRIES", 3)?;
        let http_backoff_base_ms = parse_u64("HTTP_BACKOFF_BASE_MS", 250)?;
        let http_backoff_cap_ms = parse_u64("HTTP_BACKOFF_CAP_MS", 10000)?;

        let session_ttl = parse_duration_secs("SESSION_TTL_SECS", 86_400)?;
        let password_hash_iterations = parse_u32("PASSWORD_HASH_ITERATIONS", 600_000)?;
        if password_hash_iterations == 0 {
            return Err(ConfigError::Invalid {
                name: "PASSWORD_HASH_ITERATIONS",
                source: anyhow::anyhow!("must be greater than zero"),
            });
        }

        Ok(Self {
            http_bind,
            database_url,
            database_max_connections,
            database_acquire_timeout,
            classifier_model_path,
            classification_threshold,
            youtube_api_base_url,
            youtube_api_key,
            youtube_connect_timeout,
            youtube_total_timeout,
            http_max_retries,
            http_backoff_base_ms,
            http_backoff_cap_ms,
            session_ttl,
            password_hash_iterations,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    #[must_use]
    pub fn database_max_connections(&self) -> u32 {
        self.database_max_connections
    }

    #[must_use]
    pub fn database_acquire_timeout(&self) -> Duration {
        self.database_acquire_timeout
    }

    #[must_use]
    pub fn classifier_model_path(&self) -> &PathBuf {
        &self.classifier_model_path
    }

    #[must_use]
    pub fn classification_threshold(&self) -> f64 {
        self.classification_threshold
    }

    #[must_use]
    pub fn youtube_api_base_url(&self) -> &str {
        &self.youtube_api_base_url
    }

    #[must_use]
    pub fn youtube_api_key(&self) -> Option<&str> {
        self.youtube_api_key.as_deref()
    }

    #[must_use]
    pub fn youtube_connect_timeout(&self) -> Duration {
        self.youtube_connect_timeout
    }

    #[must_use]
    pub fn youtube_total_timeout(&self) -> Duration {
        self.youtube_total_timeout
    }

    #[must_use]
    pub fn http_max_retries(&self) -> usize {
        self.http_max_retries
    }

    #[must_use]
    pub fn http_backoff_base_ms(&self) -> u64 {
        self.http_backoff_base_ms
    }

    #[must_use]
    pub fn http_backoff_cap_ms(&self) -> u64 {
        self.http_backoff_cap_ms
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    #[must_use]
    pub fn password_hash_iterations(&self) -> u32 {
        self.password_hash_iterations
    }
}

/// `NAME_FILE` (Docker secrets) wins over `NAME`; neither being set is fine.
fn optional_env_or_file(name: &'static str) -> Result<Option<String>, ConfigError> {
    let file_env = format!("{name}_FILE");
    if let Ok(file_path) = env::var(&file_env) {
        let content = fs::read_to_string(&file_path).map_err(|error| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(error).context(format!("failed to read {file_env}")),
        })?;
        let content = content.trim().to_string();
        return Ok((!content.is_empty()).then_some(content));
    }

    Ok(env::var(name).ok().filter(|value| !value.trim().is_empty()))
}

fn parse_socket_addr(name: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());

    raw.parse().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_threshold(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let value = raw.parse::<f64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("threshold must be within (0, 1], got {value}"),
        });
    }
    Ok(value)
}

fn parse_duration_secs(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let value = parse_u64(name, default_secs)?;
    Ok(Duration::from_secs(value))
}

fn parse_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let value = parse_u64(name, default_ms)?;
    Ok(Duration::from_millis(value))
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u32(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u32>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}
