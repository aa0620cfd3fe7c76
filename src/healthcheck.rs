use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("healthcheck failed: {0}")]
pub struct HealthcheckError(String);

/// Probe `GET /health/live` on the local port.
///
/// # Errors
/// Fails when the request cannot be sent or the status is not 2xx.
pub async fn healthcheck_with_port(port: u16) -> Result<(), HealthcheckError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .map_err(|error| HealthcheckError(format!("failed to create HTTP client: {error}")))?;

    let url = format!("http://127.0.0.1:{port}/health/live");
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|error| HealthcheckError(format!("request failed: {error}")))?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(HealthcheckError(format!(
            "health endpoint returned status: {}",
            response.status()
        )))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;

    fn port_of(server: &MockServer) -> u16 {
        server.address().port()
    }

    #[tokio::test]
    async fn succeeds_on_live_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health/live"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        healthcheck_with_port(port_of(&server)).await.unwrap();
    }

    #[tokio::test]
    async fn fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health/live"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let error = healthcheck_with_port(port_of(&server)).await.unwrap_err();
        assert!(error.to_string().contains("503"));
    }
}
