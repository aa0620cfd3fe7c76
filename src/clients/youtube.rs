//! YouTube Data API client for comment threads.
//!
//! Follows `nextPageToken` until the last page and retries transient
//! failures with exponential backoff.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analysis::source::{CommentFetcher, FetchError};
use crate::util::retry::{RetryConfig, is_retryable_error, is_retryable_status};

const MAX_RESULTS_PER_PAGE: &str = "100";

#[derive(Debug, Error)]
pub(crate) enum YoutubeError {
    #[error("YouTube API returned {status} {reason}: {message}")]
    Api {
        status: u16,
        reason: String,
        message: String,
    },
    #[error("YouTube request failed")]
    Transport(#[source] reqwest::Error),
    #[error("failed to decode YouTube response")]
    Decode(#[source] reqwest::Error),
    #[error("invalid YouTube request URL: {0}")]
    InvalidUrl(String),
}

impl YoutubeError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(error) => is_retryable_error(error),
            Self::Api { status, .. } => StatusCode::from_u16(*status).is_ok_and(is_retryable_status),
            Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }
}

impl From<YoutubeError> for FetchError {
    fn from(error: YoutubeError) -> Self {
        match error {
            YoutubeError::Api { status, reason, .. } => Self::Upstream { status, reason },
            other => Self::Other(anyhow::Error::new(other)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadPage {
    #[serde(default)]
    items: Vec<CommentThread>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: ThreadSnippet,
    #[serde(default)]
    replies: Option<ThreadReplies>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: Comment,
    #[serde(default)]
    total_reply_count: u64,
}

#[derive(Debug, Deserialize)]
struct ThreadReplies {
    #[serde(default)]
    comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
struct Comment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    text_original: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    reason: String,
}

impl CommentThreadPage {
    /// Top-level comment first, then its replies when it has any.
    fn into_comments(self, out: &mut Vec<String>) {
        for thread in self.items {
            out.push(thread.snippet.top_level_comment.snippet.text_original);
            if thread.snippet.total_reply_count > 0 {
                if let Some(replies) = thread.replies {
                    out.extend(
                        replies
                            .comments
                            .into_iter()
                            .map(|reply| reply.snippet.text_original),
                    );
                }
            }
        }
    }
}

/// YouTube client settings.
#[derive(Debug, Clone)]
pub(crate) struct YoutubeConfig {
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) connect_timeout: Duration,
    pub(crate) total_timeout: Duration,
    pub(crate) retry: RetryConfig,
}

#[derive(Debug, Clone)]
pub(crate) struct YoutubeClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl YoutubeClient {
    /// # Errors
    /// Fails when the base URL does not parse or the HTTP client cannot be built.
    pub(crate) fn new(config: YoutubeConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .context("failed to build YouTube HTTP client")?;

        // join() drops the last path segment unless the base ends with '/'
        let mut base = config.base_url;
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).context("invalid YouTube API base URL")?;

        if config.api_key.is_none() {
            warn!("YOUTUBE_API_KEY is not set; video comment requests will be rejected upstream");
        }

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            retry: config.retry,
        })
    }

    /// Every comment of `video_id`, in page order.
    pub(crate) async fn fetch_all_comments(
        &self,
        video_id: &str,
    ) -> Result<Vec<String>, YoutubeError> {
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page_count = 0;

        loop {
            page_count += 1;
            debug!(video_id, page = page_count, "fetching comment thread page");

            let page = self.fetch_page_with_retry(video_id, page_token.as_deref()).await?;
            let next = page.next_page_token.clone().filter(|token| !token.is_empty());
            page.into_comments(&mut comments);

            debug!(
                video_id,
                page = page_count,
                total = comments.len(),
                "fetched comment thread page"
            );

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(video_id, pages = page_count, comments = comments.len(), "video comments retrieved");
        Ok(comments)
    }

    async fn fetch_page_with_retry(
        &self,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentThreadPage, YoutubeError> {
        let url = self.page_url(video_id, page_token)?;
        let mut attempt = 0;

        loop {
            match self.fetch_page(url.clone()).await {
                Ok(page) => {
                    if attempt > 0 {
                        info!(attempt, "comment page fetch succeeded after retry");
                    }
                    return Ok(page);
                }
                Err(err) => {
                    attempt += 1;

                    if !err.is_retryable() {
                        return Err(err);
                    }
                    if !self.retry.can_retry(attempt) {
                        warn!(
                            attempt,
                            max_attempts = self.retry.max_attempts,
                            "comment page fetch failed after all retries"
                        );
                        return Err(err);
                    }

                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "comment page fetch failed, retrying after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn fetch_page(&self, url: Url) -> Result<CommentThreadPage, YoutubeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| YoutubeError::Transport(error.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        response
            .json::<CommentThreadPage>()
            .await
            .map_err(|error| YoutubeError::Decode(error.without_url()))
    }

    fn page_url(&self, video_id: &str, page_token: Option<&str>) -> Result<Url, YoutubeError> {
        let mut url = self
            .base_url
            .join("commentThreads")
            .map_err(|error| YoutubeError::InvalidUrl(error.to_string()))?;

        {
            let mut query_pairs = url.query_pairs_mut();
            query_pairs.append_pair("part", "snippet,replies");
            query_pairs.append_pair("videoId", video_id);
            query_pairs.append_pair("maxResults", MAX_RESULTS_PER_PAGE);
            if let Some(token) = page_token {
                query_pairs.append_pair("pageToken", token);
            }
            if let Some(key) = &self.api_key {
                query_pairs.append_pair("key", key);
            }
        }

        Ok(url)
    }
}

fn api_error(status: StatusCode, body: &str) -> YoutubeError {
    let (reason, message) = match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => {
            let reason = envelope
                .error
                .errors
                .into_iter()
                .next()
                .map(|detail| detail.reason);
            (reason, envelope.error.message)
        }
        Err(_) => (None, String::new()),
    };
    let reason = reason.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown")
            .to_string()
    });

    YoutubeError::Api {
        status: status.as_u16(),
        reason,
        message,
    }
}

#[async_trait]
impl CommentFetcher for YoutubeClient {
    async fn fetch_video_comments(&self, video_id: &str) -> Result<Vec<String>, FetchError> {
        self.fetch_all_comments(video_id).await.map_err(FetchError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> YoutubeConfig {
        YoutubeConfig {
            base_url,
            api_key: Some("test-key".to_string()),
            connect_timeout: Duration::from_secs(3),
            total_timeout: Duration::from_secs(10),
            retry: RetryConfig::new(3, 1, 5),
        }
    }

    fn thread(text: &str, replies: &[&str]) -> serde_json::Value {
        let mut value = json!({
            "snippet": {
                "topLevelComment": {"snippet": {"textOriginal": text}},
                "totalReplyCount": replies.len()
            }
        });
        if !replies.is_empty() {
            value["replies"] = json!({
                "comments": replies
                    .iter()
                    .map(|r| json!({"snippet": {"textOriginal": r}}))
                    .collect::<Vec<_>>()
            });
        }
        value
    }

    #[tokio::test]
    async fn follows_page_tokens_and_flattens_replies() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/commentThreads"))
            .and(query_param("videoId", "PSWf2TjTGNY"))
            .and(query_param("part", "snippet,replies"))
            .and(query_param("maxResults", "100"))
            .and(query_param("key", "test-key"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [thread("first", &["reply a", "reply b"]), thread("second", &[])],
                "nextPageToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/commentThreads"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [thread("third", &["reply c"])]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = YoutubeClient::new(test_config(server.uri())).expect("client should build");
        let comments = client
            .fetch_all_comments("PSWf2TjTGNY")
            .await
            .expect("fetch should succeed");

        assert_eq!(
            comments,
            vec!["first", "reply a", "reply b", "second", "third", "reply c"]
        );
    }

    #[tokio::test]
    async fn replies_are_ignored_when_reply_count_is_zero() {
        let server = MockServer::start().await;
        let mut item = thread("top", &["stale reply"]);
        item["snippet"]["totalReplyCount"] = json!(0);

        Mock::given(method("GET"))
            .and(path("/commentThreads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [item]})))
            .mount(&server)
            .await;

        let client = YoutubeClient::new(test_config(server.uri())).expect("client should build");
        let comments = client.fetch_all_comments("PSWf2TjTGNY").await.unwrap();
        assert_eq!(comments, vec!["top"]);
    }

    #[tokio::test]
    async fn api_error_maps_to_status_and_reason_without_retry() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/commentThreads"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "The video has disabled comments.",
                    "errors": [{"reason": "commentsDisabled", "location": "videoId"}]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = YoutubeClient::new(test_config(server.uri())).expect("client should build");
        let err = client
            .fetch_video_comments("PSWf2TjTGNY")
            .await
            .unwrap_err();

        match err {
            FetchError::Upstream { status, reason } => {
                assert_eq!(status, 403);
                assert_eq!(reason, "commentsDisabled");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/commentThreads"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/commentThreads"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"items": [thread("ok", &[])]})),
            )
            .mount(&server)
            .await;

        let client = YoutubeClient::new(test_config(server.uri())).expect("client should build");
        let comments = client.fetch_all_comments("PSWf2TjTGNY").await.unwrap();
        assert_eq!(comments, vec!["ok"]);
    }

    #[tokio::test]
    async fn retries_stop_at_max_attempts() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/commentThreads"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;

        let client = YoutubeClient::new(test_config(server.uri())).expect("client should build");
        let err = client.fetch_all_comments("PSWf2TjTGNY").await.unwrap_err();
        match err {
            YoutubeError::Api { status, reason, .. } => {
                assert_eq!(status, 500);
                assert_eq!(reason, "Internal Server Error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn base_url_path_is_preserved() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/youtube/v3/commentThreads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = YoutubeClient::new(test_config(format!("{}/youtube/v3", server.uri())))
            .expect("client should build");
        let comments = client.fetch_all_comments("PSWf2TjTGNY").await.unwrap();
        assert!(comments.is_empty());
    }
}
