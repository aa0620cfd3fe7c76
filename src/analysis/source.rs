//! Comment sources: manual text and YouTube video threads.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::error::AnalysisError;

/// Where the comments of a request come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSource {
    YoutubeVideo,
    ManuallyEntered,
}

impl CommentSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::YoutubeVideo => "youtube_video",
            Self::ManuallyEntered => "manually_entered",
        }
    }
}

impl fmt::Display for CommentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentSource {
    type Err = AnalysisError;

    fn from_str(selector: &str) -> Result<Self, Self::Err> {
        match selector {
            "youtube_video" => Ok(Self::YoutubeVideo),
            "manually_entered" => Ok(Self::ManuallyEntered),
            other => Err(AnalysisError::InvalidSource {
                selector: other.to_string(),
            }),
        }
    }
}

/// Failure reported by a [`CommentFetcher`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API answered with an error status.
    #[error("upstream returned {status} {reason}")]
    Upstream { status: u16, reason: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Retrieves every comment of a video, replies included.
#[async_trait]
pub trait CommentFetcher: Send + Sync {
    async fn fetch_video_comments(&self, video_id: &str) -> Result<Vec<String>, FetchError>;
}

static VIDEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://|//)?(?:www\.|m\.)?(?:youtu\.be/|youtube\.com/(?:embed/|v/|watch\?v=|watch\?.+&v=))(?P<video_id>[\w-]{11})",
    )
    .expect("compile video url pattern")
});

/// Extract the eleven character video id from a watch, embed or short URL.
///
/// Anything that is not a recognised YouTube URL is treated as a bare id and
/// returned trimmed.
#[must_use]
pub fn resolve_video_id(input: &str) -> String {
    let input = input.trim();
    VIDEO_URL
        .captures(input)
        .and_then(|captures| captures.name("video_id"))
        .map_or_else(|| input.to_string(), |id| id.as_str().to_string())
}

/// Produce the comment list for `source`.
///
/// Manual input is a one-element batch and never fails.
///
/// # Errors
/// [`AnalysisError::NoCommentsFound`] when a video yields no comments,
/// [`AnalysisError::UpstreamService`] when the API rejects the request,
/// [`AnalysisError::Unexpected`] for transport and decoding failures.
pub async fn collect_comments(
    source: CommentSource,
    input: &str,
    fetcher: &dyn CommentFetcher,
) -> Result<Vec<String>, AnalysisError> {
    match source {
        CommentSource::ManuallyEntered => Ok(vec![input.to_string()]),
        CommentSource::YoutubeVideo => {
            let video_id = resolve_video_id(input);
            let comments = fetcher
                .fetch_video_comments(&video_id)
                .await
                .map_err(|error| match error {
                    FetchError::Upstream { status, reason } => {
                        AnalysisError::UpstreamService { status, reason }
                    }
                    FetchError::Other(error) => AnalysisError::Unexpected(error),
                })?;
            if comments.is_empty() {
                return Err(AnalysisError::NoCommentsFound { video_id });
            }
            Ok(comments)
        }
    }
}
