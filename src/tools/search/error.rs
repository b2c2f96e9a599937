use reqwest::StatusCode;
use thiserror::Error;

/// Failures reported by a lookup provider.
///
/// Only [`ProviderError::is_recoverable`] failures are absorbed by
/// [`SearchAdapter`](super::SearchAdapter); every other variant reaches the
/// caller wrapped in [`ToolError::Provider`](crate::tools::ToolError::Provider).
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} is rate limiting requests (HTTP {status})")]
    RateLimited { provider: String, status: u16 },

    #[error("{provider} answered with a bot challenge page")]
    Challenge { provider: String },

    #[error("Request to {provider} timed out")]
    Timeout { provider: String },

    #[error("Request to {provider} failed: {source}")]
    Http {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}")]
    Status { provider: String, status: u16 },

    #[error("Malformed response from {provider}: {message}")]
    Malformed { provider: String, message: String },

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ProviderError {
    /// Throttling conditions, which resolve by themselves after a while.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. } | ProviderError::Challenge { .. }
        )
    }

    pub(crate) fn from_reqwest(provider: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout {
                provider: provider.into(),
            }
        } else {
            ProviderError::Http {
                provider: provider.into(),
                source: error,
            }
        }
    }

    pub(crate) fn malformed(provider: &str, message: impl Into<String>) -> Self {
        ProviderError::Malformed {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Maps a response status to a provider error.
///
/// 429 always means rate limiting; `throttle_statuses` lists the extra codes a
/// provider uses to signal throttling.
pub(crate) fn check_status(
    provider: &str,
    status: StatusCode,
    throttle_statuses: &[StatusCode],
) -> Result<(), ProviderError> {
    if status == StatusCode::TOO_MANY_REQUESTS || throttle_statuses.contains(&status) {
        return Err(ProviderError::RateLimited {
            provider: provider.into(),
            status: status.as_u16(),
        });
    }

    if !status.is_success() {
        return Err(ProviderError::Status {
            provider: provider.into(),
            status: status.as_u16(),
        });
    }

    Ok(())
}
