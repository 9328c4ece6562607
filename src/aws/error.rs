//! Remote API errors
//!
//! The one error shape every operation in a client's capability map returns,
//! whether it is backed by the AWS SDK or by a test stub.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::fmt;

/// Error returned by one remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// Provider error code, e.g. `Throttling` or `AccessDenied`
    pub code: Option<String>,
    pub message: String,
    /// HTTP status of the response, when one arrived
    pub status: Option<u16>,
    /// Set when the transport or the provider marks the call as safe to repeat
    pub retryable: bool,
}

impl RemoteError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.to_string()),
            message: message.into(),
            status: None,
            retryable: false,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// 404, or one of the `NoSuch*` codes S3 uses for absent configuration
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
            || self
                .code
                .as_deref()
                .map(|c| c.starts_with("NoSuch") || c.ends_with("NotFound"))
                .unwrap_or(false)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, self.status) {
            (Some(code), Some(status)) => write!(f, "{} ({}): {}", code, status, self.message),
            (Some(code), None) => write!(f, "{}: {}", code, self.message),
            (None, Some(status)) => write!(f, "HTTP {}: {}", status, self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

impl<E> From<SdkError<E, HttpResponse>> for RemoteError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    fn from(err: SdkError<E, HttpResponse>) -> Self {
        let status = err.raw_response().map(|r| r.status().as_u16());
        let code = err.code().map(str::to_string);
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

        let retryable = is_retryable(&err, status);

        Self {
            code,
            message,
            status,
            retryable,
        }
    }
}

/// Transport failures, or a reply (parsed or not) with a 5xx status
fn is_retryable<E, R>(err: &SdkError<E, R>, status: Option<u16>) -> bool {
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => true,
        SdkError::ResponseError(_) | SdkError::ServiceError(_) => {
            status.map(|s| s >= 500).unwrap_or(false)
        }
        _ => false,
    }
}
