//! Error handling
//!
//! Every failure of a command ends up as a [`DrawError`], which knows how to
//! describe itself to the chat user. Transport failures are first reduced to a
//! [`FailedCall`] and then classified into an [`ErrorCategory`].

use reqwest::StatusCode;

/// Transport-level error codes, named after the errno-style codes HTTP
/// clients usually report.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransportCode {
    /// The request or connection timed out.
    TimedOut,
    /// The connection could not be established.
    ConnectionRefused,
    /// The request could not be sent.
    Request,
    /// The response body could not be read.
    Body,
    /// The response body could not be decoded.
    Decode,
    /// Too many redirects, or an invalid one.
    Redirect,
    /// The request could not be built.
    Builder,
}

impl TransportCode {
    /// The code as reported to users.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimedOut => "ETIMEDOUT",
            Self::ConnectionRefused => "ECONNREFUSED",
            Self::Request => "EREQUEST",
            Self::Body => "EBODY",
            Self::Decode => "EDECODE",
            Self::Redirect => "EREDIRECT",
            Self::Builder => "EBUILDER",
        }
    }
}

impl std::fmt::Display for TransportCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What we know about a failed outbound call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FailedCall {
    /// HTTP status, when a response was received.
    pub status: Option<StatusCode>,
    /// Transport error code, when the failure happened below HTTP.
    pub code: Option<TransportCode>,
    /// Raw error text.
    pub message: String,
}

impl FailedCall {
    /// A failure with a response status.
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code: None,
            message: message.into(),
        }
    }

    /// A failure without any HTTP or transport detail.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// Picks the user-facing category for this failure.
    pub fn classify(&self) -> ErrorCategory {
        classify(self.status, self.code, &self.message)
    }
}

impl From<&reqwest::Error> for FailedCall {
    fn from(err: &reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            Some(TransportCode::TimedOut)
        } else if err.is_connect() {
            Some(TransportCode::ConnectionRefused)
        } else if err.is_redirect() {
            Some(TransportCode::Redirect)
        } else if err.is_body() {
            Some(TransportCode::Body)
        } else if err.is_decode() {
            Some(TransportCode::Decode)
        } else if err.is_builder() {
            Some(TransportCode::Builder)
        } else if err.is_request() {
            Some(TransportCode::Request)
        } else {
            None
        };
        Self {
            status: err.status(),
            code,
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for FailedCall {
    fn from(err: reqwest::Error) -> Self {
        Self::from(&err)
    }
}

impl std::fmt::Display for FailedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.status, self.code) {
            (Some(status), _) => write!(f, "HTTP {status}: {}", self.message),
            (None, Some(code)) => write!(f, "{code}: {}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// User-facing classes of outbound call failures.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    /// HTTP 402: the service throttles successive requests.
    RateLimited,
    /// Any other HTTP status.
    Status {
        /// Numeric status.
        code: u16,
        /// Canonical reason phrase, empty when unknown.
        reason: String,
    },
    /// The call timed out.
    TimedOut,
    /// Failed below HTTP with a transport code.
    Code(TransportCode),
    /// Nothing more specific is known.
    Unclassified(String),
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => {
                write!(f, "[warning] Please don't send different images in such quick succession.")
            }
            Self::Status { code, reason } => {
                write!(f, "[error] The request failed (HTTP {code}, {reason})")
            }
            Self::TimedOut => write!(f, "[error] The request timed out."),
            Self::Code(code) => write!(f, "[error] The request failed (error code: {code})"),
            Self::Unclassified(message) => write!(f, "[error] {message}"),
        }
    }
}

/// Maps a failed call to exactly one category. First match wins:
/// 402, other status, timeout, other transport code, raw text.
pub fn classify(
    status: Option<StatusCode>,
    code: Option<TransportCode>,
    message: &str,
) -> ErrorCategory {
    match (status, code) {
        (Some(StatusCode::PAYMENT_REQUIRED), _) => ErrorCategory::RateLimited,
        (Some(status), _) => ErrorCategory::Status {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        },
        (None, Some(TransportCode::TimedOut)) => ErrorCategory::TimedOut,
        (None, Some(code)) => ErrorCategory::Code(code),
        (None, None) => ErrorCategory::Unclassified(message.to_string()),
    }
}

/// Problems fetching a source image.
#[derive(Debug)]
pub enum DownloadError {
    /// Not a JPEG or PNG.
    UnsupportedFileType,
    /// Larger than the download limit.
    FileTooLarge,
    /// Anything else, with the underlying reason.
    Failed(String),
}

impl std::fmt::Display for DownloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFileType => write!(f, "Unsupported file type, please send a JPEG or PNG image."),
            Self::FileTooLarge => write!(f, "The image is too large."),
            Self::Failed(_) => write!(f, "Oops, the image failed to load › (╯°口°)╯"),
        }
    }
}

impl std::error::Error for DownloadError {}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::Failed(err.to_string())
    }
}

impl From<base64::DecodeError> for DownloadError {
    fn from(err: base64::DecodeError) -> Self {
        DownloadError::Failed(err.to_string())
    }
}

impl From<image::ImageError> for DownloadError {
    fn from(err: image::ImageError) -> Self {
        DownloadError::Failed(err.to_string())
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        DownloadError::Failed(err.to_string())
    }
}

/// definitions for a failed drawing or upscaling command.
#[derive(Debug)]
pub enum DrawError {
    /// A command that needs an image did not get one.
    MissingImage,
    /// Image-to-image without tags or a base prompt.
    MissingTags,
    /// Tags contained CJK ideographs.
    CjkTags,
    /// The source image could not be fetched.
    Download(DownloadError),
    /// The generation or upscaling call failed.
    Request(FailedCall),
    /// Unexpected failure, reported with its raw text.
    Internal(String),
}

impl DrawError {
    /// True for errors caused by what the user typed.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::MissingImage
                | Self::MissingTags
                | Self::CjkTags
                | Self::Download(DownloadError::UnsupportedFileType | DownloadError::FileTooLarge)
        )
    }

    /// Message shown to the chat user.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingImage => {
                "No image detected, please check the format and attach an image.".to_string()
            }
            Self::MissingTags => "Please provide descriptive tags or configure a basePrompt.".to_string(),
            Self::CjkTags => "Tags must be written in English, not Chinese 🤜".to_string(),
            Self::Download(err) => err.to_string(),
            Self::Request(call) => call.classify().to_string(),
            Self::Internal(message) => ErrorCategory::Unclassified(message.clone()).to_string(),
        }
    }
}

impl std::fmt::Display for DrawError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Download(DownloadError::Failed(reason)) => {
                write!(f, "image download failed: {reason}")
            }
            Self::Request(call) => write!(f, "request failed: {call}"),
            Self::Internal(message) => f.write_str(message),
            _ => f.write_str(&self.user_message()),
        }
    }
}

impl std::error::Error for DrawError {}

impl From<DownloadError> for DrawError {
    fn from(err: DownloadError) -> Self {
        DrawError::Download(err)
    }
}

impl From<FailedCall> for DrawError {
    fn from(call: FailedCall) -> Self {
        DrawError::Request(call)
    }
}

impl From<reqwest::Error> for DrawError {
    fn from(err: reqwest::Error) -> Self {
        DrawError::Request(FailedCall::from(&err))
    }
}

impl From<anyhow::Error> for DrawError {
    fn from(err: anyhow::Error) -> Self {
        DrawError::Internal(err.to_string())
    }
}
