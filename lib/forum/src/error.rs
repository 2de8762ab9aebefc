use thiserror::Error;

/// Errors surfaced by a [`CommentGateway`](crate::gateway::CommentGateway).
///
/// The API reports failures as `{"code": "...", "message": "..."}`; `code` is
/// stable and machine-readable, `message` is for display. Transport failures
/// that never reached the API are `Network`.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Request never completed (DNS, connect, timeout, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with a non-success status.
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The response arrived but could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Errors from [`ReplyComposer::submit`](crate::composer::ReplyComposer::submit).
///
/// Validation variants are produced before any network call and require the
/// user to change input; `Gateway` wraps a transport/API failure and may be
/// retried as-is.
#[derive(Error, Debug)]
pub enum ComposeError {
    /// No content and no attachment.
    #[error("post cannot be empty")]
    Empty,

    /// Image attachment exceeds the 8 MiB limit.
    #[error("image too large: {size} bytes")]
    ImageTooLarge { size: u64 },

    /// File attachment exceeds the 100 MiB limit.
    #[error("file too large: {size} bytes")]
    FileTooLarge { size: u64 },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ComposeError {
    /// Whether this error requires the user to edit the draft (as opposed to
    /// a transport failure, which may simply be retried).
    pub fn is_validation(&self) -> bool {
        !matches!(self, ComposeError::Gateway(_))
    }
}
