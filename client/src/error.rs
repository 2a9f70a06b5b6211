use api::ApiError;
use thiserror::Error;

/// Conditions the coordinators surface to the presentation layer.
///
/// Each variant's display string is the user-facing message, so the distinct
/// conditions (invalid credentials vs generic failure, unavailable walk vs
/// already-requested) stay distinct all the way to the screen. Expected
/// failures are always values, never panics.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    AccountExists,
    #[error("a walk request is already in progress")]
    AlreadyRequested,
    #[error("this walk is no longer available")]
    Unavailable,
    #[error("server error, please try again")]
    Server(#[source] ApiError),
    #[error("connection failed: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),
}

impl ClientError {
    /// Generic wrapper for an unexpected backend failure.
    pub fn server(err: ApiError) -> Self {
        ClientError::Server(err)
    }
}
