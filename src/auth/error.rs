//! Authentication errors.

use thiserror::Error;

/// Errors raised by the token codec and the auth gateway.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed, wrongly signed, wrong-algorithm or expired token.
    #[error("Could not validate credentials")]
    InvalidToken,

    /// Credentials rejected by every login path, or claims unusable as an identity.
    #[error("Incorrect credentials")]
    Unauthorized,

    /// Token could not be signed.
    #[error("Token signing failed: {0}")]
    Signing(String),

    /// Gateway could not be set up from the configuration.
    #[error("Auth configuration error: {0}")]
    Config(String),
}
