pub mod password;
pub mod session;
pub mod tokens;

pub use session::{TokenPair, ACCESS_COOKIE, REFRESH_COOKIE};
pub use tokens::TokenKeys;

/// Failures of the session authenticator. All render as 401.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Token not found")]
    MissingToken,

    #[error("Invalid access token")]
    InvalidToken,

    #[error("Invalid access token or user not found")]
    NotFound,

    #[error("Refresh token is expired or used")]
    Expired,

    #[error("Invalid user credentials")]
    InvalidCredentials,
}
