//! Auth errors

use thiserror::Error;

/// Authentication errors raised by the bearer-auth gateway
#[derive(Error, Debug)]
pub enum AuthError {
    /// No credential presented
    #[error("Not authenticated")]
    TokenMissing,

    /// Token's embedded expiry has passed
    #[error("Token is expired")]
    TokenExpired,

    /// Signature verification failed, payload malformed, or the token has
    /// been superseded
    #[error("Token is not valid")]
    TokenInvalid,

    /// Not a decodable token at all (wrong format)
    #[error("Token is not valid")]
    TokenMalformed,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::TokenMissing | Self::TokenInvalid => 403,
            Self::TokenExpired | Self::TokenMalformed => 401,
            Self::UserNotFound => 404,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }
}

impl From<stride_db::DbError> for AuthError {
    fn from(err: stride_db::DbError) -> Self {
        tracing::error!("Database error: {}", err);
        Self::Database(err.to_string())
    }
}

/// Errors raised while driving the NHS login flow
#[derive(Error, Debug)]
pub enum LoginError {
    /// Callback arrived without either required query parameter
    #[error("Missing state and code")]
    MissingCodeAndState,

    /// Callback arrived without the authorization code
    #[error("Missing code")]
    MissingCode,

    /// Callback arrived without the state parameter
    #[error("Missing state")]
    MissingState,

    /// Malformed or unparseable login state
    #[error("invalid login state: {0}")]
    InvalidState(String),

    /// Identity or demographics provider failure. The display string is
    /// for server logs; clients only ever see a generic 500.
    #[error("upstream provider error: {0}")]
    Upstream(String),

    /// Bad signing key or endpoint configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Token signing/validation error
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl LoginError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingCodeAndState
            | Self::MissingCode
            | Self::MissingState
            | Self::InvalidState(_) => 400,
            Self::Auth(e) => e.status_code(),
            Self::Upstream(_) | Self::Configuration(_) | Self::Database(_) => 500,
        }
    }
}

impl From<stride_db::DbError> for LoginError {
    fn from(err: stride_db::DbError) -> Self {
        tracing::error!("Database error: {}", err);
        Self::Database(err.to_string())
    }
}
