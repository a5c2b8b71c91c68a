//! Error types for the Etherpad API client.
//!
//! # Design
//! Two enums split by lifetime. `ConfigError` can only happen while building
//! a client and is never retried. `ApiError` is produced per call and always
//! carries an HTTP-style status code (`status_code()`) next to its message
//! (`Display`), which is the whole failure contract handed to embedders.
//!
//! Envelope codes reported by Etherpad are kept as a `RemoteCode` so callers
//! can match on the remote reason without parsing status numbers.

use thiserror::Error;

use crate::version::ApiVersion;

/// Errors raised while validating a configuration or constructing a client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The raw configuration is not an object.
    #[error("Etherpad configuration is mandatory")]
    MissingConfig,

    /// `apiKey` is absent, not a string, or empty.
    #[error("Etherpad api key need to be a string")]
    MissingApiKey,

    /// `apiKey` is not 64 lowercase hexadecimal characters.
    #[error("Etherpad api key is invalid")]
    InvalidApiKey,

    #[error("Etherpad url is invalid")]
    InvalidUrl,

    #[error("Etherpad version is invalid")]
    InvalidVersion,

    /// The default HTTP transport could not be initialised.
    #[error("failed to initialise HTTP transport: {0}")]
    HttpClient(String),
}

/// Envelope `code` values sent by Etherpad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCode {
    Ok,
    WrongParameters,
    InternalError,
    NoSuchFunction,
    InvalidApiKey,
    /// Any code outside the documented `0..=4` range.
    Unknown(i64),
}

impl RemoteCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => RemoteCode::Ok,
            1 => RemoteCode::WrongParameters,
            2 => RemoteCode::InternalError,
            3 => RemoteCode::NoSuchFunction,
            4 => RemoteCode::InvalidApiKey,
            other => RemoteCode::Unknown(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            RemoteCode::Ok => 0,
            RemoteCode::WrongParameters => 1,
            RemoteCode::InternalError => 2,
            RemoteCode::NoSuchFunction => 3,
            RemoteCode::InvalidApiKey => 4,
            RemoteCode::Unknown(code) => *code,
        }
    }

    /// HTTP-style status reported for this code.
    pub fn status_code(&self) -> u16 {
        match self {
            RemoteCode::Ok => 200,
            RemoteCode::WrongParameters | RemoteCode::InvalidApiKey => 422,
            RemoteCode::InternalError => 500,
            RemoteCode::NoSuchFunction => 501,
            RemoteCode::Unknown(_) => 500,
        }
    }
}

/// Errors returned by a single API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The configured protocol version predates the method.
    #[error("Not implemented in Etherpad API v{configured}. You should upgrade to >=v{required}")]
    NotImplemented {
        configured: ApiVersion,
        required: ApiVersion,
    },

    /// The per-call deadline expired before a response arrived.
    #[error("Request Timeout")]
    Timeout,

    /// No connection to Etherpad could be established.
    #[error("Etherpad is unavailable")]
    Unavailable,

    /// Etherpad answered with a non-zero envelope code.
    #[error("{message}")]
    Remote { code: RemoteCode, message: String },

    /// Non-2xx response whose body is not an envelope.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Any other transport failure that produced no HTTP status.
    #[error("{0}")]
    Transport(String),

    /// A 2xx response whose body is not an envelope.
    #[error("invalid Etherpad response: {0}")]
    InvalidEnvelope(String),

    /// The call parameters do not serialize to a flat object.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotImplemented { .. } => 501,
            ApiError::Timeout => 408,
            ApiError::Unavailable => 503,
            ApiError::Remote { code, .. } => code.status_code(),
            ApiError::Http { status, .. } => *status,
            ApiError::Transport(_) | ApiError::InvalidEnvelope(_) => 500,
            ApiError::InvalidParams(_) => 400,
        }
    }
}
