//! Application layer errors

use thiserror::Error;

/// Top-level bot errors, surfaced by the bootstrapper
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration errors. Always terminal: raised before any network activity.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Token acquisition failures
#[derive(Error, Debug)]
pub enum AuthError {
    /// The token endpoint answered with a non-2xx status
    #[error("Token endpoint returned {status}: {body}")]
    Response { status: u16, body: String },

    /// The request went out but no response came back
    #[error("No response from token endpoint: {0}")]
    NoResponse(String),

    /// The request could not be built or sent
    #[error("Malformed token request: {0}")]
    MalformedRequest(String),

    /// 2xx with a body that is not a valid token response
    #[error("Malformed token response: {0}")]
    MalformedResponse(String),

    #[error("No stored credential to refresh from")]
    NoStoredCredential,

    #[error("Stored credential has no refresh_token")]
    MissingRefreshToken,

    #[error("Credential storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Command handler failures. Contained at the dispatcher boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl HandlerError {
    /// Log tag used when the dispatcher reports this failure
    pub fn tag(&self) -> &'static str {
        match self {
            HandlerError::Execution(_) => "handler_error",
            HandlerError::Unexpected(_) => "unexpected_handler_error",
        }
    }
}

/// Chat transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed")]
    Closed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Chat login rejected: {0}")]
    Auth(String),
}
