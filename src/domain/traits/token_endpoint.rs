use std::fmt;

use async_trait::async_trait;

use crate::application::errors::AuthError;

/// Redirect URI registered for the authorization-code grant
pub const REDIRECT_URI: &str = "http://localhost";

/// OAuth grant to exchange at the token endpoint
#[derive(Clone, PartialEq, Eq)]
pub enum Grant {
    AuthorizationCode { code: String },
    RefreshToken { refresh_token: String },
}

impl Grant {
    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::AuthorizationCode { .. } => "authorization_code",
            Grant::RefreshToken { .. } => "refresh_token",
        }
    }
}

impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grant({})", self.grant_type())
    }
}

/// A token endpoint request
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub client_id: String,
    pub client_secret: String,
    pub grant: Grant,
}

impl TokenRequest {
    /// Request parameters, in the order they are sent
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.clone()),
        ];
        match &self.grant {
            Grant::AuthorizationCode { code } => {
                params.push(("code", code.clone()));
                params.push(("grant_type", self.grant.grant_type().to_string()));
                params.push(("redirect_uri", REDIRECT_URI.to_string()));
            }
            Grant::RefreshToken { refresh_token } => {
                params.push(("refresh_token", refresh_token.clone()));
                params.push(("grant_type", self.grant.grant_type().to_string()));
            }
        }
        params
    }
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("client_id", &self.client_id)
            .field("grant_type", &self.grant.grant_type())
            .finish_non_exhaustive()
    }
}

/// Status and body of a token endpoint response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenReply {
    pub status: u16,
    pub body: String,
}

impl TokenReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP seam for the token endpoint.
///
/// Any response that arrives, whatever its status, is `Ok`. Errors are
/// limited to `AuthError::NoResponse` and `AuthError::MalformedRequest`.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn request(&self, request: &TokenRequest) -> Result<TokenReply, AuthError>;
}
