//! Token acquisition - authorization-code exchange with a single refresh fallback

use serde_json::Value;

use crate::application::errors::{AuthError, StorageError};
use crate::domain::entities::Credential;
use crate::domain::traits::{CredentialStore, Grant, TokenEndpoint, TokenReply, TokenRequest};
use crate::infrastructure::config::BotConfig;

/// Status the provider returns for an already-used authorization code
const CODE_ALREADY_USED: u16 = 400;

/// Obtains OAuth credentials and persists every successful response.
///
/// `acquire` tries the authorization code first. A 400 means the code was
/// spent by an earlier run, so it falls back to the stored refresh token
/// exactly once. Nothing else is retried.
pub struct TokenAcquirer<E, S> {
    endpoint: E,
    store: S,
}

impl<E: TokenEndpoint, S: CredentialStore> TokenAcquirer<E, S> {
    pub fn new(endpoint: E, store: S) -> Self {
        Self { endpoint, store }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn acquire(&self, config: &BotConfig) -> Result<Credential, AuthError> {
        tracing::info!("Fetching Twitch OAuth token");
        let request = TokenRequest {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            grant: Grant::AuthorizationCode {
                code: config.authorization_code.clone(),
            },
        };

        let reply = self.send(&request).await?;
        if reply.is_success() {
            return self.accept(reply).await;
        }
        if reply.status == CODE_ALREADY_USED {
            tracing::info!("Authorization code rejected with 400, falling back to refresh token");
            return self.refresh(config).await;
        }

        tracing::warn!("Failed to get Twitch OAuth token: status {}", reply.status);
        Err(AuthError::Response {
            status: reply.status,
            body: reply.body,
        })
    }

    /// Exchange the stored refresh token for a new credential
    pub async fn refresh(&self, config: &BotConfig) -> Result<Credential, AuthError> {
        tracing::info!("Fetching Twitch OAuth refresh token");
        let stored = match self.store.load().await {
            Ok(raw) => raw,
            Err(StorageError::NotFound(path)) => {
                tracing::warn!("No stored credential at {}", path);
                return Err(AuthError::NoStoredCredential);
            }
            Err(e) => return Err(e.into()),
        };
        let refresh_token = stored
            .get("refresh_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingRefreshToken)?
            .to_string();

        let request = TokenRequest {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            grant: Grant::RefreshToken { refresh_token },
        };

        let reply = self.send(&request).await?;
        if reply.is_success() {
            return self.accept(reply).await;
        }

        tracing::warn!("Failed to get Twitch OAuth refresh token: status {}", reply.status);
        Err(AuthError::Response {
            status: reply.status,
            body: reply.body,
        })
    }

    async fn send(&self, request: &TokenRequest) -> Result<TokenReply, AuthError> {
        self.endpoint.request(request).await.map_err(|e| {
            tracing::warn!("Token request ({}) failed: {}", request.grant.grant_type(), e);
            e
        })
    }

    /// Validate a 2xx body and persist it before handing the credential out
    async fn accept(&self, reply: TokenReply) -> Result<Credential, AuthError> {
        let raw: Value = serde_json::from_str(&reply.body)
            .map_err(|e| AuthError::MalformedResponse(format!("body is not JSON: {}", e)))?;
        let credential =
            Credential::from_token_response(raw).map_err(|v| AuthError::MalformedResponse(v.to_string()))?;

        self.store.save(&credential.raw).await?;
        tracing::info!("Stored new Twitch OAuth credential");
        Ok(credential)
    }
}
