//! Token endpoint client over HTTP

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::application::errors::AuthError;
use crate::domain::traits::{TokenEndpoint, TokenReply, TokenRequest};

/// Posts token requests to the provider, parameters in the query string
pub struct ReqwestTokenClient {
    endpoint: Url,
    client: Client,
}

impl ReqwestTokenClient {
    /// `timeout` of `None` leaves requests unbounded
    pub fn new(endpoint: Url, timeout: Option<Duration>) -> Result<Self, AuthError> {
        let mut builder = Client::builder().user_agent(concat!("twitch-chat-bot/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AuthError::MalformedRequest(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TokenEndpoint for ReqwestTokenClient {
    async fn request(&self, request: &TokenRequest) -> Result<TokenReply, AuthError> {
        tracing::debug!("POST {} ({:?})", self.endpoint, request);

        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&request.params())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            AuthError::NoResponse(format!("Response body from {} was not received: {}", self.endpoint, e))
        })?;

        Ok(TokenReply { status, body })
    }
}

fn classify(err: reqwest::Error) -> AuthError {
    if err.is_builder() {
        AuthError::MalformedRequest(err.to_string())
    } else {
        AuthError::NoResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::Grant;

    fn request() -> TokenRequest {
        TokenRequest {
            client_id: "cid".to_string(),
            client_secret: "cs".to_string(),
            grant: Grant::AuthorizationCode { code: "c".to_string() },
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_no_response() {
        // Port 1 on loopback is not listening
        let client = ReqwestTokenClient::new(
            Url::parse("http://127.0.0.1:1/oauth2/token").unwrap(),
            Some(Duration::from_secs(5)),
        )
        .unwrap();

        let err = client.request(&request()).await.unwrap_err();
        assert!(matches!(err, AuthError::NoResponse(_)), "{:?}", err);
    }

    #[test]
    fn test_client_keeps_endpoint() {
        let url = Url::parse("https://id.twitch.tv/oauth2/token").unwrap();
        let client = ReqwestTokenClient::new(url.clone(), None).unwrap();
        assert_eq!(client.endpoint(), &url);
    }
}
