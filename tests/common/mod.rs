//! Shared test helpers: a mocked token endpoint and a scripted chat transport

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Once;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

use twitch_chat_bot::application::errors::TransportError;
use twitch_chat_bot::domain::entities::ChatMessage;
use twitch_chat_bot::domain::traits::{ChatTransport, ConnectionDescriptor};
use twitch_chat_bot::infrastructure::config::{BotConfig, Config};

static INIT: Once = Once::new();

pub fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Token endpoint URL on a mock server
pub fn token_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/oauth2/token", server.uri())).expect("mock url")
}

/// Answer `grant_type=<grant>` token requests with `status` and a JSON body, exactly `times` times
pub async fn mount_token_reply(server: &MockServer, grant: &str, status: u16, body: Value, times: u64) {
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/oauth2/token"))
        .and(matchers::query_param("grant_type", grant))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .up_to_n_times(times)
        .expect(times)
        .mount(server)
        .await;
}

/// Query parameters of every request the server received, in arrival order
pub async fn sent_params(server: &MockServer) -> Vec<HashMap<String, String>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|req| req.url.query_pairs().into_owned().collect())
        .collect()
}

/// Bot config pointing at `endpoint`
pub fn bot_config(endpoint: &Url) -> BotConfig {
    let yaml = format!(
        "twitch:\n  token_endpoint: {}\n  username: test_bot\n  client_id: cid\n  client_secret: csecret\n  authorization_code: code-1\n  channel: test_channel\n",
        endpoint
    );
    Config::from_yaml_str(&yaml)
        .expect("parse test config")
        .validate()
        .expect("valid test config")
}

/// Feeds scripted messages and records logins and replies
#[derive(Default)]
pub struct ScriptedTransport {
    incoming: VecDeque<ChatMessage>,
    pub logins: Vec<ConnectionDescriptor>,
    /// Passwords the fake server refuses
    pub rejected_passwords: Vec<String>,
    pub said: Vec<(String, String)>,
}

impl ScriptedTransport {
    pub fn with_lines(lines: &[&str]) -> Self {
        Self {
            incoming: lines
                .iter()
                .map(|text| ChatMessage::new("test_channel", "viewer", *text))
                .collect(),
            ..Self::default()
        }
    }

    pub fn replies(&self) -> Vec<String> {
        self.said.iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn connect(&mut self, descriptor: &ConnectionDescriptor) -> Result<(), TransportError> {
        self.logins.push(descriptor.clone());
        if self.rejected_passwords.contains(&descriptor.password) {
            return Err(TransportError::Auth("Login authentication failed".to_string()));
        }
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<ChatMessage>, TransportError> {
        Ok(self.incoming.pop_front())
    }

    async fn say(&mut self, channel: &str, text: &str) -> Result<(), TransportError> {
        self.said.push((channel.to_string(), text.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
