use std::fmt;

use async_trait::async_trait;

use crate::application::errors::TransportError;
use crate::domain::entities::ChatMessage;

/// ChatTransport trait - abstraction over the chat connection
#[async_trait]
pub trait ChatTransport: Send {
    /// Log in and join the channel described by `descriptor`
    async fn connect(&mut self, descriptor: &ConnectionDescriptor) -> Result<(), TransportError>;

    /// Wait for the next chat message. `None` once the stream has ended.
    async fn next_message(&mut self) -> Result<Option<ChatMessage>, TransportError>;

    /// Send a line of text to a channel
    async fn say(&mut self, channel: &str, text: &str) -> Result<(), TransportError>;

    /// Transport name for logs
    fn name(&self) -> &str;
}

/// Everything a transport needs to log in and join
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub username: String,
    /// `oauth:<access_token>`
    pub password: String,
    /// Channel name without the leading `#`
    pub channel: String,
}

impl ConnectionDescriptor {
    pub fn new(username: impl Into<String>, access_token: &str, channel: impl Into<String>) -> Self {
        let channel: String = channel.into();
        Self {
            username: username.into(),
            password: format!("oauth:{}", access_token),
            channel: channel.trim_start_matches('#').to_lowercase(),
        }
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("channel", &self.channel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_prefixes_token() {
        let d = ConnectionDescriptor::new("bot", "abc123", "#MyChannel");
        assert_eq!(d.password, "oauth:abc123");
        assert_eq!(d.channel, "mychannel");
        assert!(!format!("{:?}", d).contains("abc123"));
    }
}
