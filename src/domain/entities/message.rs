use chrono::{DateTime, Utc};

/// A chat line delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    /// Channel name without the leading `#`
    pub channel: String,
    pub sender: String,
    pub text: String,
    /// True when the bot account sent this line itself
    pub is_self: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(channel: impl Into<String>, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel: channel.into(),
            sender: sender.into(),
            text: text.into(),
            is_self: false,
            timestamp: Utc::now(),
        }
    }

    pub fn with_self(mut self, is_self: bool) -> Self {
        self.is_self = is_self;
        self
    }
}
