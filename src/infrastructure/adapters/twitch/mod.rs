//! Twitch chat adapter over IRC-over-WebSocket
//!
//! Speaks just enough IRC for a single-channel bot: PASS/NICK login,
//! JOIN, PING/PONG keepalive, and PRIVMSG in both directions. IRCv3
//! message tags are stripped, not parsed. The default endpoint is
//! `wss://irc-ws.chat.twitch.tv:443`, so the token never crosses the
//! network in cleartext.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::application::errors::TransportError;
use crate::domain::entities::ChatMessage;
use crate::domain::traits::{ChatTransport, ConnectionDescriptor};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Twitch IRC adapter.
///
/// A server `RECONNECT` is answered by logging in again on a fresh socket
/// with the same descriptor. Lines already received from the old socket
/// are still delivered. A socket that closes without `RECONNECT` is an
/// error, not a normal end of stream.
pub struct TwitchIrcAdapter {
    url: String,
    socket: Option<WsStream>,
    pending: VecDeque<String>,
    descriptor: Option<ConnectionDescriptor>,
    username: String,
}

impl TwitchIrcAdapter {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            socket: None,
            pending: VecDeque::new(),
            descriptor: None,
            username: String::new(),
        }
    }

    fn socket(&mut self) -> Result<&mut WsStream, TransportError> {
        self.socket
            .as_mut()
            .ok_or_else(|| TransportError::Protocol("not connected".to_string()))
    }

    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.socket()?
            .send(Message::text(line.to_string()))
            .await
            .map_err(ws_error)
    }

    /// Next raw IRC line; `None` once the server closed the socket
    async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Ok(Some(line));
            }
            let frame = match self.socket()?.next().await {
                None => return Ok(None),
                Some(frame) => frame.map_err(ws_error)?,
            };
            match frame {
                Message::Text(text) => push_lines(&mut self.pending, text.as_str()),
                Message::Binary(bytes) => push_lines(&mut self.pending, &String::from_utf8_lossy(&bytes)),
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    /// Open a socket, log in and join. Leaves lines that followed the
    /// welcome in `pending`.
    async fn open(&mut self, descriptor: &ConnectionDescriptor) -> Result<(), TransportError> {
        tracing::info!("Connecting to {} as {} for #{}", self.url, descriptor.username, descriptor.channel);
        let (socket, _) = connect_async(self.url.as_str()).await.map_err(ws_error)?;
        self.socket = Some(socket);
        self.username = descriptor.username.to_lowercase();

        let nick = format!("NICK {}", self.username);
        self.send_line(&format!("PASS {}", descriptor.password)).await?;
        self.send_line(&nick).await?;

        // Wait for the welcome numeric before joining
        loop {
            let Some(line) = self.read_line().await? else {
                return Err(TransportError::Closed);
            };
            if let Some(payload) = parse_ping(&line) {
                self.send_line(&build_pong(payload)).await?;
                continue;
            }
            if is_login_failure(&line) {
                return Err(TransportError::Auth(notice_text(&line).to_string()));
            }
            if is_welcome(&line) {
                break;
            }
        }

        self.send_line(&format!("JOIN #{}", descriptor.channel)).await?;
        tracing::info!("Joined #{}", descriptor.channel);
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<(), TransportError> {
        let descriptor = self
            .descriptor
            .clone()
            .ok_or_else(|| TransportError::Protocol("reconnect before login".to_string()))?;
        if let Some(mut old) = self.socket.take() {
            if let Err(e) = old.close(None).await {
                tracing::debug!("Closing old socket: {}", e);
            }
        }

        let carried = std::mem::take(&mut self.pending);
        self.open(&descriptor).await?;
        let fresh = std::mem::replace(&mut self.pending, carried);
        self.pending.extend(fresh);
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TwitchIrcAdapter {
    async fn connect(&mut self, descriptor: &ConnectionDescriptor) -> Result<(), TransportError> {
        self.pending.clear();
        self.open(descriptor).await?;
        self.descriptor = Some(descriptor.clone());
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<ChatMessage>, TransportError> {
        loop {
            let Some(line) = self.read_line().await? else {
                tracing::warn!("Twitch closed the connection");
                return Err(TransportError::Closed);
            };

            if let Some(payload) = parse_ping(&line) {
                self.send_line(&build_pong(payload)).await?;
                continue;
            }
            if command_of(&line) == Some("RECONNECT") {
                tracing::warn!("Server requested reconnect");
                self.reconnect().await?;
                continue;
            }

            if let Some(parsed) = parse_privmsg(&line) {
                let is_self = parsed.sender.eq_ignore_ascii_case(&self.username);
                return Ok(Some(
                    ChatMessage::new(parsed.channel, parsed.sender, parsed.text).with_self(is_self),
                ));
            }
            tracing::trace!("Unhandled IRC line: {}", line);
        }
    }

    async fn say(&mut self, channel: &str, text: &str) -> Result<(), TransportError> {
        self.send_line(&build_privmsg(channel, text)).await
    }

    fn name(&self) -> &str {
        "twitch"
    }
}

fn ws_error(err: tungstenite::Error) -> TransportError {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => TransportError::Closed,
        tungstenite::Error::Io(e) => TransportError::Io(e),
        other => TransportError::WebSocket(other.to_string()),
    }
}

/// One frame may carry several CRLF-terminated IRC lines
fn push_lines(pending: &mut VecDeque<String>, text: &str) {
    pending.extend(text.lines().filter(|l| !l.is_empty()).map(str::to_string));
}

/// A PRIVMSG parsed from a raw IRC line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub sender: String,
    /// Without the `#` prefix
    pub channel: String,
    pub text: String,
}

/// Drop a leading `@tags ` block if present
fn strip_tags(raw: &str) -> &str {
    if raw.starts_with('@') {
        raw.split_once(' ').map(|(_, rest)| rest).unwrap_or("")
    } else {
        raw
    }
}

/// The IRC command (or numeric) of a line
fn command_of(raw: &str) -> Option<&str> {
    let raw = strip_tags(raw);
    let rest = match raw.strip_prefix(':') {
        Some(prefixed) => prefixed.split_once(' ')?.1,
        None => raw,
    };
    rest.split(' ').next().filter(|c| !c.is_empty())
}

/// Payload of a `PING` line
pub fn parse_ping(raw: &str) -> Option<&str> {
    let raw = strip_tags(raw);
    raw.strip_prefix("PING :")
        .or_else(|| raw.strip_prefix("PING "))
        .or_else(|| (raw == "PING").then_some(""))
        .map(str::trim)
}

pub fn build_pong(payload: &str) -> String {
    format!("PONG :{}", payload)
}

/// `PRIVMSG #channel :text`, with line breaks flattened so the text cannot
/// smuggle extra IRC commands
pub fn build_privmsg(channel: &str, text: &str) -> String {
    let text: String = text.chars().map(|c| if c == '\r' || c == '\n' { ' ' } else { c }).collect();
    format!("PRIVMSG #{} :{}", channel.trim_start_matches('#'), text)
}

/// Parse `:nick!user@host PRIVMSG #channel :text`
pub fn parse_privmsg(raw: &str) -> Option<ParsedMessage> {
    let raw = strip_tags(raw).strip_prefix(':')?;
    let (prefix, rest) = raw.split_once(' ')?;
    let sender = prefix.split('!').next()?.to_string();
    let rest = rest.strip_prefix("PRIVMSG ")?;
    let (channel_part, text) = rest.split_once(" :")?;
    let channel = channel_part.strip_prefix('#')?.to_string();

    Some(ParsedMessage {
        sender,
        channel,
        text: text.to_string(),
    })
}

fn is_welcome(raw: &str) -> bool {
    command_of(raw) == Some("001")
}

fn is_login_failure(raw: &str) -> bool {
    command_of(raw) == Some("NOTICE") && {
        let text = notice_text(raw);
        text.contains("Login authentication failed") || text.contains("Improperly formatted auth")
    }
}

fn notice_text(raw: &str) -> &str {
    strip_tags(raw).split_once(" :").map(|(_, t)| t).unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    #[test]
    fn test_parse_privmsg() {
        let parsed =
            parse_privmsg(":nightbot!nightbot@nightbot.tmi.twitch.tv PRIVMSG #testchannel :!roll 20").unwrap();
        assert_eq!(parsed.sender, "nightbot");
        assert_eq!(parsed.channel, "testchannel");
        assert_eq!(parsed.text, "!roll 20");
    }

    #[test]
    fn test_parse_privmsg_with_tags() {
        let raw = "@badge-info=;color=#FF0000;display-name=Viewer :viewer!viewer@viewer.tmi.twitch.tv PRIVMSG #chan :hi there";
        let parsed = parse_privmsg(raw).unwrap();
        assert_eq!(parsed.sender, "viewer");
        assert_eq!(parsed.text, "hi there");
    }

    #[test]
    fn test_parse_privmsg_rejects_other_lines() {
        assert!(parse_privmsg(":tmi.twitch.tv 001 bot :Welcome, GLHF!").is_none());
        assert!(parse_privmsg("JOIN #channel").is_none());
        assert!(parse_privmsg(":user!u@u.tmi.twitch.tv PRIVMSG channel :msg").is_none());
        assert!(parse_privmsg("").is_none());
    }

    #[test]
    fn test_ping_pong() {
        assert_eq!(parse_ping("PING :tmi.twitch.tv"), Some("tmi.twitch.tv"));
        assert_eq!(build_pong("tmi.twitch.tv"), "PONG :tmi.twitch.tv");
        assert!(parse_ping("PONG :tmi.twitch.tv").is_none());
        assert!(parse_ping(":a!a@a PRIVMSG #c :PING").is_none());
    }

    #[test]
    fn test_privmsg_flattens_newlines() {
        assert_eq!(build_privmsg("#chan", "a\r\nQUIT"), "PRIVMSG #chan :a  QUIT");
    }

    #[test]
    fn test_login_failure_detection() {
        assert!(is_login_failure(":tmi.twitch.tv NOTICE * :Login authentication failed"));
        assert!(is_login_failure(":tmi.twitch.tv NOTICE * :Improperly formatted auth"));
        assert!(!is_login_failure(":tmi.twitch.tv NOTICE #chan :Slow mode is on"));
        assert!(is_welcome(":tmi.twitch.tv 001 bot :Welcome, GLHF!"));
    }

    const WELCOME: &str = ":tmi.twitch.tv 001 my_bot :Welcome, GLHF!";

    /// What the fake server does on one accepted socket
    struct Session {
        /// Sent once PASS and NICK have arrived
        frames: Vec<Message>,
        /// Keep reading until the client sends a line with this prefix
        read_until: &'static str,
        /// Send a close frame afterwards
        close: bool,
    }

    impl Session {
        fn new(frames: Vec<Message>, read_until: &'static str) -> Self {
            Self {
                frames,
                read_until,
                close: false,
            }
        }
    }

    async fn read_lines(
        ws: &mut WebSocketStream<TcpStream>,
        received: &mut Vec<String>,
        done: impl Fn(&[String]) -> bool,
    ) {
        while !done(received.as_slice()) {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => received.extend(text.as_str().lines().map(str::to_string)),
                Some(Ok(_)) => {}
                _ => break,
            }
        }
    }

    /// Serves `sessions` one after another; yields the lines each client sent
    async fn fake_server(sessions: Vec<Session>) -> (String, tokio::task::JoinHandle<Vec<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let mut transcripts = Vec::new();
            for session in sessions {
                let (stream, _) = listener.accept().await.unwrap();
                let mut ws = accept_async(stream).await.unwrap();
                let mut received = Vec::new();
                read_lines(&mut ws, &mut received, |r| r.len() >= 2).await;
                for frame in session.frames {
                    ws.send(frame).await.unwrap();
                }
                let until = session.read_until;
                read_lines(&mut ws, &mut received, |r| r.last().is_some_and(|l| l.starts_with(until))).await;
                if session.close {
                    let _ = ws.close(None).await;
                }
                transcripts.push(received);
            }
            transcripts
        });
        (url, handle)
    }

    fn frame(line: impl Into<String>) -> Message {
        Message::text(line.into())
    }

    fn privmsg(text: &str) -> String {
        format!(":viewer!viewer@viewer.tmi.twitch.tv PRIVMSG #chan :{}", text)
    }

    fn descriptor() -> ConnectionDescriptor {
        ConnectionDescriptor::new("My_Bot", "tok", "chan")
    }

    #[tokio::test]
    async fn test_login_join_receive_and_reply() {
        let (url, server) = fake_server(vec![Session::new(
            vec![
                frame("PING :tmi.twitch.tv"),
                frame(WELCOME),
                frame(privmsg("!ping")),
            ],
            "PRIVMSG",
        )])
        .await;

        let mut adapter = TwitchIrcAdapter::new(url);
        adapter.connect(&descriptor()).await.unwrap();

        let msg = adapter.next_message().await.unwrap().unwrap();
        assert_eq!(msg.text, "!ping");
        assert_eq!(msg.sender, "viewer");
        assert_eq!(msg.channel, "chan");
        assert!(!msg.is_self);

        adapter.say("chan", "pong").await.unwrap();
        let transcripts = server.await.unwrap();
        assert_eq!(
            transcripts[0],
            vec![
                "PASS oauth:tok".to_string(),
                "NICK my_bot".to_string(),
                "PONG :tmi.twitch.tv".to_string(),
                "JOIN #chan".to_string(),
                "PRIVMSG #chan :pong".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_several_lines_in_one_frame() {
        let burst = format!("{}\r\n:tmi.twitch.tv 002 my_bot :Your host is tmi.twitch.tv\r\n{}\r\n", WELCOME, privmsg("!roll 20"));
        let (url, _server) = fake_server(vec![Session::new(vec![frame(burst)], "PRIVMSG")]).await;

        let mut adapter = TwitchIrcAdapter::new(url);
        adapter.connect(&descriptor()).await.unwrap();

        let msg = adapter.next_message().await.unwrap().unwrap();
        assert_eq!(msg.text, "!roll 20");
    }

    #[tokio::test]
    async fn test_rejected_login_is_auth_error() {
        let (url, _server) = fake_server(vec![Session::new(
            vec![frame(":tmi.twitch.tv NOTICE * :Login authentication failed")],
            "JOIN",
        )])
        .await;

        let mut adapter = TwitchIrcAdapter::new(url);
        let err = adapter
            .connect(&ConnectionDescriptor::new("bot", "expired", "chan"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Auth(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_reconnect_request_logs_in_again() {
        let (url, server) = fake_server(vec![
            Session::new(
                vec![
                    frame(WELCOME),
                    frame(format!(":tmi.twitch.tv RECONNECT\r\n{}\r\n", privmsg("!early"))),
                ],
                "JOIN",
            ),
            Session::new(vec![frame(WELCOME), frame(privmsg("!late"))], "JOIN"),
        ])
        .await;

        let mut adapter = TwitchIrcAdapter::new(url);
        adapter.connect(&descriptor()).await.unwrap();

        assert_eq!(adapter.next_message().await.unwrap().unwrap().text, "!early");
        assert_eq!(adapter.next_message().await.unwrap().unwrap().text, "!late");

        let login = vec!["PASS oauth:tok".to_string(), "NICK my_bot".to_string(), "JOIN #chan".to_string()];
        assert_eq!(server.await.unwrap(), vec![login.clone(), login]);
    }

    #[tokio::test]
    async fn test_server_close_is_an_error() {
        let mut session = Session::new(vec![frame(WELCOME)], "JOIN");
        session.close = true;
        let (url, _server) = fake_server(vec![session]).await;

        let mut adapter = TwitchIrcAdapter::new(url);
        adapter.connect(&descriptor()).await.unwrap();

        let err = adapter.next_message().await.unwrap_err();
        assert!(matches!(err, TransportError::Closed), "{:?}", err);
    }

    #[tokio::test]
    async fn test_invalid_utf8_does_not_end_the_stream() {
        let mut garbled = privmsg("caf").into_bytes();
        garbled.extend_from_slice(b"\xff\r\n");
        let (url, _server) = fake_server(vec![Session::new(
            vec![frame(WELCOME), Message::binary(garbled), frame(privmsg("!ping"))],
            "PRIVMSG",
        )])
        .await;

        let mut adapter = TwitchIrcAdapter::new(url);
        adapter.connect(&descriptor()).await.unwrap();

        assert_eq!(adapter.next_message().await.unwrap().unwrap().text, "caf\u{FFFD}");
        assert_eq!(adapter.next_message().await.unwrap().unwrap().text, "!ping");
    }

    #[tokio::test]
    async fn test_next_message_before_connect() {
        let mut adapter = TwitchIrcAdapter::new("ws://127.0.0.1:1");
        assert!(matches!(adapter.next_message().await, Err(TransportError::Protocol(_))));
    }
}
