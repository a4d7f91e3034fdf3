//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

use crate::application::errors::TransportError;
use crate::domain::entities::ChatMessage;
use crate::domain::traits::{ChatTransport, ConnectionDescriptor};

const CONSOLE_CHANNEL: &str = "console";
const CONSOLE_USER: &str = "console";

/// Reads chat lines from `reader` and writes bot replies to `writer`
pub struct ConsoleAdapter<R, W> {
    reader: BufReader<R>,
    writer: W,
}

impl ConsoleAdapter<Stdin, Stdout> {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> ConsoleAdapter<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<R, W> ChatTransport for ConsoleAdapter<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn connect(&mut self, _descriptor: &ConnectionDescriptor) -> Result<(), TransportError> {
        tracing::info!("Starting console bot (dev mode)");
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<ChatMessage>, TransportError> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if self.reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(None);
            }
            // Undecodable bytes become U+FFFD instead of ending the stream
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            return Ok(Some(ChatMessage::new(CONSOLE_CHANNEL, CONSOLE_USER, line)));
        }
    }

    async fn say(&mut self, _channel: &str, text: &str) -> Result<(), TransportError> {
        self.writer.write_all(format!("[BOT] {}\n", text).as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
