//! Message dispatcher - Routes chat messages to command handlers

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::application::errors::{HandlerError, TransportError};
use crate::domain::entities::{ChatMessage, CommandRegistry};
use crate::domain::traits::ChatTransport;
use super::parser::parse_command;

/// Where the dispatcher is in its message cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Handling,
}

/// What happened to a single message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a command
    Ignored,
    /// Looked like a command but nothing is registered under that name
    Unknown(String),
    Handled { name: String, reply: Option<String> },
    Failed { name: String, error: HandlerError },
}

/// Running counters, logged when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub ignored: u64,
    pub unknown: u64,
    pub handled: u64,
    pub failed: u64,
}

/// Parses chat lines, resolves handlers and contains their failures.
///
/// One message is fully handled before the next one is read. A handler
/// that returns an error or panics is logged and the loop carries on.
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    state: DispatchState,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self {
            registry,
            state: DispatchState::Idle,
            stats: DispatchStats::default(),
        }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Dispatch one message and return to `Idle`
    pub fn dispatch(&mut self, message: &ChatMessage) -> DispatchOutcome {
        debug_assert_eq!(self.state, DispatchState::Idle);
        self.stats.received += 1;
        tracing::debug!(
            id = %message.id,
            at = %message.timestamp.format("%H:%M:%S%.3f"),
            "[#{}] <{}> {}",
            message.channel,
            message.sender,
            message.text
        );

        let Some(invocation) = parse_command(&message.text) else {
            self.stats.ignored += 1;
            return DispatchOutcome::Ignored;
        };

        // Building the handler runs registered code too, so it is caught like the call
        let registry = &self.registry;
        let resolved = panic::catch_unwind(AssertUnwindSafe(|| registry.resolve(&invocation.name)));
        let result = match resolved {
            Ok(None) => {
                tracing::debug!("Ignoring unknown command {}", invocation.name);
                self.stats.unknown += 1;
                return DispatchOutcome::Unknown(invocation.name);
            }
            Ok(Some(handler)) => {
                tracing::info!(
                    id = %message.id,
                    "[#{}] {} invoked {} {:?}",
                    message.channel,
                    message.sender,
                    invocation.name,
                    invocation.argument
                );

                self.state = DispatchState::Handling;
                let argument = invocation.argument.as_deref();
                let result = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(argument)))
                    .unwrap_or_else(|payload| Err(HandlerError::Unexpected(panic_message(payload))));
                self.state = DispatchState::Idle;
                result
            }
            Err(payload) => Err(HandlerError::Unexpected(panic_message(payload))),
        };

        match result {
            Ok(reply) => {
                self.stats.handled += 1;
                DispatchOutcome::Handled { name: invocation.name, reply }
            }
            Err(error) => {
                self.stats.failed += 1;
                match &error {
                    HandlerError::Execution(msg) => {
                        tracing::warn!(tag = error.tag(), command = %invocation.name, "{}", msg);
                    }
                    HandlerError::Unexpected(msg) => {
                        tracing::error!(tag = error.tag(), command = %invocation.name, "{}", msg);
                    }
                }
                DispatchOutcome::Failed { name: invocation.name, error }
            }
        }
    }

    /// Pull messages from `transport` until it closes or `shutdown` resolves.
    ///
    /// Replies are sent back to the channel the command came from. A failed
    /// reply is logged; only errors reading from the transport end the loop.
    pub async fn run<T, S>(&mut self, transport: &mut T, shutdown: S) -> Result<DispatchStats, TransportError>
    where
        T: ChatTransport + ?Sized,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("Starting message loop on {}", transport.name());

        loop {
            let next = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, leaving message loop");
                    break;
                }
                next = transport.next_message() => next?,
            };

            let Some(message) = next else {
                tracing::info!("{} stream ended", transport.name());
                break;
            };

            if let DispatchOutcome::Handled { name, reply: Some(text) } = self.dispatch(&message) {
                if let Err(e) = transport.say(&message.channel, &text).await {
                    tracing::warn!("Failed to send reply for {}: {}", name, e);
                }
            }
        }

        tracing::info!("Dispatch stats: {:?}", self.stats);
        Ok(self.stats)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked".to_string()
    }
}
