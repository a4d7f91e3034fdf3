//! Domain entities - Core business objects with no external dependencies

pub mod command;
pub mod credential;
pub mod message;

pub use command::{CommandInvocation, CommandRegistry, HandlerFactory};
pub use credential::{Credential, TokenResponseViolation};
pub use message::ChatMessage;
