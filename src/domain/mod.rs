//! Domain layer - Core business logic with no I/O
//!
//! This layer contains:
//! - Entities: Core business objects (ChatMessage, CommandInvocation, Credential)
//! - Traits: Abstractions for infrastructure (ChatTransport, CredentialStore, CommandHandler)

pub mod entities;
pub mod traits;
