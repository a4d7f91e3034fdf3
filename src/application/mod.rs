//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Services: Token acquisition
//! - Commands: Built-in chat command handlers
//! - Errors: Domain-specific errors
//! - Messaging: Command parsing and dispatching

pub mod commands;
pub mod errors;
pub mod messaging;
pub mod services;
