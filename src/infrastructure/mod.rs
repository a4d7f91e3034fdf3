//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading and validation
//! - Storage: Credential persistence
//! - OAuth: Token endpoint HTTP client
//! - Adapters: Chat transports (Twitch IRC, console)

pub mod adapters;
pub mod config;
pub mod oauth;
pub mod storage;
