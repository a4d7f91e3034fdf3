//! Twitch chat bot with a self-renewing OAuth credential and isolated
//! command dispatch.

pub mod application;
pub mod domain;
pub mod infrastructure;
