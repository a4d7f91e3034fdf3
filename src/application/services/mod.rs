//! Application services - Business logic orchestration

pub mod launcher;
pub mod token_service;

pub use launcher::launch;
pub use token_service::TokenAcquirer;
