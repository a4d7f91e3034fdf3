//! Domain traits - Abstractions for infrastructure implementations

pub mod handler;
pub mod store;
pub mod token_endpoint;
pub mod transport;

pub use handler::CommandHandler;
pub use store::CredentialStore;
pub use token_endpoint::{Grant, TokenEndpoint, TokenReply, TokenRequest, REDIRECT_URI};
pub use transport::{ChatTransport, ConnectionDescriptor};
