//! Bot launcher - acquire a credential, log in to chat, run the dispatcher

use std::future::Future;

use crate::application::errors::{BotError, TransportError};
use crate::application::messaging::{DispatchStats, Dispatcher};
use crate::application::services::TokenAcquirer;
use crate::domain::entities::Credential;
use crate::domain::traits::{ChatTransport, ConnectionDescriptor, CredentialStore, TokenEndpoint};
use crate::infrastructure::config::BotConfig;

/// Run the bot until the chat stream ends or `shutdown` resolves.
///
/// Returns `Ok(None)` if shutdown arrived before the message loop started.
/// If the chat server rejects the login, the stored refresh token is used
/// once to get a new credential and the login is tried again.
pub async fn launch<E, S, T, F>(
    config: &BotConfig,
    acquirer: &TokenAcquirer<E, S>,
    transport: &mut T,
    dispatcher: &mut Dispatcher,
    shutdown: F,
) -> Result<Option<DispatchStats>, BotError>
where
    E: TokenEndpoint,
    S: CredentialStore,
    T: ChatTransport + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let credential = tokio::select! {
        _ = &mut shutdown => {
            tracing::info!("Shutdown requested during token acquisition");
            return Ok(None);
        }
        credential = acquirer.acquire(config) => credential?,
    };

    tokio::select! {
        _ = &mut shutdown => {
            tracing::info!("Shutdown requested while connecting");
            return Ok(None);
        }
        connected = connect(config, acquirer, transport, credential) => connected?,
    }

    let stats = dispatcher.run(transport, &mut shutdown).await?;
    Ok(Some(stats))
}

async fn connect<E, S, T>(
    config: &BotConfig,
    acquirer: &TokenAcquirer<E, S>,
    transport: &mut T,
    credential: Credential,
) -> Result<(), BotError>
where
    E: TokenEndpoint,
    S: CredentialStore,
    T: ChatTransport + ?Sized,
{
    let descriptor = ConnectionDescriptor::new(&config.username, &credential.access_token, &config.channel);
    match transport.connect(&descriptor).await {
        Ok(()) => Ok(()),
        Err(TransportError::Auth(reason)) => {
            tracing::warn!("Chat login rejected ({}), refreshing token", reason);
            let refreshed = acquirer.refresh(config).await?;
            let descriptor = ConnectionDescriptor::new(&config.username, &refreshed.access_token, &config.channel);
            transport.connect(&descriptor).await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
