use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use twitch_chat_bot::application::commands::register_builtins;
use twitch_chat_bot::application::messaging::Dispatcher;
use twitch_chat_bot::application::services::{launch, TokenAcquirer};
use twitch_chat_bot::domain::entities::CommandRegistry;
use twitch_chat_bot::domain::traits::ChatTransport;
use twitch_chat_bot::infrastructure::adapters::{ConsoleAdapter, TwitchIrcAdapter};
use twitch_chat_bot::infrastructure::config::Config;
use twitch_chat_bot::infrastructure::oauth::ReqwestTokenClient;
use twitch_chat_bot::infrastructure::storage::JsonCredentialStore;

#[derive(Parser)]
#[command(name = "twitch-chat-bot")]
#[command(about = "A Twitch chat bot that keeps its OAuth token alive", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a token, join the channel and answer commands
    Run,
    /// Answer commands typed on stdin (no network)
    Console,
    /// Show version
    Version,
    /// Print a default config
    InitConfig,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_bot(&cli.config),
        Commands::Console => run_console(&cli.config),
        Commands::Version => {
            println!("twitch-chat-bot v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::InitConfig => init_config(),
    }
}

fn run_bot(config_path: &str) -> ExitCode {
    let config = match Config::load_with_env(config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Validating Config...");
    let (bot_config, commands) = match config.validate().and_then(|bot| Ok((bot, config.enabled_commands()?))) {
        Ok(validated) => validated,
        Err(e) => {
            tracing::error!("The provided config is not valid: {}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Config is valid.");

    let endpoint = match ReqwestTokenClient::new(bot_config.token_endpoint.clone(), config.request_timeout()) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let acquirer = TokenAcquirer::new(endpoint, JsonCredentialStore::new(config.store_path()));

    let registry = CommandRegistry::new();
    register_builtins(&registry, &commands);
    let mut dispatcher = Dispatcher::new(Arc::new(registry));

    // wss:// needs a process-level rustls crypto provider
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        tracing::warn!("Failed to install default crypto provider: {:?}", e);
    }
    let mut transport = TwitchIrcAdapter::new(config.irc_url());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = rt.block_on(launch(&bot_config, &acquirer, &mut transport, &mut dispatcher, shutdown_signal()));
    match result {
        Ok(_) => {
            tracing::info!("Bot stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_console(config_path: &str) -> ExitCode {
    let commands = match Config::load_with_env(config_path).and_then(|c| c.enabled_commands()) {
        Ok(commands) => commands,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let registry = CommandRegistry::new();
    register_builtins(&registry, &commands);
    let mut dispatcher = Dispatcher::new(Arc::new(registry));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    rt.block_on(async {
        let mut console = ConsoleAdapter::stdio();
        tracing::info!("Bot started on {}, type !commands", console.name());
        match dispatcher.run(&mut console, shutdown_signal()).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("{}", e);
                ExitCode::FAILURE
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn init_config() -> ExitCode {
    match serde_yaml::to_string(&Config::template()) {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Failed to render config: {}", e);
            ExitCode::FAILURE
        }
    }
}
