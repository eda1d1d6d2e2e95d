use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;

mod domain;
mod application;
mod infrastructure;

use application::errors::BotError;
use application::messaging::CommandDispatcher;
use application::services::{ConnectionSupervisor, EventService, SupervisorSettings};
use infrastructure::adapters::console::ConsoleConnector;
use domain::traits::Connector;
use infrastructure::config::{Config, TransportKind};
use infrastructure::storage::JsonSessionStore;

/// Exit code when the session was logged out and must be paired again
const EXIT_LOGGED_OUT: u8 = 2;

#[derive(Parser)]
#[command(name = "wa-bot")]
#[command(about = "A command bot for WhatsApp with pairing code login", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path, ignored when the file does not exist
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot (default)
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(&cli.config),
        Commands::Version => {
            println!("wa-bot v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::InitConfig => init_config(&cli.config),
    }
}

fn load_config(config_path: &str) -> Result<Config, BotError> {
    let config = if std::path::Path::new(config_path).exists() {
        Config::load(config_path)?
    } else {
        Config::default()
    };
    let config = config.apply_env();
    config.validate()?;
    Ok(config)
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .init();

    // Panics are reported and the process keeps going where it can
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("Uncaught panic: {}", info);
    }));
}

fn run_bot(config_path: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to start bot: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging.level);

    tracing::info!("Starting {}", config.bot.name);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("💡 Press Ctrl+C to stop the bot");

    let result = rt.block_on(supervise(config));
    // A console read may still be parked on stdin
    rt.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(BotError::LoggedOut) => {
            tracing::error!("Session logged out, re-authentication required");
            ExitCode::from(EXIT_LOGGED_OUT)
        }
        Err(e) => {
            tracing::error!("Failed to start bot: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn supervise(config: Config) -> Result<(), BotError> {
    let prefix = config.prefix()?;
    let dispatcher = CommandDispatcher::new(prefix, config.bot.name.clone())?;
    for command in dispatcher.registry().all() {
        tracing::debug!("Command {}{} - {}", prefix, command.name, command.description);
    }
    tracing::info!("Registered {} commands", dispatcher.registry().len());

    let store = JsonSessionStore::new(&config.session.path);
    store.init().await?;

    let connector = build_connector(&config)?;
    tracing::info!("Using {} transport", connector.name());

    let mut supervisor = ConnectionSupervisor::new(
        connector,
        Arc::new(store),
        EventService::new(dispatcher),
        SupervisorSettings {
            session_path: config.session.path.clone(),
            phone_number: config.session.phone_number.clone(),
            pairing_code: config.session.pairing_code.clone(),
            display_name: config.bot.name.clone(),
            reconnect_delay: config.reconnect_delay(),
        },
    );

    let result = tokio::select! {
        result = supervisor.run() => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            Ok(())
        }
    };
    tracing::info!("Stopped {} ({})", supervisor.identity(), supervisor.state());
    result
}

fn build_connector(config: &Config) -> Result<Arc<dyn Connector>, BotError> {
    match config.transport {
        TransportKind::Console => Ok(Arc::new(ConsoleConnector::new(
            config.session.phone_number.clone(),
            "Console",
        ))),
        #[cfg(feature = "whatsapp")]
        TransportKind::Whatsapp => Ok(Arc::new(
            infrastructure::adapters::whatsapp::WhatsAppConnector::new(
                config.session.path.clone(),
                config.session.phone_number.clone(),
            ),
        )),
        #[cfg(not(feature = "whatsapp"))]
        TransportKind::Whatsapp => Err(BotError::Connection(
            "this build has no WhatsApp support, rebuild with --features whatsapp".to_string(),
        )),
    }
}

fn init_config(config_path: &str) -> ExitCode {
    if std::path::Path::new(config_path).exists() {
        eprintln!("{} already exists", config_path);
        return ExitCode::FAILURE;
    }

    let yaml = match Config::default().to_yaml() {
        Ok(yaml) => yaml,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match std::fs::write(config_path, yaml) {
        Ok(()) => {
            println!("Wrote default config to {}", config_path);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to write {}: {}", config_path, e);
            ExitCode::FAILURE
        }
    }
}
