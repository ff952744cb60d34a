use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use chatroom::application::services::{LifecycleCoordinator, SessionRegistry};
use chatroom::infrastructure::adapters::TcpTransport;
use chatroom::infrastructure::audit::AuditLog;
use chatroom::infrastructure::config::Config;

#[derive(Parser)]
#[command(name = "chatroom")]
#[command(about = "A minimal multi-user chatroom", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run {
        /// Listen address (overrides config)
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { listen } => run_server(&cli.config, listen),
        Commands::Version => {
            println!("chatroom v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::InitConfig => init_config(),
    }
}

fn load_config(config_path: &str) -> Config {
    if !Path::new(config_path).exists() {
        return Config::load_env();
    }
    match Config::load(config_path) {
        Ok(mut config) => {
            config.apply_env();
            config
        }
        Err(e) => {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        }
    }
}

fn run_server(config_path: &str, listen_override: Option<String>) -> ExitCode {
    let mut config = load_config(config_path);
    if let Some(listen) = listen_override {
        config.server.listen = listen;
    }

    tracing::info!("Starting {}", config.server.name);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    rt.block_on(async move {
        let audit = if config.audit.enabled {
            match AuditLog::open(&config.audit.path).await {
                Ok(log) => log,
                Err(e) => {
                    tracing::error!("Failed to open audit log: {}, auditing disabled", e);
                    AuditLog::disabled()
                }
            }
        } else {
            AuditLog::disabled()
        };

        let registry = Arc::new(SessionRegistry::with_delivery_timeout(config.sink_timeout()));
        let coordinator = Arc::new(
            LifecycleCoordinator::new(registry, Arc::new(audit))
                .with_welcome(config.server.welcome.clone()),
        );
        let transport = TcpTransport::new(Arc::new(config), coordinator);

        tokio::select! {
            result = transport.run() => match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!("Server stopped: {}", e);
                    ExitCode::FAILURE
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                ExitCode::SUCCESS
            }
        }
    })
}

fn init_config() -> ExitCode {
    match Config::default().to_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
