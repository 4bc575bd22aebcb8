//! chat-relay: streaming relay between a browser chat page and an
//! OpenAI-compatible completion API
//!
//! Serves a small chat page, accepts the full chat history on /prompt and
//! streams the model's reply back as server-sent events.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chat_relay::{
    config::{load_env_overrides, AppConfig},
    provider::{CompletionProvider, OpenAiProvider},
    run_server,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(name = "chat-relay")]
#[command(version = "0.1.0")]
#[command(about = "Streaming relay between a chat page and an OpenAI-compatible API")]
#[command(long_about = "
chat-relay serves a browser chat page and relays conversations to an
OpenAI-compatible chat completions API, streaming the reply back as SSE.

The API key is read from OPENAI_API_KEY (a .env file is honored) or from
provider.api_key in the config file.

Example usage:
  chat-relay run --port 5000
  chat-relay --config config.yaml check-config
")]
struct Cli {
    /// Path to config file (defaults to ./config.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Run {
        /// Override listen host
        #[arg(long)]
        host: Option<String>,
        /// Override listen port
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable debug logging
        #[arg(long)]
        debug: bool,
        /// Skip the provider connectivity check at startup
        #[arg(long)]
        skip_probe: bool,
    },

    /// Validate configuration
    CheckConfig,

    /// Test connection to the completion provider
    TestProvider,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = load_config_or_exit(cli.config.as_deref());
    if let Commands::Run {
        ref host,
        port,
        debug,
        ..
    } = cli.command
    {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = port;
        }
        if debug {
            config.server.debug = true;
        }
    }

    init_tracing(cli.log_level, config.server.debug);

    match cli.command {
        Commands::Run { skip_probe, .. } => {
            run_relay(config, skip_probe).await?;
        }
        Commands::CheckConfig => {
            check_config(&config);
        }
        Commands::TestProvider => {
            test_provider(&config).await;
        }
    }

    Ok(())
}

/// `--log-level` wins, then RUST_LOG, then the debug flag
fn init_tracing(log_level: Option<LogLevel>, debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    let level_filter = if let Some(level) = log_level {
        level.to_string()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback))
            .to_string()
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&level_filter))
        .init();
}

/// Run the relay server
async fn run_relay(config: AppConfig, skip_probe: bool) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    let provider = match OpenAiProvider::from_config(&config.provider) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create provider client");
            std::process::exit(1);
        }
    };

    if config.provider.probe_on_startup && !skip_probe {
        match provider.probe().await {
            Ok(models) => tracing::info!(models, "Provider reachable"),
            Err(e) => {
                tracing::error!(error = %e, "Provider check failed, refusing to start");
                std::process::exit(1);
            }
        }
    }

    tracing::info!(
        model = %config.provider.model,
        api_key = %config.provider.masked_credential(),
        max_messages = config.limits.max_messages,
        "Configuration loaded"
    );

    run_server(config, Arc::new(provider)).await
}

/// Validate configuration and print a summary
fn check_config(config: &AppConfig) {
    if let Err(e) = config.validate() {
        eprintln!("✗ Configuration error: {}", e);
        std::process::exit(1);
    }

    println!("✓ Configuration is valid\n");
    println!("Server:");
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    println!("  Debug: {}", config.server.debug);
    println!("\nProvider:");
    println!("  URL: {}", config.provider.base_url());
    println!("  Model: {}", config.provider.model);
    println!("  API key: {}", config.provider.masked_credential());
    match config.provider.timeout_seconds {
        Some(t) => println!("  Timeout: {}s", t),
        None => println!("  Timeout: none"),
    }
    println!("\nCompletion:");
    println!("  max_tokens: {}", config.completion.max_tokens);
    println!("  temperature: {}", config.completion.temperature);
    println!("  presence_penalty: {}", config.completion.presence_penalty);
    println!("  frequency_penalty: {}", config.completion.frequency_penalty);
    println!("\nLimits:");
    println!("  Messages: {}", config.limits.max_messages);
    println!("  Chars per message: {}", config.limits.max_message_chars);
    println!("  Body bytes: {}", config.limits.max_body_bytes);
    println!("\nRate limit:");
    if config.rate_limit.enabled {
        println!(
            "  {} requests/min, burst {}",
            config.rate_limit.requests_per_minute, config.rate_limit.burst
        );
    } else {
        println!("  disabled");
    }
    println!("\nStats:");
    println!("  Enabled: {}", config.stats.enabled);
    println!("  Format: {:?}", config.stats.format);
}

/// Test connection to the provider
async fn test_provider(config: &AppConfig) {
    println!("Testing provider: {}", config.provider.base_url());

    let provider = match OpenAiProvider::from_config(&config.provider) {
        Ok(provider) => provider,
        Err(e) => {
            println!("✗ Cannot create provider client: {}", e);
            std::process::exit(1);
        }
    };

    match provider.probe().await {
        Ok(models) => {
            println!("✓ Provider is reachable");
            println!("  Models visible to this key: {}", models);
        }
        Err(e) => {
            println!("✗ Provider check failed: {}", e);
            println!("  Category: {}", e.category().as_str());
            std::process::exit(1);
        }
    }
}

/// Load configuration plus environment overrides or exit with error
fn load_config_or_exit(config_path: Option<&Path>) -> AppConfig {
    let mut config = match AppConfig::load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            eprintln!("\nYou can copy config.yaml.default and modify it:");
            eprintln!("  cp config.yaml.default config.yaml");
            std::process::exit(1);
        }
    };

    if let Err(e) = config.apply_env(&load_env_overrides()) {
        eprintln!("Error in environment: {}", e);
        std::process::exit(1);
    }

    config
}
