use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::{info, warn};

use actionhub_action::{BaseUrlRoutes, ExecutionQueue};
use actionhub_crypto::KeyRing;
use actionhub_executor::{ProcessQueue, run_worker};
use actionhub_server::actions::builtin_registry;
use actionhub_server::api::{self, AppState};
use actionhub_server::auth::{ApiKeyAuthenticator, SECRET_ENV};
use actionhub_server::config::HubConfig;
use actionhub_server::telemetry::{self, LogTarget};

/// Action hub HTTP server.
#[derive(Parser, Debug)]
#[command(name = "actionhub-server", about = "Fans BI exports out to third-party destinations")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "actionhub.toml")]
    config: PathBuf,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (the default).
    Serve,
    /// Run one job read from stdin and write the response to stdout.
    Worker,
    /// Mint an API token for the configured secret.
    Token {
        /// Nonce to sign. A random one is generated when omitted.
        nonce: Option<String>,
    },
    /// Encrypt a value with the active master key. Reads plaintext from stdin.
    Encrypt,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = HubConfig::load(&cli.config)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(host) = cli.host.clone() {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, &cli.config).await,
        Commands::Worker => worker(&config).await,
        Commands::Token { nonce } => token(nonce),
        Commands::Encrypt => encrypt(&config),
    }
}

async fn serve(config: HubConfig, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init(config.server.debug, LogTarget::Stdout);

    if !config_path.exists() {
        info!(path = %config_path.display(), "config file not found, using defaults");
    }

    let authenticator = ApiKeyAuthenticator::from_env();
    if !authenticator.is_configured() {
        return Err(format!("No {SECRET_ENV} environment variable set.").into());
    }

    let registry = builtin_registry(config.registry_config()?, config.server.debug_endpoint);
    let queue: Arc<dyn ExecutionQueue> =
        Arc::new(ProcessQueue::new(config.queue_config(config_path)?));
    if !config.executor.enable_forking {
        warn!("forking disabled, isolated actions run in the hub process");
    }

    let state = AppState {
        registry: Arc::new(registry),
        queue: Some(queue),
        forking_enabled: config.executor.enable_forking,
        routes: Arc::new(BaseUrlRoutes::new(config.server.base_url())),
        label: config.server.label.clone(),
        authenticator: Arc::new(authenticator),
        body_limit_bytes: config.server.body_limit_bytes,
    };
    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        address = %addr,
        base_url = %config.server.base_url(),
        max_concurrent = config.executor.max_concurrent,
        "Action Hub listening!"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}

async fn worker(config: &HubConfig) -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init(config.server.debug, LogTarget::Stderr);

    let registry = builtin_registry(config.registry_config()?, config.server.debug_endpoint);
    run_worker(
        &registry,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await?;
    Ok(())
}

fn token(nonce: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let nonce = nonce.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let token = ApiKeyAuthenticator::from_env().from_nonce(&nonce)?;
    println!("{token}");
    Ok(())
}

fn encrypt(config: &HubConfig) -> Result<(), Box<dyn std::error::Error>> {
    let ring = KeyRing::from_env(&config.crypto.cipher_id)?;

    let mut plaintext = String::new();
    std::io::Read::read_to_string(&mut std::io::stdin(), &mut plaintext)?;
    let plaintext = plaintext.trim_end_matches('\n');

    let encrypted = ring.encrypt(plaintext)?;
    println!("{encrypted}");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
