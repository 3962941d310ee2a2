use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use defaults_service::audit::TracingAuditSink;
use defaults_service::auth::{generate_jwt, Audience, Claims};
use defaults_service::config::{config, AppConfig, LogFormat, LoggingConfig};
use defaults_service::database::DatabaseManager;
use defaults_service::{is_production, routes, AppState};

#[derive(Parser)]
#[command(name = "defaults-service", version, about = "User defaults CRUD service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a signed token for local testing
    Token {
        /// Numeric user id placed in `sub`
        #[arg(long)]
        sub: String,
        #[arg(long = "role")]
        roles: Vec<String>,
        #[arg(long = "permission")]
        permissions: Vec<String>,
        /// Lifetime in hours, falls back to the profile's expiry
        #[arg(long, env = "SECURITY_JWT_EXPIRY_HOURS")]
        hours: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = config();
    init_tracing(&config.logging);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Token { sub, roles, permissions, hours } => {
            let mut claims = Claims::new(
                sub,
                roles,
                permissions,
                hours.unwrap_or(config.security.jwt_expiry_hours),
            );
            claims.iss = config.security.jwt_issuer.clone();
            claims.aud = config.security.jwt_audience.clone().map(Audience::from);

            println!("{}", generate_jwt(&claims, &config.security.jwt_secret)?);
            Ok(())
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn serve(config: &'static AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting defaults service in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        if is_production!() {
            anyhow::bail!("JWT_SECRET must be set in production");
        }
        tracing::warn!("JWT_SECRET is not set, every request to the default routes will get a 401");
    }

    let manager = Arc::new(DatabaseManager::new(config.database.clone()));
    let state = AppState::new(manager.clone(), Arc::new(TracingAuditSink), config);
    let app = routes::app(state, config.server.enable_cors);

    let bind_addr = (config.server.host.as_str(), config.server.port);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}:{}", config.server.host, config.server.port))?;

    tracing::info!(
        "listening on {} with routes under {}",
        listener.local_addr()?,
        config.route_prefix()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    manager.close_all().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
