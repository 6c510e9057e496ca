use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use laptop_catalog::auth::{AccessPolicy, Role, TokenAuthority, User, UserRegistry};
use laptop_catalog::proto::auth_service_server::AuthServiceServer;
use laptop_catalog::proto::catalog_service_server::CatalogServiceServer;
use laptop_catalog::service::{AuthServiceImpl, CatalogServiceImpl};
use laptop_catalog::store::{DiskImageStore, LaptopStore, RatingStore};
use laptop_catalog::ServerConfig;
use tokio::signal;
use tonic::transport::Server;
use tonic_health::server::{health_reporter, HealthReporter};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Laptop catalog gRPC server", long_about = None)]
#[command(version)]
struct Args {
    /// Host to bind to (overrides configuration)
    #[arg(short = 'H', long, env = "CATALOG_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides configuration)
    #[arg(short, long, env = "CATALOG_PORT")]
    port: Option<u16>,

    /// Enable metrics endpoint
    #[arg(long, env = "METRICS_ENABLED", default_value = "false")]
    metrics: bool,

    /// Metrics port
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,
}

/// Seeds the registry with one admin and one regular user.
fn seed_users(users: &UserRegistry) -> laptop_catalog::Result<()> {
    users.add(User::new("admin1", "secret", Role::Admin)?)?;
    users.add(User::new("user1", "secret", Role::User)?)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ServerConfig::from_env().unwrap_or_else(|e| {
        error!("Failed to load configuration: {e}");
        info!("Using default configuration");
        ServerConfig::default()
    });

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {e}");
        return Err(format!("Invalid configuration: {e}").into());
    }

    let authority = Arc::new(TokenAuthority::new(
        &config.auth.token_secret,
        config.auth.token_ttl(),
    )?);
    let policy = Arc::new(AccessPolicy::new(Arc::clone(&authority)));

    let users = Arc::new(UserRegistry::new());
    seed_users(&users)?;

    let laptops = Arc::new(LaptopStore::new());
    let images = DiskImageStore::new(&config.storage.image_dir);
    let ratings = Arc::new(RatingStore::new());

    let catalog_service = CatalogServiceImpl::new(
        Arc::clone(&laptops),
        images,
        Arc::clone(&ratings),
        Arc::clone(&policy),
    );
    let auth_service = AuthServiceImpl::new(users, Arc::clone(&authority), policy);

    if args.metrics {
        let metrics_addr =
            format!("{}:{}", config.server.host, args.metrics_port).parse::<SocketAddr>()?;
        tokio::spawn(async move {
            if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new()
                .with_http_listener(metrics_addr)
                .install()
            {
                error!("Failed to start metrics server: {e}");
            } else {
                info!("Metrics server started on {metrics_addr}");
            }
        });
    }

    let (mut reporter, health_service) = health_reporter();
    reporter
        .set_serving::<CatalogServiceServer<CatalogServiceImpl>>()
        .await;
    reporter
        .set_serving::<AuthServiceServer<AuthServiceImpl>>()
        .await;

    let addr = config.server.addr();
    info!("Server starting on {addr}");
    info!("  Image directory: {}", config.storage.image_dir);
    info!("  Token TTL: {}s", config.auth.token_ttl_secs);

    Server::builder()
        .add_service(health_service)
        .add_service(AuthServiceServer::new(auth_service))
        .add_service(CatalogServiceServer::new(catalog_service))
        .serve_with_shutdown(addr, shutdown_signal(reporter))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal(mut reporter: HealthReporter) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    reporter
        .set_not_serving::<CatalogServiceServer<CatalogServiceImpl>>()
        .await;
    reporter
        .set_not_serving::<AuthServiceServer<AuthServiceImpl>>()
        .await;

    info!("Initiating graceful shutdown (allowing in-flight requests to complete)");
}
