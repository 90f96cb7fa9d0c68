use std::net::SocketAddr;
use std::sync::Arc;

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use device_telemetry::common::AppState;
use device_telemetry::config::{Config, StorageBackend};
use device_telemetry::repository::{
    DeviceRepository, InMemoryDeviceRepository, InMemorySensorRepository, SeaOrmDeviceRepository,
    SeaOrmSensorRepository, SensorRepository,
};
use device_telemetry::routes;
use device_telemetry::services::{HttpIdentityVerifier, IdentityVerifier, TelemetryService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,device_telemetry=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting device-telemetry...");

    // Load configuration (fail-fast)
    let config = Config::from_env()?;
    tracing::info!(
        deployment = ?config.deployment,
        storage = ?config.storage_backend,
        host = %config.api_host,
        port = config.api_port,
        "Configuration loaded"
    );

    // Repositories: one shared connection for the lifetime of the process
    let (devices, sensors): (Arc<dyn DeviceRepository>, Arc<dyn SensorRepository>) =
        match config.storage_backend {
            StorageBackend::Postgres => {
                tracing::info!("Connecting to database...");
                let db = Database::connect(&config.database_url).await?;
                tracing::info!("Database connection established");

                if config.run_migrations {
                    tracing::info!("Running migrations...");
                    migration::Migrator::up(&db, None).await?;
                    tracing::info!("Migrations completed");
                }

                (
                    Arc::new(SeaOrmDeviceRepository::new(db.clone())),
                    Arc::new(SeaOrmSensorRepository::new(db)),
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage, data is lost on restart");
                (
                    Arc::new(InMemoryDeviceRepository::new()),
                    Arc::new(InMemorySensorRepository::new()),
                )
            }
        };

    let telemetry = TelemetryService::new(devices, sensors);

    // Identity verification client
    let identity: Option<Arc<dyn IdentityVerifier>> = match config.auth_verify_url.as_deref() {
        Some(url) => {
            let verifier = HttpIdentityVerifier::new(url, &config)?;
            tracing::info!(verify_url = %url, "Identity verifier initialized");
            Some(Arc::new(verifier))
        }
        None => None,
    };

    // Create application state
    let state = AppState::new(config.clone(), telemetry, identity);

    // Build router
    let app = routes::build_router(state)?;

    // Start server with graceful shutdown
    let addr = config.bind_address();
    tracing::info!(address = %addr, "Starting server");
    let listener = TcpListener::bind(&addr).await?;
    // Peer addresses feed the rate limiter when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}
