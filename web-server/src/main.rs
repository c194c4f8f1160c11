use std::sync::Arc;

use tracing::info;

use telemetry_gateway::api::{create_router, AppState};
use telemetry_gateway::auth::SessionStore;
use telemetry_gateway::config::{GatewayConfig, PersistenceBackend};
use telemetry_gateway::persistence::{ObjectStoreSink, PersistenceSink, WarehouseSink};
use telemetry_gateway::platform::PlatformClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("telemetry_gateway=info,telemetry_gateway_web_server=info,tower_http=debug")
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = GatewayConfig::from_env();
    if config.base_url.is_none() {
        // Startup proceeds; requests fail with a misconfiguration error.
        tracing::warn!("BASE_URL is not set");
    }

    let session = SessionStore::new();
    let client = Arc::new(PlatformClient::new(
        config.base_url.as_deref(),
        session.clone(),
    )?);

    // Persistence backend is picked by configuration once, at startup.
    let sink: Arc<dyn PersistenceSink> = match config.persistence_backend {
        PersistenceBackend::ObjectStore => {
            info!(bucket = %config.object_store.bucket, "using object-store persistence");
            Arc::new(ObjectStoreSink::connect(&config.object_store).await?)
        }
        PersistenceBackend::Warehouse => {
            info!(account = %config.warehouse.account, "using warehouse persistence");
            Arc::new(WarehouseSink::connect(&config.warehouse).await?)
        }
    };

    let app = create_router(AppState {
        client,
        session,
        sink,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
