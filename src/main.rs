use film_invoice_check::{router, AppConfig, BackendClient, CheckService};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt::time::ChronoLocal, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging, local time
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_level(true)
        .init();

    // Configuration
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    // Upstream parsing/lookup backend
    let backend = BackendClient::new(&config.backend)?;
    info!("Using backend at {}", backend.base_url());

    let service = Arc::new(CheckService::new(backend, &config));
    let app = router(service, config.upload.max_bytes);

    let addr = config.listen_addr();
    info!("Server listening on {}", addr);
    info!("Endpoints:");
    info!("  GET  /                        - invoice check page");
    info!("  GET  /api/state               - current state");
    info!("  POST /api/upload/invoices     - upload invoice file");
    info!("  POST /api/upload/percentages  - upload film percentages file");
    info!("  POST /api/reconcile           - check invoice percentages");
    info!("  GET  /api/export.csv          - invoice table as CSV");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
