use office_bridge::api;
use office_bridge::bridge::{self, input, BridgeError, BridgeResult, HubHandle};
use office_bridge::config::BridgeConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing; stdout is left alone since input arrives on a pipe
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    if let Err(err) = run(BridgeConfig::from_env()).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(config: BridgeConfig) -> BridgeResult<()> {
    // Bind first so a taken port fails before anything else starts
    let listener = bridge::bind(config.addr).await?;

    let (hub, hub_task) = bridge::spawn_hub(&config);
    input::spawn_stdin_reader(hub.clone())?;

    tracing::info!("Office bridge listening on ws://{}", config.addr);
    tracing::info!("Pipe agent output in: claude --output-format stream-json | office-bridge");

    axum::serve(listener, api::router(hub.clone()))
        .with_graceful_shutdown(shutdown_signal(hub))
        .await
        .map_err(BridgeError::Serve)?;

    let _ = hub_task.await;
    tracing::info!("Office bridge stopped");
    Ok(())
}

async fn shutdown_signal(hub: HubHandle) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for interrupt");
        std::future::pending::<()>().await;
    }
    tracing::info!("Interrupt received, shutting down");
    hub.shutdown();
}
