use std::sync::Arc;

use docgate::broker::Broker;
use docgate::config::{Settings, load_config};
use docgate::router::Router;
use docgate::transport::start_websocket_server;
use docgate::utils::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            return;
        }
    };
    logging::init(&config.logging.level);

    if let Err(e) = run_server(config).await {
        error!("Server failed: {e}");
    }
}

async fn run_server(config: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let broker = Broker::with_delivery_buffer(config.bus.delivery_buffer);
    let router = Arc::new(Router::from_settings(Arc::new(broker.clone()), &config));

    let addr = config.server_address();
    info!(
        namespace = %config.bus.namespace,
        queue_capacity = config.hub.queue_capacity,
        "gateway starting"
    );

    tokio::select! {
        result = start_websocket_server(&addr, router.clone()) => {
            result?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    router.shutdown().await;
    broker.close();
    Ok(())
}
