use crate::config::Settings;
use crate::ingest::UdpIngestor;
use crate::server::HttpServer;
use crate::store::LatestBatchStore;
use crate::telemetry::Metrics;

use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Settings) -> Result<(), Box<dyn Error>> {
    let store = Arc::new(LatestBatchStore::new());
    let metrics = Arc::new(Metrics::new());

    let ingestor = match UdpIngestor::bind(&config.ingest, store.clone(), metrics.clone()).await {
        Ok(ingestor) => ingestor,
        Err(e) => {
            tracing::error!("Failed to bind ingestion socket: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let server = HttpServer::new(store, metrics, &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();
    let ingest_shutdown_rx = shutdown_tx.subscribe();

    let mut ingest_handle = tokio::spawn(ingestor.run(ingest_shutdown_rx));
    let server_handle = server.run(server_shutdown_rx).await?;

    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, starting graceful shutdown.");
        }
        ingest_result = &mut ingest_handle => {
            // The ingest loop only ends on its own when the socket is beyond
            // recovery; nothing can be served without ingestion.
            let _ = shutdown_tx.send(());
            let _ = server_handle.await;
            return match ingest_result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    tracing::error!("Ingestion loop failed: {:?}", e);
                    Err(Box::new(e))
                }
                Err(e) => Err(Box::new(e)),
            };
        }
    }

    let _ = shutdown_tx.send(());
    let _ = ingest_handle.await;
    let _ = server_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
