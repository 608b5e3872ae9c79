use crate::{config::Settings, routes::api_routes, store::LatestBatchStore, telemetry::Metrics};
use axum::Router;
use axum_otel_metrics::HttpMetricsLayerBuilder;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};
use tower_http::{services::ServeDir, timeout::TimeoutLayer};

#[derive(Clone)]
pub struct SharedState {
    pub store: Arc<LatestBatchStore>,
    pub metrics: Arc<Metrics>,
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(
        store: Arc<LatestBatchStore>,
        metrics: Arc<Metrics>,
        config: &Settings,
    ) -> anyhow::Result<Self> {
        let addr = config.server.get_address();

        let metrics_layer = HttpMetricsLayerBuilder::new().build();

        let app_state = SharedState { store, metrics };

        // Unmatched paths fall through to the viewer assets; a stalled
        // client is cut off by the timeout instead of holding a connection.
        let router = Router::new()
            .merge(api_routes())
            .fallback_service(ServeDir::new(&config.server.static_dir))
            .with_state(app_state)
            .layer(metrics_layer)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )));

        let listener = TcpListener::bind(&addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Serving HTTP on {}", self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx.resubscribe();
            async move {
                let server = axum::serve(listener, router);
                server
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}
