//! API server entry point.

use api::config::Config;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Resolves with the name of the first termination signal received.
///
/// In-flight aggregate requests finish before the server stops; command
/// consumers stop with the runtime.
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal as unix_signal};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut terminate) => tokio::select! {
                _ = signal::ctrl_c() => "SIGINT",
                _ = terminate.recv() => "SIGTERM",
            },
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for SIGINT only");
                let _ = signal::ctrl_c().await;
                "SIGINT"
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        "SIGINT"
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Wire the orchestrator to its owning services
    let app = if config.in_memory_services {
        tracing::info!("serving from in-memory owning services");
        let (state, _services) = api::create_in_memory_state(&config).await;
        api::create_app(state, metrics_handle)
    } else {
        tracing::info!(
            product = %config.product_url,
            recommendation = %config.recommendation_url,
            review = %config.review_url,
            "serving from remote owning services"
        );
        let state = api::create_http_state(&config)
            .await
            .expect("failed to build HTTP client");
        api::create_app(state, metrics_handle)
    };

    // 4. Start server
    let addr = config.addr();
    tracing::info!(%addr, service_address = %config.service_address, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let received = shutdown_signal().await;
            tracing::info!(signal = received, "starting graceful shutdown");
        })
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
