use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use marketplace_chat_hub::config::Settings;
use marketplace_chat_hub::hub::Hub;
use marketplace_chat_hub::postgres::PostgresPool;
use marketplace_chat_hub::server::{create_app, AppState};
use marketplace_chat_hub::store::create_message_store;
use marketplace_chat_hub::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;
    init_tracing(&settings.log);
    tracing::info!("Configuration loaded");

    // Storage: a configured postgres backend must be reachable at startup
    let postgres_pool = if settings.database.backend == "postgres" {
        let pool = PostgresPool::new(&settings.database)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to connect to PostgreSQL"))?;
        Some(pool)
    } else {
        None
    };
    let store = create_message_store(&settings.database, postgres_pool.as_ref());

    // Hub task
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let (hub, hub_handle) = Hub::new(&settings.hub, &settings.websocket);
    let mut hub_shutdown = shutdown_tx.subscribe();
    let hub_task = tokio::spawn(hub.run_until(async move {
        let _ = hub_shutdown.recv().await;
    }));

    // Create application state
    let addr = settings.server_addr();
    let state = AppState::new(settings, hub_handle, store);
    tracing::info!("Application state initialized");

    let app = create_app(state);

    // Start server
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    tracing::info!("Waiting for hub to finish...");
    if let Err(e) = hub_task.await {
        tracing::error!(error = %e, "Hub task panicked");
    }

    if let Some(pool) = postgres_pool {
        pool.close().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Closes every live session, which lets their connections drain
    let _ = shutdown_tx.send(());
}
