//! HTTP surface of the webhook relay: `POST /webhook` for producers and
//! `GET /sse` for stream consumers.

use log::*;
use relay::SessionRegistry;
use std::sync::Arc;
use tokio::net::TcpListener;

pub use error::{Error, Result};
pub use service::AppState;

mod controller;
pub mod error;
mod params;
pub mod router;
mod sse;

/// Binds the configured address and serves requests until a shutdown signal
/// arrives.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let listen_address = app_state.config.listen_address();
    let listener = TcpListener::bind(&listen_address).await?;

    info!(
        "Server starting... listening for connections on http://{}",
        listener.local_addr()?
    );

    let sessions = Arc::clone(&app_state.sessions);
    let router = router::define_routes(app_state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(sessions))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM. Open streams never end on their own, so
/// every session is cancelled here to let graceful shutdown finish.
async fn shutdown_signal(sessions: Arc<SessionRegistry>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(
        "Shutdown signal received, closing {} open stream(s)",
        sessions.len()
    );
    sessions.cancel_all();
}
