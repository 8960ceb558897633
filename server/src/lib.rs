//! Realtime chat hub server.
//!
//! ARCHITECTURE
//! ============
//! `services::hub` owns the authoritative bounded history and subscriber set;
//! `routes` translates the websocket and REST fallback protocols into hub
//! calls. [`run`] wires both to a listener and owns the hub lifecycle, so the
//! binary and the end-to-end tests start the server the same way.

pub mod config;
pub mod routes;
pub mod services;
pub mod state;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

pub use services::hub::ChatHub;
pub use state::AppState;

/// Serve the chat routes on `listener` until `shutdown` resolves.
///
/// Starts the hub's liveness sweep before accepting connections. When
/// `shutdown` resolves the hub drops every subscriber, which closes the open
/// sockets, and the server drains.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn run(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    state.hub.start();
    let hub = state.hub.clone();
    let app = routes::app(state);

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "chat hub listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            hub.shutdown();
        })
        .await
}
