//! Liveness endpoint for external uptime monitors

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::State, routing::get};
use tokio::net::TcpListener;
use tracing::info;

use crate::CONSOLE_TARGET;

/// `GET /` answers with `body`; nothing else is routed
pub fn router(body: String) -> Router {
    Router::new()
        .route("/", get(alive))
        .with_state(Arc::new(body))
}

async fn alive(State(body): State<Arc<String>>) -> String {
    body.as_str().to_owned()
}

/// Bind `addr` and serve until the process exits
///
/// # Errors
///
/// Fails if the address cannot be bound or the server stops with an I/O error.
pub async fn serve(addr: SocketAddr, body: String) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(target: CONSOLE_TARGET, addr = %listener.local_addr()?, "Liveness endpoint listening");
    axum::serve(listener, router(body)).await
}
