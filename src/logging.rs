//! # Logging
//! src/logging.rs
//!
//! Todo el servidor loguea con `tracing`. El filtro se toma de `RUST_LOG`
//! (`info` si no está definida), por ejemplo:
//!
//! ```bash
//! RUST_LOG=origin_http=debug ./origin_http
//! ```

use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::http::StatusCode;

/// Instala el subscriber global. Si ya había uno (tests, embebido) se deja.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_thread_names(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Línea del access log: cliente, request line y status.
/// La fecha la pone el subscriber.
pub fn request_line(peer: SocketAddr, request_line: &str, status: StatusCode) {
    info!(
        target: "access",
        client = %peer,
        request = %request_line,
        status = status.as_u16(),
        "request"
    );
}
