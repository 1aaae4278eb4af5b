//! # Errores del servidor
//! src/error.rs
//!
//! Errores que salen de la capa de transporte y del dispatcher. Los errores
//! de protocolo del cliente viven en `http::request::ParseError` y los del
//! gateway en `cgi::GatewayError`: esos se convierten en una respuesta, estos
//! no.

use std::io;

use thiserror::Error;

/// Falla de una conexión individual: se loguea y la conexión se abandona
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Reset, broken pipe o cualquier error de I/O en el socket
    #[error("transport error: {source}")]
    Transport {
        #[from]
        source: io::Error,
    },

    /// El peer cerró antes de mandar los `Content-Length` bytes anunciados
    #[error("request body truncated: expected {expected} bytes, received {received}")]
    TruncatedBody { expected: usize, received: usize },
}

impl ConnectionError {
    /// `true` si el peer simplemente se fue (no vale la pena loguear como error)
    pub fn is_disconnect(&self) -> bool {
        match self {
            ConnectionError::Transport { source } => matches!(
                source.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ),
            ConnectionError::TruncatedBody { .. } => false,
        }
    }
}

/// Errores fatales del dispatcher: terminan el servidor
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind { address: String, source: io::Error },

    #[error("failed to set listen backlog to {backlog}: {source}")]
    Listen { backlog: i32, source: io::Error },

    #[error("accept failed: {source}")]
    Accept { source: io::Error },

    #[error("failed to spawn {what} thread: {source}")]
    Spawn { what: &'static str, source: io::Error },
}
