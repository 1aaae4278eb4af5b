//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Implementa el protocolo desde cero, sin librerías de alto nivel:
//!
//! - Parsing de requests HTTP/0.9, HTTP/1.0 y HTTP/1.1
//! - Disposición de la conexión (close / keep-alive)
//! - Construcción y framing de responses
//! - Status codes, tipos MIME y header `Date`
//!
//! ## Diferencias entre versiones
//!
//! - HTTP/0.9: `GET /path` a secas, sin headers en ninguna dirección,
//!   la conexión siempre se cierra.
//! - HTTP/1.0: headers, cierre por defecto, `Connection: keep-alive` lo evita.
//! - HTTP/1.1: conexiones persistentes por defecto, `Connection: close` las cierra.

pub mod date;
pub mod mime;
pub mod request;   // Parsing de HTTP requests
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado HTTP
pub mod uri;       // Request-target: query y normalización
pub mod version;   // Versión y disposición

// Re-exportamos los tipos principales para facilitar su uso
pub use request::{Incoming, Method, ParseError, Rejection, Request, RequestReader};
pub use response::{Body, Response};
pub use status::StatusCode;
pub use version::{Disposition, Version};
