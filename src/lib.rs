//! # Origin HTTP
//! src/lib.rs
//!
//! Servidor HTTP de origen implementado desde cero: sirve archivos estáticos
//! desde un document root y ejecuta scripts CGI bajo un prefijo reservado.
//! Habla HTTP/0.9, HTTP/1.0 y HTTP/1.1, con conexiones persistentes.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: Parsing de requests y framing de responses
//! - `router`: Resolución de paths contra el document root
//! - `cgi`: Ejecución de scripts como procesos hijos
//! - `server`: Dispatcher TCP, workers por conexión y reaper
//! - `config`: Archivo JSON + argumentos CLI
//! - `logging`: Subscriber de `tracing` y access log
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use std::sync::Arc;
//! use origin_http::config::Config;
//! use origin_http::server::Server;
//!
//! let server = Server::bind(Arc::new(Config::default())).expect("bind");
//! server.run().expect("Error en el servidor");
//! ```

pub mod cgi;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod router;
pub mod server;
