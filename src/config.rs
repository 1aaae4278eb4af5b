//! # Configuración del Servidor
//! src/config.rs
//!
//! La configuración se arma una sola vez al arrancar y después es de solo
//! lectura: cada worker recibe un `Arc<Config>`.
//!
//! Orden de precedencia (el último gana):
//!
//! 1. Valores por defecto
//! 2. Archivo JSON (`--config`, por defecto `server.json`)
//! 3. Argumentos CLI / variables de entorno
//!
//! ## Ejemplos de uso
//!
//! ### Archivo
//! ```json
//! {
//!   "port": 8000,
//!   "document_root": "www",
//!   "http_version": "1.1",
//!   "index_files": ["index.html", "index.htm"]
//! }
//! ```
//!
//! ### CLI
//! ```bash
//! ./origin_http --config server.json --port 9000 --document-root ./public
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 ./origin_http
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::http::Version;

/// Nombre y versión que se anuncian en `Server` y `SERVER_SOFTWARE`
pub const SERVER_SOFTWARE: &str = concat!("origin-http/", env!("CARGO_PKG_VERSION"));

/// Errores al cargar o validar la configuración
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuración del servidor
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Host/IP en el que escucha
    pub host: String,

    /// Puerto en el que escucha el servidor
    pub port: u16,

    /// Profundidad de la cola de conexiones pendientes
    pub backlog: i32,

    /// Máximo de bytes por línea del request (request line y headers)
    pub request_buffer_size: usize,

    /// Directorio desde el que se sirven los archivos
    pub document_root: PathBuf,

    /// Versión para responder requests cuya versión no se pudo determinar
    pub http_version: String,

    /// Archivos índice que se buscan, en orden, dentro de un directorio
    pub index_files: Vec<String>,

    /// Prefijo de paths que se ejecutan como CGI
    pub cgi_prefix: String,

    /// Valor de `SERVER_NAME` para los scripts CGI
    pub server_name: String,

    /// Si se loguea una línea por cada request atendido
    pub logging: bool,
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            backlog: 1024,
            request_buffer_size: 65536,
            document_root: PathBuf::from("www"),
            http_version: "1.0".to_string(),
            index_files: vec!["index.html".to_string(), "index.htm".to_string()],
            cgi_prefix: "/cgi-bin/".to_string(),
            server_name: "origin-http".to_string(),
            logging: true,
        }
    }
}

impl Config {
    /// Carga la configuración desde un archivo JSON.
    ///
    /// Si el archivo no existe se usan los valores por defecto (con un
    /// warning). Los campos ausentes toman su valor por defecto.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "archivo de configuración inexistente, usando valores por defecto");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_json(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parsea la configuración desde un string JSON
    ///
    /// # Ejemplo
    /// ```rust
    /// use origin_http::config::Config;
    ///
    /// let config = Config::from_json(r#"{"port": 9000}"#).unwrap();
    /// assert_eq!(config.port, 9000);
    /// assert_eq!(config.address(), "127.0.0.1:9000");
    /// ```
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Obtiene la dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Versión por defecto ya interpretada.
    ///
    /// Una configuración validada nunca cae en el fallback a HTTP/1.0.
    pub fn default_version(&self) -> Version {
        Version::from_config(&self.http_version).unwrap_or(Version::Http10)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_buffer_size == 0 {
            return Err(ConfigError::Invalid("request_buffer_size must be >= 1".to_string()));
        }
        if self.backlog <= 0 {
            return Err(ConfigError::Invalid("backlog must be >= 1".to_string()));
        }
        if Version::from_config(&self.http_version).is_none() {
            return Err(ConfigError::Invalid(format!(
                "http_version must be 1.0 or 1.1, got {}",
                self.http_version
            )));
        }
        if self.index_files.is_empty() {
            return Err(ConfigError::Invalid("index_files must not be empty".to_string()));
        }
        if !self.cgi_prefix.starts_with('/') || !self.cgi_prefix.ends_with('/') {
            return Err(ConfigError::Invalid(format!(
                "cgi_prefix must start and end with '/', got {}",
                self.cgi_prefix
            )));
        }
        Ok(())
    }
}

/// Argumentos de línea de comandos
#[derive(Debug, Clone, Parser)]
#[command(name = "origin_http")]
#[command(about = "Servidor HTTP de origen: archivos estáticos y CGI")]
#[command(version)]
pub struct Cli {
    /// Archivo de configuración JSON
    #[arg(short, long, default_value = "server.json", env = "HTTP_CONFIG")]
    pub config: PathBuf,

    /// Host/IP en el que escucha
    #[arg(long, env = "HTTP_HOST")]
    pub host: Option<String>,

    /// Puerto en el que escucha el servidor
    #[arg(short, long, env = "HTTP_PORT")]
    pub port: Option<u16>,

    /// Directorio desde el que se sirven los archivos
    #[arg(long, env = "DOCUMENT_ROOT")]
    pub document_root: Option<PathBuf>,

    /// Versión HTTP por defecto (1.0 o 1.1)
    #[arg(long, env = "HTTP_VERSION")]
    pub http_version: Option<String>,

    /// Máximo de bytes por línea del request
    #[arg(long, env = "REQUEST_BUFFER_SIZE")]
    pub request_buffer_size: Option<usize>,

    /// Profundidad de la cola de listen
    #[arg(long, env = "HTTP_BACKLOG")]
    pub backlog: Option<i32>,

    /// Desactiva el access log
    #[arg(long)]
    pub no_logging: bool,
}

impl Cli {
    /// Carga el archivo indicado y aplica encima los argumentos
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = Config::load(&self.config)?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(document_root) = self.document_root {
            config.document_root = document_root;
        }
        if let Some(http_version) = self.http_version {
            config.http_version = http_version;
        }
        if let Some(size) = self.request_buffer_size {
            config.request_buffer_size = size;
        }
        if let Some(backlog) = self.backlog {
            config.backlog = backlog;
        }
        if self.no_logging {
            config.logging = false;
        }
    }
}
