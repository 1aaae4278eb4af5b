//! # Gateway CGI
//! src/cgi/mod.rs
//!
//! Ejecuta los scripts que están bajo el prefijo CGI como procesos hijos:
//!
//! ```text
//! Request ──► CgiEnvironment (metavariables CGI/1.1)
//!         ──► stdin  = body del request (vacío si no hay)
//!         ◄── stdout = respuesta del script (headers propios + body)
//!         ◄── stderr = diagnóstico, solo para el log
//! ```
//!
//! El script recibe únicamente las metavariables; no hereda el entorno del
//! servidor. No hay timeout: un script colgado bloquea solo a su conexión.

use std::io::{self, Write};
use std::net::SocketAddr;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use thiserror::Error;
use tracing::debug;

use crate::http::Request;

/// Falla al ejecutar un script: siempre termina en un 500
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to spawn {}: {source}", .script.display())]
    Spawn { script: PathBuf, source: io::Error },

    #[error("failed waiting for script: {0}")]
    Io(#[from] io::Error),

    #[error("script exited with {status}")]
    Exit { status: ExitStatus, stderr: String },

    #[error("script wrote to stderr")]
    Stderr(String),
}

impl GatewayError {
    /// Lo que el script escribió en stderr, si llegó a correr
    pub fn stderr(&self) -> Option<&str> {
        match self {
            GatewayError::Exit { stderr, .. } | GatewayError::Stderr(stderr) => Some(stderr),
            GatewayError::Spawn { .. } | GatewayError::Io(_) => None,
        }
    }
}

/// Datos del servidor que no vienen en el request
#[derive(Debug, Clone, Copy)]
pub struct ServerInfo<'a> {
    pub server_name: &'a str,
    pub server_software: &'a str,

    /// Puerto en el que realmente se escucha
    pub server_port: u16,
}

/// Metavariables que recibe el script, en orden fijo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgiEnvironment {
    vars: Vec<(&'static str, String)>,
}

impl CgiEnvironment {
    /// Arma el entorno para ejecutar `script` en respuesta a `request`
    pub fn new(
        request: &Request,
        script: &Path,
        script_name: &str,
        remote: SocketAddr,
        server: ServerInfo<'_>,
    ) -> Self {
        let vars = vec![
            ("SERVER_NAME", server.server_name.to_string()),
            ("SERVER_SOFTWARE", server.server_software.to_string()),
            ("GATEWAY_INTERFACE", "CGI/1.1".to_string()),
            ("SERVER_PROTOCOL", request.version().as_str().to_string()),
            ("SERVER_PORT", server.server_port.to_string()),
            ("REQUEST_METHOD", request.method().as_str().to_string()),
            ("REMOTE_ADDR", remote.ip().to_string()),
            ("REMOTE_PORT", remote.port().to_string()),
            ("QUERY_STRING", request.query_string().to_string()),
            ("PATH_INFO", script.to_string_lossy().into_owned()),
            ("SCRIPT_NAME", script_name.to_string()),
            ("CONTENT_LENGTH", request.content_length().to_string()),
            ("CONTENT_TYPE", request.content_type().to_string()),
        ];
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.vars.iter().map(|(key, value)| (*key, value.as_str()))
    }
}

/// Ejecuta `script` y devuelve su stdout.
///
/// El body se escribe en el stdin del hijo desde un thread aparte, así un
/// script que produce mucha salida antes de leer su entrada no se traba con
/// el servidor. El directorio de trabajo es el del script.
///
/// # Errores
///
/// - `Spawn` si el archivo no se puede ejecutar
/// - `Exit` si el script termina con un código distinto de 0
/// - `Stderr` si termina bien pero escribió en stderr
pub fn run(script: &Path, env: &CgiEnvironment, body: &[u8]) -> Result<Vec<u8>, GatewayError> {
    let mut command = Command::new(script);
    command
        .env_clear()
        .envs(env.iter())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = script.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        command.current_dir(dir);
    }
    unblock_signals(&mut command);

    let mut child = command.spawn().map_err(|source| GatewayError::Spawn {
        script: script.to_path_buf(),
        source,
    })?;

    let stdin = child.stdin.take();
    let output = thread::scope(|scope| {
        scope.spawn(move || {
            if let Some(mut stdin) = stdin {
                // EPIPE: el script terminó sin leer su entrada
                if let Err(e) = stdin.write_all(body) {
                    debug!(error = %e, "script did not consume its input");
                }
            }
        });
        child.wait_with_output()
    })?;

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(GatewayError::Exit {
            status: output.status,
            stderr,
        });
    }
    if !stderr.is_empty() {
        return Err(GatewayError::Stderr(stderr));
    }

    Ok(output.stdout)
}

/// El servidor bloquea SIGINT/SIGTERM en todos sus threads para atenderlas
/// con `sigwait`; el hijo hereda esa máscara y hay que limpiarla antes del
/// `exec`.
fn unblock_signals(command: &mut Command) {
    // SAFETY: entre fork y exec solo se llaman funciones async-signal-safe
    // y no se aloca memoria.
    unsafe {
        command.pre_exec(|| {
            let mut empty: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut empty);
            let rc = libc::pthread_sigmask(libc::SIG_SETMASK, &empty, std::ptr::null_mut());
            if rc != 0 {
                return Err(io::Error::from_raw_os_error(rc));
            }
            Ok(())
        });
    }
}
