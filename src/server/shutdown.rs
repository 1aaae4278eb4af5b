//! # Apagado ordenado
//! src/server/shutdown.rs
//!
//! `accept` bloquea sin timeout, así que marcar un flag no alcanza: después
//! de marcarlo hay que despertar al dispatcher con una conexión propia.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Pide al dispatcher que deje de aceptar conexiones.
///
/// Se puede clonar y mandar a otros threads (el de señales, un test).
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,

    /// Dirección a la que se conecta para destrabar `accept`
    wake: SocketAddr,
}

impl ShutdownHandle {
    pub(crate) fn new(local_addr: SocketAddr) -> Self {
        // Un listener en 0.0.0.0 / :: se despierta por loopback
        let wake = match local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => {
                SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local_addr.port())
            }
            IpAddr::V6(ip) if ip.is_unspecified() => {
                SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), local_addr.port())
            }
            _ => local_addr,
        };

        Self {
            requested: Arc::new(AtomicBool::new(false)),
            wake,
        }
    }

    /// Marca el apagado y despierta al dispatcher. Llamadas repetidas no
    /// hacen nada.
    pub fn trigger(&self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            return;
        }

        match TcpStream::connect_timeout(&self.wake, WAKE_TIMEOUT) {
            Ok(_) => debug!(wake = %self.wake, "dispatcher woken up"),
            // El listener ya no está: no hay accept que destrabar
            Err(e) => warn!(wake = %self.wake, error = %e, "could not wake dispatcher"),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
