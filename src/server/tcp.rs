//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! El dispatcher es dueño del socket que escucha. Por cada conexión aceptada
//! lanza un thread worker que se queda con el stream; después de entregarlo
//! el dispatcher no lo vuelve a tocar y solo registra el id del worker en el
//! reaper.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::ServerError;

use super::reaper::{Reaper, WorkerId};
use super::shutdown::ShutdownHandle;
use super::worker::{self, Context};

/// Servidor HTTP de origen: un thread por conexión
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    context: Arc<Context>,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Abre el socket en `config.address()` con la cola de `config.backlog`.
    ///
    /// # Errores
    ///
    /// `Bind` si la dirección está en uso o no hay permiso sobre el puerto;
    /// `Listen` si no se pudo ajustar la cola.
    pub fn bind(config: Arc<Config>) -> Result<Self, ServerError> {
        let address = config.address();
        let bind_error = |source| ServerError::Bind {
            address: address.clone(),
            source,
        };

        let listener = TcpListener::bind(&address).map_err(bind_error)?;
        set_backlog(&listener, config.backlog)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let shutdown = ShutdownHandle::new(local_addr);
        let context = Context::new(config, local_addr.port(), shutdown.clone());
        info!(
            address = %local_addr,
            document_root = %context.router.document_root().display(),
            version = %context.config.default_version(),
            "listening"
        );

        Ok(Self {
            listener,
            local_addr,
            context: Arc::new(context),
            shutdown,
        })
    }

    /// Dirección real del listener (útil con `port: 0`)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Acepta conexiones hasta que se pida el apagado o `accept` falle.
    ///
    /// En ambos casos el listener se cierra primero y después se espera a
    /// que terminen los workers en curso.
    pub fn run(self) -> Result<(), ServerError> {
        let Server {
            listener,
            context,
            shutdown,
            ..
        } = self;

        let reaper = Reaper::start()?;
        let result = accept_loop(&listener, &context, &shutdown, &reaper);
        drop(listener);

        info!("listener closed, waiting for open connections");
        let reaped = reaper.finish();
        info!(reaped, "server stopped");
        result
    }
}

fn accept_loop(
    listener: &TcpListener,
    context: &Arc<Context>,
    shutdown: &ShutdownHandle,
    reaper: &Reaper,
) -> Result<(), ServerError> {
    let mut next_id: WorkerId = 0;

    loop {
        let accepted = listener.accept();
        if shutdown.is_triggered() {
            debug!("shutdown requested");
            return Ok(());
        }

        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                error!(error = %source, "accept failed");
                return Err(ServerError::Accept { source });
            }
        };

        next_id += 1;
        let id = next_id;
        let lease = reaper.lease(id);
        let context = Arc::clone(context);

        let spawned = thread::Builder::new()
            .name(format!("conn-{id}"))
            .spawn(move || worker::serve(stream, peer, &context, lease));
        match spawned {
            Ok(handle) => reaper.spawned(id, handle),
            // El stream y la lease se soltaron junto con el closure
            Err(e) => {
                warn!(%peer, error = %e, "could not spawn worker, connection dropped");
                reaper.abandoned(id);
            }
        }
    }
}

/// `TcpListener::bind` usa una cola fija; se vuelve a llamar a `listen` con
/// la profundidad configurada (sobre un socket que ya escucha solo la ajusta)
fn set_backlog(listener: &TcpListener, backlog: i32) -> Result<(), ServerError> {
    // SAFETY: el fd es válido mientras viva `listener`
    let rc = unsafe { libc::listen(listener.as_raw_fd(), backlog) };
    if rc == -1 {
        return Err(ServerError::Listen {
            backlog,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}
