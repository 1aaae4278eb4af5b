//! # Señales de terminación
//! src/server/signal.rs
//!
//! SIGINT y SIGTERM se bloquean en el thread principal antes de lanzar
//! cualquier otro (la máscara se hereda) y un thread dedicado las recibe con
//! `sigwait`. Así ningún handler asíncrono corre en medio de un worker.
//!
//! - Primera señal: apagado ordenado (no se aceptan más conexiones, las que
//!   están en curso terminan).
//! - Segunda señal: salida inmediata.

use std::io;
use std::process;
use std::thread;

use tracing::{error, info, warn};

use super::ShutdownHandle;
use crate::error::ServerError;

/// Código de salida convencional para 128 + SIGINT
const FORCED_EXIT_CODE: i32 = 130;

fn termination_signals() -> libc::sigset_t {
    // SAFETY: sigemptyset inicializa el set antes de usarlo
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGINT);
        libc::sigaddset(&mut set, libc::SIGTERM);
        set
    }
}

/// Bloquea SIGINT/SIGTERM en el thread actual.
///
/// Tiene que llamarse antes de crear cualquier thread.
pub fn block_termination_signals() -> io::Result<()> {
    let set = termination_signals();
    // SAFETY: `set` está inicializado y no se pide la máscara anterior
    let rc = unsafe { libc::pthread_sigmask(libc::SIG_BLOCK, &set, std::ptr::null_mut()) };
    if rc != 0 {
        return Err(io::Error::from_raw_os_error(rc));
    }
    Ok(())
}

/// Lanza el thread que espera las señales y dispara `shutdown`
pub fn spawn_listener(shutdown: ShutdownHandle) -> Result<(), ServerError> {
    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || wait_for_signals(shutdown))
        .map(|_| ())
        .map_err(|source| ServerError::Spawn {
            what: "signal",
            source,
        })
}

fn wait_for_signals(shutdown: ShutdownHandle) {
    let set = termination_signals();

    loop {
        let mut signal: libc::c_int = 0;
        // SAFETY: `set` y `signal` son válidos durante la llamada
        let rc = unsafe { libc::sigwait(&set, &mut signal) };
        if rc != 0 {
            error!(error = %io::Error::from_raw_os_error(rc), "sigwait failed, signals ignored");
            return;
        }

        if shutdown.is_triggered() {
            warn!(signal, "second signal received, exiting now");
            process::exit(FORCED_EXIT_CODE);
        }

        info!(signal, "shutting down, waiting for open connections");
        shutdown.trigger();
    }
}
