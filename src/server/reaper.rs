//! # Reaper de workers
//! src/server/reaper.rs
//!
//! Recupera los threads de conexión que ya terminaron sin que el dispatcher
//! tenga que esperar a nadie.
//!
//! ```text
//! dispatcher ──Spawned(id, handle)──┐
//!                                   ├──► reaper: live{id → handle}
//! worker (Lease::drop) ─Finished(id)┘         join de los terminados
//! ```
//!
//! El conjunto de workers vivos existe solo dentro del thread del reaper.
//! Los avisos pueden llegar en cualquier orden: un `Finished` anterior a su
//! `Spawned` queda anotado hasta que el handle aparece. Si el thread nunca se
//! pudo lanzar, el dispatcher manda `Abandoned` y la anotación se descarta.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error};

use crate::error::ServerError;

/// Cada cuánto se barren los threads que avisaron pero todavía no salieron
const SWEEP_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) type WorkerId = u64;

enum Event {
    Spawned(WorkerId, JoinHandle<()>),
    Finished(WorkerId),

    /// `spawn` falló: la lease se soltó sin thread
    Abandoned(WorkerId),
}

/// Prueba de que un worker es dueño de su conexión. Al soltarla (también
/// durante un panic) el reaper se entera de que el worker terminó.
#[derive(Debug)]
pub(crate) struct Lease {
    id: WorkerId,
    events: Sender<Event>,
}

impl Lease {
    pub fn id(&self) -> WorkerId {
        self.id
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let _ = self.events.send(Event::Finished(self.id));
    }
}

/// Lado del dispatcher
pub(crate) struct Reaper {
    events: Sender<Event>,
    thread: JoinHandle<usize>,
}

impl Reaper {
    pub fn start() -> Result<Self, ServerError> {
        let (events, receiver) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("reaper".to_string())
            .spawn(move || reap(receiver))
            .map_err(|source| ServerError::Spawn {
                what: "reaper",
                source,
            })?;

        Ok(Self { events, thread })
    }

    /// Lease para el worker `id`; se entrega al thread antes de lanzarlo
    pub fn lease(&self, id: WorkerId) -> Lease {
        Lease {
            id,
            events: self.events.clone(),
        }
    }

    pub fn spawned(&self, id: WorkerId, handle: JoinHandle<()>) {
        let _ = self.events.send(Event::Spawned(id, handle));
    }

    /// El thread del worker `id` no se pudo crear
    pub fn abandoned(&self, id: WorkerId) {
        let _ = self.events.send(Event::Abandoned(id));
    }

    /// Espera a que terminen todos los workers en curso.
    ///
    /// Retorna cuántos workers se recuperaron en total.
    pub fn finish(self) -> usize {
        drop(self.events);
        match self.thread.join() {
            Ok(reaped) => reaped,
            Err(_) => {
                error!("reaper thread panicked");
                0
            }
        }
    }
}

/// Workers conocidos por el reaper
#[derive(Default)]
struct Workers {
    live: HashMap<WorkerId, JoinHandle<()>>,

    /// Avisaron que terminaron; se recuperan cuando su thread sale
    finished: HashSet<WorkerId>,
}

impl Workers {
    fn record(&mut self, event: Event) {
        match event {
            Event::Spawned(id, handle) => {
                self.live.insert(id, handle);
            }
            Event::Finished(id) => {
                self.finished.insert(id);
            }
            Event::Abandoned(id) => {
                self.finished.remove(&id);
            }
        }
    }

    /// Hace join de todo worker que avisó y cuyo thread ya salió
    fn sweep(&mut self) -> usize {
        let live = &mut self.live;
        let mut reaped = 0;
        self.finished.retain(|id| {
            let exited = live.get(id).is_some_and(|handle| handle.is_finished());
            if exited {
                if let Some(handle) = live.remove(id) {
                    join(*id, handle);
                    reaped += 1;
                }
            }
            // Sin handle todavía, o thread aún saliendo: queda para la próxima
            !exited
        });
        reaped
    }

    /// Espera a todos los que quedan
    fn drain(&mut self) -> usize {
        self.finished.clear();
        let mut reaped = 0;
        for (id, handle) in self.live.drain() {
            join(id, handle);
            reaped += 1;
        }
        reaped
    }
}

/// Loop del reaper: termina cuando no queda ningún `Sender` (el dispatcher
/// y todas las leases se soltaron)
fn reap(events: Receiver<Event>) -> usize {
    let mut workers = Workers::default();
    let mut reaped = 0;

    loop {
        match events.recv_timeout(SWEEP_INTERVAL) {
            Ok(event) => workers.record(event),
            // Sin avisos: igual se barre
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        reaped += workers.sweep();
    }

    // Ya no hay leases: lo que queda está saliendo
    reaped += workers.drain();
    debug!(reaped, "reaper stopped");
    reaped
}

fn join(id: WorkerId, handle: JoinHandle<()>) {
    match handle.join() {
        Ok(()) => debug!(worker = id, "worker reaped"),
        Err(_) => error!(worker = id, "worker panicked"),
    }
}
