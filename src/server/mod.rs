//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones entrantes y le da a cada una su propio thread
//! 3. Recupera los threads que terminaron sin frenar al `accept`
//! 4. Se apaga ordenadamente ante SIGINT/SIGTERM
//!
//! Los workers no comparten nada mutable entre sí: solo la configuración
//! (inmutable) y el canal de aviso al reaper.

mod reaper;
pub mod shutdown;
pub mod signal;
pub mod tcp;
mod worker;

// Re-exportar para facilitar el uso
pub use shutdown::ShutdownHandle;
pub use tcp::Server;
