//! # Origin HTTP - Entry Point
//! src/main.rs
//!
//! Lee la configuración, instala el manejo de señales y corre el servidor
//! hasta SIGINT/SIGTERM.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use origin_http::config::Cli;
use origin_http::logging;
use origin_http::server::{signal, Server};

fn main() -> ExitCode {
    logging::init();

    // Antes de crear cualquier thread, para que todos hereden la máscara
    if let Err(e) = signal::block_termination_signals() {
        error!(error = %e, "failed to block termination signals");
        return ExitCode::FAILURE;
    }

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::bind(Arc::new(config)) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to start server");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = signal::spawn_listener(server.shutdown_handle()) {
        error!(error = %e, "failed to install signal handling");
        return ExitCode::FAILURE;
    }

    match server.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal server error");
            ExitCode::FAILURE
        }
    }
}
