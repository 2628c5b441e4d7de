//! Notes HTTP server entry point.
//!
//! # Responsibility
//! - Load configuration and initialize process logging.
//! - Open the store and serve the notes API until interrupted.

mod config;

use config::Config;
use log::error;
use notes_api::{router, AppState};
use notes_core::{init_logging, Db, LogOptions, Logger};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            if init_logging(&LogOptions::default()).is_err() {
                eprintln!("could not read config from environment: {err}");
            }
            error!("event=config_load module=server status=error error={err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_logging(&config.log) {
        eprintln!("could not initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let log = Logger::facade();
    match serve(&config, &log).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log.error(
                "server_exit",
                &[("module", &"server"), ("status", &"error"), ("error", &err)],
            );
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: &Config, log: &Logger) -> Result<(), Box<dyn std::error::Error>> {
    let db = Db::open(&config.dsn, log)?;
    let app = router(AppState::new(db, log));

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    let server_log = log.with("module", "server");
    server_log.info("server_listening", &[("status", &"ok"), ("addr", &config.addr)]);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    server_log.info("server_stopped", &[("status", &"ok")]);
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No handler could be installed; run until killed.
        std::future::pending::<()>().await;
    }
}
