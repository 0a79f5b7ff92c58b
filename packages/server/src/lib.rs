#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web ingest server for building survey annotations.
//!
//! Serves the survey form taxonomy (`/level`, `/use`, `/structre`,
//! `/visual`), accepts annotation submissions at `/map_data`, and hosts the
//! bundled static site at `/`. Submissions are written create-only to the
//! configured [`ObjectStore`].

pub mod config;
pub mod error;
pub mod form;
mod handlers;
pub mod shutdown;

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use building_survey_storage::ObjectStore;

use crate::config::ServerConfig;

/// Shared application state.
pub struct AppState {
    /// Bucket submissions are written to.
    pub store: Arc<dyn ObjectStore>,
    /// Largest accepted image, in bytes.
    pub max_upload_bytes: usize,
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/test", web::get().to(handlers::hello))
        .route("/health", web::get().to(handlers::health))
        .route("/level", web::get().to(handlers::levels))
        .route("/use", web::get().to(handlers::building_uses))
        .route("/structre", web::get().to(handlers::structure_types))
        .route("/visual", web::get().to(handlers::visual_analyses))
        .route("/map_data", web::post().to(handlers::map_data));
}

/// Static site service; must be registered after [`configure`] so API
/// routes take precedence.
#[must_use]
pub fn static_files(dir: &Path) -> Files {
    Files::new("/", dir).index_file("index.html")
}

/// Starts the building survey server.
///
/// Builds the storage backend, binds the HTTP server and runs until
/// `SIGINT` or `SIGTERM`, then flushes logs and returns. The caller is
/// responsible for initializing logging and providing the async runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let state = web::Data::new(AppState {
        store: config.storage.into_store(),
        max_upload_bytes: config.max_upload_bytes,
    });

    if !config.static_dir.is_dir() {
        log::warn!(
            "Static directory {} does not exist; only the API will be served",
            config.static_dir.display()
        );
    }

    let static_dir = config.static_dir;
    let bind_addr = config.bind_addr;
    let port = config.port;

    log::info!("Starting server on {bind_addr}:{port}");

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
            .service(static_files(&static_dir))
    })
    .disable_signals()
    .bind((bind_addr, port))?
    .run();

    let handle = server.handle();
    actix_web::rt::spawn(async move {
        match shutdown::wait_for_signal().await {
            Ok(signal) => {
                log::info!("Caught signal {signal}, shutting down");
                handle.stop(true).await;
            }
            Err(e) => log::error!("Failed to install signal handlers: {e}"),
        }
    });

    server.await?;

    log::info!("Server stopped");
    shutdown::flush_logs();
    Ok(())
}
