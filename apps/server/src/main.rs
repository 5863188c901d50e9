#![warn(clippy::all, clippy::pedantic)]

use std::net::SocketAddr;
use std::path::Path;

use actix_web::{App, HttpServer, web};
use apiwatch_service::{Config, Monitor};
use tokio_util::sync::CancellationToken;
use tracing::info;

mod error;
mod routes;

use error::AppError;
use logger::init_tracing;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_config(None::<&Path>)?;
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    let monitor = web::Data::new(Monitor::open(&config).await?);

    let shutdown = CancellationToken::new();
    let tasks = monitor.start(shutdown.clone());

    let served = run_server(addr, monitor).await;

    info!("HTTP server stopped, waiting for background tasks");
    shutdown.cancel();
    tasks.join().await;

    served
}

async fn run_server(addr: SocketAddr, monitor: web::Data<Monitor>) -> Result<(), AppError> {
    info!("Listening on {}", addr);

    HttpServer::new(move || App::new().app_data(monitor.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
