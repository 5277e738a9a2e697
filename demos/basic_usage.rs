//! Basic usage example for the Elastic logger middleware
//!
//! Run with:
//! ```bash
//! ELASTIC_LOGGER_URL=http://localhost:9200 \
//! ELASTIC_LOGGER_INDEX=http-logs \
//! ELASTIC_LOGGER_SERVICE=example-app \
//! RUST_LOG=elastic_logger_actix=debug \
//! cargo run --example basic_usage
//! ```

use actix_web::{web, App, HttpResponse, HttpServer};
use elastic_logger_actix::ElasticLoggerMiddleware;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

async fn index() -> HttpResponse {
    HttpResponse::Ok().body("Hello from the logged app!")
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "example-app"
    }))
}

async fn echo(body: String) -> HttpResponse {
    HttpResponse::Ok().body(body)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let logger = ElasticLoggerMiddleware::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    tracing::info!("starting example server on http://0.0.0.0:8080");

    HttpServer::new(move || {
        App::new()
            .wrap(logger.clone())
            .service(web::resource("/").route(web::get().to(index)))
            .service(web::resource("/health").route(web::get().to(health)))
            .service(web::resource("/echo").route(web::post().to(echo)))
    })
    .bind("0.0.0.0:8080")?
    .run()
    .await
}
