mod config;
mod ledger;
mod routes;
mod verification;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use config::AppConfig;
use ledger::{InMemoryLedgerRepository, LedgerRepository, SeedDocument};
use routes::configure_routes;
use std::sync::Arc;
use verification::{GeminiFaceMatcher, VerificationHandler};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let seed = SeedDocument::load(config.seed_data_path.as_deref()).map_err(|e| {
        log::error!("Failed to load seed data: {}", e);
        std::io::Error::other(format!("Seed data error: {}", e))
    })?;
    match &config.seed_data_path {
        Some(path) => log::info!("Seed data loaded from {}", path.display()),
        None => log::info!("Using bundled seed data"),
    }
    log::info!(
        "Ledger seeded with {} users, {} loans, {} transactions",
        seed.users.len(),
        seed.loans.len(),
        seed.transactions.len()
    );

    let repo: Arc<dyn LedgerRepository> = Arc::new(InMemoryLedgerRepository::new(seed));

    let matcher = GeminiFaceMatcher::new(&config.gemini).map_err(|e| {
        log::error!("Failed to build face matcher client: {}", e);
        std::io::Error::other(format!("Face matcher error: {}", e))
    })?;
    log::info!(
        "Face verification via {} (timeout {}s)",
        matcher.endpoint(),
        config.gemini.timeout_secs
    );
    let verification_handler = VerificationHandler::new(Arc::new(matcher));

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(verification_handler.clone()))
            .app_data(web::Data::from(repo.clone()))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
