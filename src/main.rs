use std::io;
use std::net::TcpListener;
use std::sync::Arc;

use clap::Parser;
use env_logger::Env;
use quiz_generator_api::assembly::QuizAssembly;
use quiz_generator_api::config::Settings;
use quiz_generator_api::db;
use quiz_generator_api::generator::{ContentGenerator, GeminiClient};
use quiz_generator_api::run;
use quiz_generator_api::state::AppState;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let settings = Settings::parse();
    let bounds = settings.generation.bounds;
    bounds
        .sanity_check()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let pool = db::connect(&settings.database_url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    db::migrate(&pool)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    log::info!("Connected to {}", settings.database_url);

    let gemini = GeminiClient::new(
        reqwest::Client::new(),
        settings.gemini.api_key.clone(),
        settings.gemini.model.clone(),
        settings.gemini.base_url.clone(),
    );
    let generator = Arc::new(ContentGenerator::new(Arc::new(gemini)));
    let assembly = QuizAssembly::new(pool.clone(), generator, bounds, settings.generation.timeout());
    log::info!(
        "Generating with {} ({}-{} questions, {}-{} choices, timeout {:?})",
        settings.gemini.model,
        bounds.min_questions,
        bounds.max_questions,
        bounds.min_choices,
        bounds.max_choices,
        settings.generation.timeout()
    );

    log::info!("Starting server at http://{}", settings.bind_address);
    log::info!("Swagger UI available at http://{}/swagger-ui/", settings.bind_address);

    let listener = TcpListener::bind(&settings.bind_address)?;
    run(listener, AppState { db: pool, assembly })?.await
}
