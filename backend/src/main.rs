mod attribution;
mod config;
mod error;
mod model;
mod prompt;
mod routes;
mod storage;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use attribution::Aggregator;
use config::{AnalysisConfig, ConfigError};
use model::{GeminiClient, ModelClient};
use routes::configure_routes;
use std::env;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let config = match AnalysisConfig::load() {
        Ok(config) => config,
        Err(ConfigError::Io { path, .. }) => {
            log::warn!("No config at {}, using built-in defaults", path.display());
            AnalysisConfig::default()
        }
        Err(e) => {
            log::error!("Failed to load analysis config: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Config loading failed: {}", e),
            ));
        }
    };

    let gemini = match GeminiClient::from_config(&config.model) {
        Ok(client) => client,
        Err(e) => {
            log::error!("Failed to initialize model client: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Model client setup failed: {}", e),
            ));
        }
    };
    log::info!(
        "Model client ready: {} (web search {})",
        config.model.id,
        if config.model.web_search { "enabled" } else { "disabled" }
    );

    let aggregator = if config.scoring.use_tool_trace {
        log::info!("Attribution uses the model's tool trace when present");
        Aggregator::trace_backed()
    } else {
        Aggregator::default()
    };
    if let Some(seed) = config.scoring.seed {
        log::warn!("Attribution scores are pinned to seed {}", seed);
    }

    let model: Arc<dyn ModelClient> = Arc::new(gemini);
    let model = web::Data::from(model);
    let aggregator = web::Data::new(aggregator);
    let config = web::Data::new(config);

    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
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
            .wrap(Logger::default())
            .app_data(config.clone())
            .app_data(aggregator.clone())
            .app_data(model.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
