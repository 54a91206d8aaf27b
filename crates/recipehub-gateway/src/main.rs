use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recipehub_gateway::{config::GatewayConfig, metrics::register_metrics, routes, state::AppState};

/// Largest JSON body accepted on any route.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let rate_limit_rpm = config.rate_limit_rpm;

    tracing::info!("Starting recipehub-gateway on port {}", port);
    tracing::info!("Chapa API: {}", config.chapa_base_url);
    tracing::info!("Hasura endpoint: {}", config.hasura_endpoint);
    tracing::info!("Outbound timeout: {:?}", config.http_timeout);
    tracing::info!(
        "Webhook signatures: {}",
        if config.chapa_webhook_secret.is_some() {
            "verified"
        } else {
            "not verified (dev mode)"
        }
    );

    register_metrics();

    let state = AppState::new(config).map_err(std::io::Error::other)?;
    let state_data = web::Data::new(state);

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm as u64)
        .finish()
        .ok_or_else(|| std::io::Error::other("invalid RATE_LIMIT_RPM"))?;

    HttpServer::new(move || {
        let cors = recipehub_gateway::cors::build_cors(&allowed_origins);

        App::new()
            .app_data(state_data.clone())
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Governor::new(&governor_conf))
            .configure(routes::health::configure)
            .configure(routes::payments::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
