use actix_cors::Cors;
use actix_web::http::header::{AUTHORIZATION, CONTENT_TYPE};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use std::net::TcpListener;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use travelease_server::{json_config, routes, AppState, Settings};

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Load configuration
    let config = Settings::new().context("Failed to load configuration")?;
    info!(environment = %config.environment, "Configuration loaded successfully");

    // Initialize application state
    let state = AppState::new(config.clone())
        .await
        .context("Failed to initialize application state")?;
    let state = web::Data::new(state);

    // Drop idle login rate-limit windows
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(RATE_LIMIT_CLEANUP_INTERVAL).await;
            let limiter = cleanup_state.auth.rate_limiter();
            limiter.cleanup().await;
            let tracked = limiter.tracked_keys().await;
            debug!(tracked = tracked, "Login rate-limit windows cleaned up");
        }
    });

    // Create and bind TCP listener
    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address).with_context(|| format!("Failed to bind {}", address))?;
    info!("TravelEase server listening on http://{}", address);

    let server_state = state.clone();
    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_config.allowed_origin)
            .allowed_methods(vec!["GET", "POST", "DELETE"])
            .allowed_headers(vec![AUTHORIZATION, CONTENT_TYPE])
            .supports_credentials()
            .max_age(cors_config.max_age as usize);

        App::new()
            .app_data(server_state.clone())
            .app_data(json_config())
            .wrap(server_state.authenticator())
            .wrap(cors)
            .configure(routes)
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .context("HTTP server terminated with an error")?;

    state.shutdown().await?;
    info!("Server stopped");
    Ok(())
}
