pub mod auth;
pub mod bookings;
pub mod config;
pub mod db;
pub mod error;
pub mod vehicles;

use std::sync::Arc;
use actix_web::{web, HttpResponse};
use tracing::info;
use uuid::Uuid;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{Authenticator, AuthService, Principal, TokenCodec};
pub use db::{BookingStore, CredentialStore, DbOperations, MemoryStore, VehicleStore};

/// Health check endpoint handler
/// Returns server status, timestamp and which store backs the data, with
/// connection pool counts when it is Postgres
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let store = match &state.db {
        Some(db) => serde_json::json!({ "kind": "postgres", "pool": db.get_pool_status() }),
        None => serde_json::json!({ "kind": "memory" }),
    };
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "store": store,
    }))
}

pub async fn service_info() -> HttpResponse {
    HttpResponse::Ok().body("TravelEase server running...")
}

/// Parses a path identifier, reporting `message` as a validation error.
pub(crate) fn parse_id(raw: &str, message: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::ValidationError(message.to_string()))
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth: Arc<AuthService>,
    pub vehicles: Arc<dyn VehicleStore>,
    pub bookings: Arc<dyn BookingStore>,
    db: Option<DbOperations>,
}

impl AppState {
    /// Connects the store selected by `database.url` and applies migrations
    /// when it is Postgres.
    pub async fn new(config: Settings) -> Result<Self> {
        if config.database.is_memory() {
            info!("Using in-memory store");
            return Ok(Self::in_memory(config));
        }

        let db = DbOperations::new_with_options(
            &config.database.url,
            config.database.max_connections,
            std::time::Duration::from_secs(config.database.acquire_timeout_secs),
        )
        .await?;
        db.run_migrations().await?;

        let store = Arc::new(db.clone());
        let mut state = Self::with_store(config, store);
        state.db = Some(db);
        Ok(state)
    }

    pub fn in_memory(config: Settings) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store<S>(config: Settings, store: Arc<S>) -> Self
    where
        S: CredentialStore + VehicleStore + BookingStore + 'static,
    {
        let auth = AuthService::from_config(store.clone(), &config.auth);
        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            vehicles: store.clone(),
            bookings: store,
            db: None,
        }
    }

    /// Request gate for the routes registered by [`routes`].
    pub fn authenticator(&self) -> Authenticator {
        Authenticator::new(self.auth.clone(), &self.config.auth.cookie_name)
    }

    pub async fn shutdown(&self) -> Result<()> {
        // Close database connections
        if let Some(db) = &self.db {
            db.close().await;
        }
        Ok(())
    }
}

/// Malformed JSON bodies become a 400 in the same body shape as every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| AppError::ValidationError(format!("Invalid request body: {}", err)).into())
}

/// Every route the server exposes. Which of them require a session token is
/// decided by [`auth::policy`], enforced by [`Authenticator`].
pub fn routes(cfg: &mut web::ServiceConfig) {
    use crate::auth::handlers as users;
    use crate::bookings::handlers as bookings;
    use crate::vehicles::handlers as vehicles;

    cfg.route("/", web::get().to(service_info))
        .route("/health", web::get().to(health_check))
        .route("/users", web::post().to(users::register))
        .route("/login", web::post().to(users::login))
        .route("/logout", web::post().to(users::logout))
        .service(
            web::resource("/vehicles")
                .route(web::get().to(vehicles::latest))
                .route(web::post().to(vehicles::create_vehicle)),
        )
        .service(
            web::resource("/vehicles/{id}")
                .route(web::get().to(vehicles::get_vehicle))
                .route(web::delete().to(vehicles::delete_vehicle)),
        )
        .route("/allVehicles", web::get().to(vehicles::search))
        .service(
            web::resource("/bookings")
                .route(web::get().to(bookings::list))
                .route(web::post().to(bookings::create)),
        )
        .route("/bookings/{id}", web::delete().to(bookings::cancel));
}
