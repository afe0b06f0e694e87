#![allow(dead_code)]

use actix_web::http::header::AUTHORIZATION;
use actix_web::web;
use chrono::{Duration, Utc};
use travelease_server::auth::{Principal, RegisterParams, TokenCodec};
use travelease_server::{AppState, Settings};

pub const TEST_SECRET: &[u8] = b"test_secret";

/// Builds the full application (authenticator, JSON config, every route)
/// around the given `web::Data<AppState>`.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .app_data(travelease_server::json_config())
                .wrap($state.authenticator())
                .configure(travelease_server::routes),
        )
        .await
    };
}

pub fn test_state() -> web::Data<AppState> {
    let config = Settings::new_for_test().expect("Failed to load test config");
    web::Data::new(AppState::in_memory(config))
}

/// Registers `email` (no password) and returns a fresh session token.
pub async fn login_as(state: &AppState, email: &str) -> String {
    state
        .auth
        .register(RegisterParams {
            email: email.to_string(),
            ..Default::default()
        })
        .await
        .expect("registration failed");
    state.auth.login(email, None).await.expect("login failed")
}

pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {}", token))
}

pub fn expired_token(email: &str) -> String {
    TokenCodec::new(TEST_SECRET)
        .issue_at(
            &Principal {
                subject: "expired-user".to_string(),
                email: email.to_string(),
            },
            Duration::hours(1),
            Utc::now() - Duration::hours(2),
        )
        .expect("failed to sign token")
}

/// Flips one character inside the signed payload segment.
pub fn tamper(token: &str) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    let mut payload: Vec<char> = parts[1].chars().collect();
    let i = payload.len() / 2;
    payload[i] = if payload[i] == 'A' { 'B' } else { 'A' };
    format!("{}.{}.{}", parts[0], payload.into_iter().collect::<String>(), parts[2])
}
