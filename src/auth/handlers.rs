use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::auth::service::{RegisterParams, Registration};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build(state.config.auth.cookie_name.clone(), token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.config.environment == "production")
        .max_age(time::Duration::seconds(state.auth.token_ttl().num_seconds()))
        .finish()
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!(email = %req.email, "Received login request");
    match state.auth.login(&req.email, req.password.as_deref()).await {
        Ok(token) => {
            info!(email = %req.email, "Login successful");
            Ok(HttpResponse::Ok()
                .cookie(session_cookie(&state, token.clone()))
                .json(AuthResponse { token }))
        }
        Err(e) => {
            warn!(email = %req.email, error = %e, "Login failed");
            Err(e)
        }
    }
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    info!(email = %req.email, "Received registration request");

    let registration = state
        .auth
        .register(RegisterParams {
            email: req.email,
            password: req.password,
            name: req.name,
            photo_url: req.photo_url,
        })
        .await?;

    Ok(match registration {
        Registration::Created(_) => {
            HttpResponse::Created().json(json!({ "message": "User created successfully" }))
        }
        Registration::AlreadyExists => {
            HttpResponse::Ok().json(json!({ "message": "User already exists" }))
        }
    })
}

/// Clears the session cookie. Tokens carry no server-side state, so a bearer
/// token copied elsewhere stays valid until it expires.
pub async fn logout(state: web::Data<AppState>) -> HttpResponse {
    let mut cookie = Cookie::build(state.config.auth.cookie_name.clone(), "")
        .path("/")
        .finish();
    cookie.make_removal();

    HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "message": "Successfully logged out" }))
}
