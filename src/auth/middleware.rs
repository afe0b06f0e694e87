//! Request authenticator.
//!
//! For every request the policy table marks as `Authenticated`:
//!
//! ```text
//! NoToken ──(cookie or bearer header)──> TokenPresent ──verify──> Authenticated
//!    │                                        │
//!    └──> Rejected 401                        └──> Rejected 403
//! ```
//!
//! A rejected request never reaches a handler. An authenticated request
//! carries its [`Principal`] in the request extensions.

use std::future::{ready, Ready};
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use tracing::{debug, warn};

use crate::auth::policy::{required_access, Access};
use crate::auth::service::AuthService;
use crate::auth::token::Principal;
use crate::error::{AppError, AuthError};

pub const NO_TOKEN: &str = "No token provided";
pub const INVALID_TOKEN: &str = "Invalid or expired token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCarrier {
    Cookie,
    Bearer,
}

/// Finds the candidate token. The session cookie wins over the header.
pub fn extract_token(req: &HttpRequest, cookie_name: &str) -> Option<(TokenCarrier, String)> {
    if let Some(cookie) = req.cookie(cookie_name) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some((TokenCarrier::Cookie, value.to_string()));
        }
    }

    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Some((TokenCarrier::Bearer, token.to_string()))
    } else {
        None
    }
}

/// Runs the state machine for one request.
pub fn authenticate(req: &HttpRequest, auth: &AuthService, cookie_name: &str) -> Result<Principal, AuthError> {
    let (carrier, token) = extract_token(req, cookie_name)
        .ok_or_else(|| AuthError::Unauthorized(NO_TOKEN.to_string()))?;

    auth.verify_token(&token).map_err(|e| {
        debug!(?carrier, error = %e, "Token verification failed");
        AuthError::Forbidden(INVALID_TOKEN.to_string())
    })
}

#[derive(Clone)]
pub struct Authenticator {
    auth: Arc<AuthService>,
    cookie_name: Arc<str>,
}

impl Authenticator {
    pub fn new(auth: Arc<AuthService>, cookie_name: &str) -> Self {
        Self {
            auth,
            cookie_name: Arc::from(cookie_name),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authenticator
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthenticatorMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticatorMiddleware {
            service,
            auth: self.auth.clone(),
            cookie_name: self.cookie_name.clone(),
        }))
    }
}

pub struct AuthenticatorMiddleware<S> {
    service: S,
    auth: Arc<AuthService>,
    cookie_name: Arc<str>,
}

impl<S, B> Service<ServiceRequest> for AuthenticatorMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if required_access(req.method(), req.path()) == Access::Public {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        match authenticate(req.request(), &self.auth, &self.cookie_name) {
            Ok(principal) => {
                debug!(method = %req.method(), path = %req.path(), email = %principal.email, "Request authenticated");
                req.extensions_mut().insert(principal);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(err) => {
                warn!(method = %req.method(), path = %req.path(), reason = %err, "Request rejected");
                let res = req.error_response(AppError::from(err)).map_into_right_body();
                Box::pin(async move { Ok(res) })
            }
        }
    }
}

/// Handlers on gated routes take a `Principal` argument. Outside the gate
/// the extractor fails closed with 401.
impl FromRequest for Principal {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Principal>()
                .cloned()
                .ok_or_else(|| AppError::unauthorized(NO_TOKEN)),
        )
    }
}
