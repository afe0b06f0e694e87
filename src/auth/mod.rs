//! Authentication module for the TravelEase server
//!
//! Token issuance and verification, the request authenticator that gates
//! mutating routes, and the per-route authorization policy.

pub mod handlers;
pub mod middleware;
pub mod password;
pub mod policy;
mod rate_limit;
mod service;
pub mod token;

pub use middleware::Authenticator;
pub use policy::{Access, AuthorizationDecision, Operation};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use service::{AuthService, RegisterParams, Registration};
pub use token::{Claims, Principal, TokenCodec};
