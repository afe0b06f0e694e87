use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, TokenError};
use crate::Result;

/// Claim set sealed into every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // User ID
    pub email: String, // Identity used for ownership checks
    pub iat: i64,      // Issued at
    pub exp: i64,      // Expiration time
}

/// Identity asserted by a verified token, rebuilt on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject: String,
    pub email: String,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            email: claims.email,
        }
    }
}

/// HS256 codec bound to the process-wide signing secret.
///
/// Expiry is checked here rather than by `jsonwebtoken` so that the boundary
/// is exact (`now > exp` fails, no leeway) and callers can supply the clock.
/// The MAC comparison itself is constant-time inside `jsonwebtoken`.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn issue(&self, principal: &Principal, ttl: Duration) -> Result<String> {
        self.issue_at(principal, ttl, Utc::now())
    }

    pub fn issue_at(&self, principal: &Principal, ttl: Duration, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: principal.subject.clone(),
            email: principal.email.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::InternalError(format!("Failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> std::result::Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)?.claims;

        if claims.sub.is_empty() || claims.email.is_empty() {
            return Err(TokenError::Malformed);
        }
        if now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn alice() -> Principal {
        Principal {
            subject: "6f1c2b1e-0000-4000-8000-000000000001".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    #[test]
    fn test_round_trip_until_expiry() {
        let codec = TokenCodec::new(b"test_secret");
        let now = Utc::now();
        let token = assert_ok!(codec.issue_at(&alice(), Duration::hours(1), now));

        let claims = assert_ok!(codec.verify_at(&token, now));
        assert_eq!(claims.sub, alice().subject);
        assert_eq!(claims.email, alice().email);
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, (now + Duration::hours(1)).timestamp());
        assert_eq!(Principal::from(claims), alice());

        // Still valid at the exact expiry second.
        assert_ok!(codec.verify_at(&token, now + Duration::hours(1)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let codec = TokenCodec::new(b"test_secret");
        let now = Utc::now();
        let token = codec.issue_at(&alice(), Duration::hours(1), now).unwrap();

        let err = assert_err!(codec.verify_at(&token, now + Duration::hours(1) + Duration::seconds(1)));
        assert_eq!(err, TokenError::Expired);

        let stale = codec
            .issue_at(&alice(), Duration::hours(1), Utc::now() - Duration::hours(2))
            .unwrap();
        assert_eq!(codec.verify(&stale), Err(TokenError::Expired));
    }

    #[test]
    fn test_other_secret_fails_signature() {
        let issuer = TokenCodec::new(b"test_secret");
        let verifier = TokenCodec::new(b"another_secret");
        let token = issuer.issue(&alice(), Duration::hours(1)).unwrap();

        assert_eq!(verifier.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_tampered_payload_fails_signature() {
        let codec = TokenCodec::new(b"test_secret");
        let token = codec.issue(&alice(), Duration::hours(1)).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let mut payload: Vec<u8> = parts[1].bytes().collect();
        payload[4] = if payload[4] == b'A' { b'B' } else { b'A' };
        let tampered = format!("{}.{}.{}", parts[0], String::from_utf8(payload).unwrap(), parts[2]);

        assert_eq!(codec.verify(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = TokenCodec::new(b"test_secret");
        assert_eq!(codec.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(codec.verify("a.b.c"), Err(TokenError::Malformed));
        assert_eq!(codec.verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn test_signed_but_incomplete_claims_are_malformed() {
        #[derive(Serialize)]
        struct Partial {
            sub: String,
            exp: i64,
        }

        let secret = b"test_secret";
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Partial {
                sub: "someone".to_string(),
                exp: (Utc::now() + Duration::hours(1)).timestamp(),
            },
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        let codec = TokenCodec::new(secret);
        assert_eq!(codec.verify(&token), Err(TokenError::Malformed));
    }
}
