//! HS256 token encode/validate.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

/// Validator seam consumed by the HTTP middleware.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<JwtClaims, TokenValidationError>;
}

/// Symmetric HS256 signer/validator.
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256Jwt {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn encode(&self, claims: &JwtClaims) -> Result<String, TokenValidationError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenValidationError::Rejected(e.to_string()))
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    TokenValidationError::Expired
                }
                jsonwebtoken::errors::ErrorKind::ImmatureSignature => {
                    TokenValidationError::NotYetValid
                }
                _ => TokenValidationError::Rejected(e.to_string()),
            })?;
        // jsonwebtoken only checks `exp`; the claims window (iat/exp sanity)
        // is ours to enforce.
        validate_claims(&data.claims, Utc::now())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::{Duration, Utc};
    use railtrace_core::UserId;

    fn claims(ttl: Duration) -> JwtClaims {
        JwtClaims::new(UserId::new(), "inspector1", Role::Inspector, Utc::now(), ttl)
    }

    #[test]
    fn round_trip() {
        let jwt = Hs256Jwt::new(b"test-secret");
        let c = claims(Duration::minutes(10));
        let token = jwt.encode(&c).unwrap();
        let decoded = jwt.validate(&token).unwrap();
        assert_eq!(decoded, c);
    }

    #[test]
    fn rejects_wrong_secret() {
        let a = Hs256Jwt::new(b"secret-a");
        let b = Hs256Jwt::new(b"secret-b");
        let token = a.encode(&claims(Duration::minutes(10))).unwrap();
        assert!(b.validate(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let jwt = Hs256Jwt::new(b"test-secret");
        let mut c = claims(Duration::minutes(10));
        c.iat = (Utc::now() - Duration::hours(2)).timestamp();
        c.exp = (Utc::now() - Duration::hours(1)).timestamp();
        let token = jwt.encode(&c).unwrap();
        assert_eq!(jwt.validate(&token), Err(TokenValidationError::Expired));
    }

    #[test]
    fn rejects_token_issued_in_the_future() {
        let jwt = Hs256Jwt::new(b"test-secret");
        let mut c = claims(Duration::minutes(10));
        c.iat = (Utc::now() + Duration::hours(1)).timestamp();
        c.exp = (Utc::now() + Duration::hours(2)).timestamp();
        let token = jwt.encode(&c).unwrap();
        assert_eq!(jwt.validate(&token), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn rejects_inverted_claim_window() {
        let jwt = Hs256Jwt::new(b"test-secret");
        let mut c = claims(Duration::minutes(10));
        c.exp = c.iat;
        let token = jwt.encode(&c).unwrap();
        assert_eq!(
            jwt.validate(&token),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn rejects_garbage() {
        let jwt = Hs256Jwt::new(b"test-secret");
        assert!(matches!(
            jwt.validate("not.a.token"),
            Err(TokenValidationError::Rejected(_))
        ));
    }
}
