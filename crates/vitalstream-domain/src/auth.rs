use crate::error::{DomainError, DomainResult};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Identity extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub user_id: String,
    pub role: String,
}

/// Opaque "verify and extract identity" capability. Token issuance lives
/// outside this gateway.
#[cfg_attr(test, mockall::automock)]
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> DomainResult<Identity>;
}

/// Claims layout shared with the token issuer.
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub id: String,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
}

/// HS256 implementation of TokenVerifier.
pub struct JwtTokenVerifier {
    config: JwtConfig,
}

impl JwtTokenVerifier {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> DomainResult<Identity> {
        let token_data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| DomainError::InvalidToken(e.to_string()))?;

        Ok(Identity {
            subject: token_data.claims.sub,
            user_id: token_data.claims.id,
            role: token_data.claims.role,
        })
    }
}
