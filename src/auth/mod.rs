use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
}

/// `aud` is either a single string or an array of strings (RFC 7519 4.1.3)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::One(a) => a == audience,
            Audience::Many(all) => all.iter().any(|a| a == audience),
        }
    }
}

impl From<String> for Audience {
    fn from(audience: String) -> Self {
        Audience::One(audience)
    }
}

impl Claims {
    pub fn new(sub: impl Into<String>, roles: Vec<String>, permissions: Vec<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: sub.into(),
            roles,
            permissions,
            exp,
            iat: Some(now.timestamp()),
            iss: None,
            aud: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// HS256 token verifier built once from the security settings
#[derive(Clone)]
pub struct JwtVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(security: &SecurityConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        if let Some(issuer) = &security.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }
        match &security.jwt_audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let key = (!security.jwt_secret.is_empty())
            .then(|| DecodingKey::from_secret(security.jwt_secret.as_bytes()));

        Self { key, validation }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let key = self.key.as_ref().ok_or(JwtError::InvalidSecret)?;

        decode::<Claims>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("token subject '{0}' is not a valid user id")]
pub struct InvalidSubject(pub String);

/// Identity of the caller for one request, derived from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub sub: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            sub: claims.sub,
            roles: claims.roles,
            permissions: claims.permissions,
        }
    }
}

impl AuthContext {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// An unscoped grant (`perm`) covers every scope; a scoped grant
    /// (`perm:scope`) covers only its own scope.
    pub fn has_permission(&self, permission: &str, scope: Option<&str>) -> bool {
        self.permissions.iter().any(|grant| match grant.split_once(':') {
            None => grant == permission,
            Some((name, granted_scope)) => {
                name == permission && scope.is_some_and(|s| s == granted_scope)
            }
        })
    }

    /// Integer user key bound to the stored procedures
    pub fn user_id(&self) -> Result<i32, InvalidSubject> {
        self.sub
            .trim()
            .parse()
            .map_err(|_| InvalidSubject(self.sub.clone()))
    }
}
