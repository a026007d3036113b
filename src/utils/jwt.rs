use crate::error::{AppError, AppResult};
use crate::models::Operator;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";

/// Claims of a staff access token issued by the auth provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // operator id
    #[serde(default)]
    pub email: Option<String>,
    pub role: String, // "admin" or "staff"
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn into_operator(self) -> AppResult<Operator> {
        let is_admin = match self.role.as_str() {
            ROLE_ADMIN => true,
            ROLE_STAFF => false,
            other => {
                return Err(AppError::AuthError(format!("Unknown role: {other}")));
            }
        };
        Ok(Operator {
            id: self.sub,
            email: self.email,
            is_admin,
        })
    }
}

#[derive(Clone)]
pub struct JwtService {
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<Operator> {
        let claims = self.verify_token(token)?;
        if claims.sub.trim().is_empty() {
            return Err(AppError::AuthError("Token has no subject".to_string()));
        }
        claims.into_operator()
    }
}
