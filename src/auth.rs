use actix_web::{dev::Payload, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::{ready, Ready};

use crate::error::ApiError;

pub const SECRET_ENV: &str = "ACCESS_SECRET";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

fn secret() -> Result<String, ApiError> {
    env::var(SECRET_ENV).map_err(|_| {
        log::error!("{SECRET_ENV} not set; rejecting authenticated request");
        ApiError::Internal
    })
}

/// Validate an access token and return its claims.
fn decode_token(token: &str) -> Result<Claims, ApiError> {
    let secret = secret()?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthorized)
}

/// Extractor yielding validated `Claims`.
pub struct Auth(pub Claims);

impl Auth {
    pub fn subject(&self) -> &str {
        &self.0.sub
    }
}

impl FromRequest for Auth {
    type Error = ApiError;
    type Future = Ready<Result<Self, ApiError>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        // Delegate to BearerAuth to parse the header.
        match BearerAuth::from_request(req, pl).into_inner() {
            Ok(bearer) => ready(decode_token(bearer.token()).map(Auth)),
            Err(_) => ready(Err(ApiError::Unauthorized)),
        }
    }
}

/// Issue an access token for `subject`, valid for `ttl`.
pub fn issue_token(subject: &str, ttl: chrono::Duration) -> Result<String, ApiError> {
    let secret = secret()?;
    let exp = chrono::Utc::now()
        .checked_add_signed(ttl)
        .ok_or(ApiError::Internal)?
        .timestamp() as usize;
    let claims = Claims { sub: subject.to_string(), exp };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).map_err(|e| {
        log::error!("token encoding failed: {e}");
        ApiError::Internal
    })
}
