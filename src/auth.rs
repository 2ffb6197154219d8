use actix_web::{dev::Payload, Error, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::{ready, Ready};

use crate::models::Id;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "postgres-store", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres-store",
    sqlx(type_name = "user_role", rename_all = "lowercase")
)]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub roles: Vec<Role>,
    /// "access" or "refresh"; the Auth extractor only accepts access tokens.
    pub token_use: String,
}

fn jwt_secret() -> Vec<u8> {
    env::var("JWT_SECRET")
        .expect("JWT_SECRET not set")
        .into_bytes()
}

fn decode_jwt(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(&jwt_secret()), &validation)?;
    Ok(data.claims)
}

/// Extractor yielding validated access-token `Claims`.
pub struct Auth(pub Claims);

impl Auth {
    pub fn is_admin(&self) -> bool {
        self.0.roles.iter().any(|r| matches!(r, Role::Admin))
    }

    /// The authenticated user's id (`sub` claim).
    pub fn user_id(&self) -> Result<Id, crate::error::ApiError> {
        self.0
            .sub
            .parse()
            .map_err(|_| crate::error::ApiError::Unauthorized)
    }
}

impl FromRequest for Auth {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        // Delegate to BearerAuth to parse the header.
        if let Ok(bearer) = BearerAuth::from_request(req, pl).into_inner() {
            match decode_jwt(bearer.token()) {
                Ok(claims) if claims.token_use == "access" => {
                    return ready(Ok(Auth(claims)))
                }
                Ok(_) => {
                    return ready(Err(actix_web::error::ErrorUnauthorized(
                        "Refresh token not accepted here",
                    )))
                }
                Err(_) => return ready(Err(actix_web::error::ErrorUnauthorized("Invalid JWT"))),
            }
        }
        ready(Err(actix_web::error::ErrorUnauthorized(
            "Authorization required",
        )))
    }
}

const ACCESS_TOKEN_HOURS: i64 = 1;
const REFRESH_TOKEN_DAYS: i64 = 7;

fn create_token(
    user_id: Id,
    roles: Vec<Role>,
    token_use: &str,
    lifetime: chrono::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(lifetime)
        .expect("valid timestamp")
        .timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
        roles,
        token_use: token_use.to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(&jwt_secret()),
    )
}

pub fn create_access_token(
    user_id: Id,
    roles: Vec<Role>,
) -> Result<String, jsonwebtoken::errors::Error> {
    create_token(user_id, roles, "access", chrono::Duration::hours(ACCESS_TOKEN_HOURS))
}

pub fn create_refresh_token(
    user_id: Id,
    roles: Vec<Role>,
) -> Result<String, jsonwebtoken::errors::Error> {
    create_token(user_id, roles, "refresh", chrono::Duration::days(REFRESH_TOKEN_DAYS))
}

/// Validate a refresh token and return its claims; access tokens are rejected.
pub fn decode_refresh_token(token: &str) -> Result<Claims, crate::error::ApiError> {
    match decode_jwt(token) {
        Ok(claims) if claims.token_use == "refresh" => Ok(claims),
        _ => Err(crate::error::ApiError::Unauthorized),
    }
}

pub fn hash_password(password: &str) -> Result<String, crate::error::ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            log::error!("password hash failure: {e}");
            crate::error::ApiError::Internal
        })
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
