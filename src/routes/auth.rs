use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::auth::{
    create_access_token, create_refresh_token, decode_refresh_token, hash_password,
    verify_password, Auth, Role,
};
use crate::error::ApiError;
use crate::models::{LoginRequest, RegisterRequest, User};
use crate::routes::AppState;

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct TokenPairResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: User,
}

fn token_pair(user: User) -> Result<TokenPairResponse, ApiError> {
    let roles = vec![user.role];
    let token = create_access_token(user.id, roles.clone()).map_err(|_| ApiError::Internal)?;
    let refresh_token =
        create_refresh_token(user.id, roles).map_err(|_| ApiError::Internal)?;
    Ok(TokenPairResponse {
        token,
        refresh_token,
        user,
    })
}

fn bootstrap_role(email: &str) -> Role {
    let admins = std::env::var("BOOTSTRAP_ADMIN_EMAILS").unwrap_or_default();
    let is_admin = admins
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .any(|s| s.trim().eq_ignore_ascii_case(email));
    if is_admin {
        Role::Admin
    } else {
        Role::User
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = TokenPairResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    data: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    payload.validate()?;
    let hash = hash_password(&payload.password)?;
    let role = bootstrap_role(&payload.email);
    let user = data
        .repo
        .create_user(&payload.email, &payload.name, &hash, role)
        .await?;
    log::info!("registered user {} ({})", user.id, user.email);
    Ok(HttpResponse::Created().json(token_pair(user)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = TokenPairResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = data
        .repo
        .find_user_by_email(&payload.email)
        .await
        .map_err(|_| ApiError::Unauthorized)?;
    if !verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }
    Ok(HttpResponse::Ok().json(token_pair(user)?))
}

#[derive(serde::Deserialize, utoipa::ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token"),
        (status = 401, description = "Invalid refresh token")
    )
)]
pub async fn refresh(payload: web::Json<RefreshRequest>) -> Result<HttpResponse, ApiError> {
    let claims = decode_refresh_token(&payload.refresh_token)?;
    let user_id: i64 = claims.sub.parse().map_err(|_| ApiError::Unauthorized)?;
    let token =
        create_access_token(user_id, claims.roles).map_err(|_| ApiError::Internal)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "token": token })))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn me(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let user = data.repo.get_user(auth.user_id()?).await?;
    Ok(HttpResponse::Ok().json(user))
}
