use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Id, NewContactMessage, NewWishlistItem};
use crate::routes::{ensure_admin, AppState};

// ------------------------------------------------------------- contact

#[utoipa::path(
    post,
    path = "/api/v1/contact",
    request_body = NewContactMessage,
    responses(
        (status = 201, description = "Message received", body = crate::models::ContactMessage),
        (status = 429, description = "Too many submissions from this address")
    )
)]
pub async fn submit_contact(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<NewContactMessage>,
) -> Result<HttpResponse, ApiError> {
    payload.validate()?;
    if let Some(rl) = &data.rate_limiter {
        let peer = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();
        if !rl.allow_contact(&peer) {
            log::warn!("contact form rate limited for {peer}");
            return Ok(HttpResponse::TooManyRequests()
                .json(serde_json::json!({"error": "rate limited"})));
        }
    }
    let msg = data.repo.create_contact(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(msg))
}

pub async fn list_contact(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    Ok(HttpResponse::Ok().json(data.repo.list_contact().await?))
}

pub async fn delete_contact(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    data.repo.delete_contact(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ------------------------------------------------------------ wishlist

#[utoipa::path(
    get,
    path = "/api/v1/wishlist",
    responses((status = 200, description = "The caller's wishlist, resolved to products", body = [crate::models::Product]))
)]
pub async fn list_wishlist(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let items = data.repo.list_wishlist(auth.user_id()?).await?;
    // products removed from the catalog silently drop out of the list
    let mut products = Vec::with_capacity(items.len());
    for item in items {
        if let Ok(product) = data.repo.get_product(item.product_id).await {
            products.push(product);
        }
    }
    Ok(HttpResponse::Ok().json(products))
}

#[utoipa::path(
    post,
    path = "/api/v1/wishlist",
    request_body = NewWishlistItem,
    responses(
        (status = 201, description = "Added (idempotent)", body = crate::models::WishlistItem),
        (status = 404, description = "Unknown product")
    )
)]
pub async fn add_wishlist(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewWishlistItem>,
) -> Result<HttpResponse, ApiError> {
    let user_id = auth.user_id()?;
    data.repo.get_product(payload.product_id).await?;
    let item = data.repo.add_wishlist(user_id, payload.product_id).await?;
    Ok(HttpResponse::Created().json(item))
}

pub async fn remove_wishlist(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    data.repo
        .remove_wishlist(auth.user_id()?, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

// --------------------------------------------------------------- admin

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    responses(
        (status = 200, description = "Dashboard counters", body = crate::models::AdminStats),
        (status = 403, description = "Admins only")
    )
)]
pub async fn admin_stats(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    Ok(HttpResponse::Ok().json(data.repo.admin_stats().await?))
}

// -------------------------------------------------------------- health

/// Liveness plus a configuration snapshot: which env vars are present,
/// never their values.
pub async fn health(data: web::Data<AppState>) -> HttpResponse {
    let present = |k: &str| std::env::var(k).is_ok();
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "gateway_configured": data.gateway.is_some(),
        "env": {
            "DATABASE_URL": present("DATABASE_URL"),
            "JWT_SECRET": present("JWT_SECRET"),
            "STRIPE_SECRET_KEY": present("STRIPE_SECRET_KEY"),
            "STRIPE_WEBHOOK_SECRET": present("STRIPE_WEBHOOK_SECRET"),
            "PUBLIC_APP_URL": present("PUBLIC_APP_URL"),
        }
    }))
}
