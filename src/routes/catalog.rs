use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Id, NewCategory, NewProduct, UpdateProduct};
use crate::routes::{ensure_admin, AppState};

#[derive(serde::Deserialize, utoipa::IntoParams)]
pub struct ProductQuery {
    /// Filter by category slug.
    pub category: Option<String>,
    /// Case-insensitive substring search over name and description.
    pub q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "List products", body = [crate::models::Product]),
        (status = 404, description = "Unknown category")
    )
)]
pub async fn list_products(
    data: web::Data<AppState>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, ApiError> {
    let products = data
        .repo
        .list_products(query.category.as_deref(), query.q.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Id, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = crate::models::Product),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_product(
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let product = data.repo.get_product(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = NewProduct,
    responses(
        (status = 201, description = "Product created", body = crate::models::Product),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admins only")
    )
)]
pub async fn create_product(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewProduct>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    payload.validate()?;
    if payload.price.is_sign_negative() {
        return Err(ApiError::Validation(vec![crate::error::FieldError {
            field: "price".into(),
            message: "must not be negative".into(),
        }]));
    }
    let product = data.repo.create_product(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(product))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    request_body = UpdateProduct,
    params(("id" = Id, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product updated", body = crate::models::Product),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_product(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateProduct>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    payload.validate()?;
    if payload.price.map_or(false, |p| p.is_sign_negative()) {
        return Err(ApiError::Validation(vec![crate::error::FieldError {
            field: "price".into(),
            message: "must not be negative".into(),
        }]));
    }
    let product = data
        .repo
        .update_product(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(product))
}

pub async fn delete_product(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    data.repo.delete_product(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "List categories", body = [crate::models::Category]))
)]
pub async fn list_categories(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let categories = data.repo.list_categories().await?;
    Ok(HttpResponse::Ok().json(categories))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = NewCategory,
    responses(
        (status = 201, description = "Category created", body = crate::models::Category),
        (status = 409, description = "Slug already exists")
    )
)]
pub async fn create_category(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewCategory>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    payload.validate()?;
    let category = data.repo.create_category(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(category))
}

pub async fn update_category(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<NewCategory>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    payload.validate()?;
    let category = data
        .repo
        .update_category(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(category))
}

pub async fn delete_category(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    data.repo.delete_category(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
