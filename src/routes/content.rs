use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Id, NewBlogPost, NewProject, NewService, UpdateBlogPost};
use crate::routes::{ensure_admin, AppState};

// ----------------------------------------------------------------- blog

#[utoipa::path(
    get,
    path = "/api/v1/blog",
    responses((status = 200, description = "Published posts; drafts included for admins", body = [crate::models::BlogPost]))
)]
pub async fn list_posts(
    auth: Option<Auth>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let include_unpublished = auth.map_or(false, |a| a.is_admin());
    let posts = data.repo.list_posts(include_unpublished).await?;
    Ok(HttpResponse::Ok().json(posts))
}

#[utoipa::path(
    get,
    path = "/api/v1/blog/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post", body = crate::models::BlogPost),
        (status = 404, description = "Not found or unpublished")
    )
)]
pub async fn get_post(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let post = data.repo.get_post_by_slug(&path.into_inner()).await?;
    if !post.published && !auth.map_or(false, |a| a.is_admin()) {
        return Err(ApiError::NotFound);
    }
    Ok(HttpResponse::Ok().json(post))
}

#[utoipa::path(
    post,
    path = "/api/v1/blog",
    request_body = NewBlogPost,
    responses(
        (status = 201, description = "Post created", body = crate::models::BlogPost),
        (status = 409, description = "Slug already exists")
    )
)]
pub async fn create_post(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewBlogPost>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    payload.validate()?;
    let post = data.repo.create_post(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

pub async fn update_post(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateBlogPost>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    let existing = data.repo.get_post_by_slug(&path.into_inner()).await?;
    let post = data
        .repo
        .update_post(existing.id, payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn delete_post(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    let existing = data.repo.get_post_by_slug(&path.into_inner()).await?;
    data.repo.delete_post(existing.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ------------------------------------------------------------- services

#[utoipa::path(
    get,
    path = "/api/v1/services",
    responses((status = 200, description = "List services", body = [crate::models::Service]))
)]
pub async fn list_services(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.list_services().await?))
}

pub async fn get_service(
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.get_service(path.into_inner()).await?))
}

pub async fn create_service(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewService>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    payload.validate()?;
    let service = data.repo.create_service(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(service))
}

pub async fn update_service(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<NewService>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    payload.validate()?;
    let service = data
        .repo
        .update_service(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(service))
}

pub async fn delete_service(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    data.repo.delete_service(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ------------------------------------------------------------- projects

#[utoipa::path(
    get,
    path = "/api/v1/projects",
    responses((status = 200, description = "List projects", body = [crate::models::Project]))
)]
pub async fn list_projects(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.list_projects().await?))
}

pub async fn get_project(
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.get_project(path.into_inner()).await?))
}

pub async fn create_project(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewProject>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    payload.validate()?;
    let project = data.repo.create_project(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(project))
}

pub async fn update_project(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<NewProject>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    payload.validate()?;
    let project = data
        .repo
        .update_project(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(project))
}

pub async fn delete_project(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    data.repo.delete_project(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
