use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::models::StockShortfall;
use crate::payment::PaymentError;
use crate::repo::RepoError;

/// Uniform JSON error body. `code` carries a machine-readable discriminator
/// where clients need to branch (payment gateway states); `fields` carries
/// per-field validation detail; `shortfalls` the itemized stock deficits of
/// a rejected checkout.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfalls: Option<Vec<StockShortfall>>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("bad request")]
    BadRequest,
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("insufficient stock")]
    OutOfStock(Vec<StockShortfall>),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("payment gateway not configured")]
    PaymentNotConfigured,
    #[error("payment gateway error")]
    PaymentGateway,
    #[error("internal error")]
    Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Conflict => ApiError::Conflict,
            RepoError::Internal(msg) => {
                log::error!("repo error: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::NotConfigured => ApiError::PaymentNotConfigured,
            PaymentError::Gateway(msg) => {
                log::error!("payment gateway error: {msg}");
                ApiError::PaymentGateway
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errs: validator::ValidationErrors) -> Self {
        let fields = errs
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        ApiError::Validation(fields)
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::BadRequest | ApiError::Validation(_) | ApiError::OutOfStock(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::PaymentNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::PaymentGateway => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let code = match self {
            ApiError::PaymentNotConfigured => Some("payment_gateway_not_configured".to_string()),
            ApiError::PaymentGateway => Some("payment_gateway_error".to_string()),
            ApiError::OutOfStock(_) => Some("insufficient_stock".to_string()),
            _ => None,
        };
        let fields = match self {
            ApiError::Validation(f) => Some(f.clone()),
            _ => None,
        };
        let shortfalls = match self {
            ApiError::OutOfStock(s) => Some(s.clone()),
            _ => None,
        };
        HttpResponse::build(status).json(ApiErrorBody {
            error: self.to_string(),
            code,
            fields,
            shortfalls,
        })
    }
}
