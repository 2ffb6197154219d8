use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use validator::Validate;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{
    Id, NewOrder, NewReturnRequest, OrderDraft, OrderDraftLine, OrderStatus, StockShortfall,
    UpdateOrderStatus, UpdateReturnStatus,
};
use crate::routes::{ensure_admin, AppState};

/// Flat shipping applied to every order.
pub fn shipping_flat() -> Decimal {
    Decimal::new(1000, 2) // 10.00
}

/// subtotal = Σ unit_price × quantity; total = subtotal + flat shipping.
pub fn order_totals(lines: &[OrderDraftLine]) -> (Decimal, Decimal, Decimal) {
    let subtotal: Decimal = lines
        .iter()
        .map(|l| l.unit_price * Decimal::from(l.quantity))
        .sum();
    let shipping = shipping_flat();
    (subtotal, shipping, subtotal + shipping)
}

/// How long the cancellation transaction may run before we give up.
const CANCEL_TIMEOUT_SECS: u64 = 10;

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = NewOrder,
    responses(
        (status = 201, description = "Order placed", body = crate::models::OrderDetail),
        (status = 400, description = "Validation failed or insufficient stock (itemized shortfalls)"),
        (status = 404, description = "Unknown product")
    )
)]
pub async fn create_order(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewOrder>,
) -> Result<HttpResponse, ApiError> {
    let user_id = auth.user_id()?;
    payload.validate()?;
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_checkout(&user_id.to_string()) {
            return Ok(HttpResponse::TooManyRequests()
                .json(serde_json::json!({"error": "rate limited"})));
        }
    }

    let mut lines = Vec::with_capacity(payload.items.len());
    let mut shortfalls: Vec<StockShortfall> = Vec::new();
    for item in &payload.items {
        if item.quantity < 1 {
            return Err(ApiError::Validation(vec![crate::error::FieldError {
                field: "items".into(),
                message: format!("quantity for product {} must be at least 1", item.product_id),
            }]));
        }
        let product = data.repo.get_product(item.product_id).await?;
        if product.stock < item.quantity {
            shortfalls.push(StockShortfall {
                product_id: product.id,
                requested: item.quantity,
                available: product.stock,
            });
            continue;
        }
        lines.push(OrderDraftLine {
            product_id: product.id,
            product_name: product.name,
            seller: product.seller,
            unit_price: product.price,
            quantity: item.quantity,
        });
    }
    // any shortfall rejects the whole checkout; nothing is persisted
    if !shortfalls.is_empty() {
        return Err(ApiError::OutOfStock(shortfalls));
    }

    let (subtotal, shipping, total) = order_totals(&lines);
    let detail = data
        .repo
        .create_order(OrderDraft {
            user_id,
            lines,
            subtotal,
            shipping,
            total,
        })
        .await?;
    log::info!(
        "order {} placed by user {user_id}: total {}",
        detail.order.id,
        detail.order.total
    );
    Ok(HttpResponse::Created().json(detail))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses((status = 200, description = "Own orders; all orders for admins", body = [crate::models::Order]))
)]
pub async fn list_orders(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let scope = if auth.is_admin() {
        None
    } else {
        Some(auth.user_id()?)
    };
    let orders = data.repo.list_orders(scope).await?;
    Ok(HttpResponse::Ok().json(orders))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Id, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order detail", body = crate::models::OrderDetail),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_order(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let detail = data.repo.get_order(path.into_inner()).await?;
    if !auth.is_admin() && detail.order.user_id != auth.user_id()? {
        return Err(ApiError::Forbidden);
    }
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    params(("id" = Id, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order cancelled, stock restored", body = crate::models::OrderDetail),
        (status = 409, description = "Order is not PENDING")
    )
)]
pub async fn cancel_order(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let detail = data.repo.get_order(id).await?;
    if !auth.is_admin() && detail.order.user_id != auth.user_id()? {
        return Err(ApiError::Forbidden);
    }
    // bounded wait: a wedged transaction must not hold the request forever
    let cancelled = tokio::time::timeout(
        std::time::Duration::from_secs(CANCEL_TIMEOUT_SECS),
        data.repo.cancel_order(id),
    )
    .await
    .map_err(|_| {
        log::error!("cancel order {id}: timed out");
        ApiError::Internal
    })??;
    log::info!("order {id} cancelled, stock restored");
    Ok(HttpResponse::Ok().json(cancelled))
}

pub async fn set_order_status(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateOrderStatus>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    let order = data
        .repo
        .set_order_status(path.into_inner(), payload.status)
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/returns",
    request_body = NewReturnRequest,
    params(("id" = Id, Path, description = "Order id")),
    responses(
        (status = 201, description = "Return requested", body = crate::models::ReturnRequest),
        (status = 409, description = "Order not delivered or item already in a return")
    )
)]
pub async fn create_return(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<NewReturnRequest>,
) -> Result<HttpResponse, ApiError> {
    let user_id = auth.user_id()?;
    payload.validate()?;
    let order_id = path.into_inner();
    let detail = data.repo.get_order(order_id).await?;
    if detail.order.user_id != user_id && !auth.is_admin() {
        return Err(ApiError::Forbidden);
    }
    if detail.order.status != OrderStatus::Delivered {
        return Err(ApiError::Conflict);
    }
    let ret = data
        .repo
        .create_return(order_id, payload.order_item_id, user_id, &payload.reason)
        .await?;
    Ok(HttpResponse::Created().json(ret))
}

pub async fn list_returns(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    let returns = data.repo.list_returns().await?;
    Ok(HttpResponse::Ok().json(returns))
}

pub async fn set_return_status(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateReturnStatus>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    let ret = data
        .repo
        .set_return_status(path.into_inner(), payload.status)
        .await?;
    Ok(HttpResponse::Ok().json(ret))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: &str, quantity: i32) -> OrderDraftLine {
        OrderDraftLine {
            product_id: 1,
            product_name: "x".into(),
            seller: "house".into(),
            unit_price: price.parse().unwrap(),
            quantity,
        }
    }

    #[test]
    fn totals_match_worked_example() {
        // $10×2 + $5×1 => subtotal 25.00, total 35.00 with flat 10.00 shipping
        let lines = vec![line("10.00", 2), line("5.00", 1)];
        let (subtotal, shipping, total) = order_totals(&lines);
        assert_eq!(subtotal, "25.00".parse::<Decimal>().unwrap());
        assert_eq!(shipping, "10.00".parse::<Decimal>().unwrap());
        assert_eq!(total, "35.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn empty_order_is_just_shipping() {
        let (subtotal, _, total) = order_totals(&[]);
        assert_eq!(subtotal, Decimal::ZERO);
        assert_eq!(total, shipping_flat());
    }
}
