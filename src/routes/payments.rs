use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Id, OrderStatus};
use crate::payment::{to_minor_units, verify_webhook_signature, WebhookEvent};
use crate::routes::AppState;

fn payment_currency() -> String {
    std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "usd".to_string())
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/payment-intent",
    params(("id" = Id, Path, description = "Order id")),
    responses(
        (status = 200, description = "Intent created or re-fetched; body carries the client secret"),
        (status = 409, description = "Order is not payable"),
        (status = 502, description = "Gateway rejected the request"),
        (status = 503, description = "No payment gateway configured")
    )
)]
pub async fn create_payment_intent(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let order_id = path.into_inner();
    let detail = data.repo.get_order(order_id).await?;
    if !auth.is_admin() && detail.order.user_id != auth.user_id()? {
        return Err(ApiError::Forbidden);
    }
    if detail.order.status != OrderStatus::Pending {
        return Err(ApiError::Conflict);
    }
    let gateway = data.gateway.as_ref().ok_or(ApiError::PaymentNotConfigured)?;

    // Re-requesting the intent for an order is idempotent: hand back the
    // one already attached instead of creating a second charge.
    let intent = match &detail.order.payment_intent_id {
        Some(existing) => gateway.retrieve_intent(existing).await?,
        None => {
            let amount = to_minor_units(detail.order.total).ok_or_else(|| {
                log::error!(
                    "order {order_id}: total {} does not fit minor units",
                    detail.order.total
                );
                ApiError::Internal
            })?;
            let intent = gateway
                .create_intent(amount, &payment_currency(), order_id)
                .await?;
            data.repo.set_payment_intent(order_id, &intent.id).await?;
            intent
        }
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "payment_intent_id": intent.id,
        "client_secret": intent.client_secret,
        "status": intent.status,
        "amount": intent.amount,
        "currency": intent.currency,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/payment-status",
    params(("id" = Id, Path, description = "Order id")),
    responses(
        (status = 200, description = "Gateway-reported status; a succeeded intent promotes the order"),
        (status = 404, description = "Order has no payment intent")
    )
)]
pub async fn payment_status(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let order_id = path.into_inner();
    let detail = data.repo.get_order(order_id).await?;
    if !auth.is_admin() && detail.order.user_id != auth.user_id()? {
        return Err(ApiError::Forbidden);
    }
    let intent_id = detail
        .order
        .payment_intent_id
        .as_deref()
        .ok_or(ApiError::NotFound)?;
    let gateway = data.gateway.as_ref().ok_or(ApiError::PaymentNotConfigured)?;
    let intent = gateway.retrieve_intent(intent_id).await?;

    // Polling fallback for lost webhooks.
    let mut order_status = detail.order.status;
    if intent.status == "succeeded" && order_status == OrderStatus::Pending {
        let updated = data
            .repo
            .set_order_status(order_id, OrderStatus::Processed)
            .await?;
        order_status = updated.status;
        log::info!("order {order_id} marked PROCESSED via status poll");
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "payment_status": intent.status,
        "order_status": order_status,
    })))
}

/// Stripe-style webhook receiver. The body must be read raw: the signature
/// covers the exact bytes on the wire.
pub async fn webhook(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let secret = std::env::var("STRIPE_WEBHOOK_SECRET").map_err(|_| {
        log::error!("webhook received but STRIPE_WEBHOOK_SECRET is not set");
        ApiError::PaymentNotConfigured
    })?;
    let header = req
        .headers()
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            log::warn!("webhook rejected: no Stripe-Signature header");
            ApiError::BadRequest
        })?;
    if !verify_webhook_signature(&body, header, &secret, chrono::Utc::now().timestamp()) {
        log::warn!("webhook rejected: bad signature");
        return Err(ApiError::BadRequest);
    }

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        log::warn!("webhook rejected: malformed event: {e}");
        ApiError::BadRequest
    })?;
    match event.event_type.as_str() {
        "checkout.session.completed" | "payment_intent.succeeded" => {
            let object = &event.data.object;
            let order = match data.repo.find_order_by_intent(object.intent_id()).await {
                Ok(order) => Some(order),
                // metadata fallback for sessions created before the intent
                // id was attached to the order
                Err(_) => match object.order_id() {
                    Some(id) => data.repo.get_order(id).await.ok().map(|d| d.order),
                    None => None,
                },
            };
            match order {
                Some(order) if order.status == OrderStatus::Pending => {
                    data.repo
                        .set_order_status(order.id, OrderStatus::Processed)
                        .await?;
                    log::info!(
                        "order {} marked PROCESSED via webhook ({})",
                        order.id,
                        event.event_type
                    );
                }
                Some(order) => {
                    // duplicate delivery; the order already moved on
                    log::debug!("webhook for order {} ignored: status {:?}", order.id, order.status);
                }
                None => {
                    log::warn!(
                        "webhook {} references unknown intent {}",
                        event.event_type,
                        event.data.object.intent_id()
                    );
                }
            }
        }
        other => {
            log::debug!("ignoring webhook event type {other}");
        }
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}
