#![cfg(feature = "inmem-store")]

use std::sync::Arc;

use actix_web::{test, App};
use bazaar::models::{OrderDraft, OrderDraftLine, OrderStatus};
use bazaar::payment::sign_webhook_payload;
use bazaar::repo::inmem::InMemRepo;
use bazaar::repo::{OrderRepo, ProductRepo, UserRepo};
use bazaar::{config, AppState};
use serial_test::serial;

const WEBHOOK_SECRET: &str = "whsec_test_secret";

fn setup_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    std::env::set_var("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET);
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("BAZAAR_DATA_DIR", tmp.path().to_str().unwrap());
}

async fn seed_pending_order(repo: &InMemRepo) -> i64 {
    let user = repo
        .create_user("buyer@example.com", "Buyer", "x", bazaar::auth::Role::User)
        .await
        .unwrap();
    let product = repo
        .create_product(bazaar::models::NewProduct {
            name: "Widget".into(),
            description: String::new(),
            price: "25.00".parse().unwrap(),
            stock: 10,
            seller: "house".into(),
            images: vec![],
            features: vec![],
            category_id: None,
        })
        .await
        .unwrap();
    let detail = repo
        .create_order(OrderDraft {
            user_id: user.id,
            lines: vec![OrderDraftLine {
                product_id: product.id,
                product_name: product.name.clone(),
                seller: product.seller.clone(),
                unit_price: product.price,
                quantity: 1,
            }],
            subtotal: "25.00".parse().unwrap(),
            shipping: "10.00".parse().unwrap(),
            total: "35.00".parse().unwrap(),
        })
        .await
        .unwrap();
    repo.set_payment_intent(detail.order.id, "pi_test_123")
        .await
        .unwrap();
    detail.order.id
}

fn event_body(event_type: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "type": event_type,
        "data": {"object": {"id": "pi_test_123", "metadata": {}}}
    }))
    .unwrap()
}

#[actix_web::test]
#[serial]
async fn test_signed_webhook_promotes_order() {
    setup_env();
    let repo = InMemRepo::new();
    let order_id = seed_pending_order(&repo).await;
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(repo.clone()),
                gateway: None,
                rate_limiter: None,
            }))
            .configure(config),
    )
    .await;

    let body = event_body("payment_intent.succeeded");
    let sig = sign_webhook_payload(&body, WEBHOOK_SECRET, chrono::Utc::now().timestamp());
    let req = test::TestRequest::post()
        .uri("/api/v1/payments/webhook")
        .insert_header(("Stripe-Signature", sig))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(v["received"], true);

    let detail = repo.get_order(order_id).await.unwrap();
    assert_eq!(detail.order.status, OrderStatus::Processed);
}

#[actix_web::test]
#[serial]
async fn test_checkout_session_event_promotes_order() {
    setup_env();
    let repo = InMemRepo::new();
    let order_id = seed_pending_order(&repo).await;
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(repo.clone()),
                gateway: None,
                rate_limiter: None,
            }))
            .configure(config),
    )
    .await;

    // session objects carry the intent in `payment_intent`
    let body = serde_json::to_vec(&serde_json::json!({
        "type": "checkout.session.completed",
        "data": {"object": {
            "id": "cs_1", "payment_intent": "pi_test_123",
            "metadata": {"order_id": order_id.to_string()}
        }}
    }))
    .unwrap();
    let sig = sign_webhook_payload(&body, WEBHOOK_SECRET, chrono::Utc::now().timestamp());
    let req = test::TestRequest::post()
        .uri("/api/v1/payments/webhook")
        .insert_header(("Stripe-Signature", sig))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    assert_eq!(
        repo.get_order(order_id).await.unwrap().order.status,
        OrderStatus::Processed
    );
}

#[actix_web::test]
#[serial]
async fn test_bad_signature_rejected_without_side_effects() {
    setup_env();
    let repo = InMemRepo::new();
    let order_id = seed_pending_order(&repo).await;
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(repo.clone()),
                gateway: None,
                rate_limiter: None,
            }))
            .configure(config),
    )
    .await;

    let body = event_body("payment_intent.succeeded");
    let sig = sign_webhook_payload(&body, "whsec_wrong_secret", chrono::Utc::now().timestamp());
    let req = test::TestRequest::post()
        .uri("/api/v1/payments/webhook")
        .insert_header(("Stripe-Signature", sig))
        .set_payload(body.clone())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // missing header is also a 400
    let req = test::TestRequest::post()
        .uri("/api/v1/payments/webhook")
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    assert_eq!(
        repo.get_order(order_id).await.unwrap().order.status,
        OrderStatus::Pending
    );
}

#[actix_web::test]
#[serial]
async fn test_unknown_event_type_acknowledged_and_ignored() {
    setup_env();
    let repo = InMemRepo::new();
    let order_id = seed_pending_order(&repo).await;
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(repo.clone()),
                gateway: None,
                rate_limiter: None,
            }))
            .configure(config),
    )
    .await;

    let body = event_body("invoice.finalized");
    let sig = sign_webhook_payload(&body, WEBHOOK_SECRET, chrono::Utc::now().timestamp());
    let req = test::TestRequest::post()
        .uri("/api/v1/payments/webhook")
        .insert_header(("Stripe-Signature", sig))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    assert_eq!(
        repo.get_order(order_id).await.unwrap().order.status,
        OrderStatus::Pending
    );
}
