#![cfg(feature = "inmem-store")]

use std::sync::Arc;

use actix_web::{test, App};
use bazaar::repo::inmem::InMemRepo;
use bazaar::{config, AppState, SecurityHeaders};
use serial_test::serial;

fn setup_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    std::env::set_var("BOOTSTRAP_ADMIN_EMAILS", "admin@example.com");
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("BAZAAR_DATA_DIR", tmp.path().to_str().unwrap());
}

fn state() -> AppState {
    AppState {
        repo: Arc::new(InMemRepo::new()),
        gateway: None,
        rate_limiter: None,
    }
}

async fn register(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
    email: &str,
    name: &str,
) -> (String, i64) {
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(&serde_json::json!({
            "email": email, "name": name, "password": "hunter2hunter2"
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_i64().unwrap(),
    )
}

#[actix_web::test]
#[serial]
async fn test_storefront_checkout_flow() {
    setup_env();
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::from_env())
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let (admin, _) = register(&app, "admin@example.com", "Admin").await;
    let (user, _) = register(&app, "shopper@example.com", "Shopper").await;

    // category + products (admin)
    let req = test::TestRequest::post()
        .uri("/api/v1/categories")
        .insert_header(("Authorization", format!("Bearer {admin}")))
        .set_json(&serde_json::json!({"slug":"tools","name":"Tools"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let req = test::TestRequest::post()
        .uri("/api/v1/products")
        .insert_header(("Authorization", format!("Bearer {admin}")))
        .set_json(&serde_json::json!({
            "name":"Hammer","description":"claw hammer","price":"10.00","stock":5
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let hammer: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let hammer_id = hammer["id"].as_i64().unwrap();
    assert_eq!(hammer["price"], "10.00");

    let req = test::TestRequest::post()
        .uri("/api/v1/products")
        .insert_header(("Authorization", format!("Bearer {admin}")))
        .set_json(&serde_json::json!({
            "name":"Nails","description":"box of nails","price":"5.00","stock":2,
            "seller":"acme"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let nails: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let nails_id = nails["id"].as_i64().unwrap();

    // non-admin cannot create products
    let req = test::TestRequest::post()
        .uri("/api/v1/products")
        .insert_header(("Authorization", format!("Bearer {user}")))
        .set_json(&serde_json::json!({
            "name":"X","description":"","price":"1.00","stock":1
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // search
    let req = test::TestRequest::get()
        .uri("/api/v1/products?q=hamm")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let found: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(found.as_array().unwrap().len(), 1);

    // over-ordering is rejected with itemized shortfalls, nothing persisted
    let req = test::TestRequest::post()
        .uri("/api/v1/orders")
        .insert_header(("Authorization", format!("Bearer {user}")))
        .set_json(&serde_json::json!({
            "items": [
                {"product_id": hammer_id, "quantity": 2},
                {"product_id": nails_id, "quantity": 3}
            ]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(body["code"], "insufficient_stock");
    let shortfalls = body["shortfalls"].as_array().unwrap();
    assert_eq!(shortfalls.len(), 1);
    assert_eq!(shortfalls[0]["product_id"].as_i64().unwrap(), nails_id);
    assert_eq!(shortfalls[0]["requested"], 3);
    assert_eq!(shortfalls[0]["available"], 2);

    // stock untouched by the rejected checkout
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/products/{hammer_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let p: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(p["stock"], 5);

    // valid checkout: $10 x 2 + $5 x 1, flat 10.00 shipping
    let req = test::TestRequest::post()
        .uri("/api/v1/orders")
        .insert_header(("Authorization", format!("Bearer {user}")))
        .set_json(&serde_json::json!({
            "items": [
                {"product_id": hammer_id, "quantity": 2},
                {"product_id": nails_id, "quantity": 1}
            ]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let order: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let order_id = order["id"].as_i64().unwrap();
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["subtotal"], "25.00");
    assert_eq!(order["shipping"], "10.00");
    assert_eq!(order["total"], "35.00");
    // one sub-order per seller, price snapshots on items
    assert_eq!(order["sub_orders"].as_array().unwrap().len(), 2);
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(order["items"][0]["product_name"], "Hammer");
    assert_eq!(order["items"][0]["unit_price"], "10.00");

    // stock decremented
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/products/{hammer_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let p: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(p["stock"], 3);

    // another user cannot read this order
    let (stranger, _) = register(&app, "other@example.com", "Other").await;
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/orders/{order_id}"))
        .insert_header(("Authorization", format!("Bearer {stranger}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // admin sees every order; user only their own
    let req = test::TestRequest::get()
        .uri("/api/v1/orders")
        .insert_header(("Authorization", format!("Bearer {admin}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let all: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(all.as_array().unwrap().len(), 1);
    let req = test::TestRequest::get()
        .uri("/api/v1/orders")
        .insert_header(("Authorization", format!("Bearer {stranger}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let none: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(none.as_array().unwrap().len(), 0);

    // cancel restores stock
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/orders/{order_id}/cancel"))
        .insert_header(("Authorization", format!("Bearer {user}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let cancelled: serde_json::Value =
        serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(cancelled["status"], "CANCELLED");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/products/{hammer_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let p: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(p["stock"], 5);

    // cancelling again conflicts
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/orders/{order_id}/cancel"))
        .insert_header(("Authorization", format!("Bearer {user}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);
}

#[actix_web::test]
#[serial]
async fn test_returns_require_delivered_order() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let (admin, _) = register(&app, "admin@example.com", "Admin").await;
    let (user, _) = register(&app, "buyer@example.com", "Buyer").await;

    let req = test::TestRequest::post()
        .uri("/api/v1/products")
        .insert_header(("Authorization", format!("Bearer {admin}")))
        .set_json(&serde_json::json!({
            "name":"Lamp","description":"desk lamp","price":"30.00","stock":3
        }))
        .to_request();
    let lamp: serde_json::Value =
        serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await)
            .unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/orders")
        .insert_header(("Authorization", format!("Bearer {user}")))
        .set_json(&serde_json::json!({
            "items": [{"product_id": lamp["id"], "quantity": 1}]
        }))
        .to_request();
    let order: serde_json::Value =
        serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await)
            .unwrap();
    let order_id = order["id"].as_i64().unwrap();
    let item_id = order["items"][0]["id"].as_i64().unwrap();

    // not delivered yet
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/orders/{order_id}/returns"))
        .insert_header(("Authorization", format!("Bearer {user}")))
        .set_json(&serde_json::json!({"order_item_id": item_id, "reason": "broken"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    // admin advances the order to DELIVERED
    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/admin/orders/{order_id}/status"))
        .insert_header(("Authorization", format!("Bearer {admin}")))
        .set_json(&serde_json::json!({"status": "DELIVERED"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/orders/{order_id}/returns"))
        .insert_header(("Authorization", format!("Bearer {user}")))
        .set_json(&serde_json::json!({"order_item_id": item_id, "reason": "broken"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let ret: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(ret["status"], "REQUESTED");
    let ret_id = ret["id"].as_i64().unwrap();

    // second return for the same item conflicts
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/orders/{order_id}/returns"))
        .insert_header(("Authorization", format!("Bearer {user}")))
        .set_json(&serde_json::json!({"order_item_id": item_id, "reason": "again"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    // admin approves
    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/admin/returns/{ret_id}"))
        .insert_header(("Authorization", format!("Bearer {admin}")))
        .set_json(&serde_json::json!({"status": "APPROVED"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let upd: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(upd["status"], "APPROVED");
}

#[actix_web::test]
#[serial]
async fn test_wishlist_and_stats() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let (admin, _) = register(&app, "admin@example.com", "Admin").await;
    let (user, _) = register(&app, "fan@example.com", "Fan").await;

    let req = test::TestRequest::post()
        .uri("/api/v1/products")
        .insert_header(("Authorization", format!("Bearer {admin}")))
        .set_json(&serde_json::json!({
            "name":"Mug","description":"","price":"8.00","stock":10
        }))
        .to_request();
    let mug: serde_json::Value =
        serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await)
            .unwrap();
    let mug_id = mug["id"].as_i64().unwrap();

    // add twice, still one entry
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/v1/wishlist")
            .insert_header(("Authorization", format!("Bearer {user}")))
            .set_json(&serde_json::json!({"product_id": mug_id}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
    }
    let req = test::TestRequest::get()
        .uri("/api/v1/wishlist")
        .insert_header(("Authorization", format!("Bearer {user}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let list: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "Mug");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/wishlist/{mug_id}"))
        .insert_header(("Authorization", format!("Bearer {user}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    // stats are admin only
    let req = test::TestRequest::get()
        .uri("/api/v1/admin/stats")
        .insert_header(("Authorization", format!("Bearer {user}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/stats")
        .insert_header(("Authorization", format!("Bearer {admin}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let stats: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(stats["users"], 2);
    assert_eq!(stats["products"], 1);
    assert_eq!(stats["revenue"], "0");
}
