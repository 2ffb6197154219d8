#![cfg(feature = "inmem-store")]

use std::sync::Arc;

use actix_web::{test, App};
use bazaar::repo::inmem::InMemRepo;
use bazaar::{config, AppState};
use serde_json::json;
use serial_test::serial;

fn setup_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    std::env::set_var("BOOTSTRAP_ADMIN_EMAILS", "root@example.com");
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

#[actix_web::test]
#[serial]
async fn test_register_login_me() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(&json!({
            "email": "Ada@Example.com", "name": "Ada", "password": "hunter2hunter2"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    // email normalized, password hash never serialized
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["refresh_token"].as_str().unwrap().len() > 10);

    // duplicate email
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(&json!({
            "email": "ada@example.com", "name": "Ada", "password": "hunter2hunter2"
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    // wrong password
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(&json!({"email": "ada@example.com", "password": "wrongwrongwrong"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    // correct login, case-insensitive email
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(&json!({"email": "ADA@example.com", "password": "hunter2hunter2"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let me: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(me["name"], "Ada");
}

#[actix_web::test]
#[serial]
async fn test_refresh_token_flow() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(&json!({
            "email": "bob@example.com", "name": "Bob", "password": "hunter2hunter2"
        }))
        .to_request();
    let body: serde_json::Value =
        serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await)
            .unwrap();
    let access = body["token"].as_str().unwrap().to_string();
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    // a refresh token is not an access token
    let req = test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .insert_header(("Authorization", format!("Bearer {refresh}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    // and an access token cannot be refreshed
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(&json!({"refresh_token": access}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    // the real refresh mints a working access token
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(&json!({"refresh_token": refresh}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let minted = body["token"].as_str().unwrap().to_string();
    let req = test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .insert_header(("Authorization", format!("Bearer {minted}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}

#[actix_web::test]
#[serial]
async fn test_bootstrap_admin_email_gets_admin_role() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(&json!({
            "email": "root@example.com", "name": "Root", "password": "hunter2hunter2"
        }))
        .to_request();
    let body: serde_json::Value =
        serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await)
            .unwrap();
    assert_eq!(body["user"]["role"], "admin");
}

#[actix_web::test]
#[serial]
async fn test_validation_errors_are_itemized() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(&json!({"email": "nope", "name": "", "password": "short"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}
