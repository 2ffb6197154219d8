#![cfg(feature = "inmem-store")]

use std::sync::Arc;

use actix_web::{test, App};
use bazaar::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
use bazaar::repo::inmem::InMemRepo;
use bazaar::{config, AppState};
use serde_json::json;
use serial_test::serial;

fn setup_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    std::env::set_var("RL_CONTACT_LIMIT", "2");
    std::env::set_var("RL_CONTACT_WINDOW", "3600");
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("BAZAAR_DATA_DIR", tmp.path().to_str().unwrap());
}

#[actix_web::test]
#[serial]
async fn test_contact_form_rate_limited() {
    setup_env();
    let limiter = RateLimiterFacade::new(InMemoryRateLimiter::new(true), RateLimitConfig::from_env());
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(InMemRepo::new()),
                gateway: None,
                rate_limiter: Some(limiter),
            }))
            .configure(config),
    )
    .await;

    let payload = json!({
        "name": "Visitor", "email": "v@example.com",
        "subject": "Hi", "body": "a question"
    });
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/v1/contact")
            .set_json(&payload)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
    }
    let req = test::TestRequest::post()
        .uri("/api/v1/contact")
        .set_json(&payload)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 429);
}

#[actix_web::test]
#[serial]
async fn test_disabled_limiter_never_blocks() {
    setup_env();
    let limiter = RateLimiterFacade::new(InMemoryRateLimiter::new(false), RateLimitConfig::from_env());
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(InMemRepo::new()),
                gateway: None,
                rate_limiter: Some(limiter),
            }))
            .configure(config),
    )
    .await;

    let payload = json!({
        "name": "Visitor", "email": "v@example.com",
        "subject": "Hi", "body": "a question"
    });
    for _ in 0..5 {
        let req = test::TestRequest::post()
            .uri("/api/v1/contact")
            .set_json(&payload)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
    }
}
