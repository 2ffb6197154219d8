#![cfg(feature = "inmem-store")]

use std::sync::Arc;

use actix_web::{test, App};
use bazaar::repo::inmem::InMemRepo;
use bazaar::{config, AppState, SecurityHeaders};
use serial_test::serial;

fn setup_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("BAZAAR_DATA_DIR", tmp.path().to_str().unwrap());
}

#[actix_web::test]
#[serial]
async fn test_security_headers_present() {
    setup_env();
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::default())
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(InMemRepo::new()),
                gateway: None,
                rate_limiter: None,
            }))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("referrer-policy").unwrap(), "no-referrer");
    assert!(headers.get("content-security-policy").is_some());
    // HSTS only when opted in
    assert!(headers.get("strict-transport-security").is_none());
}

#[actix_web::test]
#[serial]
async fn test_hsts_opt_in() {
    setup_env();
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::default().with_hsts(true))
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(InMemRepo::new()),
                gateway: None,
                rate_limiter: None,
            }))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().get("strict-transport-security").is_some());
}
