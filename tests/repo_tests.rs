#![cfg(feature = "inmem-store")]

use bazaar::auth::Role;
use bazaar::models::{NewProduct, OrderDraft, OrderDraftLine, OrderStatus};
use bazaar::repo::inmem::InMemRepo;
use bazaar::repo::{OrderRepo, ProductRepo, RepoError, UserRepo, WishlistRepo};
use serial_test::serial;

fn setup_env() -> tempfile::TempDir {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("BAZAAR_DATA_DIR", tmp.path().to_str().unwrap());
    tmp
}

fn widget(stock: i32) -> NewProduct {
    NewProduct {
        name: "Widget".into(),
        description: String::new(),
        price: "10.00".parse().unwrap(),
        stock,
        seller: "house".into(),
        images: vec![],
        features: vec![],
        category_id: None,
    }
}

fn draft_for(user_id: i64, product: &bazaar::models::Product, quantity: i32) -> OrderDraft {
    let line_total = product.price * rust_decimal::Decimal::from(quantity);
    OrderDraft {
        user_id,
        lines: vec![OrderDraftLine {
            product_id: product.id,
            product_name: product.name.clone(),
            seller: product.seller.clone(),
            unit_price: product.price,
            quantity,
        }],
        subtotal: line_total,
        shipping: "10.00".parse().unwrap(),
        total: line_total + "10.00".parse::<rust_decimal::Decimal>().unwrap(),
    }
}

#[tokio::test]
#[serial]
async fn snapshot_survives_restart() {
    let _tmp = setup_env();
    let repo = InMemRepo::new();
    let user = repo
        .create_user("a@example.com", "A", "hash", Role::User)
        .await
        .unwrap();
    repo.create_product(widget(3)).await.unwrap();

    // a fresh instance pointed at the same data dir reloads the state
    let reloaded = InMemRepo::new();
    let found = reloaded.get_user(user.id).await.unwrap();
    assert_eq!(found.email, "a@example.com");
    // credentials survive even though API serialization hides the hash
    assert_eq!(found.password_hash, "hash");
    let products = reloaded.list_products(None, None).await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].stock, 3);
}

#[tokio::test]
#[serial]
async fn order_creation_rejects_stale_stock() {
    let _tmp = setup_env();
    let repo = InMemRepo::new();
    let user = repo
        .create_user("b@example.com", "B", "hash", Role::User)
        .await
        .unwrap();
    let product = repo.create_product(widget(1)).await.unwrap();

    // a draft priced before someone else bought the last unit
    let stale = draft_for(user.id, &product, 1);
    repo.create_order(stale.clone()).await.unwrap();
    match repo.create_order(stale).await {
        Err(RepoError::Conflict) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
    // no decrement happened for the losing draft
    assert_eq!(repo.get_product(product.id).await.unwrap().stock, 0);
}

#[tokio::test]
#[serial]
async fn cancel_skips_missing_products() {
    let _tmp = setup_env();
    let repo = InMemRepo::new();
    let user = repo
        .create_user("c@example.com", "C", "hash", Role::User)
        .await
        .unwrap();
    let product = repo.create_product(widget(5)).await.unwrap();
    let detail = repo
        .create_order(draft_for(user.id, &product, 2))
        .await
        .unwrap();

    // the product disappears before the cancellation
    repo.delete_product(product.id).await.unwrap();
    let cancelled = repo.cancel_order(detail.order.id).await.unwrap();
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
}

#[tokio::test]
#[serial]
async fn cancel_requires_pending() {
    let _tmp = setup_env();
    let repo = InMemRepo::new();
    let user = repo
        .create_user("d@example.com", "D", "hash", Role::User)
        .await
        .unwrap();
    let product = repo.create_product(widget(5)).await.unwrap();
    let detail = repo
        .create_order(draft_for(user.id, &product, 1))
        .await
        .unwrap();
    repo.set_order_status(detail.order.id, OrderStatus::Shipped)
        .await
        .unwrap();
    match repo.cancel_order(detail.order.id).await {
        Err(RepoError::Conflict) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn wishlist_add_is_idempotent() {
    let _tmp = setup_env();
    let repo = InMemRepo::new();
    let user = repo
        .create_user("e@example.com", "E", "hash", Role::User)
        .await
        .unwrap();
    let product = repo.create_product(widget(1)).await.unwrap();
    let first = repo.add_wishlist(user.id, product.id).await.unwrap();
    let second = repo.add_wishlist(user.id, product.id).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(repo.list_wishlist(user.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn find_order_by_intent_roundtrip() {
    let _tmp = setup_env();
    let repo = InMemRepo::new();
    let user = repo
        .create_user("f@example.com", "F", "hash", Role::User)
        .await
        .unwrap();
    let product = repo.create_product(widget(2)).await.unwrap();
    let detail = repo
        .create_order(draft_for(user.id, &product, 1))
        .await
        .unwrap();
    repo.set_payment_intent(detail.order.id, "pi_abc").await.unwrap();
    let found = repo.find_order_by_intent("pi_abc").await.unwrap();
    assert_eq!(found.id, detail.order.id);
    assert!(matches!(
        repo.find_order_by_intent("pi_missing").await,
        Err(RepoError::NotFound)
    ));
}
