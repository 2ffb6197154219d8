use std::sync::Arc;

use actix_web::web;

use crate::payment::PaymentGateway;
use crate::rate_limit::RateLimiterFacade;
use crate::repo::Repo;

pub mod auth;
pub mod catalog;
pub mod content;
pub mod messages;
pub mod misc;
pub mod orders;
pub mod payments;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    /// `None` until STRIPE_SECRET_KEY is configured.
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub rate_limiter: Option<RateLimiterFacade>,
}

/// Admin-only guard used across handlers.
macro_rules! ensure_admin {
    ($auth:expr) => {
        if !$auth.is_admin() {
            return Err(crate::error::ApiError::Forbidden);
        }
    };
}
pub(crate) use ensure_admin;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            // auth
            .service(web::resource("/auth/register").route(web::post().to(auth::register)))
            .service(web::resource("/auth/login").route(web::post().to(auth::login)))
            .service(web::resource("/auth/refresh").route(web::post().to(auth::refresh)))
            .service(web::resource("/auth/me").route(web::get().to(auth::me)))
            // catalog
            .service(
                web::resource("/products")
                    .route(web::get().to(catalog::list_products))
                    .route(web::post().to(catalog::create_product)),
            )
            .service(
                web::resource("/products/{id}")
                    .route(web::get().to(catalog::get_product))
                    .route(web::put().to(catalog::update_product))
                    .route(web::delete().to(catalog::delete_product)),
            )
            .service(
                web::resource("/categories")
                    .route(web::get().to(catalog::list_categories))
                    .route(web::post().to(catalog::create_category)),
            )
            .service(
                web::resource("/categories/{id}")
                    .route(web::put().to(catalog::update_category))
                    .route(web::delete().to(catalog::delete_category)),
            )
            // orders
            .service(
                web::resource("/orders")
                    .route(web::get().to(orders::list_orders))
                    .route(web::post().to(orders::create_order)),
            )
            .service(web::resource("/orders/{id}").route(web::get().to(orders::get_order)))
            .service(
                web::resource("/orders/{id}/cancel").route(web::post().to(orders::cancel_order)),
            )
            .service(
                web::resource("/orders/{id}/returns")
                    .route(web::post().to(orders::create_return)),
            )
            .service(
                web::resource("/admin/orders/{id}/status")
                    .route(web::patch().to(orders::set_order_status)),
            )
            .service(web::resource("/admin/returns").route(web::get().to(orders::list_returns)))
            .service(
                web::resource("/admin/returns/{id}")
                    .route(web::patch().to(orders::set_return_status)),
            )
            // payments
            .service(
                web::resource("/orders/{id}/payment-intent")
                    .route(web::post().to(payments::create_payment_intent)),
            )
            .service(
                web::resource("/orders/{id}/payment-status")
                    .route(web::get().to(payments::payment_status)),
            )
            .service(
                web::resource("/payments/webhook").route(web::post().to(payments::webhook)),
            )
            // messaging
            .service(
                web::resource("/messages")
                    .route(web::get().to(messages::get_thread))
                    .route(web::post().to(messages::send_message)),
            )
            .service(
                web::resource("/messages/conversations")
                    .route(web::get().to(messages::list_conversations)),
            )
            .service(
                web::resource("/messages/{id}/seen")
                    .route(web::post().to(messages::mark_seen)),
            )
            .service(
                web::resource("/messages/{id}").route(web::delete().to(messages::delete_message)),
            )
            // content
            .service(
                web::resource("/blog")
                    .route(web::get().to(content::list_posts))
                    .route(web::post().to(content::create_post)),
            )
            .service(
                web::resource("/blog/{slug}")
                    .route(web::get().to(content::get_post))
                    .route(web::put().to(content::update_post))
                    .route(web::delete().to(content::delete_post)),
            )
            .service(
                web::resource("/services")
                    .route(web::get().to(content::list_services))
                    .route(web::post().to(content::create_service)),
            )
            .service(
                web::resource("/services/{id}")
                    .route(web::get().to(content::get_service))
                    .route(web::put().to(content::update_service))
                    .route(web::delete().to(content::delete_service)),
            )
            .service(
                web::resource("/projects")
                    .route(web::get().to(content::list_projects))
                    .route(web::post().to(content::create_project)),
            )
            .service(
                web::resource("/projects/{id}")
                    .route(web::get().to(content::get_project))
                    .route(web::put().to(content::update_project))
                    .route(web::delete().to(content::delete_project)),
            )
            // misc
            .service(
                web::resource("/contact")
                    .route(web::get().to(misc::list_contact))
                    .route(web::post().to(misc::submit_contact)),
            )
            .service(
                web::resource("/contact/{id}").route(web::delete().to(misc::delete_contact)),
            )
            .service(
                web::resource("/wishlist")
                    .route(web::get().to(misc::list_wishlist))
                    .route(web::post().to(misc::add_wishlist)),
            )
            .service(
                web::resource("/wishlist/{product_id}")
                    .route(web::delete().to(misc::remove_wishlist)),
            )
            .service(web::resource("/admin/stats").route(web::get().to(misc::admin_stats)))
            .service(web::resource("/health").route(web::get().to(misc::health))),
    );
}
