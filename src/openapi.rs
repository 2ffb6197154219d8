use utoipa::OpenApi;

use crate::models::{
    AdminStats, BlogPost, Category, ContactMessage, Conversation, LoginRequest, NewBlogPost,
    NewCategory, NewContactMessage, NewMessage, NewOrder, NewOrderLine, NewProduct, NewProject,
    NewReturnRequest, NewService, NewWishlistItem, Order, OrderDetail, OrderItem, Product,
    Project, RegisterRequest, ReturnRequest, Service, StockShortfall, SubOrder, UpdateProduct,
    User, UserMessage, WishlistItem,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::refresh,
        crate::routes::auth::me,
        crate::routes::catalog::list_products,
        crate::routes::catalog::get_product,
        crate::routes::catalog::create_product,
        crate::routes::catalog::update_product,
        crate::routes::catalog::list_categories,
        crate::routes::catalog::create_category,
        crate::routes::orders::create_order,
        crate::routes::orders::list_orders,
        crate::routes::orders::get_order,
        crate::routes::orders::cancel_order,
        crate::routes::orders::create_return,
        crate::routes::payments::create_payment_intent,
        crate::routes::payments::payment_status,
        crate::routes::messages::send_message,
        crate::routes::messages::list_conversations,
        crate::routes::messages::get_thread,
        crate::routes::content::list_posts,
        crate::routes::content::get_post,
        crate::routes::content::create_post,
        crate::routes::content::list_services,
        crate::routes::content::list_projects,
        crate::routes::misc::submit_contact,
        crate::routes::misc::list_wishlist,
        crate::routes::misc::add_wishlist,
        crate::routes::misc::admin_stats,
    ),
    components(schemas(
        User, RegisterRequest, LoginRequest, Category, NewCategory, Product, NewProduct, UpdateProduct,
        Order, SubOrder, OrderItem, OrderDetail, NewOrder, NewOrderLine, StockShortfall,
        ReturnRequest, NewReturnRequest,
        UserMessage, NewMessage, Conversation,
        ContactMessage, NewContactMessage,
        BlogPost, NewBlogPost, Service, NewService, Project, NewProject,
        WishlistItem, NewWishlistItem, AdminStats,
        crate::routes::auth::TokenPairResponse,
        crate::routes::auth::RefreshRequest,
        crate::error::FieldError,
    )),
    tags(
        (name = "auth", description = "Registration, login and token refresh"),
        (name = "catalog", description = "Products and categories"),
        (name = "orders", description = "Checkout, cancellation and returns"),
        (name = "payments", description = "Payment intents and webhooks"),
        (name = "messages", description = "User to admin messaging"),
        (name = "content", description = "Blog, services and projects"),
    )
)]
pub struct ApiDoc;
