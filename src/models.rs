use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

pub type Id = i64;

// ---------------------------------------------------------------- users

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct User {
    pub id: Id,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    #[schema(value_type = String, format = Password)]
    pub password_hash: String,
    pub role: crate::auth::Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// ------------------------------------------------------------- catalog

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct Category {
    pub id: Id,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 64))]
    pub slug: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Id,
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    pub stock: i32,
    pub seller: String,
    pub images: Vec<String>,
    pub features: Vec<String>,
    pub category_id: Option<Id>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock: i32,
    #[serde(default = "default_seller")]
    pub seller: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub category_id: Option<Id>,
}

fn default_seller() -> String {
    "house".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub seller: Option<String>,
    pub images: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
    pub category_id: Option<Id>,
}

// -------------------------------------------------------------- orders

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "postgres-store", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres-store",
    sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum OrderStatus {
    Pending,
    Processed,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct Order {
    pub id: Id,
    pub user_id: Id,
    pub status: OrderStatus,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub shipping: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct SubOrder {
    pub id: Id,
    pub order_id: Id,
    pub seller: String,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: Id,
    pub order_id: Id,
    pub sub_order_id: Id,
    pub product_id: Id,
    pub product_name: String, // snapshot at purchase time
    #[schema(value_type = String)]
    pub unit_price: Decimal, // snapshot at purchase time
    pub quantity: i32,
}

/// Order plus its sub-orders and line items, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub sub_orders: Vec<SubOrder>,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewOrderLine {
    pub product_id: Id,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct NewOrder {
    #[validate(length(min = 1))]
    pub items: Vec<NewOrderLine>,
}

/// One line the repo persists: the resolved product snapshot.
#[derive(Debug, Clone)]
pub struct OrderDraftLine {
    pub product_id: Id,
    pub product_name: String,
    pub seller: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Fully priced order ready to be persisted atomically.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: Id,
    pub lines: Vec<OrderDraftLine>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Per-line stock deficit reported when a checkout is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StockShortfall {
    pub product_id: Id,
    pub requested: i32,
    pub available: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateOrderStatus {
    pub status: OrderStatus,
}

// ------------------------------------------------------------- returns

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "postgres-store", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres-store",
    sqlx(type_name = "return_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum ReturnStatus {
    Requested,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct ReturnRequest {
    pub id: Id,
    pub order_id: Id,
    pub order_item_id: Id,
    pub user_id: Id,
    pub reason: String,
    pub status: ReturnStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct NewReturnRequest {
    pub order_item_id: Id,
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateReturnStatus {
    pub status: ReturnStatus,
}

// ------------------------------------------------------------ messages

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct UserMessage {
    pub id: Id,
    pub user_id: Id,
    pub from_admin: bool,
    pub subject: String,
    pub body: String,
    pub seen: bool,
    pub deleted_for_user: bool,
    pub deleted_for_everyone: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct NewMessage {
    /// Target user; only honored (and required) for admin senders.
    pub user_id: Option<Id>,
    #[validate(length(min = 1, max = 300))]
    pub subject: String,
    #[validate(length(min = 1, max = 10000))]
    pub body: String,
}

/// Query-time grouping of messages sharing a normalized subject.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Conversation {
    pub user_id: Id,
    pub subject: String, // normalized
    pub message_count: usize,
    pub unread_count: usize,
    pub last_message: UserMessage,
}

// ------------------------------------------------------------- contact

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct ContactMessage {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct NewContactMessage {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 300))]
    pub subject: String,
    #[validate(length(min = 1, max = 10000))]
    pub body: String,
}

// ------------------------------------------------------------- content

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct BlogPost {
    pub id: Id,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct NewBlogPost {
    #[validate(length(min = 1, max = 200))]
    pub slug: String,
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    pub body: String,
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBlogPost {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct Service {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub features: Vec<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct NewService {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct Project {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct NewProject {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[validate(url)]
    pub url: Option<String>,
}

// ------------------------------------------------------------ wishlist

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct WishlistItem {
    pub id: Id,
    pub user_id: Id,
    pub product_id: Id,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewWishlistItem {
    pub product_id: Id,
}

// --------------------------------------------------------------- stats

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminStats {
    pub users: usize,
    pub products: usize,
    pub orders: usize,
    pub pending_orders: usize,
    #[schema(value_type = String)]
    pub revenue: Decimal,
    pub unread_messages: usize,
    pub contact_messages: usize,
}
