use crate::auth::Role as AuthRole;
use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("internal: {0}")]
    Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
        role: AuthRole,
    ) -> RepoResult<User>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<User>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
}

#[async_trait]
pub trait ProductRepo: Send + Sync {
    async fn list_products(
        &self,
        category_slug: Option<&str>,
        search: Option<&str>,
    ) -> RepoResult<Vec<Product>>;
    async fn get_product(&self, id: Id) -> RepoResult<Product>;
    async fn create_product(&self, new: NewProduct) -> RepoResult<Product>;
    async fn update_product(&self, id: Id, upd: UpdateProduct) -> RepoResult<Product>;
    async fn delete_product(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait CategoryRepo: Send + Sync {
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn create_category(&self, new: NewCategory) -> RepoResult<Category>;
    async fn update_category(&self, id: Id, upd: NewCategory) -> RepoResult<Category>;
    async fn delete_category(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait OrderRepo: Send + Sync {
    /// Persist a priced draft atomically: re-checks and decrements stock,
    /// then writes the order, its per-seller sub-orders and its items.
    /// A stock race lost between pricing and persisting maps to `Conflict`.
    async fn create_order(&self, draft: OrderDraft) -> RepoResult<OrderDetail>;
    async fn get_order(&self, id: Id) -> RepoResult<OrderDetail>;
    /// `user_id = None` lists every order (admin view).
    async fn list_orders(&self, user_id: Option<Id>) -> RepoResult<Vec<Order>>;
    /// Cancel a PENDING order and restore stock for every item in one
    /// transaction. A single item whose product no longer exists is logged
    /// and skipped; the remaining restores and the cancellation still land.
    async fn cancel_order(&self, id: Id) -> RepoResult<OrderDetail>;
    async fn set_order_status(&self, id: Id, status: OrderStatus) -> RepoResult<Order>;
    async fn set_payment_intent(&self, id: Id, intent_id: &str) -> RepoResult<Order>;
    async fn find_order_by_intent(&self, intent_id: &str) -> RepoResult<Order>;
}

#[async_trait]
pub trait ReturnRepo: Send + Sync {
    async fn create_return(
        &self,
        order_id: Id,
        order_item_id: Id,
        user_id: Id,
        reason: &str,
    ) -> RepoResult<ReturnRequest>;
    async fn list_returns(&self) -> RepoResult<Vec<ReturnRequest>>;
    async fn set_return_status(&self, id: Id, status: ReturnStatus) -> RepoResult<ReturnRequest>;
}

#[async_trait]
pub trait MessageRepo: Send + Sync {
    async fn create_message(
        &self,
        user_id: Id,
        from_admin: bool,
        subject: &str,
        body: &str,
    ) -> RepoResult<UserMessage>;
    /// All messages, oldest first; `user_id = None` spans every user
    /// (admin view). Thread grouping is a query-time concern of the caller.
    async fn list_messages(&self, user_id: Option<Id>) -> RepoResult<Vec<UserMessage>>;
    async fn get_message(&self, id: Id) -> RepoResult<UserMessage>;
    async fn mark_message_seen(&self, id: Id) -> RepoResult<UserMessage>;
    async fn delete_message_for_user(&self, id: Id) -> RepoResult<UserMessage>;
    async fn delete_message_for_everyone(&self, id: Id) -> RepoResult<UserMessage>;
}

#[async_trait]
pub trait ContactRepo: Send + Sync {
    async fn create_contact(&self, new: NewContactMessage) -> RepoResult<ContactMessage>;
    async fn list_contact(&self) -> RepoResult<Vec<ContactMessage>>;
    async fn delete_contact(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait BlogRepo: Send + Sync {
    async fn list_posts(&self, include_unpublished: bool) -> RepoResult<Vec<BlogPost>>;
    async fn get_post_by_slug(&self, slug: &str) -> RepoResult<BlogPost>;
    async fn create_post(&self, new: NewBlogPost) -> RepoResult<BlogPost>;
    async fn update_post(&self, id: Id, upd: UpdateBlogPost) -> RepoResult<BlogPost>;
    async fn delete_post(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait ServiceRepo: Send + Sync {
    async fn list_services(&self) -> RepoResult<Vec<Service>>;
    async fn get_service(&self, id: Id) -> RepoResult<Service>;
    async fn create_service(&self, new: NewService) -> RepoResult<Service>;
    async fn update_service(&self, id: Id, upd: NewService) -> RepoResult<Service>;
    async fn delete_service(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait ProjectRepo: Send + Sync {
    async fn list_projects(&self) -> RepoResult<Vec<Project>>;
    async fn get_project(&self, id: Id) -> RepoResult<Project>;
    async fn create_project(&self, new: NewProject) -> RepoResult<Project>;
    async fn update_project(&self, id: Id, upd: NewProject) -> RepoResult<Project>;
    async fn delete_project(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait WishlistRepo: Send + Sync {
    async fn list_wishlist(&self, user_id: Id) -> RepoResult<Vec<WishlistItem>>;
    /// Idempotent: re-adding an existing product returns the existing row.
    async fn add_wishlist(&self, user_id: Id, product_id: Id) -> RepoResult<WishlistItem>;
    async fn remove_wishlist(&self, user_id: Id, product_id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait StatsRepo: Send + Sync {
    async fn admin_stats(&self) -> RepoResult<AdminStats>;
}

pub trait Repo:
    UserRepo
    + ProductRepo
    + CategoryRepo
    + OrderRepo
    + ReturnRepo
    + MessageRepo
    + ContactRepo
    + BlogRepo
    + ServiceRepo
    + ProjectRepo
    + WishlistRepo
    + StatsRepo
{
}

impl<T> Repo for T where
    T: UserRepo
        + ProductRepo
        + CategoryRepo
        + OrderRepo
        + ReturnRepo
        + MessageRepo
        + ContactRepo
        + BlogRepo
        + ServiceRepo
        + ProjectRepo
        + WishlistRepo
        + StatsRepo
{
}

#[cfg(feature = "inmem-store")]
pub mod inmem;

#[cfg(feature = "postgres-store")]
pub mod pg;
