use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::*;
use crate::auth::Role as AuthRole;

const SNAPSHOT_PATH: &str = "data/state.json";

/// Snapshot form of a user. `User` skips `password_hash` when serialized
/// for API responses, so persisting it directly would drop every
/// credential; this record keeps the full row on disk.
#[derive(Clone, Serialize, Deserialize)]
struct StoredUser {
    id: Id,
    email: String,
    name: String,
    password_hash: String,
    role: AuthRole,
    created_at: DateTime<Utc>,
}

impl From<User> for StoredUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            password_hash: u.password_hash,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

impl From<StoredUser> for User {
    fn from(u: StoredUser) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            password_hash: u.password_hash,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
struct State {
    users: HashMap<Id, StoredUser>,
    categories: HashMap<Id, Category>,
    products: HashMap<Id, Product>,
    orders: HashMap<Id, Order>,
    sub_orders: HashMap<Id, SubOrder>,
    order_items: HashMap<Id, OrderItem>,
    returns: HashMap<Id, ReturnRequest>,
    messages: HashMap<Id, UserMessage>,
    contact: HashMap<Id, ContactMessage>,
    posts: HashMap<Id, BlogPost>,
    services: HashMap<Id, Service>,
    projects: HashMap<Id, Project>,
    wishlist: HashMap<Id, WishlistItem>,
    next_id: Id,
}

#[derive(Clone)]
pub struct InMemRepo {
    state: Arc<RwLock<State>>,
    snapshot_path: Arc<PathBuf>,
}

impl InMemRepo {
    fn data_dir() -> PathBuf {
        std::env::var("BAZAAR_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"))
    }

    fn snapshot_path() -> PathBuf {
        if std::env::var("BAZAAR_DATA_DIR").is_ok() {
            let mut p = Self::data_dir();
            p.push("state.json");
            p
        } else {
            PathBuf::from(SNAPSHOT_PATH)
        }
    }

    fn load_state_from(path: &Path) -> State {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                Ok(s) => {
                    log::info!("loaded snapshot '{}'", path.display());
                    s
                }
                Err(e) => {
                    log::warn!(
                        "failed to parse snapshot '{}': {e}. Starting empty.",
                        path.display()
                    );
                    State::default()
                }
            },
            Err(_) => State::default(),
        }
    }

    fn persist(&self) {
        let path = self.snapshot_path.clone();
        if let Ok(s) = serde_json::to_vec_pretty(&*self.state.read().unwrap()) {
            if let Some(dir) = path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            if let Err(e) = std::fs::write(&*path, s) {
                log::warn!("failed to write snapshot '{}': {e}", path.display());
            }
        }
    }

    pub fn new() -> Self {
        let snapshot_path = Self::snapshot_path();
        let state = Self::load_state_from(&snapshot_path);
        Self {
            state: Arc::new(RwLock::new(state)),
            snapshot_path: Arc::new(snapshot_path),
        }
    }

    fn next_id(state: &mut State) -> Id {
        state.next_id += 1;
        state.next_id
    }
}

impl Default for InMemRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepo for InMemRepo {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
        role: AuthRole,
    ) -> RepoResult<User> {
        let mut s = self.state.write().unwrap();
        if s.users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email))
        {
            return Err(RepoError::Conflict);
        }
        let id = Self::next_id(&mut s);
        let user = User {
            id,
            email: email.to_lowercase(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at: Utc::now(),
        };
        s.users.insert(id, user.clone().into());
        drop(s);
        self.persist();
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<User> {
        let s = self.state.read().unwrap();
        s.users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .map(User::from)
            .ok_or(RepoError::NotFound)
    }

    async fn get_user(&self, id: Id) -> RepoResult<User> {
        let s = self.state.read().unwrap();
        s.users
            .get(&id)
            .cloned()
            .map(User::from)
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl ProductRepo for InMemRepo {
    async fn list_products(
        &self,
        category_slug: Option<&str>,
        search: Option<&str>,
    ) -> RepoResult<Vec<Product>> {
        let s = self.state.read().unwrap();
        let category_id = match category_slug {
            Some(slug) => {
                let cat = s
                    .categories
                    .values()
                    .find(|c| c.slug == slug)
                    .ok_or(RepoError::NotFound)?;
                Some(cat.id)
            }
            None => None,
        };
        let needle = search.map(|q| q.to_lowercase());
        let mut v: Vec<_> = s
            .products
            .values()
            .filter(|p| category_id.map_or(true, |cid| p.category_id == Some(cid)))
            .filter(|p| {
                needle.as_ref().map_or(true, |q| {
                    p.name.to_lowercase().contains(q) || p.description.to_lowercase().contains(q)
                })
            })
            .cloned()
            .collect();
        v.sort_by_key(|p| p.id);
        Ok(v)
    }

    async fn get_product(&self, id: Id) -> RepoResult<Product> {
        let s = self.state.read().unwrap();
        s.products.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_product(&self, new: NewProduct) -> RepoResult<Product> {
        let mut s = self.state.write().unwrap();
        if let Some(cid) = new.category_id {
            if !s.categories.contains_key(&cid) {
                return Err(RepoError::NotFound);
            }
        }
        let id = Self::next_id(&mut s);
        let now = Utc::now();
        let product = Product {
            id,
            name: new.name,
            description: new.description,
            price: new.price,
            stock: new.stock,
            seller: new.seller,
            images: new.images,
            features: new.features,
            category_id: new.category_id,
            created_at: now,
            updated_at: now,
        };
        s.products.insert(id, product.clone());
        drop(s);
        self.persist();
        Ok(product)
    }

    async fn update_product(&self, id: Id, upd: UpdateProduct) -> RepoResult<Product> {
        let mut s = self.state.write().unwrap();
        if let Some(cid) = upd.category_id {
            if !s.categories.contains_key(&cid) {
                return Err(RepoError::NotFound);
            }
        }
        let product = s.products.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(name) = upd.name {
            product.name = name;
        }
        if let Some(description) = upd.description {
            product.description = description;
        }
        if let Some(price) = upd.price {
            product.price = price;
        }
        if let Some(stock) = upd.stock {
            product.stock = stock;
        }
        if let Some(seller) = upd.seller {
            product.seller = seller;
        }
        if let Some(images) = upd.images {
            product.images = images;
        }
        if let Some(features) = upd.features {
            product.features = features;
        }
        if let Some(cid) = upd.category_id {
            product.category_id = Some(cid);
        }
        product.updated_at = Utc::now();
        let updated = product.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }

    async fn delete_product(&self, id: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        if s.products.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        s.wishlist.retain(|_, w| w.product_id != id);
        drop(s);
        self.persist();
        Ok(())
    }
}

#[async_trait]
impl CategoryRepo for InMemRepo {
    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s.categories.values().cloned().collect();
        v.sort_by_key(|c| c.id);
        Ok(v)
    }

    async fn create_category(&self, new: NewCategory) -> RepoResult<Category> {
        let mut s = self.state.write().unwrap();
        if s.categories.values().any(|c| c.slug == new.slug) {
            return Err(RepoError::Conflict);
        }
        let id = Self::next_id(&mut s);
        let category = Category {
            id,
            slug: new.slug,
            name: new.name,
            created_at: Utc::now(),
        };
        s.categories.insert(id, category.clone());
        drop(s);
        self.persist();
        Ok(category)
    }

    async fn update_category(&self, id: Id, upd: NewCategory) -> RepoResult<Category> {
        let mut s = self.state.write().unwrap();
        // uniqueness check before the mutable borrow
        if s.categories
            .values()
            .any(|c| c.slug == upd.slug && c.id != id)
        {
            return Err(RepoError::Conflict);
        }
        let category = s.categories.get_mut(&id).ok_or(RepoError::NotFound)?;
        category.slug = upd.slug;
        category.name = upd.name;
        let updated = category.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }

    async fn delete_category(&self, id: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        if s.categories.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        // detach products rather than cascading
        for p in s.products.values_mut() {
            if p.category_id == Some(id) {
                p.category_id = None;
            }
        }
        drop(s);
        self.persist();
        Ok(())
    }
}

impl InMemRepo {
    fn order_detail_locked(s: &State, id: Id) -> RepoResult<OrderDetail> {
        let order = s.orders.get(&id).cloned().ok_or(RepoError::NotFound)?;
        let mut sub_orders: Vec<_> = s
            .sub_orders
            .values()
            .filter(|so| so.order_id == id)
            .cloned()
            .collect();
        sub_orders.sort_by_key(|so| so.id);
        let mut items: Vec<_> = s
            .order_items
            .values()
            .filter(|i| i.order_id == id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.id);
        Ok(OrderDetail {
            order,
            sub_orders,
            items,
        })
    }
}

#[async_trait]
impl OrderRepo for InMemRepo {
    async fn create_order(&self, draft: OrderDraft) -> RepoResult<OrderDetail> {
        let mut s = self.state.write().unwrap();
        // re-check stock under the write lock; the route's pre-check can race
        for line in &draft.lines {
            let product = s
                .products
                .get(&line.product_id)
                .ok_or(RepoError::NotFound)?;
            if product.stock < line.quantity {
                return Err(RepoError::Conflict);
            }
        }
        for line in &draft.lines {
            if let Some(p) = s.products.get_mut(&line.product_id) {
                p.stock -= line.quantity;
            }
        }
        let now = Utc::now();
        let order_id = Self::next_id(&mut s);
        let order = Order {
            id: order_id,
            user_id: draft.user_id,
            status: OrderStatus::Pending,
            subtotal: draft.subtotal,
            shipping: draft.shipping,
            total: draft.total,
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
        };
        s.orders.insert(order_id, order);

        // one sub-order per distinct seller, in first-seen order
        let mut seller_subs: Vec<(String, Id)> = Vec::new();
        for line in &draft.lines {
            let sub_id = match seller_subs.iter().find(|(seller, _)| *seller == line.seller) {
                Some((_, sub_id)) => *sub_id,
                None => {
                    let sub_id = Self::next_id(&mut s);
                    s.sub_orders.insert(
                        sub_id,
                        SubOrder {
                            id: sub_id,
                            order_id,
                            seller: line.seller.clone(),
                            subtotal: Decimal::ZERO,
                        },
                    );
                    seller_subs.push((line.seller.clone(), sub_id));
                    sub_id
                }
            };
            let line_total = line.unit_price * Decimal::from(line.quantity);
            if let Some(so) = s.sub_orders.get_mut(&sub_id) {
                so.subtotal += line_total;
            }
            let item_id = Self::next_id(&mut s);
            s.order_items.insert(
                item_id,
                OrderItem {
                    id: item_id,
                    order_id,
                    sub_order_id: sub_id,
                    product_id: line.product_id,
                    product_name: line.product_name.clone(),
                    unit_price: line.unit_price,
                    quantity: line.quantity,
                },
            );
        }
        let detail = Self::order_detail_locked(&s, order_id)?;
        drop(s);
        self.persist();
        Ok(detail)
    }

    async fn get_order(&self, id: Id) -> RepoResult<OrderDetail> {
        let s = self.state.read().unwrap();
        Self::order_detail_locked(&s, id)
    }

    async fn list_orders(&self, user_id: Option<Id>) -> RepoResult<Vec<Order>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s
            .orders
            .values()
            .filter(|o| user_id.map_or(true, |uid| o.user_id == uid))
            .cloned()
            .collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(v)
    }

    async fn cancel_order(&self, id: Id) -> RepoResult<OrderDetail> {
        let mut s = self.state.write().unwrap();
        let order = s.orders.get(&id).ok_or(RepoError::NotFound)?;
        if order.status != OrderStatus::Pending {
            return Err(RepoError::Conflict);
        }
        let items: Vec<OrderItem> = s
            .order_items
            .values()
            .filter(|i| i.order_id == id)
            .cloned()
            .collect();
        // per-item isolation: a missing product (deleted since purchase) is
        // logged and skipped, the rest still restore
        for item in &items {
            match s.products.get_mut(&item.product_id) {
                Some(p) => p.stock += item.quantity,
                None => log::warn!(
                    "cancel order {id}: product {} gone, skipping stock restore of {}",
                    item.product_id,
                    item.quantity
                ),
            }
        }
        if let Some(o) = s.orders.get_mut(&id) {
            o.status = OrderStatus::Cancelled;
            o.updated_at = Utc::now();
        }
        let detail = Self::order_detail_locked(&s, id)?;
        drop(s);
        self.persist();
        Ok(detail)
    }

    async fn set_order_status(&self, id: Id, status: OrderStatus) -> RepoResult<Order> {
        let mut s = self.state.write().unwrap();
        let order = s.orders.get_mut(&id).ok_or(RepoError::NotFound)?;
        order.status = status;
        order.updated_at = Utc::now();
        let updated = order.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }

    async fn set_payment_intent(&self, id: Id, intent_id: &str) -> RepoResult<Order> {
        let mut s = self.state.write().unwrap();
        let order = s.orders.get_mut(&id).ok_or(RepoError::NotFound)?;
        order.payment_intent_id = Some(intent_id.to_string());
        order.updated_at = Utc::now();
        let updated = order.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }

    async fn find_order_by_intent(&self, intent_id: &str) -> RepoResult<Order> {
        let s = self.state.read().unwrap();
        s.orders
            .values()
            .find(|o| o.payment_intent_id.as_deref() == Some(intent_id))
            .cloned()
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl ReturnRepo for InMemRepo {
    async fn create_return(
        &self,
        order_id: Id,
        order_item_id: Id,
        user_id: Id,
        reason: &str,
    ) -> RepoResult<ReturnRequest> {
        let mut s = self.state.write().unwrap();
        if !s
            .order_items
            .get(&order_item_id)
            .map_or(false, |i| i.order_id == order_id)
        {
            return Err(RepoError::NotFound);
        }
        if s.returns
            .values()
            .any(|r| r.order_item_id == order_item_id)
        {
            return Err(RepoError::Conflict);
        }
        let id = Self::next_id(&mut s);
        let ret = ReturnRequest {
            id,
            order_id,
            order_item_id,
            user_id,
            reason: reason.to_string(),
            status: ReturnStatus::Requested,
            created_at: Utc::now(),
        };
        s.returns.insert(id, ret.clone());
        drop(s);
        self.persist();
        Ok(ret)
    }

    async fn list_returns(&self) -> RepoResult<Vec<ReturnRequest>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s.returns.values().cloned().collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(v)
    }

    async fn set_return_status(&self, id: Id, status: ReturnStatus) -> RepoResult<ReturnRequest> {
        let mut s = self.state.write().unwrap();
        let ret = s.returns.get_mut(&id).ok_or(RepoError::NotFound)?;
        ret.status = status;
        let updated = ret.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }
}

#[async_trait]
impl MessageRepo for InMemRepo {
    async fn create_message(
        &self,
        user_id: Id,
        from_admin: bool,
        subject: &str,
        body: &str,
    ) -> RepoResult<UserMessage> {
        let mut s = self.state.write().unwrap();
        if !s.users.contains_key(&user_id) {
            return Err(RepoError::NotFound);
        }
        let id = Self::next_id(&mut s);
        let msg = UserMessage {
            id,
            user_id,
            from_admin,
            subject: subject.to_string(),
            body: body.to_string(),
            seen: false,
            deleted_for_user: false,
            deleted_for_everyone: false,
            created_at: Utc::now(),
        };
        s.messages.insert(id, msg.clone());
        drop(s);
        self.persist();
        Ok(msg)
    }

    async fn list_messages(&self, user_id: Option<Id>) -> RepoResult<Vec<UserMessage>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s
            .messages
            .values()
            .filter(|m| user_id.map_or(true, |uid| m.user_id == uid))
            .cloned()
            .collect();
        v.sort_by_key(|m| (m.created_at, m.id));
        Ok(v)
    }

    async fn get_message(&self, id: Id) -> RepoResult<UserMessage> {
        let s = self.state.read().unwrap();
        s.messages.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn mark_message_seen(&self, id: Id) -> RepoResult<UserMessage> {
        let mut s = self.state.write().unwrap();
        let msg = s.messages.get_mut(&id).ok_or(RepoError::NotFound)?;
        msg.seen = true;
        let updated = msg.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }

    async fn delete_message_for_user(&self, id: Id) -> RepoResult<UserMessage> {
        let mut s = self.state.write().unwrap();
        let msg = s.messages.get_mut(&id).ok_or(RepoError::NotFound)?;
        msg.deleted_for_user = true;
        let updated = msg.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }

    async fn delete_message_for_everyone(&self, id: Id) -> RepoResult<UserMessage> {
        let mut s = self.state.write().unwrap();
        let msg = s.messages.get_mut(&id).ok_or(RepoError::NotFound)?;
        msg.deleted_for_everyone = true;
        let updated = msg.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }
}

#[async_trait]
impl ContactRepo for InMemRepo {
    async fn create_contact(&self, new: NewContactMessage) -> RepoResult<ContactMessage> {
        let mut s = self.state.write().unwrap();
        let id = Self::next_id(&mut s);
        let msg = ContactMessage {
            id,
            name: new.name,
            email: new.email,
            subject: new.subject,
            body: new.body,
            created_at: Utc::now(),
        };
        s.contact.insert(id, msg.clone());
        drop(s);
        self.persist();
        Ok(msg)
    }

    async fn list_contact(&self) -> RepoResult<Vec<ContactMessage>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s.contact.values().cloned().collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(v)
    }

    async fn delete_contact(&self, id: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        if s.contact.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        drop(s);
        self.persist();
        Ok(())
    }
}

#[async_trait]
impl BlogRepo for InMemRepo {
    async fn list_posts(&self, include_unpublished: bool) -> RepoResult<Vec<BlogPost>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s
            .posts
            .values()
            .filter(|p| include_unpublished || p.published)
            .cloned()
            .collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(v)
    }

    async fn get_post_by_slug(&self, slug: &str) -> RepoResult<BlogPost> {
        let s = self.state.read().unwrap();
        s.posts
            .values()
            .find(|p| p.slug == slug)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn create_post(&self, new: NewBlogPost) -> RepoResult<BlogPost> {
        let mut s = self.state.write().unwrap();
        if s.posts.values().any(|p| p.slug == new.slug) {
            return Err(RepoError::Conflict);
        }
        let id = Self::next_id(&mut s);
        let now = Utc::now();
        let post = BlogPost {
            id,
            slug: new.slug,
            title: new.title,
            body: new.body,
            image: new.image,
            tags: new.tags,
            published: new.published,
            created_at: now,
            updated_at: now,
        };
        s.posts.insert(id, post.clone());
        drop(s);
        self.persist();
        Ok(post)
    }

    async fn update_post(&self, id: Id, upd: UpdateBlogPost) -> RepoResult<BlogPost> {
        let mut s = self.state.write().unwrap();
        if let Some(ref slug) = upd.slug {
            if s.posts.values().any(|p| p.slug == *slug && p.id != id) {
                return Err(RepoError::Conflict);
            }
        }
        let post = s.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(slug) = upd.slug {
            post.slug = slug;
        }
        if let Some(title) = upd.title {
            post.title = title;
        }
        if let Some(body) = upd.body {
            post.body = body;
        }
        if let Some(image) = upd.image {
            post.image = Some(image);
        }
        if let Some(tags) = upd.tags {
            post.tags = tags;
        }
        if let Some(published) = upd.published {
            post.published = published;
        }
        post.updated_at = Utc::now();
        let updated = post.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }

    async fn delete_post(&self, id: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        if s.posts.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        drop(s);
        self.persist();
        Ok(())
    }
}

#[async_trait]
impl ServiceRepo for InMemRepo {
    async fn list_services(&self) -> RepoResult<Vec<Service>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s.services.values().cloned().collect();
        v.sort_by_key(|x| x.id);
        Ok(v)
    }

    async fn get_service(&self, id: Id) -> RepoResult<Service> {
        let s = self.state.read().unwrap();
        s.services.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_service(&self, new: NewService) -> RepoResult<Service> {
        let mut s = self.state.write().unwrap();
        let id = Self::next_id(&mut s);
        let service = Service {
            id,
            title: new.title,
            description: new.description,
            features: new.features,
            price: new.price,
            image: new.image,
            created_at: Utc::now(),
        };
        s.services.insert(id, service.clone());
        drop(s);
        self.persist();
        Ok(service)
    }

    async fn update_service(&self, id: Id, upd: NewService) -> RepoResult<Service> {
        let mut s = self.state.write().unwrap();
        let service = s.services.get_mut(&id).ok_or(RepoError::NotFound)?;
        service.title = upd.title;
        service.description = upd.description;
        service.features = upd.features;
        service.price = upd.price;
        service.image = upd.image;
        let updated = service.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }

    async fn delete_service(&self, id: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        if s.services.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        drop(s);
        self.persist();
        Ok(())
    }
}

#[async_trait]
impl ProjectRepo for InMemRepo {
    async fn list_projects(&self) -> RepoResult<Vec<Project>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s.projects.values().cloned().collect();
        v.sort_by_key(|x| x.id);
        Ok(v)
    }

    async fn get_project(&self, id: Id) -> RepoResult<Project> {
        let s = self.state.read().unwrap();
        s.projects.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_project(&self, new: NewProject) -> RepoResult<Project> {
        let mut s = self.state.write().unwrap();
        let id = Self::next_id(&mut s);
        let project = Project {
            id,
            title: new.title,
            description: new.description,
            images: new.images,
            url: new.url,
            created_at: Utc::now(),
        };
        s.projects.insert(id, project.clone());
        drop(s);
        self.persist();
        Ok(project)
    }

    async fn update_project(&self, id: Id, upd: NewProject) -> RepoResult<Project> {
        let mut s = self.state.write().unwrap();
        let project = s.projects.get_mut(&id).ok_or(RepoError::NotFound)?;
        project.title = upd.title;
        project.description = upd.description;
        project.images = upd.images;
        project.url = upd.url;
        let updated = project.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }

    async fn delete_project(&self, id: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        if s.projects.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        drop(s);
        self.persist();
        Ok(())
    }
}

#[async_trait]
impl WishlistRepo for InMemRepo {
    async fn list_wishlist(&self, user_id: Id) -> RepoResult<Vec<WishlistItem>> {
        let s = self.state.read().unwrap();
        let mut v: Vec<_> = s
            .wishlist
            .values()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        v.sort_by_key(|w| w.id);
        Ok(v)
    }

    async fn add_wishlist(&self, user_id: Id, product_id: Id) -> RepoResult<WishlistItem> {
        let mut s = self.state.write().unwrap();
        if !s.products.contains_key(&product_id) {
            return Err(RepoError::NotFound);
        }
        if let Some(existing) = s
            .wishlist
            .values()
            .find(|w| w.user_id == user_id && w.product_id == product_id)
        {
            return Ok(existing.clone());
        }
        let id = Self::next_id(&mut s);
        let item = WishlistItem {
            id,
            user_id,
            product_id,
            created_at: Utc::now(),
        };
        s.wishlist.insert(id, item.clone());
        drop(s);
        self.persist();
        Ok(item)
    }

    async fn remove_wishlist(&self, user_id: Id, product_id: Id) -> RepoResult<()> {
        let mut s = self.state.write().unwrap();
        let before = s.wishlist.len();
        s.wishlist
            .retain(|_, w| !(w.user_id == user_id && w.product_id == product_id));
        if s.wishlist.len() == before {
            return Err(RepoError::NotFound);
        }
        drop(s);
        self.persist();
        Ok(())
    }
}

#[async_trait]
impl StatsRepo for InMemRepo {
    async fn admin_stats(&self) -> RepoResult<AdminStats> {
        let s = self.state.read().unwrap();
        let revenue = s
            .orders
            .values()
            .filter(|o| {
                matches!(
                    o.status,
                    OrderStatus::Processed | OrderStatus::Shipped | OrderStatus::Delivered
                )
            })
            .map(|o| o.total)
            .sum();
        Ok(AdminStats {
            users: s.users.len(),
            products: s.products.len(),
            orders: s.orders.len(),
            pending_orders: s
                .orders
                .values()
                .filter(|o| o.status == OrderStatus::Pending)
                .count(),
            revenue,
            unread_messages: s
                .messages
                .values()
                .filter(|m| !m.from_admin && !m.seen && !m.deleted_for_everyone)
                .count(),
            contact_messages: s.contact.len(),
        })
    }
}
