use sqlx::{Pool, Postgres};

use super::*;
use crate::auth::Role as AuthRole;

#[derive(Clone)]
pub struct PgRepo {
    pool: Pool<Postgres>,
}

impl PgRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_err(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => RepoError::Conflict,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => RepoError::NotFound,
        _ => RepoError::Internal(e.to_string()),
    }
}

#[async_trait]
impl UserRepo for PgRepo {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
        role: AuthRole,
    ) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, name, password_hash, role) VALUES (LOWER($1),$2,$3,$4) \
             RETURNING id, email, name, password_hash, role, created_at",
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash, role, created_at FROM users WHERE email = LOWER($1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn get_user(&self, id: Id) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }
}

const PRODUCT_COLS: &str =
    "id, name, description, price, stock, seller, images, features, category_id, created_at, updated_at";

#[async_trait]
impl ProductRepo for PgRepo {
    async fn list_products(
        &self,
        category_slug: Option<&str>,
        search: Option<&str>,
    ) -> RepoResult<Vec<Product>> {
        let category_id: Option<Id> = match category_slug {
            Some(slug) => Some(
                sqlx::query_scalar::<_, Id>("SELECT id FROM categories WHERE slug = $1")
                    .bind(slug)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_err)?,
            ),
            None => None,
        };
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLS} FROM products \
             WHERE ($1::bigint IS NULL OR category_id = $1) \
               AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%' OR description ILIKE '%' || $2 || '%') \
             ORDER BY id"
        ))
        .bind(category_id)
        .bind(search)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn get_product(&self, id: Id) -> RepoResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn create_product(&self, new: NewProduct) -> RepoResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (name, description, price, stock, seller, images, features, category_id) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8) RETURNING {PRODUCT_COLS}"
        ))
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.stock)
        .bind(&new.seller)
        .bind(&new.images)
        .bind(&new.features)
        .bind(new.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn update_product(&self, id: Id, upd: UpdateProduct) -> RepoResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET \
               name = COALESCE($2, name), \
               description = COALESCE($3, description), \
               price = COALESCE($4, price), \
               stock = COALESCE($5, stock), \
               seller = COALESCE($6, seller), \
               images = COALESCE($7, images), \
               features = COALESCE($8, features), \
               category_id = COALESCE($9, category_id), \
               updated_at = now() \
             WHERE id = $1 RETURNING {PRODUCT_COLS}"
        ))
        .bind(id)
        .bind(upd.name)
        .bind(upd.description)
        .bind(upd.price)
        .bind(upd.stock)
        .bind(upd.seller)
        .bind(upd.images)
        .bind(upd.features)
        .bind(upd.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn delete_product(&self, id: Id) -> RepoResult<()> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryRepo for PgRepo {
    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, slug, name, created_at FROM categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn create_category(&self, new: NewCategory) -> RepoResult<Category> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (slug, name) VALUES ($1,$2) RETURNING id, slug, name, created_at",
        )
        .bind(&new.slug)
        .bind(&new.name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn update_category(&self, id: Id, upd: NewCategory) -> RepoResult<Category> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET slug = $2, name = $3 WHERE id = $1 \
             RETURNING id, slug, name, created_at",
        )
        .bind(id)
        .bind(&upd.slug)
        .bind(&upd.name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn delete_category(&self, id: Id) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        sqlx::query("UPDATE products SET category_id = NULL WHERE category_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        let res = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        tx.commit().await.map_err(map_err)
    }
}

const ORDER_COLS: &str =
    "id, user_id, status, subtotal, shipping, total, payment_intent_id, created_at, updated_at";

impl PgRepo {
    async fn order_detail(&self, id: Id) -> RepoResult<OrderDetail> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        let sub_orders = sqlx::query_as::<_, SubOrder>(
            "SELECT id, order_id, seller, subtotal FROM sub_orders WHERE order_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, sub_order_id, product_id, product_name, unit_price, quantity \
             FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(OrderDetail {
            order,
            sub_orders,
            items,
        })
    }
}

#[async_trait]
impl OrderRepo for PgRepo {
    async fn create_order(&self, draft: OrderDraft) -> RepoResult<OrderDetail> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        // conditional decrement keeps stock non-negative under concurrency
        for line in &draft.lines {
            let res = sqlx::query(
                "UPDATE products SET stock = stock - $2, updated_at = now() \
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::Conflict);
            }
        }
        let order = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (user_id, status, subtotal, shipping, total) \
             VALUES ($1,'PENDING',$2,$3,$4) RETURNING {ORDER_COLS}"
        ))
        .bind(draft.user_id)
        .bind(draft.subtotal)
        .bind(draft.shipping)
        .bind(draft.total)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_err)?;

        let mut seller_subs: Vec<(String, Id)> = Vec::new();
        for line in &draft.lines {
            let sub_id = match seller_subs.iter().find(|(seller, _)| *seller == line.seller) {
                Some((_, sub_id)) => *sub_id,
                None => {
                    let sub_id = sqlx::query_scalar::<_, Id>(
                        "INSERT INTO sub_orders (order_id, seller, subtotal) VALUES ($1,$2,0) \
                         RETURNING id",
                    )
                    .bind(order.id)
                    .bind(&line.seller)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(map_err)?;
                    seller_subs.push((line.seller.clone(), sub_id));
                    sub_id
                }
            };
            sqlx::query(
                "INSERT INTO order_items (order_id, sub_order_id, product_id, product_name, unit_price, quantity) \
                 VALUES ($1,$2,$3,$4,$5,$6)",
            )
            .bind(order.id)
            .bind(sub_id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.unit_price)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
            sqlx::query("UPDATE sub_orders SET subtotal = subtotal + $2 WHERE id = $1")
                .bind(sub_id)
                .bind(line.unit_price * rust_decimal::Decimal::from(line.quantity))
                .execute(&mut *tx)
                .await
                .map_err(map_err)?;
        }
        tx.commit().await.map_err(map_err)?;
        self.order_detail(order.id).await
    }

    async fn get_order(&self, id: Id) -> RepoResult<OrderDetail> {
        self.order_detail(id).await
    }

    async fn list_orders(&self, user_id: Option<Id>) -> RepoResult<Vec<Order>> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLS} FROM orders \
             WHERE ($1::bigint IS NULL OR user_id = $1) ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn cancel_order(&self, id: Id) -> RepoResult<OrderDetail> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_err)?;
        if order.status != OrderStatus::Pending {
            return Err(RepoError::Conflict);
        }
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, sub_order_id, product_id, product_name, unit_price, quantity \
             FROM order_items WHERE order_id = $1",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_err)?;
        // a product deleted since purchase matches no row; log and keep
        // restoring the rest. A real SQL error aborts the transaction, so
        // it propagates instead.
        for item in &items {
            let restored = sqlx::query(
                "UPDATE products SET stock = stock + $2, updated_at = now() WHERE id = $1",
            )
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
            if restored.rows_affected() == 0 {
                log::warn!(
                    "cancel order {id}: product {} gone, skipping stock restore of {}",
                    item.product_id,
                    item.quantity
                );
            }
        }
        sqlx::query("UPDATE orders SET status = 'CANCELLED', updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        tx.commit().await.map_err(map_err)?;
        self.order_detail(id).await
    }

    async fn set_order_status(&self, id: Id, status: OrderStatus) -> RepoResult<Order> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 RETURNING {ORDER_COLS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn set_payment_intent(&self, id: Id, intent_id: &str) -> RepoResult<Order> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET payment_intent_id = $2, updated_at = now() WHERE id = $1 \
             RETURNING {ORDER_COLS}"
        ))
        .bind(id)
        .bind(intent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn find_order_by_intent(&self, intent_id: &str) -> RepoResult<Order> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLS} FROM orders WHERE payment_intent_id = $1"
        ))
        .bind(intent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }
}

#[async_trait]
impl ReturnRepo for PgRepo {
    async fn create_return(
        &self,
        order_id: Id,
        order_item_id: Id,
        user_id: Id,
        reason: &str,
    ) -> RepoResult<ReturnRequest> {
        let belongs: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM order_items WHERE id = $1 AND order_id = $2",
        )
        .bind(order_item_id)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        if belongs.is_none() {
            return Err(RepoError::NotFound);
        }
        sqlx::query_as::<_, ReturnRequest>(
            "INSERT INTO return_requests (order_id, order_item_id, user_id, reason, status) \
             VALUES ($1,$2,$3,$4,'REQUESTED') \
             RETURNING id, order_id, order_item_id, user_id, reason, status, created_at",
        )
        .bind(order_id)
        .bind(order_item_id)
        .bind(user_id)
        .bind(reason)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn list_returns(&self) -> RepoResult<Vec<ReturnRequest>> {
        sqlx::query_as::<_, ReturnRequest>(
            "SELECT id, order_id, order_item_id, user_id, reason, status, created_at \
             FROM return_requests ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn set_return_status(&self, id: Id, status: ReturnStatus) -> RepoResult<ReturnRequest> {
        sqlx::query_as::<_, ReturnRequest>(
            "UPDATE return_requests SET status = $2 WHERE id = $1 \
             RETURNING id, order_id, order_item_id, user_id, reason, status, created_at",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }
}

const MESSAGE_COLS: &str =
    "id, user_id, from_admin, subject, body, seen, deleted_for_user, deleted_for_everyone, created_at";

#[async_trait]
impl MessageRepo for PgRepo {
    async fn create_message(
        &self,
        user_id: Id,
        from_admin: bool,
        subject: &str,
        body: &str,
    ) -> RepoResult<UserMessage> {
        sqlx::query_as::<_, UserMessage>(&format!(
            "INSERT INTO user_messages (user_id, from_admin, subject, body) \
             VALUES ($1,$2,$3,$4) RETURNING {MESSAGE_COLS}"
        ))
        .bind(user_id)
        .bind(from_admin)
        .bind(subject)
        .bind(body)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn list_messages(&self, user_id: Option<Id>) -> RepoResult<Vec<UserMessage>> {
        sqlx::query_as::<_, UserMessage>(&format!(
            "SELECT {MESSAGE_COLS} FROM user_messages \
             WHERE ($1::bigint IS NULL OR user_id = $1) ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn get_message(&self, id: Id) -> RepoResult<UserMessage> {
        sqlx::query_as::<_, UserMessage>(&format!(
            "SELECT {MESSAGE_COLS} FROM user_messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn mark_message_seen(&self, id: Id) -> RepoResult<UserMessage> {
        sqlx::query_as::<_, UserMessage>(&format!(
            "UPDATE user_messages SET seen = TRUE WHERE id = $1 RETURNING {MESSAGE_COLS}"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn delete_message_for_user(&self, id: Id) -> RepoResult<UserMessage> {
        sqlx::query_as::<_, UserMessage>(&format!(
            "UPDATE user_messages SET deleted_for_user = TRUE WHERE id = $1 \
             RETURNING {MESSAGE_COLS}"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn delete_message_for_everyone(&self, id: Id) -> RepoResult<UserMessage> {
        sqlx::query_as::<_, UserMessage>(&format!(
            "UPDATE user_messages SET deleted_for_everyone = TRUE WHERE id = $1 \
             RETURNING {MESSAGE_COLS}"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }
}

#[async_trait]
impl ContactRepo for PgRepo {
    async fn create_contact(&self, new: NewContactMessage) -> RepoResult<ContactMessage> {
        sqlx::query_as::<_, ContactMessage>(
            "INSERT INTO contact_messages (name, email, subject, body) VALUES ($1,$2,$3,$4) \
             RETURNING id, name, email, subject, body, created_at",
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.subject)
        .bind(&new.body)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn list_contact(&self) -> RepoResult<Vec<ContactMessage>> {
        sqlx::query_as::<_, ContactMessage>(
            "SELECT id, name, email, subject, body, created_at FROM contact_messages \
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn delete_contact(&self, id: Id) -> RepoResult<()> {
        let res = sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

const POST_COLS: &str =
    "id, slug, title, body, image, tags, published, created_at, updated_at";

#[async_trait]
impl BlogRepo for PgRepo {
    async fn list_posts(&self, include_unpublished: bool) -> RepoResult<Vec<BlogPost>> {
        sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {POST_COLS} FROM blog_posts \
             WHERE ($1 OR published) ORDER BY created_at DESC"
        ))
        .bind(include_unpublished)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn get_post_by_slug(&self, slug: &str) -> RepoResult<BlogPost> {
        sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {POST_COLS} FROM blog_posts WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn create_post(&self, new: NewBlogPost) -> RepoResult<BlogPost> {
        sqlx::query_as::<_, BlogPost>(&format!(
            "INSERT INTO blog_posts (slug, title, body, image, tags, published) \
             VALUES ($1,$2,$3,$4,$5,$6) RETURNING {POST_COLS}"
        ))
        .bind(&new.slug)
        .bind(&new.title)
        .bind(&new.body)
        .bind(&new.image)
        .bind(&new.tags)
        .bind(new.published)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn update_post(&self, id: Id, upd: UpdateBlogPost) -> RepoResult<BlogPost> {
        sqlx::query_as::<_, BlogPost>(&format!(
            "UPDATE blog_posts SET \
               slug = COALESCE($2, slug), \
               title = COALESCE($3, title), \
               body = COALESCE($4, body), \
               image = COALESCE($5, image), \
               tags = COALESCE($6, tags), \
               published = COALESCE($7, published), \
               updated_at = now() \
             WHERE id = $1 RETURNING {POST_COLS}"
        ))
        .bind(id)
        .bind(upd.slug)
        .bind(upd.title)
        .bind(upd.body)
        .bind(upd.image)
        .bind(upd.tags)
        .bind(upd.published)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn delete_post(&self, id: Id) -> RepoResult<()> {
        let res = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceRepo for PgRepo {
    async fn list_services(&self) -> RepoResult<Vec<Service>> {
        sqlx::query_as::<_, Service>(
            "SELECT id, title, description, features, price, image, created_at FROM services ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn get_service(&self, id: Id) -> RepoResult<Service> {
        sqlx::query_as::<_, Service>(
            "SELECT id, title, description, features, price, image, created_at FROM services WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn create_service(&self, new: NewService) -> RepoResult<Service> {
        sqlx::query_as::<_, Service>(
            "INSERT INTO services (title, description, features, price, image) \
             VALUES ($1,$2,$3,$4,$5) \
             RETURNING id, title, description, features, price, image, created_at",
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.features)
        .bind(new.price)
        .bind(&new.image)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn update_service(&self, id: Id, upd: NewService) -> RepoResult<Service> {
        sqlx::query_as::<_, Service>(
            "UPDATE services SET title = $2, description = $3, features = $4, price = $5, image = $6 \
             WHERE id = $1 \
             RETURNING id, title, description, features, price, image, created_at",
        )
        .bind(id)
        .bind(&upd.title)
        .bind(&upd.description)
        .bind(&upd.features)
        .bind(upd.price)
        .bind(&upd.image)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn delete_service(&self, id: Id) -> RepoResult<()> {
        let res = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectRepo for PgRepo {
    async fn list_projects(&self) -> RepoResult<Vec<Project>> {
        sqlx::query_as::<_, Project>(
            "SELECT id, title, description, images, url, created_at FROM projects ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn get_project(&self, id: Id) -> RepoResult<Project> {
        sqlx::query_as::<_, Project>(
            "SELECT id, title, description, images, url, created_at FROM projects WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn create_project(&self, new: NewProject) -> RepoResult<Project> {
        sqlx::query_as::<_, Project>(
            "INSERT INTO projects (title, description, images, url) VALUES ($1,$2,$3,$4) \
             RETURNING id, title, description, images, url, created_at",
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.images)
        .bind(&new.url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn update_project(&self, id: Id, upd: NewProject) -> RepoResult<Project> {
        sqlx::query_as::<_, Project>(
            "UPDATE projects SET title = $2, description = $3, images = $4, url = $5 \
             WHERE id = $1 RETURNING id, title, description, images, url, created_at",
        )
        .bind(id)
        .bind(&upd.title)
        .bind(&upd.description)
        .bind(&upd.images)
        .bind(&upd.url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn delete_project(&self, id: Id) -> RepoResult<()> {
        let res = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl WishlistRepo for PgRepo {
    async fn list_wishlist(&self, user_id: Id) -> RepoResult<Vec<WishlistItem>> {
        sqlx::query_as::<_, WishlistItem>(
            "SELECT id, user_id, product_id, created_at FROM wishlist_items \
             WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn add_wishlist(&self, user_id: Id, product_id: Id) -> RepoResult<WishlistItem> {
        sqlx::query_as::<_, WishlistItem>(
            "INSERT INTO wishlist_items (user_id, product_id) VALUES ($1,$2) \
             ON CONFLICT (user_id, product_id) DO UPDATE SET product_id = EXCLUDED.product_id \
             RETURNING id, user_id, product_id, created_at",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn remove_wishlist(&self, user_id: Id, product_id: Id) -> RepoResult<()> {
        let res = sqlx::query(
            "DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl StatsRepo for PgRepo {
    async fn admin_stats(&self) -> RepoResult<AdminStats> {
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        let pending: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = 'PENDING'")
                .fetch_one(&self.pool)
                .await
                .map_err(map_err)?;
        let revenue: rust_decimal::Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total), 0) FROM orders \
             WHERE status IN ('PROCESSED','SHIPPED','DELIVERED')",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        let unread: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_messages \
             WHERE NOT from_admin AND NOT seen AND NOT deleted_for_everyone",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        let contact: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages")
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(AdminStats {
            users: users as usize,
            products: products as usize,
            orders: orders as usize,
            pending_orders: pending as usize,
            revenue,
            unread_messages: unread as usize,
            contact_messages: contact as usize,
        })
    }
}
