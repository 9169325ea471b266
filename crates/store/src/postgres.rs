//! PostgreSQL-backed store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use common::{CartId, CategoryId, MedicineId, OrderId, ReviewId, UserId};
use domain::{
    Actor, CartItemView, CartLine, CartView, DomainError, Medicine, MedicineUpdate, Money,
    NewMedicine, Order, OrderDraft, OrderLine, OrderStatus, Review, Role, ShippingDetails,
    TransitionPlan, can_view, plan_self_cancel, plan_transition, validate_rating,
};

use crate::error::{Result, StoreError};
use crate::{Page, PharmacyStore};

/// PostgreSQL-backed store.
///
/// Every multi-entity mutation runs in one SQL transaction. Medicine rows
/// are locked with `FOR UPDATE` before any stock arithmetic, and the
/// decrement itself carries a `stock >= qty` guard so the non-negative
/// invariant holds even at the database level.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_medicine(row: PgRow) -> Result<Medicine> {
        Ok(Medicine {
            id: MedicineId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price")?),
            stock: row.try_get("stock")?,
            is_active: row.try_get("is_active")?,
            seller_id: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("category_id")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_cart_line(row: PgRow) -> Result<CartLine> {
        Ok(CartLine {
            cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
            medicine_id: MedicineId::from_uuid(row.try_get::<Uuid, _>("medicine_id")?),
            medicine_name: row.try_get("medicine_name")?,
            seller_id: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            quantity: decode_quantity(row.try_get("quantity")?)?,
            price: Money::from_cents(row.try_get("price")?),
            stock: row.try_get("stock")?,
            is_active: row.try_get("is_active")?,
        })
    }

    fn row_to_order_line(row: PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            medicine_id: MedicineId::from_uuid(row.try_get::<Uuid, _>("medicine_id")?),
            medicine_name: row.try_get("medicine_name")?,
            seller_id: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            quantity: decode_quantity(row.try_get("quantity")?)?,
            unit_price: Money::from_cents(row.try_get("unit_price")?),
        })
    }

    fn row_to_order(row: PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            status: status.parse::<OrderStatus>()?,
            total: Money::from_cents(row.try_get("total")?),
            shipping: ShippingDetails {
                name: row.try_get("shipping_name")?,
                phone: row.try_get("shipping_phone")?,
                address: row.try_get("shipping_address")?,
            },
            lines,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_review(row: PgRow) -> Result<Review> {
        Ok(Review {
            id: ReviewId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            medicine_id: MedicineId::from_uuid(row.try_get::<Uuid, _>("medicine_id")?),
            rating: row.try_get("rating")?,
            comment: row.try_get("comment")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn fetch_lines(conn: &mut PgConnection, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT medicine_id, medicine_name, seller_id, quantity, unit_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY medicine_id
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter().map(Self::row_to_order_line).collect()
    }

    /// Loads an order with its lines, optionally locking the order row.
    async fn fetch_order(
        conn: &mut PgConnection,
        id: OrderId,
        for_update: bool,
    ) -> Result<Order> {
        let sql = if for_update {
            "SELECT * FROM orders WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT * FROM orders WHERE id = $1"
        };

        let row = sqlx::query(sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| StoreError::not_found("Order"))?;

        let lines = Self::fetch_lines(conn, id).await?;
        Self::row_to_order(row, lines)
    }

    async fn fetch_cart_view(conn: &mut PgConnection, user_id: UserId) -> Result<CartView> {
        let rows = sqlx::query(
            r#"
            SELECT ci.medicine_id, m.name AS medicine_name, ci.quantity, ci.unit_price
            FROM carts c
            JOIN cart_items ci ON ci.cart_id = c.id
            JOIN medicines m ON m.id = ci.medicine_id
            WHERE c.user_id = $1
            ORDER BY ci.medicine_id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *conn)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| {
                Ok(CartItemView {
                    medicine_id: MedicineId::from_uuid(row.try_get::<Uuid, _>("medicine_id")?),
                    medicine_name: row.try_get("medicine_name")?,
                    quantity: decode_quantity(row.try_get("quantity")?)?,
                    unit_price: Money::from_cents(row.try_get("unit_price")?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CartView::new(items))
    }

    /// Increments stock for every order line. The rows are locked by the
    /// UPDATE itself; restores are unconditional.
    async fn restore_stock(
        conn: &mut PgConnection,
        lines: &[OrderLine],
        now: DateTime<Utc>,
    ) -> Result<()> {
        for line in lines {
            sqlx::query("UPDATE medicines SET stock = stock + $2, updated_at = $3 WHERE id = $1")
                .bind(line.medicine_id.as_uuid())
                .bind(i64::from(line.quantity))
                .bind(now)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}

fn decode_quantity(raw: i64) -> std::result::Result<u32, sqlx::Error> {
    u32::try_from(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: "quantity".to_string(),
        source: Box::new(e),
    })
}

#[async_trait]
impl PharmacyStore for PostgresStore {
    async fn create_medicine(&self, seller_id: UserId, new: NewMedicine) -> Result<Medicine> {
        let new = new.validated()?;
        let id = MedicineId::new();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO medicines
                (id, name, price, stock, is_active, seller_id, category_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, $5, $6, $7, $7)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&new.name)
        .bind(new.price.cents())
        .bind(new.stock)
        .bind(seller_id.as_uuid())
        .bind(new.category_id.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Medicine {
            id,
            name: new.name,
            price: new.price,
            stock: new.stock,
            is_active: true,
            seller_id,
            category_id: new.category_id,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_medicine(&self, id: MedicineId) -> Result<Medicine> {
        let row = sqlx::query("SELECT * FROM medicines WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("Medicine"))?;

        Self::row_to_medicine(row)
    }

    async fn list_medicines(&self, include_inactive: bool, page: Page) -> Result<Vec<Medicine>> {
        let sql = if include_inactive {
            "SELECT * FROM medicines ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        } else {
            "SELECT * FROM medicines WHERE is_active ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        };

        let rows = sqlx::query(sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_medicine).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn update_medicine(
        &self,
        actor: &Actor,
        id: MedicineId,
        update: MedicineUpdate,
    ) -> Result<Medicine> {
        let update = update.validated()?;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM medicines WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("Medicine"))?;
        let medicine = Self::row_to_medicine(row)?;

        if actor.role != Role::Admin && medicine.seller_id != actor.id {
            return Err(DomainError::Forbidden(
                "Only the owning seller can update this medicine".to_string(),
            )
            .into());
        }

        let price = update.price.unwrap_or(medicine.price);
        let is_active = update.is_active.unwrap_or(medicine.is_active);
        let restock = update.restock.unwrap_or(0);
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE medicines
            SET price = $2, is_active = $3, stock = stock + $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(price.cents())
        .bind(is_active)
        .bind(restock)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Medicine {
            price,
            is_active,
            stock: medicine.stock + restock,
            updated_at: now,
            ..medicine
        })
    }

    async fn get_cart(&self, user_id: UserId) -> Result<CartView> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_cart_view(&mut conn, user_id).await
    }

    async fn upsert_cart_item(
        &self,
        user_id: UserId,
        medicine_id: MedicineId,
        quantity: u32,
    ) -> Result<CartView> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT is_active, price FROM medicines WHERE id = $1")
            .bind(medicine_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("Medicine"))?;
        let is_active: bool = row.try_get("is_active")?;
        if !is_active {
            return Err(DomainError::MedicineUnavailable { medicine_id }.into());
        }
        let price = Money::from_cents(row.try_get("price")?);

        let now = Utc::now();

        // Lazily create the cart on first add.
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT carts_user_key DO NOTHING
            "#,
        )
        .bind(CartId::new().as_uuid())
        .bind(user_id.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let cart_id: Uuid = sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;

        if quantity == 0 {
            sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND medicine_id = $2")
                .bind(cart_id)
                .bind(medicine_id.as_uuid())
                .execute(&mut *tx)
                .await?;
        } else {
            // Refresh the unit price snapshot on every mutation.
            sqlx::query(
                r#"
                INSERT INTO cart_items (cart_id, medicine_id, quantity, unit_price, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (cart_id, medicine_id)
                DO UPDATE SET quantity = $3, unit_price = $4, updated_at = $5
                "#,
            )
            .bind(cart_id)
            .bind(medicine_id.as_uuid())
            .bind(i64::from(quantity))
            .bind(price.cents())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let view = Self::fetch_cart_view(&mut *tx, user_id).await?;
        tx.commit().await?;
        Ok(view)
    }

    async fn remove_cart_item(
        &self,
        user_id: UserId,
        medicine_id: MedicineId,
    ) -> Result<CartView> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM cart_items ci
            USING carts c
            WHERE ci.cart_id = c.id AND c.user_id = $1 AND ci.medicine_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(medicine_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        let view = Self::fetch_cart_view(&mut *tx, user_id).await?;
        tx.commit().await?;
        Ok(view)
    }

    #[tracing::instrument(skip(self, shipping))]
    async fn place_order(&self, user_id: UserId, shipping: ShippingDetails) -> Result<Order> {
        let shipping = shipping.validated()?;
        let mut tx = self.pool.begin().await?;

        // Lock the medicine rows in a stable order so concurrent
        // checkouts of overlapping medicines serialize instead of
        // deadlocking. The cart row is locked too, which also serializes
        // a double-submit of the same cart.
        let rows = sqlx::query(
            r#"
            SELECT c.id AS cart_id, ci.medicine_id, ci.quantity,
                   m.name AS medicine_name, m.seller_id, m.price, m.stock, m.is_active
            FROM carts c
            JOIN cart_items ci ON ci.cart_id = c.id
            JOIN medicines m ON m.id = ci.medicine_id
            WHERE c.user_id = $1
            ORDER BY m.id
            FOR UPDATE OF c, m
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;

        let cart = rows
            .into_iter()
            .map(Self::row_to_cart_line)
            .collect::<Result<Vec<_>>>()?;
        let draft = OrderDraft::build(&cart)?;

        let order_id = OrderId::new();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO orders
                (id, user_id, status, total, shipping_name, shipping_phone, shipping_address,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(OrderStatus::Placed.as_str())
        .bind(draft.total.cents())
        .bind(&shipping.name)
        .bind(&shipping.phone)
        .bind(&shipping.address)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for line in &draft.lines {
            sqlx::query(
                r#"
                INSERT INTO order_items
                    (order_id, medicine_id, medicine_name, seller_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(line.medicine_id.as_uuid())
            .bind(&line.medicine_name)
            .bind(line.seller_id.as_uuid())
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await?;

            // Reserve: atomic check-and-decrement on the locked row.
            let reserved = sqlx::query(
                "UPDATE medicines SET stock = stock - $2, updated_at = $3 \
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(line.medicine_id.as_uuid())
            .bind(i64::from(line.quantity))
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if reserved.rows_affected() == 0 {
                let available = cart
                    .iter()
                    .find(|item| item.medicine_id == line.medicine_id)
                    .map_or(0, |item| item.stock);
                return Err(DomainError::InsufficientStock {
                    medicine_id: line.medicine_id,
                    requested: i64::from(line.quantity),
                    available,
                }
                .into());
            }
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart[0].cart_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            user_id,
            status: OrderStatus::Placed,
            total: draft.total,
            shipping,
            lines: draft.lines,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_order(&self, actor: &Actor, id: OrderId) -> Result<Order> {
        let mut conn = self.pool.acquire().await?;
        let order = Self::fetch_order(&mut conn, id, false).await?;

        if !can_view(actor, &order) {
            return Err(StoreError::not_found("Order"));
        }

        Ok(order)
    }

    async fn list_orders(&self, actor: &Actor, page: Page) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;

        let rows = match actor.role {
            Role::Admin => {
                sqlx::query("SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                    .bind(page.limit())
                    .bind(page.offset())
                    .fetch_all(&mut *conn)
                    .await?
            }
            Role::Customer => {
                sqlx::query(
                    "SELECT * FROM orders WHERE user_id = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(actor.id.as_uuid())
                .bind(page.limit())
                .bind(page.offset())
                .fetch_all(&mut *conn)
                .await?
            }
            Role::Seller => {
                sqlx::query(
                    r#"
                    SELECT o.* FROM orders o
                    WHERE EXISTS (
                        SELECT 1 FROM order_items oi
                        WHERE oi.order_id = o.id AND oi.seller_id = $1
                    )
                    ORDER BY o.created_at DESC LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(actor.id.as_uuid())
                .bind(page.limit())
                .bind(page.offset())
                .fetch_all(&mut *conn)
                .await?
            }
        };

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
            let lines = Self::fetch_lines(&mut conn, id).await?;
            orders.push(Self::row_to_order(row, lines)?);
        }

        Ok(orders)
    }

    #[tracing::instrument(skip(self))]
    async fn transition_order(
        &self,
        actor: &Actor,
        id: OrderId,
        target: OrderStatus,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let order = Self::fetch_order(&mut *tx, id, true).await?;
        let plan = plan_transition(actor, &order, target)?;

        match plan {
            TransitionPlan::Noop => Ok(order),
            TransitionPlan::Apply { restock } => {
                let now = Utc::now();

                if restock {
                    Self::restore_stock(&mut *tx, &order.lines, now).await?;
                }

                sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
                    .bind(id.as_uuid())
                    .bind(target.as_str())
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;

                tx.commit().await?;

                Ok(Order {
                    status: target,
                    updated_at: now,
                    ..order
                })
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_own_order(&self, user_id: UserId, id: OrderId) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let order = Self::fetch_order(&mut *tx, id, true).await?;
        plan_self_cancel(user_id, &order)?;

        let now = Utc::now();
        Self::restore_stock(&mut *tx, &order.lines, now).await?;

        sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(OrderStatus::Cancelled.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Order {
            status: OrderStatus::Cancelled,
            updated_at: now,
            ..order
        })
    }

    #[tracing::instrument(skip(self, comment))]
    async fn create_review(
        &self,
        user_id: UserId,
        medicine_id: MedicineId,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Review> {
        validate_rating(rating)?;
        let mut tx = self.pool.begin().await?;

        let delivered: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM orders o
                JOIN order_items oi ON oi.order_id = o.id
                WHERE o.user_id = $1 AND oi.medicine_id = $2 AND o.status = $3
            )
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(medicine_id.as_uuid())
        .bind(OrderStatus::Delivered.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if !delivered {
            return Err(DomainError::ReviewNotAllowed.into());
        }

        let id = ReviewId::new();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, medicine_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(medicine_id.as_uuid())
        .bind(rating)
        .bind(&comment)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("reviews_user_medicine_key")
            {
                return StoreError::DuplicateReview;
            }
            StoreError::Database(e)
        })?;

        tx.commit().await?;

        Ok(Review {
            id,
            user_id,
            medicine_id,
            rating,
            comment,
            created_at: now,
        })
    }

    async fn list_reviews(&self, medicine_id: MedicineId) -> Result<Vec<Review>> {
        let rows = sqlx::query(
            "SELECT * FROM reviews WHERE medicine_id = $1 ORDER BY created_at DESC",
        )
        .bind(medicine_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_review).collect()
    }
}
