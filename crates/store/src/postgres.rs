use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use common::{CustomerId, Money, OrderId, OrderItemId, ProductId};

use crate::model::{Customer, NewOrder, Order, OrderItem, Product, StockUpdate};
use crate::store::{CustomerStore, OrderStore, ProductStore, Store};
use crate::{Result, StoreError};

/// PostgreSQL-backed store implementation.
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

    fn row_to_customer(row: PgRow) -> Result<Customer> {
        Ok(Customer {
            id: CustomerId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price")?),
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Locks each implicated product row, checks its quantity against the
    /// snapshot the update was computed from, and writes the new quantity.
    ///
    /// Rows are locked in product-id order so two batches requesting
    /// FOR UPDATE on overlapping products acquire them in the same
    /// sequence and cannot deadlock each other. The caller must not hold
    /// weaker locks on these rows before this runs; `place_order` orders
    /// its work accordingly. Returning an error aborts the surrounding
    /// transaction, so no update in the batch survives a conflict.
    async fn apply_stock_updates(
        tx: &mut Transaction<'_, Postgres>,
        updates: &[StockUpdate],
    ) -> Result<Vec<Product>> {
        let mut ordered: Vec<&StockUpdate> = updates.iter().collect();
        ordered.sort_by(|a, b| a.product_id.as_str().cmp(b.product_id.as_str()));

        let now = Utc::now();
        let mut updated = Vec::with_capacity(ordered.len());

        for update in ordered {
            let row = sqlx::query(
                r#"
                SELECT id, name, price, quantity, created_at, updated_at
                FROM products
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(update.product_id.as_str())
            .fetch_optional(&mut **tx)
            .await?;

            let product = match row {
                Some(row) => Self::row_to_product(row)?,
                None => return Err(StoreError::UnknownProduct(update.product_id.clone())),
            };

            if product.quantity != update.expected {
                tracing::debug!(
                    product_id = %update.product_id,
                    expected = update.expected,
                    actual = product.quantity,
                    "stock snapshot is stale, aborting transaction"
                );
                return Err(StoreError::StockConflict {
                    product_id: update.product_id.clone(),
                    expected: update.expected,
                    actual: product.quantity,
                });
            }

            sqlx::query("UPDATE products SET quantity = $2, updated_at = $3 WHERE id = $1")
                .bind(update.product_id.as_str())
                .bind(update.quantity)
                .bind(now)
                .execute(&mut **tx)
                .await?;

            updated.push(Product {
                quantity: update.quantity,
                updated_at: now,
                ..product
            });
        }

        Ok(updated)
    }

    /// Inserts the order header and all item rows.
    async fn insert_order(
        tx: &mut Transaction<'_, Postgres>,
        order: NewOrder,
    ) -> Result<Order> {
        let order_id = OrderId::new();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(order.customer_id.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            let item_id = OrderItemId::new();

            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, price, quantity)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(item_id.as_uuid())
            .bind(order_id.as_uuid())
            .bind(item.product_id.as_str())
            .bind(item.price.cents())
            .bind(item.quantity as i64)
            .execute(&mut **tx)
            .await?;

            items.push(OrderItem {
                id: item_id,
                order_id,
                product_id: item.product_id,
                price: item.price,
                quantity: item.quantity,
            });
        }

        Ok(Order {
            id: order_id,
            customer_id: order.customer_id,
            items,
            created_at: now,
            updated_at: now,
        })
    }
}

#[async_trait]
impl CustomerStore for PostgresStore {
    async fn find_customer_by_id(&self, id: &CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, created_at, updated_at
            FROM customers
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_customer).transpose()
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, price, quantity, created_at, updated_at
            FROM products
            WHERE name = $1
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn find_products_by_id(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let id_list: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();

        let rows = sqlx::query(
            r#"
            SELECT id, name, price, quantity, created_at, updated_at
            FROM products
            WHERE id = ANY($1)
            "#,
        )
        .bind(&id_list)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn update_quantities(&self, updates: &[StockUpdate]) -> Result<Vec<Product>> {
        let mut tx = self.pool.begin().await?;
        let updated = Self::apply_stock_updates(&mut tx, updates).await?;
        tx.commit().await?;
        Ok(updated)
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        let order = Self::insert_order(&mut tx, order).await?;
        tx.commit().await?;
        Ok(order)
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn place_order(&self, order: NewOrder, updates: &[StockUpdate]) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Lock and decrement the product rows before inserting any order
        // rows. The item inserts have foreign keys into products, and the
        // referential check takes a KEY SHARE lock on the referenced row;
        // inserting first would let two placements hold shared locks on
        // the same product and then deadlock requesting FOR UPDATE on it.
        // Holding the exclusive lock first keeps the FK check conflict-free.
        Self::apply_stock_updates(&mut tx, updates).await?;
        let order = Self::insert_order(&mut tx, order).await?;

        tx.commit().await?;
        Ok(order)
    }
}

/// Loads an order with its items attached. Test and diagnostic helper;
/// the creation workflow itself never reads orders back.
pub async fn load_order(pool: &PgPool, id: OrderId) -> Result<Option<Order>> {
    let header = sqlx::query(
        r#"
        SELECT id, customer_id, created_at, updated_at
        FROM orders
        WHERE id = $1
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(pool)
    .await?;

    let Some(header) = header else {
        return Ok(None);
    };

    let item_rows = sqlx::query(
        r#"
        SELECT id, order_id, product_id, price, quantity
        FROM order_items
        WHERE order_id = $1
        ORDER BY id
        "#,
    )
    .bind(id.as_uuid())
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(item_rows.len());
    for row in item_rows {
        let quantity = u32::try_from(row.try_get::<i64, _>("quantity")?).map_err(|e| {
            StoreError::Database(sqlx::Error::ColumnDecode {
                index: "quantity".into(),
                source: Box::new(e),
            })
        })?;

        items.push(OrderItem {
            id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            price: Money::from_cents(row.try_get("price")?),
            quantity,
        });
    }

    Ok(Some(Order {
        id: OrderId::from_uuid(header.try_get::<Uuid, _>("id")?),
        customer_id: CustomerId::new(header.try_get::<String, _>("customer_id")?),
        items,
        created_at: header.try_get("created_at")?,
        updated_at: header.try_get("updated_at")?,
    }))
}
