use async_trait::async_trait;
use bazaar_core::shipping::{AirwayBill, CreatedShipment};
use bazaar_core::{DeliverTo, RepoError};
use bazaar_order::repository::{OrderFilter, OrderPage, OrderRepository};
use bazaar_order::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, order_code, user_id, status, payment_method, payment_status, \
    deliver_to, subtotal, shipping_charge, placed_at, confirmed_at, shipped_at, \
    out_for_delivery_at, delivered_at, estimated_delivery_date, gateway_order_id, \
    gateway_payment_id, courier_order_id, shipment_id, awb_code, courier_name, tracking_url, \
    created_at, updated_at";

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one(&self, clause: &str, key: &str) -> Result<Option<Order>, RepoError> {
        let sql = format!("SELECT {} FROM orders WHERE {} LIMIT 1", ORDER_COLUMNS, clause);
        let row: Option<OrderRow> = sqlx::query_as(&sql).bind(key).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepoError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let item_rows: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT order_id, product_id, product_name, quantity, price_per_item, original_price, total_for_item \
             FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            items.entry(row.order_id).or_default().push(row.into_item()?);
        }

        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_code: String,
    user_id: String,
    status: String,
    payment_method: String,
    payment_status: String,
    deliver_to: Json<DeliverTo>,
    subtotal: Decimal,
    shipping_charge: Decimal,
    placed_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    out_for_delivery_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    estimated_delivery_date: Option<DateTime<Utc>>,
    gateway_order_id: Option<String>,
    gateway_payment_id: Option<String>,
    courier_order_id: Option<String>,
    shipment_id: Option<String>,
    awb_code: Option<String>,
    courier_name: Option<String>,
    tracking_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepoError> {
        let status = OrderStatus::parse(&self.status)
            .ok_or_else(|| format!("unknown order status '{}'", self.status))?;
        let payment_method = PaymentMethod::parse(&self.payment_method)
            .ok_or_else(|| format!("unknown payment method '{}'", self.payment_method))?;
        let payment_status = PaymentStatus::parse(&self.payment_status)
            .ok_or_else(|| format!("unknown payment status '{}'", self.payment_status))?;

        Ok(Order {
            id: self.id,
            order_code: self.order_code,
            user_id: self.user_id,
            status,
            payment_method,
            payment_status,
            deliver_to: self.deliver_to.0,
            items,
            subtotal: self.subtotal,
            shipping_charge: self.shipping_charge,
            placed_at: self.placed_at,
            confirmed_at: self.confirmed_at,
            shipped_at: self.shipped_at,
            out_for_delivery_at: self.out_for_delivery_at,
            delivered_at: self.delivered_at,
            estimated_delivery_date: self.estimated_delivery_date,
            gateway_order_id: self.gateway_order_id,
            gateway_payment_id: self.gateway_payment_id,
            courier_order_id: self.courier_order_id,
            shipment_id: self.shipment_id,
            awb_code: self.awb_code,
            courier_name: self.courier_name,
            tracking_url: self.tracking_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    quantity: i32,
    price_per_item: Decimal,
    original_price: Option<Decimal>,
    total_for_item: Decimal,
}

impl OrderItemRow {
    fn into_item(self) -> Result<OrderItem, RepoError> {
        Ok(OrderItem {
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: u32::try_from(self.quantity)?,
            price_per_item: self.price_per_item,
            original_price: self.original_price,
            total_for_item: self.total_for_item,
        })
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create_order(&self, order: &Order) -> Result<Uuid, RepoError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_code, user_id, status, payment_method, payment_status,
                deliver_to, subtotal, shipping_charge, placed_at, estimated_delivery_date,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id)
        .bind(&order.order_code)
        .bind(&order.user_id)
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(Json(&order.deliver_to))
        .bind(order.subtotal)
        .bind(order.shipping_charge)
        .bind(order.placed_at)
        .bind(order.estimated_delivery_date)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, product_name, quantity,
                    price_per_item, original_price, total_for_item)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(order.id)
            .bind(i32::try_from(position)?)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(i32::try_from(item.quantity)?)
            .bind(item.price_per_item)
            .bind(item.original_price)
            .bind(item.total_for_item)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(order.id)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row: Option<OrderRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_code(&self, order_code: &str) -> Result<Option<Order>, RepoError> {
        self.fetch_one("order_code = $1", order_code).await
    }

    async fn find_by_code_or_awb(&self, key: &str) -> Result<Option<Order>, RepoError> {
        self.fetch_one(
            "awb_code = $1 OR order_code = $1 ORDER BY (awb_code IS NOT DISTINCT FROM $1) DESC",
            key,
        )
        .await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<OrderPage, RepoError> {
        let status = filter.status.map(|s| s.as_str());

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM orders \
             WHERE ($1::text IS NULL OR user_id = $1) AND ($2::text IS NULL OR status = $2)",
        )
        .bind(filter.user_id.as_deref())
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {} FROM orders \
             WHERE ($1::text IS NULL OR user_id = $1) AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC, order_code DESC LIMIT $3 OFFSET $4",
            ORDER_COLUMNS
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(filter.user_id.as_deref())
            .bind(status)
            .bind(i64::from(filter.limit))
            .bind(i64::try_from(filter.offset())?)
            .fetch_all(&self.pool)
            .await?;

        Ok(OrderPage {
            orders: self.attach_items(rows).await?,
            total: u64::try_from(total)?,
        })
    }

    async fn save_progress(&self, order: &Order) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            UPDATE orders SET status = $2, payment_status = $3, gateway_payment_id = $4,
                confirmed_at = $5, shipped_at = $6, out_for_delivery_at = $7, delivered_at = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(order.id)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.gateway_payment_id.as_deref())
        .bind(order.confirmed_at)
        .bind(order.shipped_at)
        .bind(order.out_for_delivery_at)
        .bind(order.delivered_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_gateway_order(&self, id: Uuid, gateway_order_id: &str) -> Result<(), RepoError> {
        sqlx::query("UPDATE orders SET gateway_order_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(gateway_order_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_shipment_if_absent(
        &self,
        id: Uuid,
        shipment: &CreatedShipment,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE orders SET courier_order_id = $2, shipment_id = $3, updated_at = NOW() \
             WHERE id = $1 AND shipment_id IS NULL",
        )
        .bind(id)
        .bind(&shipment.courier_order_id)
        .bind(&shipment.shipment_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_airway_bill(
        &self,
        id: Uuid,
        airway_bill: &AirwayBill,
        tracking_url: &str,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE orders SET awb_code = $2, courier_name = $3, tracking_url = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&airway_bill.awb_code)
        .bind(&airway_bill.courier_name)
        .bind(tracking_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
