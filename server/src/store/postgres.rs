// orderflow-server/src/store/postgres.rs

//! PostgreSQL implementation of the order storage traits.
//!
//! Each guarded mutation is one conditional `UPDATE ... RETURNING`, so two
//! requests racing on the same row cannot both succeed. Statuses are stored as
//! their wire names and parsed back on read; an unknown value in a row is a
//! storage error, never a silently defaulted status.

use anyhow::Context;
use async_trait::async_trait;
use orderflow::store::{CaptureTransition, PaymentRecord, StockDecrement};
use orderflow::{
  CartStore, LineItem, Order, OrderStatus, OrderStore, PaymentMethod, PaymentStatus, StockStore, Voucher, VoucherKind,
  VoucherStore,
};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, line_items, address_id, payment_method, payment_status, order_status, \
  raw_total, total_amount, voucher_code, discount, order_date, payment_id, payer_id, stock_reserved, updated_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn migrate(&self) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
      .run(&self.pool)
      .await
      .context("running database migrations")?;
    Ok(())
  }
}

fn order_from_row(row: &PgRow) -> anyhow::Result<Order> {
  let Json(line_items): Json<Vec<LineItem>> = row.try_get("line_items")?;
  let payment_method: String = row.try_get("payment_method")?;
  let payment_status: String = row.try_get("payment_status")?;
  let order_status: String = row.try_get("order_status")?;

  Ok(Order {
    id: row.try_get("id")?,
    user_id: row.try_get("user_id")?,
    line_items,
    address_id: row.try_get("address_id")?,
    payment_method: payment_method.parse::<PaymentMethod>()?,
    payment_status: payment_status.parse::<PaymentStatus>()?,
    order_status: order_status.parse::<OrderStatus>()?,
    raw_total: row.try_get("raw_total")?,
    total_amount: row.try_get("total_amount")?,
    voucher_code: row.try_get("voucher_code")?,
    discount: row.try_get("discount")?,
    order_date: row.try_get("order_date")?,
    payment_id: row.try_get("payment_id")?,
    payer_id: row.try_get("payer_id")?,
    stock_reserved: row.try_get("stock_reserved")?,
    updated_at: row.try_get("updated_at")?,
  })
}

fn voucher_from_row(row: &PgRow) -> anyhow::Result<Voucher> {
  let kind: String = row.try_get("kind")?;
  let kind = match kind.as_str() {
    "percent" => VoucherKind::Percent,
    "fixed" => VoucherKind::Fixed,
    other => anyhow::bail!("unknown voucher kind '{}'", other),
  };
  Ok(Voucher {
    code: row.try_get("code")?,
    kind,
    value: row.try_get("value")?,
    max_discount: row.try_get("max_discount")?,
    min_order_amount: row.try_get("min_order_amount")?,
    is_active: row.try_get("is_active")?,
    expired_at: row.try_get("expired_at")?,
  })
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(name = "PgStore::insert_order", skip(self, order), fields(order_id = %order.id))]
  async fn insert_order(&self, order: &Order) -> anyhow::Result<()> {
    let sql = format!(
      "INSERT INTO orders ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
      ORDER_COLUMNS
    );
    sqlx::query(&sql)
      .bind(order.id)
      .bind(order.user_id)
      .bind(Json(&order.line_items))
      .bind(order.address_id)
      .bind(order.payment_method.as_str())
      .bind(order.payment_status.as_str())
      .bind(order.order_status.as_str())
      .bind(order.raw_total)
      .bind(order.total_amount)
      .bind(order.voucher_code.as_deref())
      .bind(order.discount)
      .bind(order.order_date)
      .bind(order.payment_id.as_deref())
      .bind(order.payer_id.as_deref())
      .bind(order.stock_reserved)
      .bind(order.updated_at)
      .execute(&self.pool)
      .await
      .context("inserting order")?;
    Ok(())
  }

  async fn get_order(&self, order_id: Uuid) -> anyhow::Result<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    let row = sqlx::query(&sql)
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await
      .context("loading order")?;
    row.as_ref().map(order_from_row).transpose()
  }

  async fn orders_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
    let sql = format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY order_date DESC",
      ORDER_COLUMNS
    );
    let rows = sqlx::query(&sql)
      .bind(user_id)
      .fetch_all(&self.pool)
      .await
      .context("listing orders for user")?;
    rows.iter().map(order_from_row).collect()
  }

  async fn compare_and_set_status(
    &self,
    order_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
  ) -> anyhow::Result<Option<Order>> {
    let sql = format!(
      "UPDATE orders SET order_status = $3, updated_at = now() \
       WHERE id = $1 AND order_status = $2 RETURNING {}",
      ORDER_COLUMNS
    );
    let row = sqlx::query(&sql)
      .bind(order_id)
      .bind(from.as_str())
      .bind(to.as_str())
      .fetch_optional(&self.pool)
      .await
      .context("updating order status")?;
    debug!(%order_id, %from, %to, applied = row.is_some(), "Status compare-and-set.");
    row.as_ref().map(order_from_row).transpose()
  }

  async fn mark_paid(&self, order_id: Uuid, payment: &PaymentRecord) -> anyhow::Result<Option<CaptureTransition>> {
    let sql = format!(
      "UPDATE orders SET payment_status = 'paid', payment_id = $2, payer_id = $3, \
       order_status = CASE WHEN order_status = 'pending' AND $4::text IS NOT NULL THEN $4::text ELSE order_status END, \
       updated_at = now() \
       WHERE id = $1 AND payment_status <> 'paid' AND order_status <> 'rejected' RETURNING {}",
      ORDER_COLUMNS
    );
    let row = sqlx::query(&sql)
      .bind(order_id)
      .bind(&payment.payment_id)
      .bind(&payment.payer_id)
      .bind(payment.advance_to.map(|status| status.as_str()))
      .fetch_optional(&self.pool)
      .await
      .context("marking order paid")?;

    if let Some(row) = row {
      return Ok(Some(CaptureTransition::Captured(order_from_row(&row)?)));
    }
    Ok(self.get_order(order_id).await?.map(|current| {
      if current.is_paid() {
        CaptureTransition::AlreadyPaid(current)
      } else {
        CaptureTransition::Rejected(current)
      }
    }))
  }

  async fn claim_stock_reservation(&self, order_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
      "UPDATE orders SET stock_reserved = TRUE, updated_at = now() WHERE id = $1 AND stock_reserved = FALSE",
    )
    .bind(order_id)
    .execute(&self.pool)
    .await
    .context("claiming stock reservation")?;
    Ok(result.rows_affected() == 1)
  }

  async fn unclaim_stock_reservation(&self, order_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("UPDATE orders SET stock_reserved = FALSE, updated_at = now() WHERE id = $1")
      .bind(order_id)
      .execute(&self.pool)
      .await
      .context("releasing stock reservation claim")?;
    Ok(())
  }
}

#[async_trait]
impl StockStore for PgStore {
  async fn try_decrement(&self, product_id: Uuid, quantity: i64) -> anyhow::Result<StockDecrement> {
    let remaining: Option<i64> = sqlx::query_scalar(
      "UPDATE products SET total_stock = total_stock - $2 \
       WHERE id = $1 AND total_stock >= $2 RETURNING total_stock",
    )
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&self.pool)
    .await
    .context("decrementing stock")?;

    if let Some(remaining) = remaining {
      return Ok(StockDecrement::Applied { remaining });
    }
    Ok(match self.stock_of(product_id).await? {
      Some(available) => StockDecrement::Insufficient { available },
      None => StockDecrement::UnknownProduct,
    })
  }

  async fn increment(&self, product_id: Uuid, quantity: i64) -> anyhow::Result<()> {
    let result = sqlx::query("UPDATE products SET total_stock = total_stock + $2 WHERE id = $1")
      .bind(product_id)
      .bind(quantity)
      .execute(&self.pool)
      .await
      .context("restoring stock")?;
    if result.rows_affected() == 0 {
      anyhow::bail!("product {} has no stock record", product_id);
    }
    Ok(())
  }

  async fn stock_of(&self, product_id: Uuid) -> anyhow::Result<Option<i64>> {
    let total = sqlx::query_scalar("SELECT total_stock FROM products WHERE id = $1")
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await
      .context("reading stock")?;
    Ok(total)
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn clear_cart(&self, user_id: Uuid) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM carts WHERE user_id = $1")
      .bind(user_id)
      .execute(&self.pool)
      .await
      .context("clearing cart")?;
    Ok(result.rows_affected())
  }
}

#[async_trait]
impl VoucherStore for PgStore {
  async fn find_voucher(&self, code: &str) -> anyhow::Result<Option<Voucher>> {
    let row = sqlx::query(
      "SELECT code, kind, value, max_discount, min_order_amount, is_active, expired_at FROM vouchers WHERE code = $1",
    )
    .bind(code)
    .fetch_optional(&self.pool)
    .await
    .context("loading voucher")?;
    row.as_ref().map(voucher_from_row).transpose()
  }
}
