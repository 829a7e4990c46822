// orderflow/src/store/memory.rs

//! In-process store backing tests and database-less runs.
//!
//! Each conditional operation runs under one `parking_lot` lock, which gives it
//! the same all-or-nothing behaviour as a single conditional SQL update.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use uuid::Uuid;

use super::{CaptureTransition, CartStore, OrderStore, PaymentRecord, StockDecrement, StockStore, VoucherStore};
use crate::model::{LineItem, Order, OrderStatus, PaymentStatus, ProductStock, Voucher};

#[derive(Debug, Default)]
pub struct MemoryStore {
  orders: RwLock<HashMap<Uuid, Order>>,
  stock: Mutex<HashMap<Uuid, i64>>,
  carts: Mutex<HashMap<Uuid, Vec<LineItem>>>,
  vouchers: RwLock<HashMap<String, Voucher>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_stock(&self, product_id: Uuid, total_stock: i64) {
    self.stock.lock().insert(product_id, total_stock);
  }

  pub fn seed_stock(&self, rows: impl IntoIterator<Item = ProductStock>) {
    let mut stock = self.stock.lock();
    for row in rows {
      stock.insert(row.product_id, row.total_stock);
    }
  }

  pub fn put_voucher(&self, voucher: Voucher) {
    let code = Voucher::normalize_code(&voucher.code);
    self.vouchers.write().insert(code, voucher);
  }

  pub fn put_cart(&self, user_id: Uuid, items: Vec<LineItem>) {
    self.carts.lock().insert(user_id, items);
  }

  pub fn has_cart(&self, user_id: Uuid) -> bool {
    self.carts.lock().contains_key(&user_id)
  }

  pub fn order_count(&self) -> usize {
    self.orders.read().len()
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn insert_order(&self, order: &Order) -> anyhow::Result<()> {
    let mut orders = self.orders.write();
    if orders.contains_key(&order.id) {
      anyhow::bail!("order {} already exists", order.id);
    }
    orders.insert(order.id, order.clone());
    Ok(())
  }

  async fn get_order(&self, order_id: Uuid) -> anyhow::Result<Option<Order>> {
    Ok(self.orders.read().get(&order_id).cloned())
  }

  async fn orders_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
    let mut found: Vec<Order> = self
      .orders
      .read()
      .values()
      .filter(|o| o.user_id == user_id)
      .cloned()
      .collect();
    found.sort_by(|a, b| b.order_date.cmp(&a.order_date));
    Ok(found)
  }

  async fn compare_and_set_status(
    &self,
    order_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
  ) -> anyhow::Result<Option<Order>> {
    let mut orders = self.orders.write();
    match orders.get_mut(&order_id) {
      Some(order) if order.order_status == from => {
        order.order_status = to;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
      }
      _ => Ok(None),
    }
  }

  async fn mark_paid(&self, order_id: Uuid, payment: &PaymentRecord) -> anyhow::Result<Option<CaptureTransition>> {
    let mut orders = self.orders.write();
    let Some(order) = orders.get_mut(&order_id) else {
      return Ok(None);
    };
    if order.payment_status == PaymentStatus::Paid {
      return Ok(Some(CaptureTransition::AlreadyPaid(order.clone())));
    }
    if order.order_status == OrderStatus::Rejected {
      return Ok(Some(CaptureTransition::Rejected(order.clone())));
    }
    order.payment_status = PaymentStatus::Paid;
    order.payment_id = Some(payment.payment_id.clone());
    order.payer_id = Some(payment.payer_id.clone());
    if let Some(target) = payment.advance_to {
      if order.order_status == OrderStatus::Pending {
        order.order_status = target;
      }
    }
    order.updated_at = Utc::now();
    Ok(Some(CaptureTransition::Captured(order.clone())))
  }

  async fn claim_stock_reservation(&self, order_id: Uuid) -> anyhow::Result<bool> {
    let mut orders = self.orders.write();
    match orders.get_mut(&order_id) {
      Some(order) if !order.stock_reserved => {
        order.stock_reserved = true;
        order.updated_at = Utc::now();
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn unclaim_stock_reservation(&self, order_id: Uuid) -> anyhow::Result<()> {
    if let Some(order) = self.orders.write().get_mut(&order_id) {
      order.stock_reserved = false;
      order.updated_at = Utc::now();
    }
    Ok(())
  }
}

#[async_trait]
impl StockStore for MemoryStore {
  async fn try_decrement(&self, product_id: Uuid, quantity: i64) -> anyhow::Result<StockDecrement> {
    let mut stock = self.stock.lock();
    let Some(total) = stock.get_mut(&product_id) else {
      return Ok(StockDecrement::UnknownProduct);
    };
    if *total < quantity {
      return Ok(StockDecrement::Insufficient { available: *total });
    }
    *total -= quantity;
    Ok(StockDecrement::Applied { remaining: *total })
  }

  async fn increment(&self, product_id: Uuid, quantity: i64) -> anyhow::Result<()> {
    match self.stock.lock().get_mut(&product_id) {
      Some(total) => {
        *total += quantity;
        Ok(())
      }
      None => anyhow::bail!("product {} has no stock record", product_id),
    }
  }

  async fn stock_of(&self, product_id: Uuid) -> anyhow::Result<Option<i64>> {
    Ok(self.stock.lock().get(&product_id).copied())
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn clear_cart(&self, user_id: Uuid) -> anyhow::Result<u64> {
    Ok(u64::from(self.carts.lock().remove(&user_id).is_some()))
  }
}

#[async_trait]
impl VoucherStore for MemoryStore {
  async fn find_voucher(&self, code: &str) -> anyhow::Result<Option<Voucher>> {
    Ok(self.vouchers.read().get(code).cloned())
  }
}
