// orderflow/src/store/mod.rs

//! Storage seams used by the order workflows.
//!
//! Every mutation that guards an invariant is a single conditional operation
//! at this boundary: stock is decremented only when enough is left, order
//! status moves only from the status the caller last saw, and payment moves
//! `pending → paid` at most once.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{Order, OrderStatus, Voucher};

pub use memory::MemoryStore;

/// Result of one conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecrement {
  Applied { remaining: i64 },
  Insufficient { available: i64 },
  UnknownProduct,
}

/// Result of the `pending → paid` compare-and-set.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureTransition {
  /// This call moved the order to paid.
  Captured(Order),
  /// Another call got there first; the stored order is returned as is.
  AlreadyPaid(Order),
  /// The order was rejected before it was paid and stays unpaid.
  Rejected(Order),
}

/// Payment details recorded on capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
  pub payment_id: String,
  pub payer_id: String,
  /// Status to move a still-pending order to, if the capture policy advances it.
  pub advance_to: Option<OrderStatus>,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn insert_order(&self, order: &Order) -> anyhow::Result<()>;

  async fn get_order(&self, order_id: Uuid) -> anyhow::Result<Option<Order>>;

  /// Newest first.
  async fn orders_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>>;

  /// Sets the order status to `to` only while the stored status is still `from`.
  /// `None` means the status moved under the caller (or the order is gone).
  async fn compare_and_set_status(
    &self,
    order_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
  ) -> anyhow::Result<Option<Order>>;

  /// Moves payment `pending → paid` and records `payment`, unless the order was
  /// rejected. `None` if the order does not exist.
  async fn mark_paid(&self, order_id: Uuid, payment: &PaymentRecord) -> anyhow::Result<Option<CaptureTransition>>;

  /// Sets `stock_reserved` if it was clear. Returns whether this call set it.
  async fn claim_stock_reservation(&self, order_id: Uuid) -> anyhow::Result<bool>;

  async fn unclaim_stock_reservation(&self, order_id: Uuid) -> anyhow::Result<()>;
}

#[async_trait]
pub trait StockStore: Send + Sync {
  /// Decrements `product_id` by `quantity` only if at least `quantity` is in stock.
  async fn try_decrement(&self, product_id: Uuid, quantity: i64) -> anyhow::Result<StockDecrement>;

  async fn increment(&self, product_id: Uuid, quantity: i64) -> anyhow::Result<()>;

  async fn stock_of(&self, product_id: Uuid) -> anyhow::Result<Option<i64>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  /// Removes the user's cart. Returns the number of carts removed (0 or 1).
  async fn clear_cart(&self, user_id: Uuid) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait VoucherStore: Send + Sync {
  /// `code` is already normalised to upper case.
  async fn find_voucher(&self, code: &str) -> anyhow::Result<Option<Voucher>>;
}
