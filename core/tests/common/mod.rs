// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use once_cell::sync::Lazy;
use orderflow::flow::{ContextData, Handler, PipelineControl};
use orderflow::payment::{MomoConfig, PaypalConfig};
use orderflow::store::{CaptureTransition, PaymentRecord};
use orderflow::{
  CreateOrderRequest, FlowError, Gateways, LineItem, MemoryStore, Notifier, Order, OrderEvent, OrderService, OrderStatus,
  OrderStore, PaymentOutcome, ProductStock, Stores, Voucher, VoucherKind,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

// --- Flow engine fixtures ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub steps_executed: Vec<String>,
  pub route: Option<String>,
  pub skip_b: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Flow error: {0}")]
  Flow(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    TestError::Flow(format!("{:?}", fe))
  }
}

pub fn recording_handler(step_name: &'static str) -> Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.steps_executed.push(step_name.to_string());
      Ok(PipelineControl::Continue)
    })
  })
}

// --- Tracing ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Notifier that remembers what it was asked to send ---
#[derive(Default)]
pub struct RecordingNotifier {
  pub events: Mutex<Vec<(Uuid, OrderEvent)>>,
  pub fail: AtomicBool,
}

impl RecordingNotifier {
  pub fn failing() -> Self {
    let notifier = Self::default();
    notifier.fail.store(true, Ordering::SeqCst);
    notifier
  }

  pub fn events(&self) -> Vec<(Uuid, OrderEvent)> {
    self.events.lock().clone()
  }
}

#[async_trait]
impl Notifier for RecordingNotifier {
  async fn notify(&self, user_id: Uuid, event: &OrderEvent) -> anyhow::Result<()> {
    self.events.lock().push((user_id, event.clone()));
    if self.fail.load(Ordering::SeqCst) {
      anyhow::bail!("mail transport unavailable");
    }
    Ok(())
  }
}

// --- Order store whose inserts always fail ---
pub struct BrokenInsertStore(pub Arc<MemoryStore>);

#[async_trait]
impl OrderStore for BrokenInsertStore {
  async fn insert_order(&self, _order: &Order) -> anyhow::Result<()> {
    anyhow::bail!("connection reset")
  }

  async fn get_order(&self, order_id: Uuid) -> anyhow::Result<Option<Order>> {
    self.0.get_order(order_id).await
  }

  async fn orders_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
    self.0.orders_for_user(user_id).await
  }

  async fn compare_and_set_status(
    &self,
    order_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
  ) -> anyhow::Result<Option<Order>> {
    self.0.compare_and_set_status(order_id, from, to).await
  }

  async fn mark_paid(&self, order_id: Uuid, payment: &PaymentRecord) -> anyhow::Result<Option<CaptureTransition>> {
    self.0.mark_paid(order_id, payment).await
  }

  async fn claim_stock_reservation(&self, order_id: Uuid) -> anyhow::Result<bool> {
    self.0.claim_stock_reservation(order_id).await
  }

  async fn unclaim_stock_reservation(&self, order_id: Uuid) -> anyhow::Result<()> {
    self.0.unclaim_stock_reservation(order_id).await
  }
}

// --- A storefront wired to the in-memory store and sandbox gateways ---
pub struct TestShop {
  pub store: Arc<MemoryStore>,
  pub notifier: Arc<RecordingNotifier>,
  pub service: OrderService,
}

impl TestShop {
  pub fn new() -> Self {
    Self::with_notifier(RecordingNotifier::default())
  }

  pub fn with_notifier(notifier: RecordingNotifier) -> Self {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(notifier);
    let service = OrderService::new(Stores::shared(store.clone()), sandbox_gateways(), notifier.clone());
    Self {
      store,
      notifier,
      service,
    }
  }

  pub fn with_broken_inserts() -> Self {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let mut stores = Stores::shared(store.clone());
    stores.orders = Arc::new(BrokenInsertStore(store.clone()));
    let service = OrderService::new(stores, sandbox_gateways(), notifier.clone());
    Self {
      store,
      notifier,
      service,
    }
  }

  pub fn product(&self, total_stock: i64) -> Uuid {
    let product_id = Uuid::new_v4();
    self.store.seed_stock([ProductStock {
      product_id,
      total_stock,
    }]);
    product_id
  }

  pub async fn stock(&self, product_id: Uuid) -> i64 {
    use orderflow::StockStore;
    self.store.stock_of(product_id).await.unwrap().unwrap()
  }
}

/// The wallet payment id carried by a MoMo pay URL.
pub fn momo_payment_id(outcome: &PaymentOutcome) -> String {
  match outcome {
    PaymentOutcome::Redirect { url } => url
      .split(['?', '&'])
      .find_map(|pair| pair.strip_prefix("requestId="))
      .expect("pay URL carries a requestId")
      .to_string(),
    other => panic!("expected a MoMo redirect, got {:?}", other),
  }
}

pub fn sandbox_gateways() -> Gateways {
  Gateways::sandbox(MomoConfig::default(), PaypalConfig::default(), Duration::ZERO)
}

pub fn order_request(user_id: Uuid, items: Vec<LineItem>, method: &str) -> CreateOrderRequest {
  CreateOrderRequest {
    user_id: Some(user_id),
    line_items: items,
    address_id: Some(Uuid::new_v4()),
    payment_method: Some(method.to_string()),
    voucher_code: None,
  }
}

pub fn voucher(code: &str, kind: VoucherKind, value: Decimal) -> Voucher {
  Voucher {
    code: code.to_string(),
    kind,
    value,
    max_discount: None,
    min_order_amount: Decimal::ZERO,
    is_active: true,
    expired_at: None,
  }
}
