// orderflow/src/workflow/mod.rs

//! Order Lifecycle Manager: the operations callers invoke.
//!
//! `createOrder` and capture run as pipelines over a per-call context; the
//! remaining operations are single conditional writes or plain reads.

pub mod capture;
pub mod contexts;
pub mod create_order;
pub mod paypal;
pub mod requests;
pub mod status;

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{OrderError, OrderResult};
use crate::flow::{ContextData, Pipeline, PipelineResult};
use crate::inventory::InventoryAdjuster;
use crate::model::{Order, PaymentMethod};
use crate::notify::{NotificationDispatch, Notifier};
use crate::payment::{
  CaptureRequest, MomoConfig, PaymentCreator, PaymentDetails, PaymentDispatcher, PaymentExecutors, PaypalConfig,
  RedirectGateway, SandboxMomoGateway, SandboxPaypalGateway,
};
use crate::pricing::PricingEngine;
use crate::store::{CartStore, OrderStore, StockStore, VoucherStore};

pub use contexts::{CaptureCtx, CreateOrderCtx};
pub use requests::{
  CreateOrderRequest, CreatedOrder, PaypalPaymentCreated, PaypalPaymentRequest, StatusUpdate, ValidatedOrder,
};

/// Storage collaborators. One backend usually serves all four.
#[derive(Clone)]
pub struct Stores {
  pub orders: Arc<dyn OrderStore>,
  pub stock: Arc<dyn StockStore>,
  pub carts: Arc<dyn CartStore>,
  pub vouchers: Arc<dyn VoucherStore>,
}

impl Stores {
  pub fn shared<S>(store: Arc<S>) -> Self
  where
    S: OrderStore + StockStore + CartStore + VoucherStore + 'static,
  {
    Self {
      orders: store.clone(),
      stock: store.clone(),
      carts: store.clone(),
      vouchers: store,
    }
  }
}

/// Payment-provider collaborators.
#[derive(Clone)]
pub struct Gateways {
  pub momo: Arc<dyn RedirectGateway>,
  pub paypal: Arc<dyn PaymentCreator>,
  pub executors: PaymentExecutors,
}

impl Gateways {
  pub fn sandbox(momo: MomoConfig, paypal: PaypalConfig, latency: Duration) -> Self {
    let momo = Arc::new(SandboxMomoGateway::new(momo).with_latency(latency));
    let paypal = Arc::new(SandboxPaypalGateway::new(paypal).with_latency(latency));
    Self {
      momo: momo.clone(),
      paypal: paypal.clone(),
      executors: PaymentExecutors::new()
        .with(PaymentMethod::Momo, momo)
        .with(PaymentMethod::Paypal, paypal),
    }
  }
}

/// Everything a workflow step may reach, carried inside each run's context.
pub struct OrderDeps {
  pub orders: Arc<dyn OrderStore>,
  pub carts: Arc<dyn CartStore>,
  pub vouchers: Arc<dyn VoucherStore>,
  pub pricing: PricingEngine,
  pub inventory: InventoryAdjuster,
  pub dispatcher: PaymentDispatcher,
  pub executors: PaymentExecutors,
  pub paypal: Arc<dyn PaymentCreator>,
  pub notifications: NotificationDispatch,
}

#[derive(Clone)]
pub struct OrderService {
  deps: Arc<OrderDeps>,
  create_pipeline: Arc<Pipeline<CreateOrderCtx, OrderError>>,
  capture_pipeline: Arc<Pipeline<CaptureCtx, OrderError>>,
}

impl OrderService {
  pub fn new(stores: Stores, gateways: Gateways, notifier: Arc<dyn Notifier>) -> Self {
    let deps = OrderDeps {
      orders: stores.orders,
      carts: stores.carts,
      vouchers: stores.vouchers,
      pricing: PricingEngine::new(),
      inventory: InventoryAdjuster::new(stores.stock),
      dispatcher: PaymentDispatcher::new(gateways.momo),
      executors: gateways.executors,
      paypal: gateways.paypal,
      notifications: NotificationDispatch::new(notifier),
    };
    Self {
      deps: Arc::new(deps),
      create_pipeline: Arc::new(create_order::create_order_pipeline()),
      capture_pipeline: Arc::new(capture::capture_pipeline()),
    }
  }

  pub fn deps(&self) -> &OrderDeps {
    &self.deps
  }

  /// Validates, prices, reserves stock, persists, clears the user's cart and
  /// dispatches payment, in that order.
  #[instrument(name = "OrderService::create_order", skip(self, request), fields(user_id = ?request.user_id, method = ?request.payment_method))]
  pub async fn create_order(&self, request: CreateOrderRequest) -> OrderResult<CreatedOrder> {
    let ctx_data = ContextData::new(CreateOrderCtx::new(self.deps.clone(), request));
    let result = self.create_pipeline.run(ctx_data.clone()).await?;
    ensure_completed(self.create_pipeline.name(), result)?;

    let created = ctx_data.with(create_order::created_order)?;
    info!(order_id = %created.order.id, outcome = ?created.outcome, "Order created.");
    Ok(created)
  }

  #[instrument(name = "OrderService::capture", skip(self, request), fields(order_id = ?request.order_id, payment_id = %request.payment_id))]
  pub async fn capture(&self, request: CaptureRequest) -> OrderResult<Order> {
    let ctx_data = ContextData::new(CaptureCtx::new(self.deps.clone(), request));
    let result = self.capture_pipeline.run(ctx_data.clone()).await?;
    ensure_completed(self.capture_pipeline.name(), result)?;
    ctx_data.with(|ctx| contexts::produced(&ctx.order, "order"))
  }

  #[instrument(name = "OrderService::get_order", skip(self))]
  pub async fn get_order(&self, order_id: Uuid) -> OrderResult<Order> {
    self
      .deps
      .orders
      .get_order(order_id)
      .await
      .map_err(OrderError::storage)?
      .ok_or_else(|| OrderError::NotFound(format!("order {}", order_id)))
  }

  /// Newest first. A user without orders is `NotFound`.
  #[instrument(name = "OrderService::orders_for_user", skip(self))]
  pub async fn orders_for_user(&self, user_id: Uuid) -> OrderResult<Vec<Order>> {
    let orders = self
      .deps
      .orders
      .orders_for_user(user_id)
      .await
      .map_err(OrderError::storage)?;
    if orders.is_empty() {
      return Err(OrderError::NotFound(format!("no orders for user {}", user_id)));
    }
    Ok(orders)
  }

  /// `new_status` arrives as its wire name; unknown names are `InvalidRequest`.
  #[instrument(name = "OrderService::update_order_status", skip(self))]
  pub async fn update_order_status(&self, order_id: Uuid, new_status: &str) -> OrderResult<StatusUpdate> {
    status::update_order_status(&self.deps, order_id, new_status).await
  }

  /// Dispatches payment again for an order left as a `pending/pending` draft.
  #[instrument(name = "OrderService::retry_payment", skip(self))]
  pub async fn retry_payment(&self, order_id: Uuid) -> OrderResult<CreatedOrder> {
    let order = self.get_order(order_id).await?;
    if !order.is_retryable_draft() {
      warn!(%order_id, payment = %order.payment_status, status = %order.order_status, "Order is not awaiting payment.");
      return Err(OrderError::InvalidRequest(format!(
        "order {} is not awaiting payment ({}/{})",
        order_id, order.payment_status, order.order_status
      )));
    }
    let outcome = self.deps.dispatcher.dispatch(&order).await?;
    Ok(CreatedOrder { order, outcome })
  }

  pub async fn create_paypal_payment(&self, request: PaypalPaymentRequest) -> OrderResult<PaypalPaymentCreated> {
    paypal::create_paypal_payment(&self.deps, request).await
  }

  pub async fn paypal_payment_details(&self, payment_id: &str) -> OrderResult<PaymentDetails> {
    paypal::paypal_payment_details(&self.deps, payment_id).await
  }
}

// Every step of both pipelines either continues or fails, so a stop is a wiring fault.
fn ensure_completed(pipeline: &str, result: PipelineResult) -> OrderResult<()> {
  match result {
    PipelineResult::Completed => Ok(()),
    PipelineResult::Stopped { step } => Err(OrderError::from(crate::error::FlowError::Internal(format!(
      "pipeline '{}' stopped unexpectedly at step '{}'",
      pipeline, step
    )))),
  }
}
