// orderflow/src/workflow/contexts.rs

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::requests::{CreateOrderRequest, ValidatedOrder};
use super::OrderDeps;
use crate::error::{FlowError, OrderResult};
use crate::model::Order;
use crate::payment::{CaptureRequest, PaymentDetails, PaymentOutcome};
use crate::pricing::PriceBreakdown;

/// State of one `createOrder` run.
pub struct CreateOrderCtx {
  pub deps: Arc<OrderDeps>,
  pub request: CreateOrderRequest,
  pub now: DateTime<Utc>,

  pub validated: Option<ValidatedOrder>,
  pub priced: Option<PriceBreakdown>,
  pub order: Option<Order>,
  pub outcome: Option<PaymentOutcome>,
}

impl CreateOrderCtx {
  pub fn new(deps: Arc<OrderDeps>, request: CreateOrderRequest) -> Self {
    Self {
      deps,
      request,
      now: Utc::now(),
      validated: None,
      priced: None,
      order: None,
      outcome: None,
    }
  }
}

/// State of one capture run.
pub struct CaptureCtx {
  pub deps: Arc<OrderDeps>,
  pub request: CaptureRequest,

  pub order: Option<Order>,
  /// The order was already paid when the run found it; the gateway is not contacted.
  pub already_paid: bool,
  pub executed: Option<PaymentDetails>,
  /// This run performed the `pending → paid` move.
  pub captured_now: bool,
}

impl CaptureCtx {
  pub fn new(deps: Arc<OrderDeps>, request: CaptureRequest) -> Self {
    Self {
      deps,
      request,
      order: None,
      already_paid: false,
      executed: None,
      captured_now: false,
    }
  }
}

/// Reads a value an earlier step was expected to leave in the context.
pub(crate) fn produced<T: Clone>(slot: &Option<T>, what: &str) -> OrderResult<T> {
  slot
    .clone()
    .ok_or_else(|| FlowError::Internal(format!("{} missing from context", what)).into())
}
