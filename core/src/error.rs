// orderflow/src/error.rs

//! Error taxonomy for the order workflows.
//!
//! `FlowError` covers failures of the step engine itself (missing handlers,
//! unmatched branches). `OrderError` is what the order operations return; every
//! variant maps to one caller-visible failure class.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::model::OrderStatus;

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No branch matched key '{key}' in step '{step_name}'")]
  NoBranchMatched { step_name: String, key: String },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

#[derive(Debug, Error)]
pub enum OrderError {
  /// Malformed or missing input. Always detected before any side effect.
  #[error("Invalid request: {0}")]
  InvalidRequest(String),

  #[error("Voucher rejected: {0}")]
  VoucherInvalid(String),

  #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
  InsufficientStock {
    product_id: Uuid,
    requested: i64,
    available: i64,
  },

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Illegal order status transition from {from} to {to}")]
  IllegalTransition { from: OrderStatus, to: OrderStatus },

  /// The payment provider failed. The order, if already persisted, stays a retryable draft.
  #[error("Payment gateway error: {0}")]
  GatewayError(String),

  #[error("Payment not approved (state: {state})")]
  PaymentNotApproved { state: String },

  #[error("Storage error: {source}")]
  Storage {
    #[source]
    source: anyhow::Error,
  },

  #[error("Workflow error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },
}

impl OrderError {
  pub fn storage(err: impl Into<anyhow::Error>) -> Self {
    OrderError::Storage { source: err.into() }
  }

  pub fn insufficient(product_id: Uuid, requested: i64, available: i64) -> Self {
    OrderError::InsufficientStock {
      product_id,
      requested,
      available,
    }
  }

  pub fn voucher_below_minimum(min_order_amount: Decimal) -> Self {
    OrderError::VoucherInvalid(format!(
      "order total does not reach the voucher minimum of {}",
      min_order_amount
    ))
  }

  /// Short machine-readable name of the failure class, used in logs and response bodies.
  pub fn kind(&self) -> &'static str {
    match self {
      OrderError::InvalidRequest(_) => "InvalidRequest",
      OrderError::VoucherInvalid(_) => "VoucherInvalid",
      OrderError::InsufficientStock { .. } => "InsufficientStock",
      OrderError::NotFound(_) => "NotFound",
      OrderError::IllegalTransition { .. } => "IllegalTransition",
      OrderError::GatewayError(_) => "GatewayError",
      OrderError::PaymentNotApproved { .. } => "PaymentNotApproved",
      OrderError::Storage { .. } => "Storage",
      OrderError::Workflow { .. } => "Workflow",
    }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
pub type OrderResult<T, E = OrderError> = std::result::Result<T, E>;
