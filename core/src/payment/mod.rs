// orderflow/src/payment/mod.rs

//! Payment Dispatcher & Capture Handler building blocks.
//!
//! Gateways are reached through three narrow capabilities: requesting a
//! redirect URL (momo), creating a payment that the payer approves elsewhere
//! (paypal), and executing an approved payment at capture time (both).

pub mod capture;
pub mod currency;
pub mod dispatch;
pub mod momo;
pub mod paypal;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{OrderError, OrderResult};
use crate::model::{Order, PaymentMethod};

pub use capture::{expected_charge, CapturePolicy, CaptureRequest};
pub use currency::Currency;
pub use dispatch::PaymentDispatcher;
pub use momo::{MomoConfig, SandboxMomoGateway};
pub use paypal::{PaypalConfig, SandboxPaypalGateway};

/// What the caller has to do next once an order has been dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PaymentOutcome {
  /// Settled without a gateway (cash on delivery).
  Immediate { success: bool },
  /// The payer continues at `url`.
  Redirect { url: String },
  /// A separate create-payment call and a later capture finish the payment.
  RequiresExternalCapture,
}

/// A payment to be created with a gateway that charges in `currency`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
  pub order_id: Option<Uuid>,
  pub amount: Decimal,
  pub currency: Currency,
  pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPayment {
  pub payment_id: String,
  pub approval_url: String,
}

/// A payment as the issuing gateway records it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
  pub payment_id: String,
  /// Order the payment was issued for. `None` for a bare-amount payment.
  pub order_id: Option<Uuid>,
  pub amount: Decimal,
  pub currency: Currency,
  pub state: String,
}

impl PaymentDetails {
  pub const CREATED: &'static str = "created";
  pub const APPROVED: &'static str = "approved";
  pub const FAILED: &'static str = "failed";

  pub fn is_approved(&self) -> bool {
    self.state == Self::APPROVED
  }
}

#[async_trait]
pub trait RedirectGateway: Send + Sync {
  async fn request_pay_url(&self, order: &Order) -> anyhow::Result<String>;
}

#[async_trait]
pub trait PaymentCreator: Send + Sync {
  async fn create_payment(&self, request: &PaymentRequest) -> anyhow::Result<CreatedPayment>;
}

#[async_trait]
pub trait PaymentExecutor: Send + Sync {
  /// `None` if the gateway never issued `payment_id`.
  async fn payment_details(&self, payment_id: &str) -> anyhow::Result<Option<PaymentDetails>>;

  /// Transport failures, unknown ids and repeated executions are errors; a
  /// declined payment is an `Ok` with a non-approved state.
  async fn execute_payment(&self, payment_id: &str, payer_id: &str) -> anyhow::Result<PaymentDetails>;
}

/// The execute-payment capability of each gateway, keyed by the method that issued the payment.
#[derive(Clone, Default)]
pub struct PaymentExecutors {
  by_method: HashMap<PaymentMethod, Arc<dyn PaymentExecutor>>,
}

impl PaymentExecutors {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, method: PaymentMethod, executor: Arc<dyn PaymentExecutor>) -> Self {
    self.by_method.insert(method, executor);
    self
  }

  pub fn for_method(&self, method: PaymentMethod) -> OrderResult<Arc<dyn PaymentExecutor>> {
    self
      .by_method
      .get(&method)
      .cloned()
      .ok_or_else(|| OrderError::InvalidRequest(format!("{} payments cannot be captured", method)))
  }
}
