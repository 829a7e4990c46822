// orderflow/src/payment/paypal.rs

//! Sandbox PayPal gateway: payment creation with an approval link, and execution.

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{CreatedPayment, Currency, PaymentCreator, PaymentDetails, PaymentExecutor, PaymentRequest};

#[derive(Debug, Clone)]
pub struct PaypalConfig {
  /// Where payers are sent to approve a payment.
  pub base_url: String,
  /// Public base URL of this service, used for the return and cancel links.
  pub app_base_url: String,
}

impl Default for PaypalConfig {
  fn default() -> Self {
    Self {
      base_url: "https://www.sandbox.paypal.com".to_string(),
      app_base_url: "http://localhost:5000".to_string(),
    }
  }
}

#[derive(Debug, Clone)]
struct SandboxPayment {
  order_id: Option<Uuid>,
  amount: Decimal,
  currency: Currency,
  state: String,
  return_url: String,
}

#[derive(Debug)]
pub struct SandboxPaypalGateway {
  config: PaypalConfig,
  latency: Duration,
  payments: Mutex<HashMap<String, SandboxPayment>>,
}

impl SandboxPaypalGateway {
  pub fn new(config: PaypalConfig) -> Self {
    Self {
      config,
      latency: Duration::from_millis(50),
      payments: Mutex::new(HashMap::new()),
    }
  }

  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  fn redirect_url(&self, outcome: &str, order_id: Option<Uuid>) -> String {
    format!(
      "{}/api/v1/payments/paypal/{}?orderId={}",
      self.config.app_base_url.trim_end_matches('/'),
      outcome,
      order_id.map(|id| id.to_string()).unwrap_or_default()
    )
  }
}

#[async_trait]
impl PaymentCreator for SandboxPaypalGateway {
  #[instrument(name = "SandboxPaypalGateway::create_payment", skip(self, request), fields(amount = %request.amount, currency = %request.currency))]
  async fn create_payment(&self, request: &PaymentRequest) -> anyhow::Result<CreatedPayment> {
    tokio::time::sleep(self.latency).await;
    if request.currency != Currency::Usd {
      anyhow::bail!("sandbox PayPal only charges USD, got {}", request.currency);
    }
    if request.amount <= Decimal::ZERO {
      anyhow::bail!("amount must be positive, got {}", request.amount);
    }

    let payment_id = format!("PAYID-{}", Uuid::new_v4().simple().to_string().to_uppercase());
    let payment = SandboxPayment {
      order_id: request.order_id,
      amount: request.amount,
      currency: request.currency,
      state: PaymentDetails::CREATED.to_string(),
      return_url: self.redirect_url("success", request.order_id),
    };
    info!(%payment_id, return_url = %payment.return_url, cancel_url = %self.redirect_url("cancel", request.order_id), description = %request.description, "Sandbox PayPal payment created.");
    self.payments.lock().insert(payment_id.clone(), payment);

    Ok(CreatedPayment {
      approval_url: format!(
        "{}/checkoutnow?token={}",
        self.config.base_url.trim_end_matches('/'),
        payment_id
      ),
      payment_id,
    })
  }
}

impl SandboxPayment {
  fn details(&self, payment_id: &str) -> PaymentDetails {
    PaymentDetails {
      payment_id: payment_id.to_string(),
      order_id: self.order_id,
      amount: self.amount,
      currency: self.currency,
      state: self.state.clone(),
    }
  }
}

#[async_trait]
impl PaymentExecutor for SandboxPaypalGateway {
  async fn payment_details(&self, payment_id: &str) -> anyhow::Result<Option<PaymentDetails>> {
    tokio::time::sleep(self.latency).await;
    Ok(self.payments.lock().get(payment_id).map(|p| p.details(payment_id)))
  }

  /// Unknown payment ids are a gateway failure, and so is executing an approved
  /// payment again. Payers whose id starts with `DECLINE` leave the payment in
  /// state `failed`.
  async fn execute_payment(&self, payment_id: &str, payer_id: &str) -> anyhow::Result<PaymentDetails> {
    tokio::time::sleep(self.latency).await;
    let mut payments = self.payments.lock();
    let Some(payment) = payments.get_mut(payment_id) else {
      warn!(payment_id, "Sandbox PayPal has no such payment.");
      anyhow::bail!("payment {} not found", payment_id);
    };
    match payment.state.as_str() {
      PaymentDetails::CREATED => {
        payment.state = if payer_id.starts_with("DECLINE") {
          PaymentDetails::FAILED.to_string()
        } else {
          PaymentDetails::APPROVED.to_string()
        };
      }
      PaymentDetails::APPROVED => {
        warn!(payment_id, "Sandbox PayPal payment was already executed.");
        anyhow::bail!("payment {} has already been executed", payment_id);
      }
      _ => {}
    }
    info!(payment_id, amount = %payment.amount, currency = %payment.currency, state = %payment.state, "Sandbox PayPal payment executed.");
    Ok(payment.details(payment_id))
  }
}
