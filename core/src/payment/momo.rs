// orderflow/src/payment/momo.rs

//! Sandbox MoMo wallet gateway.
//!
//! Simulates the wallet's create-payment call: it answers with a pay URL after a
//! short delay and refuses amounts outside the wallet's accepted range. Each pay
//! URL carries a fresh `requestId`, which is the payment id the payer comes back
//! with at capture.

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{Currency, PaymentDetails, PaymentExecutor, RedirectGateway};
use crate::model::Order;

/// Smallest amount (VND) the wallet accepts.
pub const MOMO_MIN_AMOUNT: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);
/// Largest amount (VND) the wallet accepts.
pub const MOMO_MAX_AMOUNT: Decimal = Decimal::from_parts(50_000_000, 0, 0, false, 0);

#[derive(Debug, Clone)]
pub struct MomoConfig {
  pub endpoint: String,
  pub partner_code: String,
  pub redirect_url: String,
}

impl Default for MomoConfig {
  fn default() -> Self {
    Self {
      endpoint: "https://test-payment.momo.vn/v2/gateway".to_string(),
      partner_code: "MOMO_SANDBOX".to_string(),
      redirect_url: "http://localhost:5173/shop/payment-success".to_string(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct SandboxMomoGateway {
  config: MomoConfig,
  latency: Duration,
  issued: Arc<Mutex<HashMap<String, PaymentDetails>>>,
}

impl SandboxMomoGateway {
  pub fn new(config: MomoConfig) -> Self {
    Self {
      config,
      latency: Duration::from_millis(50),
      issued: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }
}

#[async_trait]
impl RedirectGateway for SandboxMomoGateway {
  #[instrument(name = "SandboxMomoGateway::request_pay_url", skip(self, order), fields(order_id = %order.id, amount = %order.total_amount))]
  async fn request_pay_url(&self, order: &Order) -> anyhow::Result<String> {
    tokio::time::sleep(self.latency).await;

    let amount = order.total_amount;
    if amount < MOMO_MIN_AMOUNT || amount > MOMO_MAX_AMOUNT {
      warn!("Sandbox MoMo refused amount outside accepted range.");
      anyhow::bail!(
        "amount {} is outside the accepted range {}..={}",
        amount,
        MOMO_MIN_AMOUNT,
        MOMO_MAX_AMOUNT
      );
    }

    let request_id = format!("MOMO-{}", Uuid::new_v4().simple().to_string().to_uppercase());
    self.issued.lock().insert(
      request_id.clone(),
      PaymentDetails {
        payment_id: request_id.clone(),
        order_id: Some(order.id),
        amount,
        currency: Currency::Vnd,
        state: PaymentDetails::CREATED.to_string(),
      },
    );
    let url = format!(
      "{}/pay?partnerCode={}&orderId={}&requestId={}&amount={}&orderInfo=Order%20ID%3A%20{}&redirectUrl={}",
      self.config.endpoint.trim_end_matches('/'),
      self.config.partner_code,
      order.id,
      request_id,
      amount.round(),
      order.id,
      self.config.redirect_url,
    );
    info!(%request_id, "Sandbox MoMo pay URL created.");
    Ok(url)
  }
}

#[async_trait]
impl PaymentExecutor for SandboxMomoGateway {
  async fn payment_details(&self, payment_id: &str) -> anyhow::Result<Option<PaymentDetails>> {
    tokio::time::sleep(self.latency).await;
    Ok(self.issued.lock().get(payment_id).cloned())
  }

  /// Only ids issued with a pay URL are known. Payers whose id starts with
  /// `DECLINE` are refused.
  async fn execute_payment(&self, payment_id: &str, payer_id: &str) -> anyhow::Result<PaymentDetails> {
    tokio::time::sleep(self.latency).await;
    let mut issued = self.issued.lock();
    let Some(payment) = issued.get_mut(payment_id) else {
      warn!(payment_id, "Sandbox MoMo never issued this request.");
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
      PaymentDetails::APPROVED => anyhow::bail!("payment {} has already been executed", payment_id),
      _ => {}
    }
    info!(payment_id, state = %payment.state, "Sandbox MoMo payment executed.");
    Ok(payment.clone())
  }
}
