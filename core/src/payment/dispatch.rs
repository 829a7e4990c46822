// orderflow/src/payment/dispatch.rs

use std::sync::Arc;
use tracing::{error, info, instrument};

use super::{PaymentOutcome, RedirectGateway};
use crate::error::{OrderError, OrderResult};
use crate::model::{Order, PaymentMethod};

/// Routes a persisted order to its payment method.
#[derive(Clone)]
pub struct PaymentDispatcher {
  momo: Arc<dyn RedirectGateway>,
}

impl PaymentDispatcher {
  pub fn new(momo: Arc<dyn RedirectGateway>) -> Self {
    Self { momo }
  }

  #[instrument(name = "PaymentDispatcher::dispatch", skip(self, order), fields(order_id = %order.id, method = %order.payment_method))]
  pub async fn dispatch(&self, order: &Order) -> OrderResult<PaymentOutcome> {
    match order.payment_method {
      PaymentMethod::Cash => Ok(self.dispatch_cash(order)),
      PaymentMethod::Momo => self.dispatch_momo(order).await,
      PaymentMethod::Paypal => Ok(self.dispatch_paypal(order)),
    }
  }

  pub fn dispatch_cash(&self, order: &Order) -> PaymentOutcome {
    info!(order_id = %order.id, "Cash order ready for fulfilment.");
    PaymentOutcome::Immediate { success: true }
  }

  /// A gateway failure leaves the order untouched as a retryable draft.
  pub async fn dispatch_momo(&self, order: &Order) -> OrderResult<PaymentOutcome> {
    match self.momo.request_pay_url(order).await {
      Ok(url) => {
        info!(order_id = %order.id, "MoMo pay URL issued.");
        Ok(PaymentOutcome::Redirect { url })
      }
      Err(e) => {
        error!(order_id = %order.id, error = %e, "MoMo payment request failed.");
        Err(OrderError::GatewayError(format!(
          "momo payment request failed for order {}: {}",
          order.id, e
        )))
      }
    }
  }

  /// No gateway call here; the payment is created by a separate client request.
  pub fn dispatch_paypal(&self, order: &Order) -> PaymentOutcome {
    info!(order_id = %order.id, "PayPal order awaits external payment.");
    PaymentOutcome::RequiresExternalCapture
  }
}
