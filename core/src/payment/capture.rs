// orderflow/src/payment/capture.rs

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::currency::{vnd_to_usd, Currency};
use crate::error::{OrderError, OrderResult};
use crate::model::{Order, OrderStatus, PaymentMethod};

/// Confirmation sent back by the client after the payer approved the payment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
  pub order_id: Option<Uuid>,
  #[serde(default)]
  pub payment_id: String,
  #[serde(default)]
  pub payer_id: String,
}

impl CaptureRequest {
  pub fn new(order_id: Uuid, payment_id: impl Into<String>, payer_id: impl Into<String>) -> Self {
    Self {
      order_id: Some(order_id),
      payment_id: payment_id.into(),
      payer_id: payer_id.into(),
    }
  }

  pub fn validated_order_id(&self) -> OrderResult<Uuid> {
    let order_id = self
      .order_id
      .ok_or_else(|| OrderError::InvalidRequest("orderId is required".to_string()))?;
    if self.payment_id.trim().is_empty() || self.payer_id.trim().is_empty() {
      return Err(OrderError::InvalidRequest("paymentId and payerId are required".to_string()));
    }
    Ok(order_id)
  }
}

/// What a gateway charging in `currency` must collect for `order`.
pub fn expected_charge(order: &Order, currency: Currency) -> OrderResult<Decimal> {
  match currency {
    Currency::Vnd => Ok(order.total_amount),
    Currency::Usd => vnd_to_usd(order.total_amount),
  }
}

/// How a successful capture moves the order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePolicy {
  /// A still-pending order advances to the given status.
  AdvanceTo(OrderStatus),
  KeepStatus,
}

impl CapturePolicy {
  pub fn for_method(method: PaymentMethod) -> OrderResult<Self> {
    match method {
      PaymentMethod::Paypal => Ok(CapturePolicy::AdvanceTo(OrderStatus::Confirmed)),
      PaymentMethod::Momo => Ok(CapturePolicy::KeepStatus),
      PaymentMethod::Cash => Err(OrderError::InvalidRequest(
        "cash orders are settled on delivery and are never captured".to_string(),
      )),
    }
  }

  pub fn advance_to(&self) -> Option<OrderStatus> {
    match self {
      CapturePolicy::AdvanceTo(status) => Some(*status),
      CapturePolicy::KeepStatus => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn policy_per_method() {
    assert_eq!(
      CapturePolicy::for_method(PaymentMethod::Paypal).unwrap().advance_to(),
      Some(OrderStatus::Confirmed)
    );
    assert_eq!(CapturePolicy::for_method(PaymentMethod::Momo).unwrap().advance_to(), None);
    assert!(CapturePolicy::for_method(PaymentMethod::Cash).is_err());
  }

  #[test]
  fn capture_request_requires_all_ids() {
    let missing_payer = CaptureRequest::new(Uuid::new_v4(), "PAYID-1", " ");
    assert!(matches!(missing_payer.validated_order_id(), Err(OrderError::InvalidRequest(_))));

    let no_order = CaptureRequest {
      order_id: None,
      payment_id: "PAYID-1".into(),
      payer_id: "PAYER".into(),
    };
    assert!(no_order.validated_order_id().is_err());
  }
}
