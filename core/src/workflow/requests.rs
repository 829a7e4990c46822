// orderflow/src/workflow/requests.rs

//! Inputs and results of the order operations, in their wire shape.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{OrderError, OrderResult};
use crate::model::line_item::merged_quantities;
use crate::model::{LineItem, Order, PaymentMethod, Voucher};
use crate::pricing::PricingEngine;
use crate::payment::{Currency, PaymentOutcome};

/// Order-creation request as submitted by the client.
///
/// Required fields are optional here so that a missing one is reported as
/// `InvalidRequest` by validation rather than as a decoding failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
  pub user_id: Option<Uuid>,
  #[serde(default, alias = "cartItems")]
  pub line_items: Vec<LineItem>,
  pub address_id: Option<Uuid>,
  pub payment_method: Option<String>,
  #[serde(default)]
  pub voucher_code: Option<String>,
}

/// A request that passed validation. Nothing has been touched yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrder {
  pub user_id: Uuid,
  pub address_id: Uuid,
  pub payment_method: PaymentMethod,
  pub line_items: Vec<LineItem>,
  /// Upper-cased.
  pub voucher_code: Option<String>,
}

impl CreateOrderRequest {
  pub fn validate(&self) -> OrderResult<ValidatedOrder> {
    let user_id = self
      .user_id
      .ok_or_else(|| OrderError::InvalidRequest("userId is required".to_string()))?;
    let address_id = self
      .address_id
      .ok_or_else(|| OrderError::InvalidRequest("addressId is required".to_string()))?;
    let payment_method: PaymentMethod = self
      .payment_method
      .as_deref()
      .ok_or_else(|| OrderError::InvalidRequest("paymentMethod is required".to_string()))?
      .parse()?;

    if self.line_items.is_empty() {
      return Err(OrderError::InvalidRequest("at least one line item is required".to_string()));
    }
    for item in &self.line_items {
      if item.quantity <= 0 {
        return Err(OrderError::InvalidRequest(format!(
          "quantity for product {} must be positive",
          item.product_id
        )));
      }
      if item.unit_price < Decimal::ZERO {
        return Err(OrderError::InvalidRequest(format!(
          "unit price for product {} must not be negative",
          item.product_id
        )));
      }
    }
    merged_quantities(&self.line_items)?;
    PricingEngine::new().raw_total(&self.line_items)?;

    let voucher_code = self
      .voucher_code
      .as_deref()
      .map(Voucher::normalize_code)
      .filter(|code| !code.is_empty());

    Ok(ValidatedOrder {
      user_id,
      address_id,
      payment_method,
      line_items: self.line_items.clone(),
      voucher_code,
    })
  }
}

/// A persisted order and what the client must do to pay for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedOrder {
  pub order: Order,
  pub outcome: PaymentOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
  /// 0 when the order already had the requested status.
  pub modified_count: u64,
  pub order: Order,
}

/// Client request to open a PayPal payment, optionally for a stored order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalPaymentRequest {
  pub amount: Option<Decimal>,
  pub currency: Option<String>,
  pub description: Option<String>,
  pub order_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalPaymentCreated {
  pub approval_url: String,
  pub payment_id: String,
  pub order_id: Option<Uuid>,
  pub original_amount: Decimal,
  pub original_currency: Currency,
  pub converted_amount: Decimal,
  pub converted_currency: Currency,
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  fn complete() -> CreateOrderRequest {
    CreateOrderRequest {
      user_id: Some(Uuid::new_v4()),
      line_items: vec![LineItem::new(Uuid::new_v4(), 1, dec!(1000))],
      address_id: Some(Uuid::new_v4()),
      payment_method: Some("cash".to_string()),
      voucher_code: Some(" summer10 ".to_string()),
    }
  }

  #[test]
  fn normalises_voucher_code() {
    let validated = complete().validate().unwrap();
    assert_eq!(validated.voucher_code.as_deref(), Some("SUMMER10"));
    assert_eq!(validated.payment_method, PaymentMethod::Cash);
  }

  #[test]
  fn rejects_missing_or_malformed_fields() {
    let mut no_user = complete();
    no_user.user_id = None;
    let mut no_items = complete();
    no_items.line_items.clear();
    let mut bad_method = complete();
    bad_method.payment_method = Some("bitcoin".to_string());
    let mut zero_quantity = complete();
    zero_quantity.line_items[0].quantity = 0;

    for request in [no_user, no_items, bad_method, zero_quantity] {
      assert!(matches!(request.validate(), Err(OrderError::InvalidRequest(_))));
    }
  }

  #[test]
  fn decodes_cart_items_alias() {
    let json = format!(
      r#"{{"userId":"{}","cartItems":[{{"productId":"{}","quantity":2,"price":500}}],"addressId":"{}","paymentMethod":"momo"}}"#,
      Uuid::new_v4(),
      Uuid::new_v4(),
      Uuid::new_v4()
    );
    let request: CreateOrderRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(request.line_items.len(), 1);
    assert_eq!(request.validate().unwrap().payment_method, PaymentMethod::Momo);
  }
}
