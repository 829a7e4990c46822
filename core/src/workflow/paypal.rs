// orderflow/src/workflow/paypal.rs

//! Client-initiated PayPal payment creation.
//!
//! Runs outside `createOrder`: the client calls it for a paypal order, sends the
//! payer to the approval URL, then confirms through capture.

use rust_decimal::Decimal;
use tracing::{info, instrument};

use super::requests::{PaypalPaymentCreated, PaypalPaymentRequest};
use super::OrderDeps;
use crate::error::{OrderError, OrderResult};
use crate::model::PaymentMethod;
use crate::payment::currency::{format_currency, vnd_to_usd};
use crate::payment::{expected_charge, Currency, PaymentDetails, PaymentRequest};

const DEFAULT_DESCRIPTION: &str = "Storefront payment";

#[instrument(name = "create_paypal_payment", skip(deps, request), fields(order_id = ?request.order_id))]
pub(crate) async fn create_paypal_payment(
  deps: &OrderDeps,
  request: PaypalPaymentRequest,
) -> OrderResult<PaypalPaymentCreated> {
  let order = match request.order_id {
    Some(order_id) => {
      let order = deps
        .orders
        .get_order(order_id)
        .await
        .map_err(OrderError::storage)?
        .ok_or_else(|| OrderError::NotFound(format!("order {}", order_id)))?;
      if order.payment_method != PaymentMethod::Paypal {
        return Err(OrderError::InvalidRequest(format!(
          "order {} is paid with {}, not paypal",
          order_id, order.payment_method
        )));
      }
      if order.is_paid() {
        return Err(OrderError::InvalidRequest(format!("order {} is already paid", order_id)));
      }
      Some(order)
    }
    None => None,
  };

  // An order's own total is in VND; a bare amount defaults to USD.
  let (original_amount, default_currency) = match (request.amount, &order) {
    (Some(amount), _) => (amount, Currency::Usd),
    (None, Some(order)) => (order.total_amount, Currency::Vnd),
    (None, None) => return Err(OrderError::InvalidRequest("amount is required".to_string())),
  };
  let original_currency = match request.currency.as_deref() {
    Some(code) => code.parse::<Currency>()?,
    None => default_currency,
  };
  if original_amount <= Decimal::ZERO {
    return Err(OrderError::InvalidRequest("Invalid amount".to_string()));
  }

  let converted_amount = match original_currency {
    Currency::Vnd => {
      let usd = vnd_to_usd(original_amount)?;
      info!(
        from = %format_currency(original_amount, Currency::Vnd),
        to = %format_currency(usd, Currency::Usd),
        "Currency converted for PayPal."
      );
      usd
    }
    Currency::Usd => original_amount,
  };
  if converted_amount <= Decimal::ZERO {
    return Err(OrderError::InvalidRequest(format!(
      "{} is below the smallest chargeable USD amount",
      format_currency(original_amount, original_currency)
    )));
  }
  if let Some(order) = &order {
    let due = expected_charge(order, Currency::Usd)?;
    if converted_amount != due {
      return Err(OrderError::InvalidRequest(format!(
        "{} does not match the {} due for order {}",
        format_currency(converted_amount, Currency::Usd),
        format_currency(due, Currency::Usd),
        order.id
      )));
    }
  }

  let base_description = request
    .description
    .clone()
    .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
  let description = match request.order_id {
    Some(order_id) => format!("Order #{} - {}", order_id, base_description),
    None => base_description,
  };

  let created = deps
    .paypal
    .create_payment(&PaymentRequest {
      order_id: request.order_id,
      amount: converted_amount,
      currency: Currency::Usd,
      description,
    })
    .await
    .map_err(|e| OrderError::GatewayError(format!("creating PayPal payment failed: {}", e)))?;

  info!(payment_id = %created.payment_id, "PayPal payment created.");
  Ok(PaypalPaymentCreated {
    approval_url: created.approval_url,
    payment_id: created.payment_id,
    order_id: request.order_id,
    original_amount,
    original_currency,
    converted_amount,
    converted_currency: Currency::Usd,
  })
}

/// The gateway's record of a PayPal payment.
#[instrument(name = "paypal_payment_details", skip(deps))]
pub(crate) async fn paypal_payment_details(deps: &OrderDeps, payment_id: &str) -> OrderResult<PaymentDetails> {
  if payment_id.trim().is_empty() {
    return Err(OrderError::InvalidRequest("paymentId is required".to_string()));
  }
  deps
    .executors
    .for_method(PaymentMethod::Paypal)?
    .payment_details(payment_id)
    .await
    .map_err(|e| OrderError::GatewayError(format!("looking up PayPal payment {} failed: {}", payment_id, e)))?
    .ok_or_else(|| OrderError::NotFound(format!("payment {}", payment_id)))
}
