// orderflow-server/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use orderflow::payment::PaymentDetails;
use orderflow::PaypalPaymentRequest;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::Success;
use crate::errors::AppError;
use crate::state::AppState;

#[instrument(
    name = "handler::create_paypal_payment",
    skip(app_state, req_payload),
    fields(order_id = ?req_payload.order_id)
)]
pub async fn create_paypal_payment_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<PaypalPaymentRequest>,
) -> Result<HttpResponse, AppError> {
  let created = app_state.orders.create_paypal_payment(req_payload.into_inner()).await?;
  Ok(HttpResponse::Ok().json(Success::new(created)))
}

/// Query PayPal appends to the return URL after the payer approved.
#[derive(Debug, Deserialize)]
pub struct PaypalReturn {
  #[serde(rename = "paymentId")]
  pub payment_id: Option<String>,
  #[serde(rename = "PayerID")]
  pub payer_id: Option<String>,
  pub token: Option<String>,
  #[serde(rename = "orderId")]
  pub order_id: Option<String>,
}

/// Echoed to the client, which confirms the payment through capture.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalApproved {
  pub payment_id: Option<String>,
  pub payer_id: Option<String>,
  pub token: Option<String>,
  pub order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaypalCancel {
  #[serde(rename = "orderId")]
  pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalCancelled {
  pub success: bool,
  pub message: String,
  pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentFound {
  pub payment: PaymentDetails,
}

// Empty query values count as absent.
fn present(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

#[instrument(name = "handler::paypal_success", skip(query))]
pub async fn paypal_success_handler(query: web::Query<PaypalReturn>) -> HttpResponse {
  let query = query.into_inner();
  let approved = PaypalApproved {
    payment_id: present(query.payment_id),
    payer_id: present(query.payer_id),
    token: present(query.token),
    order_id: present(query.order_id),
  };
  info!(payment_id = ?approved.payment_id, order_id = ?approved.order_id, "PayPal return received.");
  HttpResponse::Ok().json(Success::new(approved))
}

#[instrument(name = "handler::paypal_cancel", skip(query))]
pub async fn paypal_cancel_handler(query: web::Query<PaypalCancel>) -> HttpResponse {
  let order_id = present(query.into_inner().order_id);
  info!(?order_id, "PayPal payment cancelled by payer.");
  HttpResponse::Ok().json(PaypalCancelled {
    success: false,
    message: "Payment cancelled".to_string(),
    order_id,
  })
}

#[instrument(name = "handler::paypal_payment_details", skip(app_state))]
pub async fn paypal_payment_details_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let payment = app_state.orders.paypal_payment_details(&path).await?;
  Ok(HttpResponse::Ok().json(Success::new(PaymentFound { payment })))
}
