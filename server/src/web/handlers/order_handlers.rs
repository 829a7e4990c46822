// orderflow-server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use orderflow::{CaptureRequest, CreateOrderRequest, CreatedOrder, Order, PaymentOutcome};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{parse_id, Success};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
  pub message: String,
  pub order_id: Uuid,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pay_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub requires_payment: Option<bool>,
}

impl From<&CreatedOrder> for OrderPlaced {
  fn from(created: &CreatedOrder) -> Self {
    let order_id = created.order.id;
    match &created.outcome {
      PaymentOutcome::Immediate { .. } => OrderPlaced {
        message: "Order placed.".to_string(),
        order_id,
        pay_url: None,
        requires_payment: None,
      },
      PaymentOutcome::Redirect { url } => OrderPlaced {
        message: "Order placed. Continue to the wallet to pay.".to_string(),
        order_id,
        pay_url: Some(url.clone()),
        requires_payment: None,
      },
      PaymentOutcome::RequiresExternalCapture => OrderPlaced {
        message: "Order placed. Payment is required.".to_string(),
        order_id,
        pay_url: None,
        requires_payment: Some(true),
      },
    }
  }
}

#[derive(Debug, Serialize)]
pub struct Data<T: Serialize> {
  pub data: T,
}

#[derive(Debug, Serialize)]
pub struct Captured {
  pub order: Order,
}

#[instrument(
    name = "handler::create_order",
    skip(app_state, req_payload),
    fields(user_id = ?req_payload.user_id, method = ?req_payload.payment_method)
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let created = app_state.orders.create_order(req_payload.into_inner()).await?;
  info!(order_id = %created.order.id, "Order accepted.");
  Ok(HttpResponse::Created().json(Success::new(OrderPlaced::from(&created))))
}

#[instrument(name = "handler::get_order", skip(app_state))]
pub async fn get_order_handler(app_state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
  let order_id = parse_id(&path, "order")?;
  let order = app_state.orders.get_order(order_id).await?;
  Ok(HttpResponse::Ok().json(Success::new(Data { data: order })))
}

#[instrument(name = "handler::orders_for_user", skip(app_state))]
pub async fn orders_for_user_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let user_id = parse_id(&path, "user")?;
  let orders = app_state.orders.orders_for_user(user_id).await?;
  Ok(HttpResponse::Ok().json(Success::new(Data { data: orders })))
}

#[instrument(
    name = "handler::capture",
    skip(app_state, req_payload),
    fields(order_id = ?req_payload.order_id, payment_id = %req_payload.payment_id)
)]
pub async fn capture_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CaptureRequest>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.orders.capture(req_payload.into_inner()).await?;
  info!(order_id = %order.id, status = %order.order_status, "Payment captured.");
  Ok(HttpResponse::Ok().json(Success::new(Captured { order })))
}

#[instrument(name = "handler::retry_payment", skip(app_state))]
pub async fn retry_payment_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let order_id = parse_id(&path, "order")?;
  let created = app_state.orders.retry_payment(order_id).await?;
  Ok(HttpResponse::Created().json(Success::new(OrderPlaced::from(&created))))
}
