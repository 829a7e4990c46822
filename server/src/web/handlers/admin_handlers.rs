// orderflow-server/src/web/handlers/admin_handlers.rs

use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{parse_id, Success};
use crate::errors::AppError;
use crate::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Caller holding the configured admin token.
#[derive(Debug)]
pub struct AdminOperator;

impl FromRequest for AdminOperator {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
      return futures_util::future::ready(Err(AppError::Internal("application state is not configured".to_string())));
    };
    let presented = req.headers().get(ADMIN_TOKEN_HEADER).and_then(|v| v.to_str().ok());
    match presented {
      Some(token) if token == state.config.admin_token => futures_util::future::ready(Ok(AdminOperator)),
      _ => {
        warn!("AdminOperator extractor: missing or wrong {} header.", ADMIN_TOKEN_HEADER);
        futures_util::future::ready(Err(AppError::Auth("A valid admin token is required.".to_string())))
      }
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatePayload {
  pub new_status: Option<String>,
}

#[instrument(name = "handler::update_order_status", skip(app_state, req_payload, _admin))]
pub async fn update_order_status_handler(
  _admin: AdminOperator,
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_payload: web::Json<StatusUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  let order_id = parse_id(&path, "order")?;
  let new_status = req_payload
    .into_inner()
    .new_status
    .ok_or_else(|| AppError::Validation("newStatus is required".to_string()))?;

  let update = app_state.orders.update_order_status(order_id, &new_status).await?;
  info!(%order_id, new_status = %new_status, modified = update.modified_count, "Order status update handled.");
  Ok(HttpResponse::Ok().json(Success::new(update)))
}
