// orderflow-server/src/web/handlers/mod.rs

pub mod admin_handlers;
pub mod order_handlers;
pub mod payment_handlers;

use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;

/// Success envelope: `{ "success": true, ...body }`.
#[derive(Debug, Serialize)]
pub struct Success<T: Serialize> {
  pub success: bool,
  #[serde(flatten)]
  pub body: T,
}

impl<T: Serialize> Success<T> {
  pub fn new(body: T) -> Self {
    Self { success: true, body }
  }
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
  Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation(format!("{} '{}' is not a valid id", what, raw)))
}
