// orderflow-server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use orderflow::OrderError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error(transparent)]
  Order(#[from] OrderError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Message shown to the caller. Storage and configuration details stay in the logs.
  fn public_message(&self) -> String {
    match self {
      AppError::Validation(m) | AppError::Auth(m) => m.clone(),
      AppError::Order(OrderError::Storage { .. }) => "Database operation failed".to_string(),
      AppError::Order(OrderError::Workflow { .. }) => "Workflow processing error".to_string(),
      AppError::Order(e) => e.to_string(),
      AppError::Config(_) => "Configuration issue".to_string(),
      AppError::Internal(_) => "An internal error occurred".to_string(),
    }
  }

  fn error_kind(&self) -> &'static str {
    match self {
      AppError::Validation(_) => "InvalidRequest",
      AppError::Auth(_) => "Unauthorized",
      AppError::Config(_) => "Config",
      AppError::Order(e) => e.kind(),
      AppError::Internal(_) => "Internal",
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Order(e) => match e {
        OrderError::InvalidRequest(_) | OrderError::VoucherInvalid(_) => StatusCode::BAD_REQUEST,
        OrderError::PaymentNotApproved { .. } => StatusCode::PAYMENT_REQUIRED,
        OrderError::NotFound(_) => StatusCode::NOT_FOUND,
        OrderError::InsufficientStock { .. } | OrderError::IllegalTransition { .. } => StatusCode::CONFLICT,
        OrderError::GatewayError(_) | OrderError::Storage { .. } | OrderError::Workflow { .. } => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
      AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with error");
    }
    HttpResponse::build(status).json(json!({
      "success": false,
      "message": self.public_message(),
      "error": self.error_kind(),
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
