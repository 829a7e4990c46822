// orderflow-server/src/web/routes.rs

use actix_web::{web, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{admin_handlers, order_handlers, payment_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  // Malformed bodies get the same error envelope as every other failure.
  cfg.app_data(
    web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
  );
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create_order_handler))
          // Registered before "/{id}" so "capture" and "user" are not read as ids.
          .route("/capture", web::post().to(order_handlers::capture_handler))
          .route("/user/{user_id}", web::get().to(order_handlers::orders_for_user_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route(
            "/{order_id}/payment/retry",
            web::post().to(order_handlers::retry_payment_handler),
          ),
      )
      .service(
        web::scope("/payments/paypal")
          .route("/create", web::post().to(payment_handlers::create_paypal_payment_handler))
          .route("/success", web::get().to(payment_handlers::paypal_success_handler))
          .route("/cancel", web::get().to(payment_handlers::paypal_cancel_handler))
          .route(
            "/details/{payment_id}",
            web::get().to(payment_handlers::paypal_payment_details_handler),
          ),
      )
      .service(web::scope("/admin").route(
        "/orders/{order_id}/status",
        web::put().to(admin_handlers::update_order_status_handler),
      )),
  );
}
