// orderflow-server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use orderflow::payment::{MomoConfig, PaypalConfig};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Absent means the in-memory store is used.
  pub database_url: Option<String>,
  pub app_base_url: String,

  pub momo_endpoint: String,
  pub momo_partner_code: String,
  pub momo_redirect_url: String,
  pub paypal_base_url: String,

  /// Simulated round trip of the sandbox payment gateways.
  pub sandbox_latency: Duration,

  pub mail_sender: String,
  pub admin_token: String,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

    let momo_defaults = MomoConfig::default();
    let momo_endpoint = get_env("MOMO_ENDPOINT").unwrap_or(momo_defaults.endpoint);
    let momo_partner_code = get_env("MOMO_PARTNER_CODE").unwrap_or(momo_defaults.partner_code);
    let momo_redirect_url =
      get_env("MOMO_REDIRECT_URL").unwrap_or_else(|_| format!("{}/payment/momo/return", app_base_url));
    let paypal_base_url = get_env("PAYPAL_BASE_URL").unwrap_or(PaypalConfig::default().base_url);

    let sandbox_latency_ms = get_env("SANDBOX_LATENCY_MS")
      .unwrap_or_else(|_| "50".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid SANDBOX_LATENCY_MS: {}", e)))?;

    let mail_sender = get_env("MAIL_SENDER").unwrap_or_else(|_| "noreply@example.com".to_string());
    let admin_token = get_env("ADMIN_TOKEN")?;
    if admin_token.trim().is_empty() {
      return Err(AppError::Config("ADMIN_TOKEN must not be empty".to_string()));
    }

    tracing::info!(
      persistence = if database_url.is_some() { "postgres" } else { "memory" },
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      momo_endpoint,
      momo_partner_code,
      momo_redirect_url,
      paypal_base_url,
      sandbox_latency: Duration::from_millis(sandbox_latency_ms),
      mail_sender,
      admin_token,
    })
  }

  pub fn momo(&self) -> MomoConfig {
    MomoConfig {
      endpoint: self.momo_endpoint.clone(),
      partner_code: self.momo_partner_code.clone(),
      redirect_url: self.momo_redirect_url.clone(),
    }
  }

  pub fn paypal(&self) -> PaypalConfig {
    PaypalConfig {
      base_url: self.paypal_base_url.clone(),
      app_base_url: self.app_base_url.clone(),
    }
  }
}
