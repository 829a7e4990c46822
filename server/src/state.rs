// orderflow-server/src/state.rs
use crate::config::AppConfig;
use crate::services::{MailNotifier, SandboxMailTransport};
use orderflow::{Gateways, OrderService, Stores};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub orders: OrderService,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// Wires the order service to `stores`, the sandbox gateways and the mail notifier.
  pub fn new(stores: Stores, config: Arc<AppConfig>) -> Self {
    let gateways = Gateways::sandbox(config.momo(), config.paypal(), config.sandbox_latency);
    let notifier = Arc::new(MailNotifier::new(
      config.mail_sender.clone(),
      SandboxMailTransport::default(),
    ));
    Self {
      orders: OrderService::new(stores, gateways, notifier),
      config,
    }
  }
}
