// orderflow/src/notify.rs

//! Fire-and-forget notifications to order owners.
//!
//! The workflows hand an `OrderEvent` to `NotificationDispatch`, which runs the
//! notifier on its own task. A failing notifier is logged and never reaches the
//! operation that triggered it.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::OrderStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OrderEvent {
  #[serde(rename_all = "camelCase")]
  StatusChanged {
    order_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
  },
  #[serde(rename_all = "camelCase")]
  PaymentCaptured { order_id: Uuid },
}

impl OrderEvent {
  pub fn kind(&self) -> &'static str {
    match self {
      OrderEvent::StatusChanged { .. } => "statusChanged",
      OrderEvent::PaymentCaptured { .. } => "paymentCaptured",
    }
  }

  pub fn order_id(&self) -> Uuid {
    match self {
      OrderEvent::StatusChanged { order_id, .. } | OrderEvent::PaymentCaptured { order_id } => *order_id,
    }
  }
}

#[async_trait]
pub trait Notifier: Send + Sync {
  async fn notify(&self, user_id: Uuid, event: &OrderEvent) -> anyhow::Result<()>;
}

/// Writes events to the log only. Used when no mail transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
  async fn notify(&self, user_id: Uuid, event: &OrderEvent) -> anyhow::Result<()> {
    info!(%user_id, kind = event.kind(), order_id = %event.order_id(), "Order event.");
    Ok(())
  }
}

#[derive(Clone)]
pub struct NotificationDispatch {
  notifier: Arc<dyn Notifier>,
}

impl NotificationDispatch {
  pub fn new(notifier: Arc<dyn Notifier>) -> Self {
    Self { notifier }
  }

  /// Spawns delivery and returns at once. The handle is only useful to tests.
  pub fn send(&self, user_id: Uuid, event: OrderEvent) -> JoinHandle<()> {
    let notifier = Arc::clone(&self.notifier);
    tokio::spawn(async move {
      match notifier.notify(user_id, &event).await {
        Ok(()) => debug!(%user_id, kind = event.kind(), "Notification delivered."),
        Err(e) => warn!(%user_id, kind = event.kind(), order_id = %event.order_id(), error = %e, "Notification failed; ignoring."),
      }
    })
  }
}
