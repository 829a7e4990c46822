// orderflow-server/src/services/email.rs
use async_trait::async_trait;
use orderflow::{Notifier, OrderEvent, OrderStatus};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmailInfo {
  pub to: String,
  pub from: String,
  pub subject: String,
  pub body_preview: String,
  pub message_id: String,
}

/// Delivery half of the mailer. The sandbox transport only logs.
#[async_trait]
pub trait MailTransport: Send + Sync {
  async fn send(&self, to: &str, from: &str, subject: &str, html_body: &str) -> anyhow::Result<SentEmailInfo>;
}

#[derive(Debug, Clone)]
pub struct SandboxMailTransport {
  latency: Duration,
}

impl SandboxMailTransport {
  pub fn new(latency: Duration) -> Self {
    Self { latency }
  }
}

impl Default for SandboxMailTransport {
  fn default() -> Self {
    Self::new(Duration::from_millis(20))
  }
}

#[async_trait]
impl MailTransport for SandboxMailTransport {
  async fn send(&self, to: &str, from: &str, subject: &str, html_body: &str) -> anyhow::Result<SentEmailInfo> {
    info!("Simulating sending email: To='{}', From='{}', Subject='{}'", to, from, subject);
    tokio::time::sleep(self.latency).await;

    if to.ends_with(".invalid") {
      warn!("Simulated email failure for recipient: {}", to);
      anyhow::bail!("mailbox {} does not accept mail", to);
    }

    let body_preview = html_body.chars().take(50).collect::<String>() + "...";
    let message_id = format!("sandbox_email_{}", Uuid::new_v4());
    info!("Sandbox email sent successfully. Message ID: {}", message_id);

    Ok(SentEmailInfo {
      to: to.to_string(),
      from: from.to_string(),
      subject: subject.to_string(),
      body_preview,
      message_id,
    })
  }
}

/// Sends order events to the owner's mailbox.
pub struct MailNotifier<T = SandboxMailTransport> {
  sender: String,
  transport: T,
}

impl<T: MailTransport> MailNotifier<T> {
  pub fn new(sender: impl Into<String>, transport: T) -> Self {
    Self {
      sender: sender.into(),
      transport,
    }
  }
}

// User records live in another service; the sandbox derives a stable address from the id.
pub fn mailbox_for(user_id: Uuid) -> String {
  format!("user_{}@example.com", user_id.simple())
}

fn status_label(status: OrderStatus) -> &'static str {
  match status {
    OrderStatus::Pending => "Pending",
    OrderStatus::Confirmed => "Confirmed",
    OrderStatus::InShipping => "In shipping",
    OrderStatus::Delivered => "Delivered",
    OrderStatus::Rejected => "Rejected",
  }
}

pub fn render(event: &OrderEvent) -> (String, String) {
  match event {
    OrderEvent::StatusChanged { order_id, from, to } => (
      format!("Your order {} is now {}", order_id, status_label(*to)),
      format!(
        "<p>The status of order <b>{}</b> changed from {} to <b>{}</b>.</p>",
        order_id,
        status_label(*from),
        status_label(*to)
      ),
    ),
    OrderEvent::PaymentCaptured { order_id } => (
      format!("Payment received for order {}", order_id),
      format!("<p>We have received your payment for order <b>{}</b>.</p>", order_id),
    ),
  }
}

#[async_trait]
impl<T: MailTransport> Notifier for MailNotifier<T> {
  async fn notify(&self, user_id: Uuid, event: &OrderEvent) -> anyhow::Result<()> {
    let (subject, body) = render(event);
    let sent = self
      .transport
      .send(&mailbox_for(user_id), &self.sender, &subject, &body)
      .await?;
    info!(%user_id, message_id = %sent.message_id, kind = event.kind(), "Order email sent.");
    Ok(())
  }
}
