// orderflow/src/model/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::line_item::LineItem;
use crate::error::OrderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
  Cash,
  Momo,
  Paypal,
}

impl PaymentMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentMethod::Cash => "cash",
      PaymentMethod::Momo => "momo",
      PaymentMethod::Paypal => "paypal",
    }
  }
}

impl fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PaymentMethod {
  type Err = OrderError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "cash" => Ok(PaymentMethod::Cash),
      "momo" => Ok(PaymentMethod::Momo),
      "paypal" => Ok(PaymentMethod::Paypal),
      other => Err(OrderError::InvalidRequest(format!("unknown payment method '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentStatus {
  Pending,
  Paid,
}

impl PaymentStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentStatus::Pending => "pending",
      PaymentStatus::Paid => "paid",
    }
  }
}

impl fmt::Display for PaymentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PaymentStatus {
  type Err = OrderError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(PaymentStatus::Pending),
      "paid" => Ok(PaymentStatus::Paid),
      other => Err(OrderError::InvalidRequest(format!("unknown payment status '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  InShipping,
  Delivered,
  Rejected,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::InShipping,
    OrderStatus::Delivered,
    OrderStatus::Rejected,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::InShipping => "inShipping",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Rejected => "rejected",
    }
  }

  // Position on the fulfilment track. Rejected sits off the track.
  fn rank(&self) -> Option<u8> {
    match self {
      OrderStatus::Pending => Some(0),
      OrderStatus::Confirmed => Some(1),
      OrderStatus::InShipping => Some(2),
      OrderStatus::Delivered => Some(3),
      OrderStatus::Rejected => None,
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Rejected)
  }

  /// The allowed-transition table.
  ///
  /// Forward moves along `pending → confirmed → inShipping → delivered` may skip
  /// states; `rejected` is reachable from every non-terminal state. Staying in
  /// the same status is not a transition.
  pub fn can_transition_to(&self, next: OrderStatus) -> bool {
    if self.is_terminal() || *self == next {
      return false;
    }
    match (self.rank(), next.rank()) {
      (_, None) => true,
      (Some(from), Some(to)) => to > from,
      (None, Some(_)) => false,
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = OrderError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .iter()
      .copied()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| OrderError::InvalidRequest(format!("unknown order status '{}'", s)))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub line_items: Vec<LineItem>,
  pub address_id: Uuid,
  pub payment_method: PaymentMethod,
  pub payment_status: PaymentStatus,
  pub order_status: OrderStatus,
  pub raw_total: Decimal,
  /// Snapshotted at creation and never recomputed.
  pub total_amount: Decimal,
  pub voucher_code: Option<String>,
  pub discount: Decimal,
  pub order_date: DateTime<Utc>,
  pub payment_id: Option<String>,
  pub payer_id: Option<String>,
  /// Set once the line items have been taken out of stock for this order.
  pub stock_reserved: bool,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn is_paid(&self) -> bool {
    self.payment_status == PaymentStatus::Paid
  }

  /// A persisted order whose payment never completed and that nobody has moved along yet.
  pub fn is_retryable_draft(&self) -> bool {
    self.payment_status == PaymentStatus::Pending && self.order_status == OrderStatus::Pending
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn terminal_states_accept_nothing() {
    for terminal in [OrderStatus::Delivered, OrderStatus::Rejected] {
      for next in OrderStatus::ALL {
        assert!(!terminal.can_transition_to(next), "{} -> {}", terminal, next);
      }
    }
  }

  #[test]
  fn forward_moves_and_rejection_are_allowed() {
    assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
    assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
    assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::InShipping));
    assert!(OrderStatus::InShipping.can_transition_to(OrderStatus::Rejected));
    assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Rejected));
  }

  #[test]
  fn backward_and_same_status_moves_are_refused() {
    assert!(!OrderStatus::InShipping.can_transition_to(OrderStatus::Confirmed));
    assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Pending));
    assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Confirmed));
  }

  #[test]
  fn statuses_parse_from_wire_names() {
    assert_eq!("inShipping".parse::<OrderStatus>().unwrap(), OrderStatus::InShipping);
    assert!("shipped".parse::<OrderStatus>().is_err());
    assert!("bitcoin".parse::<PaymentMethod>().is_err());
    assert_eq!(
      serde_json::to_string(&OrderStatus::InShipping).unwrap(),
      "\"inShipping\""
    );
  }
}
