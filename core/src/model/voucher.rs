// orderflow/src/model/voucher.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoucherKind {
  Percent,
  Fixed,
}

/// A promotional code, read-only from the order workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
  pub code: String,
  #[serde(rename = "type")]
  pub kind: VoucherKind,
  pub value: Decimal,
  /// Cap on a percent discount. `None` leaves it uncapped.
  #[serde(default)]
  pub max_discount: Option<Decimal>,
  #[serde(default)]
  pub min_order_amount: Decimal,
  pub is_active: bool,
  #[serde(default)]
  pub expired_at: Option<DateTime<Utc>>,
}

impl Voucher {
  /// Lookup key for a user-supplied code.
  pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
  }

  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    self.expired_at.map(|at| at <= now).unwrap_or(false)
  }
}
