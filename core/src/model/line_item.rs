// orderflow/src/model/line_item.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{OrderError, OrderResult};

/// One cart row as submitted by the client. Immutable once embedded in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
  pub product_id: Uuid,
  pub quantity: i64,
  #[serde(alias = "price")]
  pub unit_price: Decimal,
}

impl LineItem {
  pub fn new(product_id: Uuid, quantity: i64, unit_price: Decimal) -> Self {
    Self {
      product_id,
      quantity,
      unit_price,
    }
  }

  pub fn subtotal(&self) -> OrderResult<Decimal> {
    self
      .unit_price
      .checked_mul(Decimal::from(self.quantity))
      .ok_or_else(|| OrderError::InvalidRequest(format!("subtotal for product {} is out of range", self.product_id)))
  }
}

/// Sums quantities per product, ordered by product id.
///
/// Stock adjustment works on these merged quantities so a product listed twice
/// is checked against its stock once.
pub fn merged_quantities(items: &[LineItem]) -> OrderResult<Vec<(Uuid, i64)>> {
  let mut merged: BTreeMap<Uuid, i64> = BTreeMap::new();
  for item in items {
    let total = merged.entry(item.product_id).or_insert(0);
    *total = total.checked_add(item.quantity).ok_or_else(|| {
      OrderError::InvalidRequest(format!("total quantity for product {} is out of range", item.product_id))
    })?;
  }
  Ok(merged.into_iter().collect())
}
