// orderflow/src/inventory.rs

//! Inventory Adjuster.
//!
//! Reservation is all-or-nothing across the line items of one order. Each
//! product is decremented with a conditional update; when one is refused, every
//! decrement already applied for the order is restored before the error is
//! returned.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{OrderError, OrderResult};
use crate::model::line_item::merged_quantities;
use crate::model::LineItem;
use crate::store::{StockDecrement, StockStore};

#[derive(Clone)]
pub struct InventoryAdjuster {
  stock: Arc<dyn StockStore>,
}

impl InventoryAdjuster {
  pub fn new(stock: Arc<dyn StockStore>) -> Self {
    Self { stock }
  }

  #[instrument(name = "InventoryAdjuster::reserve", skip(self, items), fields(items = items.len()))]
  pub async fn reserve(&self, items: &[LineItem]) -> OrderResult<()> {
    let wanted = merged_quantities(items)?;
    if let Some((product_id, quantity)) = wanted.iter().find(|(_, q)| *q <= 0) {
      return Err(OrderError::InvalidRequest(format!(
        "quantity {} for product {} must be positive",
        quantity, product_id
      )));
    }

    let mut applied: Vec<(Uuid, i64)> = Vec::with_capacity(wanted.len());
    for (product_id, quantity) in wanted {
      let refusal = match self.stock.try_decrement(product_id, quantity).await {
        Ok(StockDecrement::Applied { remaining }) => {
          debug!(%product_id, quantity, remaining, "Stock decremented.");
          applied.push((product_id, quantity));
          continue;
        }
        Ok(StockDecrement::Insufficient { available }) => {
          warn!(%product_id, requested = quantity, available, "Insufficient stock, rolling back reservation.");
          OrderError::insufficient(product_id, quantity, available)
        }
        Ok(StockDecrement::UnknownProduct) => {
          warn!(%product_id, "Unknown product in reservation, rolling back.");
          OrderError::InvalidRequest(format!("unknown product {}", product_id))
        }
        Err(e) => OrderError::storage(e),
      };
      self.restore(&applied).await;
      return Err(refusal);
    }

    info!(products = applied.len(), "Stock reserved.");
    Ok(())
  }

  /// Puts the quantities of `items` back into stock.
  ///
  /// Every product is attempted even if one fails; the first failure is returned.
  #[instrument(name = "InventoryAdjuster::release", skip(self, items), fields(items = items.len()))]
  pub async fn release(&self, items: &[LineItem]) -> OrderResult<()> {
    let mut first_failure = None;
    for (product_id, quantity) in merged_quantities(items)? {
      if quantity <= 0 {
        continue;
      }
      if let Err(e) = self.stock.increment(product_id, quantity).await {
        error!(%product_id, quantity, error = %e, "Failed to release stock.");
        first_failure.get_or_insert(e);
      }
    }
    match first_failure {
      Some(e) => Err(OrderError::storage(e)),
      None => {
        info!("Stock released.");
        Ok(())
      }
    }
  }

  // Compensation for a partially applied reservation.
  async fn restore(&self, applied: &[(Uuid, i64)]) {
    for (product_id, quantity) in applied {
      if let Err(e) = self.stock.increment(*product_id, *quantity).await {
        error!(product_id = %product_id, quantity, error = %e, "Compensating increment failed; stock is now short.");
      }
    }
  }
}
