// orderflow/src/model/product.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The stock counter of a catalog product. Shared by every concurrent order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
  pub product_id: Uuid,
  pub total_stock: i64,
}
