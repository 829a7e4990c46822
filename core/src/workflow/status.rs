// orderflow/src/workflow/status.rs

use tracing::{info, warn};
use uuid::Uuid;

use super::requests::StatusUpdate;
use super::OrderDeps;
use crate::error::{FlowError, OrderError, OrderResult};
use crate::model::OrderStatus;
use crate::notify::OrderEvent;

/// Moves an order to `requested` if the transition table allows it.
///
/// The write is a compare-and-set on the status that was read. When another
/// update wins the race the order is re-read and the table checked again; since
/// every transition moves forward, this settles within a few rounds.
pub(crate) async fn update_order_status(deps: &OrderDeps, order_id: Uuid, requested: &str) -> OrderResult<StatusUpdate> {
  let to: OrderStatus = requested.parse()?;

  for _ in 0..=OrderStatus::ALL.len() {
    let current = deps
      .orders
      .get_order(order_id)
      .await
      .map_err(OrderError::storage)?
      .ok_or_else(|| OrderError::NotFound(format!("order {}", order_id)))?;

    let from = current.order_status;
    if from == to {
      info!(%order_id, status = %to, "Order already has the requested status.");
      return Ok(StatusUpdate {
        modified_count: 0,
        order: current,
      });
    }
    if !from.can_transition_to(to) {
      warn!(%order_id, %from, %to, "Refusing illegal status transition.");
      return Err(OrderError::IllegalTransition { from, to });
    }

    match deps
      .orders
      .compare_and_set_status(order_id, from, to)
      .await
      .map_err(OrderError::storage)?
    {
      Some(updated) => {
        info!(%order_id, %from, %to, "Order status updated.");
        deps
          .notifications
          .send(updated.user_id, OrderEvent::StatusChanged { order_id, from, to });
        return Ok(StatusUpdate {
          modified_count: 1,
          order: updated,
        });
      }
      None => {
        info!(%order_id, %from, "Order status changed concurrently; re-reading.");
      }
    }
  }

  Err(OrderError::from(FlowError::Internal(format!(
    "status of order {} kept changing during update",
    order_id
  ))))
}
