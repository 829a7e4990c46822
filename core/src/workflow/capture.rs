// orderflow/src/workflow/capture.rs

//! The capture pipeline.
//!
//! Safe to repeat for the same order: an order found already paid skips the
//! gateway and the payment write, the `pending → paid` write is a
//! compare-and-set, and stock is taken only by the run that claims the order's
//! reservation marker.

use std::sync::Arc;
use tracing::{debug, error, info};

use super::contexts::{produced, CaptureCtx};
use crate::error::{OrderError, OrderResult};
use crate::flow::{ContextData, Pipeline, PipelineControl, SkipCondition, Unmatched};
use crate::model::{OrderStatus, PaymentMethod};
use crate::notify::OrderEvent;
use crate::payment::{expected_charge, CapturePolicy};
use crate::store::{CaptureTransition, PaymentRecord};

pub const STEP_LOAD: &str = "load_order";
pub const STEP_EXECUTE: &str = "execute_payment";
pub const STEP_RECORD: &str = "record_payment";
pub const STEP_RESERVE_ONCE: &str = "reserve_stock_once";
pub const STEP_NOTIFY: &str = "notify_capture";

pub fn capture_pipeline() -> Pipeline<CaptureCtx, OrderError> {
  let skip_if_already_paid: SkipCondition<CaptureCtx> = Arc::new(|ctx: &CaptureCtx| ctx.already_paid);
  let skip_unless_captured_now: SkipCondition<CaptureCtx> = Arc::new(|ctx: &CaptureCtx| !ctx.captured_now);

  let mut p = Pipeline::<CaptureCtx, OrderError>::new(
    "capture_payment",
    &[
      (STEP_LOAD, false, None),
      (STEP_EXECUTE, false, Some(skip_if_already_paid.clone())),
      (STEP_RECORD, false, Some(skip_if_already_paid)),
      (STEP_RESERVE_ONCE, false, None),
      (STEP_NOTIFY, true, Some(skip_unless_captured_now)),
    ],
  );

  p.on_root(STEP_LOAD, |ctx_data: ContextData<CaptureCtx>| {
    Box::pin(async move {
      let (deps, order_id) = ctx_data.with(|ctx| (ctx.deps.clone(), ctx.request.validated_order_id()));
      let order_id = order_id?;

      let order = deps
        .orders
        .get_order(order_id)
        .await
        .map_err(OrderError::storage)?
        .ok_or_else(|| OrderError::NotFound(format!("order {}", order_id)))?;

      CapturePolicy::for_method(order.payment_method)?;
      let already_paid = order.is_paid();
      if already_paid {
        info!(%order_id, "Order already paid; capture is a no-op.");
      } else if order.order_status == OrderStatus::Rejected {
        return Err(OrderError::InvalidRequest(format!(
          "order {} was rejected and cannot be paid",
          order_id
        )));
      }

      {
        let mut guard = ctx_data.write();
        guard.order = Some(order);
        guard.already_paid = already_paid;
      }
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_EXECUTE, |ctx_data: ContextData<CaptureCtx>| {
    Box::pin(async move {
      let (deps, order, payment_id, payer_id) = ctx_data.with(|ctx| {
        (
          ctx.deps.clone(),
          produced(&ctx.order, "order"),
          ctx.request.payment_id.clone(),
          ctx.request.payer_id.clone(),
        )
      });
      let order = order?;

      let executor = deps.executors.for_method(order.payment_method)?;
      let issued = executor
        .payment_details(&payment_id)
        .await
        .map_err(|e| OrderError::GatewayError(format!("looking up payment {} failed: {}", payment_id, e)))?
        .ok_or_else(|| OrderError::GatewayError(format!("payment {} is unknown to the gateway", payment_id)))?;
      if issued.order_id != Some(order.id) {
        info!(order_id = %order.id, %payment_id, "Payment was issued for another order.");
        return Err(OrderError::PaymentNotApproved {
          state: "order_mismatch".to_string(),
        });
      }
      if issued.amount != expected_charge(&order, issued.currency)? {
        info!(order_id = %order.id, %payment_id, amount = %issued.amount, "Payment amount does not match the order.");
        return Err(OrderError::PaymentNotApproved {
          state: "amount_mismatch".to_string(),
        });
      }

      let executed = match executor.execute_payment(&payment_id, &payer_id).await {
        Ok(executed) => executed,
        Err(e) => {
          // A concurrent capture of the same order may have executed it first.
          let current = deps.orders.get_order(order.id).await.map_err(OrderError::storage)?;
          if let Some(current) = current.filter(|o| o.is_paid()) {
            info!(order_id = %order.id, %payment_id, "Payment already executed by a concurrent capture.");
            let mut guard = ctx_data.write();
            guard.already_paid = true;
            guard.order = Some(current);
            return Ok(PipelineControl::Continue);
          }
          return Err(OrderError::GatewayError(format!(
            "executing payment {} failed: {}",
            payment_id, e
          )));
        }
      };
      if !executed.is_approved() {
        info!(order_id = %order.id, %payment_id, state = %executed.state, "Payment not approved.");
        return Err(OrderError::PaymentNotApproved { state: executed.state });
      }

      ctx_data.write().executed = Some(executed);
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.branch_on(STEP_RECORD, |ctx: &CaptureCtx| ctx.order.as_ref().map(|o| o.payment_method))
    .arm(Some(PaymentMethod::Paypal), |ctx_data: ContextData<CaptureCtx>| {
      Box::pin(record_payment(ctx_data, PaymentMethod::Paypal))
    })
    .arm(Some(PaymentMethod::Momo), |ctx_data: ContextData<CaptureCtx>| {
      Box::pin(record_payment(ctx_data, PaymentMethod::Momo))
    })
    .if_unmatched(Unmatched::Fail)
    .finalize();

  p.on_root(STEP_RESERVE_ONCE, |ctx_data: ContextData<CaptureCtx>| {
    Box::pin(async move {
      let (deps, order) = ctx_data.with(|ctx| (ctx.deps.clone(), produced(&ctx.order, "order")));
      let order = order?;
      if order.stock_reserved {
        debug!(order_id = %order.id, "Stock already reserved for order.");
        return Ok(PipelineControl::Continue);
      }

      let claimed = deps
        .orders
        .claim_stock_reservation(order.id)
        .await
        .map_err(OrderError::storage)?;
      if !claimed {
        debug!(order_id = %order.id, "Another capture claimed the stock reservation.");
        return Ok(PipelineControl::Continue);
      }

      if let Err(e) = deps.inventory.reserve(&order.line_items).await {
        error!(order_id = %order.id, error = %e, "Stock reservation at capture failed.");
        if let Err(unclaim_err) = deps.orders.unclaim_stock_reservation(order.id).await {
          error!(order_id = %order.id, error = %unclaim_err, "Failed to clear the reservation marker.");
        }
        return Err(e);
      }

      if let Some(order) = ctx_data.write().order.as_mut() {
        order.stock_reserved = true;
      }
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_NOTIFY, |ctx_data: ContextData<CaptureCtx>| {
    Box::pin(async move {
      let (deps, order) = ctx_data.with(|ctx| (ctx.deps.clone(), produced(&ctx.order, "order")));
      let order = order?;
      deps
        .notifications
        .send(order.user_id, OrderEvent::PaymentCaptured { order_id: order.id });
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p
}

async fn record_payment(ctx_data: ContextData<CaptureCtx>, method: PaymentMethod) -> OrderResult<PipelineControl> {
  let policy = CapturePolicy::for_method(method)?;
  let (deps, order, executed, payer_id) = ctx_data.with(|ctx| {
    (
      ctx.deps.clone(),
      produced(&ctx.order, "order"),
      produced(&ctx.executed, "executed payment"),
      ctx.request.payer_id.clone(),
    )
  });
  let order = order?;
  let record = PaymentRecord {
    payment_id: executed?.payment_id,
    payer_id,
    advance_to: policy.advance_to(),
  };

  let transition = deps
    .orders
    .mark_paid(order.id, &record)
    .await
    .map_err(OrderError::storage)?
    .ok_or_else(|| OrderError::NotFound(format!("order {}", order.id)))?;

  let mut guard = ctx_data.write();
  match transition {
    CaptureTransition::Captured(updated) => {
      info!(order_id = %updated.id, status = %updated.order_status, "Payment captured.");
      guard.captured_now = true;
      guard.order = Some(updated);
    }
    CaptureTransition::AlreadyPaid(current) => {
      info!(order_id = %current.id, "Concurrent capture already recorded the payment.");
      guard.already_paid = true;
      guard.order = Some(current);
    }
    CaptureTransition::Rejected(current) => {
      info!(order_id = %current.id, "Order was rejected before the payment was recorded.");
      return Err(OrderError::InvalidRequest(format!(
        "order {} was rejected and cannot be paid",
        current.id
      )));
    }
  }
  Ok(PipelineControl::Continue)
}
