// orderflow/src/workflow/create_order.rs

//! The `createOrder` pipeline.
//!
//! Validation and pricing touch nothing. Stock is reserved before the order is
//! written, so a refused reservation leaves no order behind; a failed write
//! puts the stock back. A payment-gateway failure after the write leaves the
//! order as a pending draft.

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::contexts::{produced, CreateOrderCtx};
use crate::error::{OrderError, OrderResult};
use crate::flow::{ContextData, Pipeline, PipelineControl, Unmatched};
use crate::model::{Order, OrderStatus, PaymentMethod, PaymentStatus};

pub const STEP_VALIDATE: &str = "validate_request";
pub const STEP_PRICE: &str = "price_cart";
pub const STEP_RESERVE: &str = "reserve_stock";
pub const STEP_PERSIST: &str = "persist_order";
pub const STEP_CLEAR_CART: &str = "clear_cart";
pub const STEP_DISPATCH: &str = "dispatch_payment";

pub fn create_order_pipeline() -> Pipeline<CreateOrderCtx, OrderError> {
  let mut p = Pipeline::<CreateOrderCtx, OrderError>::new(
    "create_order",
    &[
      (STEP_VALIDATE, false, None),
      (STEP_PRICE, false, None),
      (STEP_RESERVE, false, None),
      (STEP_PERSIST, false, None),
      (STEP_CLEAR_CART, false, None),
      (STEP_DISPATCH, false, None),
    ],
  );

  p.on_root(STEP_VALIDATE, |ctx_data: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let validated = ctx_data.with(|ctx| ctx.request.validate())?;
      info!(
        user_id = %validated.user_id,
        method = %validated.payment_method,
        items = validated.line_items.len(),
        "Order request validated."
      );
      ctx_data.write().validated = Some(validated);
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_PRICE, |ctx_data: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let (deps, validated, now) = ctx_data.with(|ctx| {
        (
          ctx.deps.clone(),
          produced(&ctx.validated, "validated request"),
          ctx.now,
        )
      });
      let validated = validated?;

      let voucher = match &validated.voucher_code {
        Some(code) => {
          let found = deps.vouchers.find_voucher(code).await.map_err(OrderError::storage)?;
          Some(found.ok_or_else(|| OrderError::VoucherInvalid(format!("voucher {} does not exist", code)))?)
        }
        None => None,
      };

      let priced = deps.pricing.compute_total(&validated.line_items, voucher.as_ref(), now)?;
      ctx_data.write().priced = Some(priced);
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_RESERVE, |ctx_data: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let (deps, validated) = ctx_data.with(|ctx| (ctx.deps.clone(), produced(&ctx.validated, "validated request")));
      deps.inventory.reserve(&validated?.line_items).await?;
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_PERSIST, |ctx_data: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let (deps, validated, priced, now) = ctx_data.with(|ctx| {
        (
          ctx.deps.clone(),
          produced(&ctx.validated, "validated request"),
          produced(&ctx.priced, "price breakdown"),
          ctx.now,
        )
      });
      let validated = validated?;
      let priced = priced?;

      let order = Order {
        id: Uuid::new_v4(),
        user_id: validated.user_id,
        line_items: validated.line_items,
        address_id: validated.address_id,
        payment_method: validated.payment_method,
        payment_status: PaymentStatus::Pending,
        order_status: OrderStatus::Pending,
        raw_total: priced.raw_total,
        total_amount: priced.final_total,
        voucher_code: validated.voucher_code,
        discount: priced.discount,
        order_date: now,
        payment_id: None,
        payer_id: None,
        stock_reserved: true,
        updated_at: Utc::now(),
      };

      if let Err(e) = deps.orders.insert_order(&order).await {
        error!(order_id = %order.id, error = %e, "Failed to persist order; releasing reserved stock.");
        if let Err(release_err) = deps.inventory.release(&order.line_items).await {
          error!(order_id = %order.id, error = %release_err, "Stock release after failed persist also failed.");
        }
        return Err(OrderError::storage(e));
      }

      info!(order_id = %order.id, total = %order.total_amount, discount = %order.discount, "Order persisted.");
      ctx_data.write().order = Some(order);
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_CLEAR_CART, |ctx_data: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let (deps, order) = ctx_data.with(|ctx| (ctx.deps.clone(), produced(&ctx.order, "order")));
      let user_id = order?.user_id;
      // Failing here would not undo the persisted order.
      match deps.carts.clear_cart(user_id).await {
        Ok(removed) => info!(%user_id, removed, "Cart cleared."),
        Err(e) => warn!(%user_id, error = %e, "Failed to clear cart."),
      }
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.branch_on(STEP_DISPATCH, |ctx: &CreateOrderCtx| {
    ctx.order.as_ref().map(|order| order.payment_method)
  })
  .arm(Some(PaymentMethod::Cash), |ctx_data: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let (deps, order) = ctx_data.with(|ctx| (ctx.deps.clone(), produced(&ctx.order, "order")));
      let outcome = deps.dispatcher.dispatch_cash(&order?);
      ctx_data.write().outcome = Some(outcome);
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  })
  .arm(Some(PaymentMethod::Momo), |ctx_data: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let (deps, order) = ctx_data.with(|ctx| (ctx.deps.clone(), produced(&ctx.order, "order")));
      let outcome = deps.dispatcher.dispatch_momo(&order?).await?;
      ctx_data.write().outcome = Some(outcome);
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  })
  .arm(Some(PaymentMethod::Paypal), |ctx_data: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let (deps, order) = ctx_data.with(|ctx| (ctx.deps.clone(), produced(&ctx.order, "order")));
      let outcome = deps.dispatcher.dispatch_paypal(&order?);
      ctx_data.write().outcome = Some(outcome);
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  })
  .if_unmatched(Unmatched::Fail)
  .finalize();

  p
}

/// Pulls the result out of a completed run.
pub(crate) fn created_order(ctx: &CreateOrderCtx) -> OrderResult<super::CreatedOrder> {
  Ok(super::CreatedOrder {
    order: produced(&ctx.order, "order")?,
    outcome: produced(&ctx.outcome, "payment outcome")?,
  })
}
