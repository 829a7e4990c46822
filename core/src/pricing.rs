// orderflow/src/pricing.rs

//! Pricing Engine: raw total, voucher validity and the discount-policy chain.
//!
//! Discounts are an ordered list of `DiscountPolicy` values folded over an
//! immutable `PriceBreakdown`. Each policy sees the running total left by the
//! previous one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{OrderError, OrderResult};
use crate::model::{LineItem, Voucher, VoucherKind};

pub type Money = Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
  pub raw_total: Money,
  pub discount: Money,
  pub final_total: Money,
}

impl PriceBreakdown {
  pub fn undiscounted(raw_total: Money) -> Self {
    Self {
      raw_total,
      discount: Decimal::ZERO,
      final_total: raw_total,
    }
  }

  // Never lets the accumulated discount pass the raw total.
  fn with_extra_discount(self, extra: Money) -> Self {
    let extra = extra.max(Decimal::ZERO).min(self.final_total);
    let discount = self.discount + extra;
    Self {
      raw_total: self.raw_total,
      discount,
      final_total: self.raw_total - discount,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiscountPolicy {
  Fixed { amount: Money },
  Percent { percent: Decimal, max_discount: Option<Money> },
}

impl DiscountPolicy {
  pub fn from_voucher(voucher: &Voucher) -> Self {
    match voucher.kind {
      VoucherKind::Fixed => DiscountPolicy::Fixed { amount: voucher.value },
      VoucherKind::Percent => DiscountPolicy::Percent {
        percent: voucher.value,
        max_discount: voucher.max_discount,
      },
    }
  }

  pub fn apply(&self, current: PriceBreakdown) -> PriceBreakdown {
    let extra = match self {
      DiscountPolicy::Fixed { amount } => *amount,
      DiscountPolicy::Percent { percent, max_discount } => {
        // Overflows only for absurd percentages.
        let by_percent = match current.final_total.checked_mul(*percent) {
          Some(scaled) => scaled / Decimal::ONE_HUNDRED,
          None if percent.is_sign_negative() => Decimal::ZERO,
          None => current.final_total,
        };
        match max_discount {
          Some(cap) => by_percent.min(*cap),
          None => by_percent,
        }
      }
    };
    current.with_extra_discount(extra)
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine;

impl PricingEngine {
  pub fn new() -> Self {
    PricingEngine
  }

  /// `InvalidRequest` if the cart total does not fit in a `Decimal`.
  pub fn raw_total(&self, items: &[LineItem]) -> OrderResult<Money> {
    items.iter().try_fold(Decimal::ZERO, |total, item| {
      total
        .checked_add(item.subtotal()?)
        .ok_or_else(|| OrderError::InvalidRequest("cart total is out of range".to_string()))
    })
  }

  /// `VoucherInvalid` unless the voucher is usable for an order of `raw_total` at `now`.
  pub fn check_voucher(&self, voucher: &Voucher, raw_total: Money, now: DateTime<Utc>) -> OrderResult<()> {
    if !voucher.is_active {
      return Err(OrderError::VoucherInvalid(format!("voucher {} is not active", voucher.code)));
    }
    if voucher.is_expired_at(now) {
      return Err(OrderError::VoucherInvalid(format!("voucher {} has expired", voucher.code)));
    }
    if raw_total < voucher.min_order_amount {
      return Err(OrderError::voucher_below_minimum(voucher.min_order_amount));
    }
    Ok(())
  }

  pub fn apply_policies(&self, base: PriceBreakdown, policies: &[DiscountPolicy]) -> PriceBreakdown {
    policies.iter().fold(base, |acc, policy| policy.apply(acc))
  }

  #[instrument(name = "PricingEngine::compute_total", skip(self, items, voucher), fields(items = items.len(), has_voucher = voucher.is_some()))]
  pub fn compute_total(
    &self,
    items: &[LineItem],
    voucher: Option<&Voucher>,
    now: DateTime<Utc>,
  ) -> OrderResult<PriceBreakdown> {
    let base = PriceBreakdown::undiscounted(self.raw_total(items)?);
    let mut policies = Vec::new();
    if let Some(voucher) = voucher {
      self.check_voucher(voucher, base.raw_total, now)?;
      policies.push(DiscountPolicy::from_voucher(voucher));
    }
    let priced = self.apply_policies(base, &policies);
    debug!(raw_total = %priced.raw_total, discount = %priced.discount, final_total = %priced.final_total, "Cart priced.");
    Ok(priced)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;
  use rust_decimal_macros::dec;
  use uuid::Uuid;

  fn voucher(kind: VoucherKind, value: Decimal) -> Voucher {
    Voucher {
      code: "SALE".to_string(),
      kind,
      value,
      max_discount: None,
      min_order_amount: Decimal::ZERO,
      is_active: true,
      expired_at: None,
    }
  }

  fn cart(total: Decimal) -> Vec<LineItem> {
    vec![LineItem::new(Uuid::new_v4(), 1, total)]
  }

  #[test]
  fn percent_discount_is_capped() {
    let mut v = voucher(VoucherKind::Percent, dec!(10));
    v.max_discount = Some(dec!(5000));
    let priced = PricingEngine::new()
      .compute_total(&cart(dec!(100000)), Some(&v), Utc::now())
      .unwrap();
    assert_eq!(priced.discount, dec!(5000));
    assert_eq!(priced.final_total, dec!(95000));
  }

  #[test]
  fn uncapped_percent_discount() {
    let v = voucher(VoucherKind::Percent, dec!(10));
    let priced = PricingEngine::new()
      .compute_total(&cart(dec!(100000)), Some(&v), Utc::now())
      .unwrap();
    assert_eq!(priced.discount, dec!(10000));
  }

  #[test]
  fn fixed_discount_never_exceeds_raw_total() {
    let v = voucher(VoucherKind::Fixed, dec!(20000));
    let priced = PricingEngine::new()
      .compute_total(&cart(dec!(15000)), Some(&v), Utc::now())
      .unwrap();
    assert_eq!(priced.discount, dec!(15000));
    assert_eq!(priced.final_total, Decimal::ZERO);
  }

  #[test]
  fn policies_fold_over_the_running_total() {
    let engine = PricingEngine::new();
    let base = PriceBreakdown::undiscounted(dec!(100000));
    let priced = engine.apply_policies(
      base,
      &[
        DiscountPolicy::Fixed { amount: dec!(20000) },
        DiscountPolicy::Percent {
          percent: dec!(50),
          max_discount: None,
        },
      ],
    );
    assert_eq!(priced.discount, dec!(60000));
    assert_eq!(priced.final_total, dec!(40000));
  }

  #[test]
  fn rejects_inactive_expired_and_below_minimum() {
    let engine = PricingEngine::new();
    let now = Utc::now();

    let mut inactive = voucher(VoucherKind::Fixed, dec!(1000));
    inactive.is_active = false;
    let mut expired = voucher(VoucherKind::Fixed, dec!(1000));
    expired.expired_at = Some(now - Duration::days(1));
    let mut minimum = voucher(VoucherKind::Fixed, dec!(1000));
    minimum.min_order_amount = dec!(50000);

    for v in [inactive, expired, minimum] {
      let result = engine.compute_total(&cart(dec!(30000)), Some(&v), now);
      assert!(matches!(result, Err(OrderError::VoucherInvalid(_))), "{:?}", v);
    }
  }

  #[test]
  fn no_voucher_means_no_discount() {
    let items = vec![
      LineItem::new(Uuid::new_v4(), 3, dec!(1000)),
      LineItem::new(Uuid::new_v4(), 1, dec!(500)),
    ];
    let priced = PricingEngine::new().compute_total(&items, None, Utc::now()).unwrap();
    assert_eq!(priced.raw_total, dec!(3500));
    assert_eq!(priced.discount, Decimal::ZERO);
    assert_eq!(priced.final_total, dec!(3500));
  }

  #[test]
  fn oversized_carts_are_invalid_requests() {
    let engine = PricingEngine::new();
    let items = vec![
      LineItem::new(Uuid::new_v4(), 1, Decimal::MAX),
      LineItem::new(Uuid::new_v4(), 1, Decimal::MAX),
    ];
    assert!(matches!(engine.raw_total(&items), Err(OrderError::InvalidRequest(_))));

    let huge = DiscountPolicy::Percent {
      percent: Decimal::MAX,
      max_discount: None,
    };
    let priced = huge.apply(PriceBreakdown::undiscounted(dec!(100000)));
    assert_eq!(priced.final_total, Decimal::ZERO);
  }
}
