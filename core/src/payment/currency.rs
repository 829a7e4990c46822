// orderflow/src/payment/currency.rs

//! VND/USD conversion for PayPal, which is charged in USD while the store prices in VND.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{OrderError, OrderResult};

/// 1 VND = 0.00004 USD.
pub const VND_TO_USD: Decimal = Decimal::from_parts(4, 0, 0, false, 5);
/// 1 USD = 25 000 VND.
pub const USD_TO_VND: Decimal = Decimal::from_parts(25_000, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
  Usd,
  Vnd,
}

impl Currency {
  pub fn code(&self) -> &'static str {
    match self {
      Currency::Usd => "USD",
      Currency::Vnd => "VND",
    }
  }
}

impl fmt::Display for Currency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

impl FromStr for Currency {
  type Err = OrderError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_uppercase().as_str() {
      "USD" => Ok(Currency::Usd),
      "VND" => Ok(Currency::Vnd),
      other => Err(OrderError::InvalidRequest(format!("unsupported currency '{}'", other))),
    }
  }
}

fn ensure_positive(amount: Decimal, currency: Currency) -> OrderResult<()> {
  if amount <= Decimal::ZERO {
    return Err(OrderError::InvalidRequest(format!("invalid {} amount {}", currency, amount)));
  }
  Ok(())
}

fn out_of_range(amount: Decimal, currency: Currency) -> OrderError {
  OrderError::InvalidRequest(format!("{} amount {} is out of range", currency, amount))
}

/// Rounded to cents.
pub fn vnd_to_usd(vnd: Decimal) -> OrderResult<Decimal> {
  ensure_positive(vnd, Currency::Vnd)?;
  let usd = vnd.checked_mul(VND_TO_USD).ok_or_else(|| out_of_range(vnd, Currency::Vnd))?;
  Ok(usd.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Rounded to whole dong.
pub fn usd_to_vnd(usd: Decimal) -> OrderResult<Decimal> {
  ensure_positive(usd, Currency::Usd)?;
  let vnd = usd.checked_mul(USD_TO_VND).ok_or_else(|| out_of_range(usd, Currency::Usd))?;
  Ok(vnd.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
}

/// `$12.34` for USD, `125.000₫` for VND.
pub fn format_currency(amount: Decimal, currency: Currency) -> String {
  if amount.is_zero() {
    return "0".to_string();
  }
  match currency {
    Currency::Usd => format!("${:.2}", amount),
    Currency::Vnd => format!("{}₫", group_thousands(amount.trunc())),
  }
}

fn group_thousands(whole: Decimal) -> String {
  let digits = whole.abs().normalize().to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (idx, ch) in digits.chars().enumerate() {
    if idx > 0 && (digits.len() - idx) % 3 == 0 {
      grouped.push('.');
    }
    grouped.push(ch);
  }
  if whole.is_sign_negative() {
    grouped.insert(0, '-');
  }
  grouped
}
