//! Money amounts stored as integer cents.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Money(i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyError {
  Invalid,
  Negative,
  TooManyDecimals,
}

impl MoneyError {
  pub fn message(&self) -> &'static str {
    match self {
      Self::Invalid => "Ingresá un número válido.",
      Self::Negative => "El monto no puede ser negativo.",
      Self::TooManyDecimals => "El monto admite como máximo 2 decimales.",
    }
  }
}

impl Money {
  pub fn from_cents(cents: i64) -> Self {
    Self(cents)
  }

  pub fn cents(&self) -> i64 {
    self.0
  }

  /// Parse a plain decimal like `1500`, `1500.5` or `-0.25`.
  ///
  /// Only `.` is accepted as separator; thousands separators are rejected.
  pub fn parse(raw: &str) -> Result<Self, MoneyError> {
    let s = raw.trim();
    let (negative, digits) = match s.strip_prefix('-') {
      Some(rest) => (true, rest),
      None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let (int_part, frac_part) = match digits.split_once('.') {
      Some((i, f)) => (i, f),
      None => (digits, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
      return Err(MoneyError::Invalid);
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
      return Err(MoneyError::Invalid);
    }
    if frac_part.len() > 2 {
      return Err(MoneyError::TooManyDecimals);
    }

    let units: i64 = if int_part.is_empty() {
      0
    } else {
      int_part.parse().map_err(|_| MoneyError::Invalid)?
    };
    let frac: i64 = match frac_part.len() {
      0 => 0,
      1 => frac_part.parse::<i64>().map_err(|_| MoneyError::Invalid)? * 10,
      _ => frac_part.parse().map_err(|_| MoneyError::Invalid)?,
    };
    let cents = units
      .checked_mul(100)
      .and_then(|c| c.checked_add(frac))
      .ok_or(MoneyError::Invalid)?;

    if negative && cents != 0 {
      return Err(MoneyError::Negative);
    }
    Ok(Self(cents))
  }
}

impl std::fmt::Display for Money {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
  }
}
