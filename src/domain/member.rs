use serde::{Deserialize, Serialize};

/// Minimum number of digits in a DNI
pub const DNI_MIN_DIGITS: usize = 7;
/// Maximum number of digits in a DNI
pub const DNI_MAX_DIGITS: usize = 10;

/// National identity number. Doubles as the login username of the member's account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dni(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DniError {
  Empty,
  NotNumeric,
  BadLength,
}

impl DniError {
  pub fn message(&self) -> &'static str {
    match self {
      Self::Empty => "Este campo es obligatorio.",
      Self::NotNumeric => "El DNI debe contener solo números.",
      Self::BadLength => "El DNI debe tener entre 7 y 10 dígitos.",
    }
  }
}

impl Dni {
  /// Parse raw input: trimmed, ASCII digits only, 7-10 digits long.
  pub fn parse(raw: &str) -> Result<Self, DniError> {
    let dni = raw.trim();
    if dni.is_empty() {
      return Err(DniError::Empty);
    }
    if !dni.chars().all(|c| c.is_ascii_digit()) {
      return Err(DniError::NotNumeric);
    }
    if !(DNI_MIN_DIGITS..=DNI_MAX_DIGITS).contains(&dni.len()) {
      return Err(DniError::BadLength);
    }
    Ok(Self(dni.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for Dni {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
  Active,
  Inactive,
  Suspended,
}

impl MemberStatus {
  pub const ALL: [MemberStatus; 3] = [Self::Active, Self::Inactive, Self::Suspended];

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "Activo" => Some(Self::Active),
      "Inactivo" => Some(Self::Inactive),
      "Suspendido" => Some(Self::Suspended),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Active => "Activo",
      Self::Inactive => "Inactivo",
      Self::Suspended => "Suspendido",
    }
  }
}

/// A member joined with its user account and branch, as shown in lists and detail pages.
#[derive(Debug, Clone)]
pub struct Member {
  pub id: i64,
  pub user_id: i64,
  pub dni: String,
  pub username: String,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub branch_id: i64,
  pub branch_name: String,
  pub status: MemberStatus,
  pub created_at: String,
}

impl Member {
  /// "First Last", trimmed; empty when the user has neither.
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
      .trim()
      .to_string()
  }

  /// Full name, falling back to the username
  pub fn display_name(&self) -> String {
    let full = self.full_name();
    if full.is_empty() {
      self.username.clone()
    } else {
      full
    }
  }

  pub fn status_label(&self) -> &'static str {
    self.status.as_str()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn member(first: &str, last: &str) -> Member {
    Member {
      id: 1,
      user_id: 1,
      dni: "30111222".into(),
      username: "30111222".into(),
      first_name: first.into(),
      last_name: last.into(),
      email: "a@b.com".into(),
      branch_id: 1,
      branch_name: "Centro".into(),
      status: MemberStatus::Active,
      created_at: String::new(),
    }
  }

  #[test]
  fn test_dni_accepts_7_to_10_digits() {
    assert_eq!(Dni::parse("1234567").unwrap().as_str(), "1234567");
    assert_eq!(Dni::parse("1234567890").unwrap().as_str(), "1234567890");
    assert_eq!(Dni::parse("  30111222 ").unwrap().as_str(), "30111222");
  }

  #[test]
  fn test_dni_rejects_bad_length() {
    assert_eq!(Dni::parse("123456"), Err(DniError::BadLength));
    assert_eq!(Dni::parse("12345678901"), Err(DniError::BadLength));
  }

  #[test]
  fn test_dni_rejects_non_digits() {
    assert_eq!(Dni::parse("30.111.222"), Err(DniError::NotNumeric));
    assert_eq!(Dni::parse("30111222a"), Err(DniError::NotNumeric));
    assert_eq!(Dni::parse("-3011122"), Err(DniError::NotNumeric));
    assert_eq!(Dni::parse("30 111 222"), Err(DniError::NotNumeric));
    // Arabic-Indic digits are not ASCII
    assert_eq!(Dni::parse("١٢٣٤٥٦٧"), Err(DniError::NotNumeric));
  }

  #[test]
  fn test_dni_empty() {
    assert_eq!(Dni::parse(""), Err(DniError::Empty));
    assert_eq!(Dni::parse("   "), Err(DniError::Empty));
  }

  #[test]
  fn test_member_status_roundtrip() {
    for status in MemberStatus::ALL {
      assert_eq!(MemberStatus::from_str(status.as_str()), Some(status));
    }
    assert_eq!(MemberStatus::from_str("activo"), None);
  }

  #[test]
  fn test_display_name_falls_back_to_username() {
    assert_eq!(member("Ana", "Pérez").display_name(), "Ana Pérez");
    assert_eq!(member("", "Pérez").display_name(), "Pérez");
    assert_eq!(member("", "").display_name(), "30111222");
  }
}
