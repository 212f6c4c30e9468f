//! Form parsing and validation.
//!
//! Raw form structs deserialize every field as a string so a malformed
//! submission still reaches validation and can be re-rendered with the
//! user's input. `validate` turns them into typed commands or `FormErrors`.

pub mod member;
pub mod subscription;

pub use member::MemberForm;
pub use subscription::{quick_subscribe, QuickOutcome, QuickSubscriptionForm, SubscriptionForm};

use std::collections::BTreeMap;

/// Maximum length of person name fields
pub const NAME_MAX_LEN: usize = 150;

pub const REQUIRED: &str = "Este campo es obligatorio.";

/// Validation errors keyed by form field name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
  fields: BTreeMap<&'static str, String>,
}

impl FormErrors {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record an error for `field`; the first error per field wins
  pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
    self.fields.entry(field).or_insert_with(|| message.into());
  }

  pub fn get(&self, field: &str) -> Option<&str> {
    self.fields.get(field).map(String::as_str)
  }

  pub fn has(&self, field: &str) -> bool {
    self.fields.contains_key(field)
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }
}

/// Trimmed, required, at most `NAME_MAX_LEN` characters
pub(crate) fn required_text(
  errors: &mut FormErrors,
  field: &'static str,
  value: &str,
) -> String {
  let value = value.trim();
  if value.is_empty() {
    errors.add(field, REQUIRED);
  } else if value.chars().count() > NAME_MAX_LEN {
    errors.add(
      field,
      format!("Asegurate de que este valor tenga como máximo {} caracteres.", NAME_MAX_LEN),
    );
  }
  value.to_string()
}

/// Basic address check: `local@domain.tld`, no whitespace, no empty labels
pub fn is_valid_email(email: &str) -> bool {
  if email.len() > 254 || email.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = email.rsplit_once('@') else {
    return false;
  };
  !local.is_empty()
    && !local.contains('@')
    && domain.contains('.')
    && domain.split('.').all(|label| {
      !label.is_empty()
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    })
}

/// Parse an optional integer ID from a form field
pub(crate) fn parse_id(value: &str) -> Option<i64> {
  value.trim().parse().ok()
}
