use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

use super::{is_valid_email, parse_id, required_text, FormErrors, REQUIRED};
use crate::db::MemberData;
use crate::domain::{Branch, Dni, Member, MemberStatus};

/// Create/edit member form. Field names match the HTML inputs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MemberForm {
  #[serde(default)]
  pub dni: String,
  #[serde(default)]
  pub sucursal: String,
  #[serde(default)]
  pub estado: String,
  #[serde(default)]
  pub nombre: String,
  #[serde(default)]
  pub apellido: String,
  #[serde(default)]
  pub email: String,
}

impl MemberForm {
  /// Prefill from an existing member and its user account
  pub fn from_member(member: &Member) -> Self {
    Self {
      dni: member.dni.clone(),
      sucursal: member.branch_id.to_string(),
      estado: member.status.as_str().to_string(),
      nombre: member.first_name.clone(),
      apellido: member.last_name.clone(),
      email: member.email.clone(),
    }
  }

  pub fn validate(&self, branches: &[Branch]) -> Result<MemberData, FormErrors> {
    let mut errors = FormErrors::new();

    let dni = Dni::parse(&self.dni)
      .map_err(|e| errors.add("dni", e.message()))
      .ok();

    let branch_id = match parse_id(&self.sucursal) {
      Some(id) if branches.iter().any(|b| b.id == id) => Some(id),
      _ if self.sucursal.trim().is_empty() => {
        errors.add("sucursal", REQUIRED);
        None
      }
      _ => {
        errors.add("sucursal", "Seleccioná una sucursal válida.");
        None
      }
    };

    let status = match MemberStatus::from_str(self.estado.trim()) {
      Some(status) => Some(status),
      None if self.estado.trim().is_empty() => {
        errors.add("estado", REQUIRED);
        None
      }
      None => {
        errors.add("estado", "Seleccioná un estado válido.");
        None
      }
    };

    let first_name = required_text(&mut errors, "nombre", &self.nombre);
    let last_name = required_text(&mut errors, "apellido", &self.apellido);

    let email = self.email.trim().to_string();
    if email.is_empty() {
      errors.add("email", REQUIRED);
    } else if !is_valid_email(&email) {
      errors.add("email", "Introduzca una dirección de correo electrónico válida.");
    }

    match (dni, branch_id, status) {
      (Some(dni), Some(branch_id), Some(status)) if errors.is_empty() => Ok(MemberData {
        dni,
        branch_id,
        status,
        first_name,
        last_name,
        email,
      }),
      _ => Err(errors),
    }
  }

  /// Takes the id by value or by reference (templates pass `&i64`)
  pub fn is_branch(&self, branch_id: impl Borrow<i64>) -> bool {
    parse_id(&self.sucursal) == Some(*branch_id.borrow())
  }

  pub fn is_status(&self, status: &str) -> bool {
    self.estado.trim() == status
  }
}
