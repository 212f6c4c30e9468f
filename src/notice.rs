//! One-shot user messages carried across a redirect as a query code
//! (`?notice=created`), rendered by the target page.
//!
//! The deleted member's name is not taken from the query string: the delete
//! handler sets it in a short-lived cookie that the list page reads once.

use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;

/// Carries the display name of the member just deleted to the list page
pub const DELETED_NAME_COOKIE: &str = "socios_deleted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
  MemberCreated,
  MemberUpdated,
  MemberDeleted,
  SubscriptionCreated,
  InvalidMember,
  InvalidPlan,
  AlreadyActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
  Success,
  Error,
}

impl Notice {
  pub fn from_code(code: &str) -> Option<Self> {
    match code {
      "created" => Some(Self::MemberCreated),
      "updated" => Some(Self::MemberUpdated),
      "deleted" => Some(Self::MemberDeleted),
      "subscription_created" => Some(Self::SubscriptionCreated),
      "invalid_member" => Some(Self::InvalidMember),
      "invalid_plan" => Some(Self::InvalidPlan),
      "already_active" => Some(Self::AlreadyActive),
      _ => None,
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      Self::MemberCreated => "created",
      Self::MemberUpdated => "updated",
      Self::MemberDeleted => "deleted",
      Self::SubscriptionCreated => "subscription_created",
      Self::InvalidMember => "invalid_member",
      Self::InvalidPlan => "invalid_plan",
      Self::AlreadyActive => "already_active",
    }
  }

  pub fn level(&self) -> NoticeLevel {
    match self {
      Self::MemberCreated | Self::MemberUpdated | Self::MemberDeleted | Self::SubscriptionCreated => {
        NoticeLevel::Success
      }
      Self::InvalidMember | Self::InvalidPlan | Self::AlreadyActive => NoticeLevel::Error,
    }
  }

  /// User-facing text. `name` fills in the deleted member's name.
  pub fn message(&self, name: Option<&str>) -> String {
    match self {
      Self::MemberCreated => "El socio se creó correctamente.".to_string(),
      Self::MemberUpdated => "Datos del socio actualizados correctamente.".to_string(),
      Self::MemberDeleted => match name {
        Some(name) if !name.trim().is_empty() => format!("Se eliminó el socio {}.", name.trim()),
        _ => "Se eliminó el socio.".to_string(),
      },
      Self::SubscriptionCreated => "La suscripción se creó correctamente.".to_string(),
      Self::InvalidMember => "Socio inválido".to_string(),
      Self::InvalidPlan => "Plan inválido".to_string(),
      Self::AlreadyActive => {
        "El socio ya tiene una suscripción vigente. No se creó una nueva suscripción.".to_string()
      }
    }
  }

  /// `path` with this notice appended as a query string
  pub fn redirect_target(&self, path: &str) -> String {
    format!("{}?notice={}", path, self.code())
  }
}

/// A notice ready to render
#[derive(Debug, Clone, PartialEq)]
pub struct Flash {
  pub text: String,
  pub is_error: bool,
}

impl Flash {
  pub fn success(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      is_error: false,
    }
  }

  pub fn error(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      is_error: true,
    }
  }
}

impl From<(Notice, Option<&str>)> for Flash {
  fn from((notice, name): (Notice, Option<&str>)) -> Self {
    let text = notice.message(name);
    match notice.level() {
      NoticeLevel::Success => Flash::success(text),
      NoticeLevel::Error => Flash::error(text),
    }
  }
}

/// Query parameters read by pages that display notices
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
  pub notice: Option<String>,
  /// Set to 1 right after a member is created
  pub created: Option<String>,
}

impl NoticeQuery {
  /// `deleted_name` comes from the server-set cookie, never from the query
  pub fn flash(&self, deleted_name: Option<&str>) -> Option<Flash> {
    let notice = match self.notice.as_deref().and_then(Notice::from_code) {
      Some(notice) => Some(notice),
      None if self.created.as_deref() == Some("1") => Some(Notice::MemberCreated),
      None => None,
    }?;
    Some(Flash::from((notice, deleted_name)))
  }
}

/// Cookie set by the delete handler, scoped to the member pages
pub fn deleted_name_cookie(name: &str) -> Cookie<'static> {
  Cookie::build((DELETED_NAME_COOKIE, urlencoding::encode(name).into_owned()))
    .path("/socios/")
    .http_only(true)
    .max_age(time::Duration::minutes(1))
    .build()
}

/// Read the deleted member's name and clear the cookie so it shows only once
pub fn take_deleted_name(jar: CookieJar) -> (CookieJar, Option<String>) {
  let Some(name) = jar
    .get(DELETED_NAME_COOKIE)
    .and_then(|c| urlencoding::decode(c.value()).ok().map(|n| n.into_owned()))
  else {
    return (jar, None);
  };
  let removal = Cookie::build((DELETED_NAME_COOKIE, "")).path("/socios/").build();
  (jar.remove(removal), Some(name))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_codes_resolve() {
    for notice in [Notice::MemberCreated, Notice::AlreadyActive, Notice::InvalidPlan] {
      assert_eq!(Notice::from_code(notice.code()), Some(notice));
    }
    assert_eq!(Notice::from_code("<script>"), None);
  }

  #[test]
  fn test_deleted_message_uses_name() {
    assert_eq!(
      Notice::MemberDeleted.message(Some("Ana Pérez")),
      "Se eliminó el socio Ana Pérez."
    );
    assert_eq!(Notice::MemberDeleted.message(None), "Se eliminó el socio.");
  }

  #[test]
  fn test_query_flash() {
    let query = NoticeQuery {
      notice: Some("already_active".into()),
      ..Default::default()
    };
    let flash = query.flash(None).unwrap();
    assert!(flash.is_error);
    assert!(flash.text.starts_with("El socio ya tiene una suscripción vigente"));

    let created = NoticeQuery {
      created: Some("1".into()),
      ..Default::default()
    };
    assert_eq!(created.flash(None), Some(Flash::success("El socio se creó correctamente.")));

    assert_eq!(NoticeQuery::default().flash(None), None);
  }

  #[test]
  fn test_redirect_target() {
    assert_eq!(Notice::MemberUpdated.redirect_target("/socios/4/"), "/socios/4/?notice=updated");
  }

  #[test]
  fn test_deleted_name_comes_from_cookie_only() {
    let query: NoticeQuery = query_from("notice=deleted&name=Mallory");
    assert_eq!(query.flash(None), Some(Flash::success("Se eliminó el socio.")));
    assert_eq!(
      query.flash(Some("Ana Pérez")),
      Some(Flash::success("Se eliminó el socio Ana Pérez."))
    );
  }

  #[test]
  fn test_deleted_name_cookie_read_once() {
    let jar = CookieJar::new().add(deleted_name_cookie("Ana Pérez"));
    let (jar, name) = take_deleted_name(jar);
    assert_eq!(name.as_deref(), Some("Ana Pérez"));
    assert!(jar.get(DELETED_NAME_COOKIE).is_none_or(|c| c.value().is_empty()));

    let (_, none) = take_deleted_name(CookieJar::new());
    assert_eq!(none, None);
  }

  fn query_from(raw: &str) -> NoticeQuery {
    axum::extract::Query::try_from_uri(&format!("/socios/?{}", raw).parse().unwrap())
      .unwrap()
      .0
  }
}
