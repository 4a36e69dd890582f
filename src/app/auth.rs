use actix_web::{dev::Payload, web, FromRequest, HttpMessage, HttpRequest};
use argon2::{
  password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2
};
use color_eyre::Result;
use eyre::eyre;
use futures::future::{ready, Ready};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use crate::db;
use crate::utils::time_utils::current_timestamp;
use super::error::{map_db_error, Error};
use super::AppState;

pub const SESSION_TOKEN_LENGTH: usize = 48;

pub const ROLE_USER: &'static str = "user";
pub const ROLE_EDITOR: &'static str = "editor";
pub const ROLE_ADMIN: &'static str = "admin";

pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| eyre!("Password hashing failed - {}", e))
}

// A hash that won't parse counts as a failed check, we
// don't want a 500 on a corrupted user row.
pub fn verify_password(password: &str, hash: &str) -> bool {
  match PasswordHash::new(hash) {
    Ok(parsed) => Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok(),
    Err(_) => false
  }
}

pub fn generate_session_token() -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(SESSION_TOKEN_LENGTH)
    .map(char::from)
    .collect()
}

/* --- Request guards --- */

// Extractors double as auth guards: putting one of these
// in a handler signature is what protects the endpoint.
// No session cookie or an expired one is a 401, a valid
// session with the wrong role is a 403.

#[derive(Debug, Clone)]
pub struct SessionUser {
  pub id: i32,
  pub username: String,
  pub role: String
}

// Same thing, but only lets editors and admins through.
pub struct EditorUser(pub SessionUser);

// Admins only.
pub struct AdminUser(pub SessionUser);

// For endpoints open to anonymous visitors that still
// want the user when there is one. Never fails.
pub struct MaybeUser(pub Option<SessionUser>);

fn session_user_from_request(req: &HttpRequest) -> Result<SessionUser, Error> {
  let app_state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| Error::InternalServerError(
      "App state is missing - Should never happen".to_string()
    ))?;
  let cookie = req
    .cookie(&app_state.session_cookie)
    .ok_or_else(|| Error::Unauthorized("No session cookie".to_string()))?;
  match db::session_user(
    &app_state.pool,
    cookie.value(),
    current_timestamp()
  ) {
    Ok(Some(user)) => Ok(SessionUser {
      id: user.id,
      username: user.username,
      role: user.role
    }),
    Ok(None) => Err(Error::Unauthorized(
      "Session is invalid or expired".to_string()
    )),
    Err(e) => Err(map_db_error(e))
  }
}

impl FromRequest for SessionUser {
  type Error = Error;
  type Future = Ready<Result<Self, Self::Error>>;
  type Config = ();

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(session_user_from_request(req))
  }
}

impl FromRequest for EditorUser {
  type Error = Error;
  type Future = Ready<Result<Self, Self::Error>>;
  type Config = ();

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(session_user_from_request(req).and_then(|user| {
      if user.role == ROLE_EDITOR || user.role == ROLE_ADMIN {
        Ok(EditorUser(user))
      } else {
        Err(Error::Forbidden(
          "Editor access required".to_string()
        ))
      }
    }))
  }
}

impl FromRequest for AdminUser {
  type Error = Error;
  type Future = Ready<Result<Self, Self::Error>>;
  type Config = ();

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(session_user_from_request(req).and_then(|user| {
      if user.role == ROLE_ADMIN {
        Ok(AdminUser(user))
      } else {
        Err(Error::Forbidden(
          "Admin access required".to_string()
        ))
      }
    }))
  }
}

impl FromRequest for MaybeUser {
  type Error = Error;
  type Future = Ready<Result<Self, Self::Error>>;
  type Config = ();

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(Ok(MaybeUser(session_user_from_request(req).ok())))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn password_hash_roundtrip() {
    let hash = hash_password("hunter2hunter2").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("hunter2hunter2", &hash));
    assert!(!verify_password("wrong-password", &hash));
  }

  #[test]
  fn garbage_hashes_never_verify() {
    assert!(!verify_password("anything", "not-a-hash"));
    assert!(!verify_password("anything", ""));
  }

  #[test]
  fn session_tokens_are_long_and_unique() {
    let a = generate_session_token();
    let b = generate_session_token();
    assert_eq!(SESSION_TOKEN_LENGTH, a.len());
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(a, b);
  }
}
