use actix_web::{
  cookie::{Cookie, SameSite},
  web, HttpMessage, HttpRequest, HttpResponse
};
use log::{error, info};
use crate::db;
use crate::db::entities::{Session, User};
use crate::utils::time_utils;
use super::super::auth;
use super::super::auth::SessionUser;
use super::super::dtos::*;
use super::super::error::{map_db_error, Error};
use super::super::validation::Validator;
use super::super::AppState;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_USERNAME_LENGTH: usize = 50;

fn session_cookie<'a>(name: &'a str, token: &'a str) -> Cookie<'a> {
  // No max_age on purpose: expiry is enforced server-side
  // against the sessions table, the cookie just lives as
  // long as the browser keeps it.
  Cookie::build(name, token)
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .finish()
}

fn open_session(
  app_state: &AppState,
  user_id: i32
) -> Result<String, Error> {
  let now = time_utils::current_timestamp();
  // Piggyback the cleanup of old sessions on logins, we
  // don't have a scheduler and don't need one for this.
  if let Err(e) = db::purge_expired_sessions(&app_state.pool, now) {
    error!("Could not purge expired sessions - {}", e);
  }
  let session = Session {
    id: auth::generate_session_token(),
    user_id,
    created: now,
    expires: now + app_state.session_max_age
  };
  db::insert_session(&app_state.pool, &session).map_err(map_db_error)?;
  Ok(session.id)
}

pub async fn register(
  app_state: web::Data<AppState>,
  form: web::Json<RegisterForm>
) -> Result<HttpResponse, Error> {
  if app_state.check_rate_limit() {
    return Err(Error::TooManyRequests);
  }
  let form = form.into_inner();
  let username = form.username.trim().to_string();
  Validator::new()
    .require("username", &username)
    .max_length("username", &username, MAX_USERNAME_LENGTH)
    .min_length("password", &form.password, MIN_PASSWORD_LENGTH)
    .check()?;

  let password = auth::hash_password(&form.password)
    .map_err(|e| {
      error!("Password hashing failed - {}", e);
      Error::InternalServerError("Could not process password".to_string())
    })?;

  let mut user = User {
    id: -1,
    username,
    password,
    // Self-registration never hands out privileged roles:
    role: auth::ROLE_USER.to_string(),
    created: time_utils::current_timestamp()
  };
  db::insert_user(&app_state.pool, &mut user)
    .map_err(|e| {
      if db::is_unique_violation(&e) {
        Error::BadRequest("Username is already taken".to_string())
      } else {
        map_db_error(e)
      }
    })?;
  info!("New user registered: {}", user.username);

  let token = open_session(&app_state, user.id)?;
  Ok(
    HttpResponse::Created()
      .cookie(session_cookie(&app_state.session_cookie, &token))
      .json(UserDto::from(user))
  )
}

pub async fn login(
  app_state: web::Data<AppState>,
  form: web::Json<LoginForm>
) -> Result<HttpResponse, Error> {
  if app_state.check_rate_limit() {
    return Err(Error::TooManyRequests);
  }
  let form = form.into_inner();

  // Same generic message whether the username is unknown
  // or the password is wrong.
  let fail = || Error::Unauthorized("Invalid username or password".to_string());

  let user = db::user_by_username(&app_state.pool, form.username.trim())
    .map_err(map_db_error)?
    .ok_or_else(fail)?;
  if !auth::verify_password(&form.password, &user.password) {
    return Err(fail());
  }

  let token = open_session(&app_state, user.id)?;
  Ok(
    HttpResponse::Ok()
      .cookie(session_cookie(&app_state.session_cookie, &token))
      .json(UserDto::from(user))
  )
}

pub async fn logout(
  app_state: web::Data<AppState>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  if let Some(cookie) = req.cookie(&app_state.session_cookie) {
    if let Err(e) = db::delete_session(&app_state.pool, cookie.value()) {
      // Worst case the session dies on its own expiry:
      error!("Could not delete a session on logout - {}", e);
    }
  }
  let mut removal = Cookie::new(app_state.session_cookie.clone(), "");
  removal.set_path("/");
  Ok(
    HttpResponse::Ok()
      .del_cookie(&removal)
      .json(serde_json::json!({ "message": "Logged out" }))
  )
}

// Who am I. The extractor does all the work.
pub async fn user(user: SessionUser) -> Result<HttpResponse, Error> {
  Ok(HttpResponse::Ok().json(UserDto::from(user)))
}
