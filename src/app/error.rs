use actix_web::{error::ResponseError, HttpResponse};
use derive_more::Display;
use log::error;
use serde::Serialize;

// The full error output should only appear in logs, random
// internet people get the generic display strings.
#[derive(Debug, Display)]
pub enum Error {
  #[display(fmt = "Internal Server Error")]
  InternalServerError(String),
  #[display(fmt = "Database Error")]
  DatabaseError(String),
  #[display(fmt = "Unauthorized")]
  Unauthorized(String),
  #[display(fmt = "Forbidden: {}", _0)]
  Forbidden(String),
  #[display(fmt = "Not Found: {}", _0)]
  NotFound(String),
  #[display(fmt = "Bad Request (check request params)")]
  BadRequest(String),
  #[display(fmt = "Validation failed")]
  Validation(Vec<FieldError>),
  #[display(fmt = "Too many requests")]
  TooManyRequests
}

// Per-field messages for 400 responses, the client forms
// display these next to their inputs.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
  pub field: &'static str,
  pub message: String
}

// JSON error bodies everywhere, the old API was doing
// that too.
#[derive(Serialize)]
struct ErrorBody<'a> {
  message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  errors: Option<&'a Vec<FieldError>>
}

impl Error {
  fn body(&self) -> ErrorBody {
    let errors = match self {
      Error::Validation(errors) => Some(errors),
      _ => None
    };
    let message = match self {
      // BadRequest carries a message meant for the caller:
      Error::BadRequest(msg) => msg.clone(),
      Error::Forbidden(msg) => msg.clone(),
      Error::NotFound(msg) => msg.clone(),
      _ => self.to_string()
    };
    ErrorBody { message, errors }
  }
}

impl ResponseError for Error {
  fn error_response(&self) -> HttpResponse {
    match self {
      Error::InternalServerError(_) | Error::DatabaseError(_) =>
        HttpResponse::InternalServerError().json(self.body()),
      Error::Unauthorized(_) => HttpResponse::Unauthorized().json(self.body()),
      Error::Forbidden(_) => HttpResponse::Forbidden().json(self.body()),
      Error::NotFound(_) => HttpResponse::NotFound().json(self.body()),
      Error::BadRequest(_) | Error::Validation(_) =>
        HttpResponse::BadRequest().json(self.body()),
      Error::TooManyRequests => HttpResponse::TooManyRequests().json(self.body())
    }
  }
}

// Database errors shouldn't show up in browsers, the
// details go to the logs only.
pub fn map_db_error(e: color_eyre::Report) -> Error {
  error!("Database error - {}", e);
  Error::DatabaseError(e.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::http::StatusCode;

  #[test]
  fn validation_errors_map_to_400() {
    let sut = Error::Validation(vec![FieldError {
      field: "email",
      message: "Invalid email address".to_string()
    }]);
    assert_eq!(StatusCode::BAD_REQUEST, sut.error_response().status());
  }

  #[test]
  fn auth_errors_map_to_401_and_403() {
    let unauth = Error::Unauthorized("no session".to_string());
    let forbidden = Error::Forbidden("admins only".to_string());
    assert_eq!(StatusCode::UNAUTHORIZED, unauth.error_response().status());
    assert_eq!(StatusCode::FORBIDDEN, forbidden.error_response().status());
  }
}
