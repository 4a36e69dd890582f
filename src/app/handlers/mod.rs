use actix_web::HttpResponse;
use super::error::Error;

// Handlers grouped by concern, one file each. The auth
// guards are extractors (see app::auth), a protected
// endpoint just takes one as an argument.

pub mod analytics;
pub mod auth;
pub mod posts;
pub mod site;

pub async fn index() -> HttpResponse {
  HttpResponse::Ok().body("Nothing here")
}

// Default response when no route matched the request:
pub async fn not_found() -> Result<HttpResponse, Error> {
  Err(Error::NotFound(String::from("Endpoint doesn't exist")))
}
