use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use r2d2_sqlite::SqliteConnectionManager;
use color_eyre::Result;
use eyre::WrapErr;
use log::{debug, error, warn};
use handlebars::Handlebars;
use std::sync::RwLock;
use rate_limiter::BasicRateLimiter;
// "crate" is needed here because of the dependency
// that's also named "config":
use crate::config::{Config, SiteInfo};
use crate::db::{self, Pool};
use crate::tracking::ip_location::IpLocator;

mod auth;
mod dtos;
mod error;
mod handlers;
mod helpers;
mod rate_limiter;
mod validation;

pub struct AppState {
  pub pool: Pool,
  // The rate limiter only covers login and register:
  pub rate_limiter: RwLock<BasicRateLimiter>,
  // None when no ip2location BIN file is configured, page
  // views then get empty geo fields:
  pub ip_locator: Option<RwLock<IpLocator>>,
  pub site_info: SiteInfo,
  pub session_cookie: String,
  pub session_max_age: i64
}

impl AppState {

  pub fn check_rate_limit(&self) -> bool {
    match self.rate_limiter.write() {
      Ok(mut rl) => rl.update(),
      Err(e) => {
        error!("Could not get a write handle on the \
          rate limiter, SHOULD NEVER HAPPEN - {}", e);
        false
      }
    }
  }

}

// Function to start the server. Async because of the
// .await at the end, the #[actix_web::main] decorator
// lives in main.rs.
pub async fn run() -> Result<()> {
  let config = Config::from_env()
    .expect("Configuration (environment or .env file) is missing");
  debug!("Current config: {:?}", config);
  let manager = SqliteConnectionManager::file(&config.db_path);
  let pool = Pool::new(manager)
    .expect("Database connection failed");
  // Idempotent, only creates what's missing:
  db::init_schema(&pool)
    .expect("Could not create the database schema");

  // Geo enrichment is optional. A missing or broken BIN
  // file just means page views without country data.
  let ip_locator = if config.iploc_path.is_empty() {
    None
  } else {
    match IpLocator::open(&config.iploc_path) {
      Ok(locator) => Some(RwLock::new(locator)),
      Err(e) => {
        warn!("Could not open the ip2location database, geo \
          enrichment is disabled - {}", e);
        None
      }
    }
  };

  // Declare the template system, currently using
  // handlebars:
  let mut handlebars = Handlebars::new();
  handlebars
    .register_templates_directory(".xhtml", &config.template_dir)
    .expect("Fatal: templates directory might be missing or \
      not accessible");
  let handlebars_ref = web::Data::new(handlebars);

  // These get moved into the HttpServer closure, "config"
  // itself is about to be destructured into app state.
  let bind_address = config.bind_address.clone();
  let cors_origin = config.cors_origin.clone();

  let app_state = web::Data::new(
    AppState {
      pool,
      ip_locator,
      rate_limiter: RwLock::new(
        BasicRateLimiter::new(
          config.rl_max_requests,
          config.rl_max_requests_time,
          config.rl_block_duration
        )
      ),
      session_cookie: config.session_cookie.clone(),
      session_max_age: config.session_max_age,
      site_info: (&config).into()
    }
  );

  HttpServer::new(move|| {
    // The session cookie requires credentials over CORS:
    let cors = Cors::default()
      .allowed_origin(&cors_origin)
      .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
      .allow_any_header()
      .supports_credentials()
      .max_age(3600);

    App::new()
      .app_data(app_state.clone())
      .app_data(handlebars_ref.clone())
      .app_data(web::PathConfig::default().error_handler(|_, _| {
        error::Error::BadRequest("Invalid path arguments".to_string()).into()
      }))
      .app_data(web::QueryConfig::default().error_handler(|_, _| {
        error::Error::BadRequest(
          "Invalid query string arguments".to_string()
        ).into()
      }))
      .app_data(json_config())
      .wrap(cors)
      .wrap(middleware::Logger::default())
      .configure(base_endpoints_config)
      .default_service(web::route().to(handlers::not_found))
  })
  .bind(bind_address)?
  .run()
  .await
  .context("Start Actix web server")

}

// Extractor failures get the same JSON error body as our
// own Error type, a broken JSON payload shouldn't be the
// one place the API answers in plain text.
fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err, _| {
    error::Error::BadRequest(format!("Invalid JSON body - {}", err)).into()
  })
}

// Route configuration. Fixed paths have to be declared
// before the dynamic {idOrSlug} one or they'd never match.
fn base_endpoints_config(cfg: &mut web::ServiceConfig) {
  cfg.route("/", web::get().to(handlers::index))
    .route("/sitemap.xml", web::get().to(handlers::site::sitemap))
    .route("/robots.txt", web::get().to(handlers::site::robots))
    // Auth:
    .route("/api/register", web::post().to(handlers::auth::register))
    .route("/api/login", web::post().to(handlers::auth::login))
    .route("/api/logout", web::post().to(handlers::auth::logout))
    .route("/api/user", web::get().to(handlers::auth::user))
    // Posts:
    .route("/api/posts", web::get().to(handlers::posts::all_posts))
    .route("/api/posts", web::post().to(handlers::posts::create_post))
    .route("/api/posts/featured", web::get().to(handlers::posts::featured_posts))
    .route(
      "/api/posts/category/{slug}",
      web::get().to(handlers::posts::posts_by_category)
    )
    .route("/api/posts/{slug}/content", web::get().to(handlers::posts::post_content))
    .route("/api/posts/{idOrSlug}", web::get().to(handlers::posts::post))
    .route("/api/posts/{id}", web::put().to(handlers::posts::update_post))
    .route("/api/posts/{id}", web::delete().to(handlers::posts::delete_post))
    .route("/api/search", web::get().to(handlers::posts::search))
    // Categories and authors:
    .route("/api/categories", web::get().to(handlers::site::categories))
    .route("/api/categories", web::post().to(handlers::site::create_category))
    .route("/api/categories/{slug}", web::get().to(handlers::site::category))
    .route("/api/authors", web::get().to(handlers::site::authors))
    .route("/api/authors", web::post().to(handlers::site::create_author))
    .route("/api/authors/{id}", web::get().to(handlers::site::author))
    // Newsletter and contact:
    .route("/api/subscribe", web::post().to(handlers::site::subscribe))
    .route("/api/subscribers", web::get().to(handlers::site::subscribers))
    .route("/api/contact", web::post().to(handlers::site::contact))
    .route("/api/messages", web::get().to(handlers::site::messages))
    .route(
      "/api/messages/{id}/read",
      web::put().to(handlers::site::mark_message_read)
    )
    // Analytics:
    .route(
      "/api/analytics/page-views",
      web::post().to(handlers::analytics::record_page_view)
    )
    .route(
      "/api/analytics/page-views",
      web::get().to(handlers::analytics::page_views)
    )
    .route(
      "/api/analytics/visitors",
      web::get().to(handlers::analytics::visitors)
    )
    .route(
      "/api/analytics/traffic",
      web::post().to(handlers::analytics::record_traffic_stats)
    )
    .route(
      "/api/analytics/traffic",
      web::get().to(handlers::analytics::traffic)
    )
    .route(
      "/api/analytics/content-performance",
      web::post().to(handlers::analytics::record_content_performance)
    )
    .route(
      "/api/analytics/content-performance",
      web::get().to(handlers::analytics::post_performance)
    )
    .route(
      "/api/analytics/top-content",
      web::get().to(handlers::analytics::top_content)
    )
    .route(
      "/api/analytics/user-engagement",
      web::post().to(handlers::analytics::record_engagement)
    )
    .route(
      "/api/analytics/engaged-users",
      web::get().to(handlers::analytics::engaged_users)
    )
    .route(
      "/api/analytics/summary",
      web::get().to(handlers::analytics::summary)
    );
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::http::StatusCode;
  use actix_web::{test, App};
  use crate::db::test_pool;

  #[actix_rt::test]
  async fn malformed_json_bodies_get_the_json_error_shape() {
    let state = web::Data::new(test_state(test_pool()));
    let mut app = test::init_service(
      App::new()
        .app_data(state)
        .app_data(json_config())
        .route(
          "/api/analytics/page-views",
          web::post().to(handlers::analytics::record_page_view)
        )
    ).await;
    let req = test::TestRequest::post()
      .uri("/api/analytics/page-views")
      .header("content-type", "application/json")
      .set_payload("{not json at all")
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(StatusCode::BAD_REQUEST, resp.status());
    let body = test::read_body(resp).await;
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(parsed["message"].as_str().unwrap().contains("JSON"));
  }
}

#[cfg(test)]
pub fn test_state(pool: Pool) -> AppState {
  AppState {
    pool,
    // High enough to never trip in tests:
    rate_limiter: RwLock::new(BasicRateLimiter::new(10000, 900, 900)),
    ip_locator: None,
    site_info: SiteInfo {
      title: "Test Blog".to_string(),
      root: "https://test.example.com".to_string(),
      description: "Testing".to_string()
    },
    session_cookie: "blog_session".to_string(),
    session_max_age: 3600
  }
}
