use actix_web::{web, HttpRequest, HttpResponse};
use log::{error, warn};
use crate::db::analytics;
use crate::db::analytics::PeriodType;
use crate::db::entities::*;
use crate::tracking;
use crate::tracking::ip_location::GeoInfo;
use crate::tracking::ua;
use crate::utils::{ip_utils, time_utils};
use super::super::auth::{AdminUser, MaybeUser, SessionUser};
use super::super::dtos::*;
use super::super::error::{map_db_error, Error, FieldError};
use super::super::helpers;
use super::super::validation::Validator;
use super::super::AppState;

// Defaults for the various list endpoints:
const DEFAULT_TRAFFIC_LIMIT: usize = 30;
const DEFAULT_TOP_LIMIT: usize = 10;
const DEFAULT_PAGE_VIEW_LIMIT: usize = 50;
const DEFAULT_VISITOR_DAYS: i64 = 30;

// Summary composition, what the dashboard landing
// page shows:
const SUMMARY_VISITOR_DAYS: i64 = 30;
const SUMMARY_PAGE_VIEWS: usize = 10;
const SUMMARY_TOP_CONTENT: usize = 5;
const SUMMARY_TRAFFIC_DAYS: usize = 7;

fn parse_period_type(value: &str) -> Result<PeriodType, Error> {
  PeriodType::parse(value).ok_or_else(|| {
    Error::Validation(vec![FieldError {
      field: "periodType",
      message: "Must be one of daily, weekly, monthly".to_string()
    }])
  })
}

/* --- Page views --- */

// Open to anonymous visitors, this is the tracking beacon
// the client fires on navigation. Everything derivable
// server-side gets derived here: user id from the session
// when there is one, device and browser from the user
// agent, geo from the optional ip2location database, and
// a fallback session id for clients that didn't send one.
pub async fn record_page_view(
  app_state: web::Data<AppState>,
  form: web::Json<PageViewForm>,
  maybe_user: MaybeUser,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  Validator::new()
    .require("path", &form.path)
    .check()?;

  let now = time_utils::current_timestamp();
  let user_agent = helpers::user_agent(&req);
  let client_ip = helpers::real_ip_addr(&req);

  let session_id = match form.session_id.filter(|s| !s.trim().is_empty()) {
    Some(session_id) => session_id,
    // The address gets truncated before hashing so no
    // full IP ever takes part in a stored identifier:
    None => tracking::fallback_session_id(
      &client_ip
        .map(|ip| ip_utils::extract_first_bytes(&ip.to_string()))
        .unwrap_or_default(),
      &user_agent,
      time_utils::start_of_day(now)
    )
  };

  let mut geo = GeoInfo::empty();
  if let (Some(locator), Some(ip)) = (&app_state.ip_locator, client_ip) {
    // The ip2location reader needs &mut self:
    match locator.write() {
      Ok(mut locator) => match locator.geo_info(ip) {
        Ok(info) => geo = info,
        Err(e) => warn!("Geo lookup failed for a page view - {}", e)
      },
      Err(e) => error!("Could not get a write handle on the IP \
        locator - SHOULD NEVER HAPPEN - {}", e)
    }
  }

  let mut view = PageView {
    id: -1,
    path: form.path,
    session_id,
    user_id: maybe_user.0.map(|u| u.id),
    referrer: form.referrer.filter(|r| !r.is_empty()),
    device: ua::device_from_ua(&user_agent).to_string(),
    browser: ua::browser_from_ua(&user_agent).to_string(),
    user_agent,
    country: geo.country,
    region: geo.region,
    city: geo.city,
    metadata: form.metadata.map(|m| m.to_string()),
    // Server clock, never the client's:
    timestamp: now
  };
  analytics::insert_page_view(&app_state.pool, &mut view)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(PageViewDto::from(view)))
}

pub async fn page_views(
  app_state: web::Data<AppState>,
  query: web::Query<LimitQuery>,
  _admin: AdminUser
) -> Result<HttpResponse, Error> {
  let views: Vec<PageViewDto> = analytics::recent_page_views(
    &app_state.pool,
    query.limit.unwrap_or(DEFAULT_PAGE_VIEW_LIMIT)
  )
    .map_err(map_db_error)?
    .into_iter()
    .map(Into::into)
    .collect();
  Ok(HttpResponse::Ok().json(views))
}

pub async fn visitors(
  app_state: web::Data<AppState>,
  query: web::Query<VisitorsQuery>,
  _admin: AdminUser
) -> Result<HttpResponse, Error> {
  let days = query.days.unwrap_or(DEFAULT_VISITOR_DAYS);
  let count = analytics::unique_visitor_count(&app_state.pool, days)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(VisitorCountDto { count, days }))
}

/* --- Traffic stats --- */

pub async fn record_traffic_stats(
  app_state: web::Data<AppState>,
  form: web::Json<TrafficStatsForm>,
  _admin: AdminUser
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  Validator::new()
    .timestamp("date", form.date)
    .check()?;
  let period_type = parse_period_type(&form.period_type)?;
  let merged = analytics::upsert_traffic_stats(
    &app_state.pool,
    &TrafficStats {
      id: -1,
      date: form.date,
      period_type: period_type.as_str().to_string(),
      visitor_count: form.visitor_count,
      page_view_count: form.page_view_count,
      bounce_rate: form.bounce_rate.unwrap_or(0.0),
      avg_session_duration: form.avg_session_duration.unwrap_or(0.0)
    }
  ).map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(TrafficStatsDto::from(merged)))
}

pub async fn traffic(
  app_state: web::Data<AppState>,
  query: web::Query<TrafficQuery>,
  _admin: AdminUser
) -> Result<HttpResponse, Error> {
  let period_type = match &query.period_type {
    Some(value) => parse_period_type(value)?,
    None => PeriodType::Daily
  };
  let rows: Vec<TrafficStatsDto> = analytics::traffic_stats(
    &app_state.pool,
    period_type,
    query.limit.unwrap_or(DEFAULT_TRAFFIC_LIMIT)
  )
    .map_err(map_db_error)?
    .into_iter()
    .map(Into::into)
    .collect();
  Ok(HttpResponse::Ok().json(rows))
}

/* --- Content performance --- */

pub async fn record_content_performance(
  app_state: web::Data<AppState>,
  form: web::Json<ContentPerformanceForm>,
  _admin: AdminUser
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  Validator::new()
    .positive("postId", form.post_id)
    .timestamp("date", form.date)
    .check()?;
  let merged = analytics::upsert_content_performance(
    &app_state.pool,
    &ContentPerformance {
      id: -1,
      post_id: form.post_id,
      date: form.date,
      views: form.views,
      likes: form.likes.unwrap_or(0),
      shares: form.shares.unwrap_or(0),
      comments: form.comments.unwrap_or(0),
      avg_read_time: form.avg_read_time.unwrap_or(0.0),
      bounce_rate: form.bounce_rate.unwrap_or(0.0)
    }
  ).map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(ContentPerformanceDto::from(merged)))
}

pub async fn top_content(
  app_state: web::Data<AppState>,
  query: web::Query<LimitQuery>,
  _admin: AdminUser
) -> Result<HttpResponse, Error> {
  let rows: Vec<ContentPerformanceDto> = analytics::top_performing_content(
    &app_state.pool,
    query.limit.unwrap_or(DEFAULT_TOP_LIMIT)
  )
    .map_err(map_db_error)?
    .into_iter()
    .map(Into::into)
    .collect();
  Ok(HttpResponse::Ok().json(rows))
}

pub async fn post_performance(
  app_state: web::Data<AppState>,
  query: web::Query<PostIdQuery>,
  _admin: AdminUser
) -> Result<HttpResponse, Error> {
  let rows: Vec<ContentPerformanceDto> =
    analytics::content_performance_for_post(&app_state.pool, query.post_id)
      .map_err(map_db_error)?
      .into_iter()
      .map(Into::into)
      .collect();
  Ok(HttpResponse::Ok().json(rows))
}

/* --- User engagement --- */

// Any logged-in user can push their own engagement row.
// The user id in the payload is ignored and replaced with
// the session's, so nobody writes anyone else's rows.
pub async fn record_engagement(
  app_state: web::Data<AppState>,
  form: web::Json<UserEngagementForm>,
  user: SessionUser
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  Validator::new()
    .timestamp("date", form.date)
    .check()?;
  let now = time_utils::current_timestamp();
  let merged = analytics::upsert_user_engagement(
    &app_state.pool,
    &UserEngagement {
      id: -1,
      user_id: user.id,
      date: form.date,
      session_count: form.session_count,
      total_time_spent: form.total_time_spent,
      pages_per_session: form.pages_per_session.unwrap_or(0.0),
      last_active: form.last_active.unwrap_or(now)
    }
  ).map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(UserEngagementDto::from(merged)))
}

pub async fn engaged_users(
  app_state: web::Data<AppState>,
  query: web::Query<LimitQuery>,
  _admin: AdminUser
) -> Result<HttpResponse, Error> {
  let rows: Vec<UserEngagementDto> = analytics::most_engaged_users(
    &app_state.pool,
    query.limit.unwrap_or(DEFAULT_TOP_LIMIT)
  )
    .map_err(map_db_error)?
    .into_iter()
    .map(Into::into)
    .collect();
  Ok(HttpResponse::Ok().json(rows))
}

/* --- Summary --- */

pub async fn summary(
  app_state: web::Data<AppState>,
  _admin: AdminUser
) -> Result<HttpResponse, Error> {
  let pool = &app_state.pool;
  let summary = SummaryDto {
    unique_visitors: VisitorCountDto {
      count: analytics::unique_visitor_count(pool, SUMMARY_VISITOR_DAYS)
        .map_err(map_db_error)?,
      days: SUMMARY_VISITOR_DAYS
    },
    recent_page_views: analytics::recent_page_views(pool, SUMMARY_PAGE_VIEWS)
      .map_err(map_db_error)?
      .into_iter()
      .map(Into::into)
      .collect(),
    top_content: analytics::top_performing_content(pool, SUMMARY_TOP_CONTENT)
      .map_err(map_db_error)?
      .into_iter()
      .map(Into::into)
      .collect(),
    daily_traffic: analytics::traffic_stats(
      pool,
      PeriodType::Daily,
      SUMMARY_TRAFFIC_DAYS
    )
      .map_err(map_db_error)?
      .into_iter()
      .map(Into::into)
      .collect()
  };
  Ok(HttpResponse::Ok().json(summary))
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::http::StatusCode;
  use actix_web::cookie::Cookie;
  use actix_web::{test, App};
  use crate::app::test_state;
  use crate::db;
  use crate::db::test_pool;

  // Creates a user with the given role and a live session
  // for it, returns the session token.
  fn logged_in(pool: &db::Pool, username: &str, role: &str) -> String {
    let now = time_utils::current_timestamp();
    let mut user = User {
      id: -1,
      username: username.to_string(),
      password: "irrelevant".to_string(),
      role: role.to_string(),
      created: now
    };
    db::insert_user(pool, &mut user).unwrap();
    let session = Session {
      id: format!("token-{}", username),
      user_id: user.id,
      created: now,
      expires: now + 3600
    };
    db::insert_session(pool, &session).unwrap();
    session.id
  }

  #[actix_rt::test]
  async fn summary_without_a_session_is_a_401() {
    let state = web::Data::new(test_state(test_pool()));
    let mut app = test::init_service(
      App::new()
        .app_data(state)
        .route("/api/analytics/summary", web::get().to(summary))
    ).await;
    let req = test::TestRequest::get()
      .uri("/api/analytics/summary")
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(StatusCode::UNAUTHORIZED, resp.status());
  }

  #[actix_rt::test]
  async fn summary_with_a_user_session_is_a_403() {
    let pool = test_pool();
    let token = logged_in(&pool, "plain-user", "user");
    let state = web::Data::new(test_state(pool));
    let mut app = test::init_service(
      App::new()
        .app_data(state)
        .route("/api/analytics/summary", web::get().to(summary))
    ).await;
    let req = test::TestRequest::get()
      .uri("/api/analytics/summary")
      .cookie(Cookie::new("blog_session", token))
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(StatusCode::FORBIDDEN, resp.status());
  }

  #[actix_rt::test]
  async fn summary_with_an_admin_session_works() {
    let pool = test_pool();
    let token = logged_in(&pool, "the-admin", "admin");
    let state = web::Data::new(test_state(pool));
    let mut app = test::init_service(
      App::new()
        .app_data(state)
        .route("/api/analytics/summary", web::get().to(summary))
    ).await;
    let req = test::TestRequest::get()
      .uri("/api/analytics/summary")
      .cookie(Cookie::new("blog_session", token))
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(StatusCode::OK, resp.status());
  }

  #[actix_rt::test]
  async fn page_view_beacon_works_without_a_session() {
    let pool = test_pool();
    let state = web::Data::new(test_state(pool.clone()));
    let mut app = test::init_service(
      App::new()
        .app_data(state)
        .route(
          "/api/analytics/page-views",
          web::post().to(record_page_view)
        )
    ).await;
    let req = test::TestRequest::post()
      .uri("/api/analytics/page-views")
      .header("user-agent", "Mozilla/5.0 (X11; Linux x86_64) Firefox/121.0")
      .set_json(&serde_json::json!({ "path": "/blog/some-post" }))
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(StatusCode::CREATED, resp.status());

    let stored = analytics::recent_page_views(&pool, 10).unwrap();
    assert_eq!(1, stored.len());
    assert_eq!("/blog/some-post", stored[0].path);
    assert_eq!("firefox", stored[0].browser);
    // No session id in the payload, one got derived:
    assert!(!stored[0].session_id.is_empty());
  }

  #[actix_rt::test]
  async fn page_view_without_a_path_is_a_400() {
    let state = web::Data::new(test_state(test_pool()));
    let mut app = test::init_service(
      App::new()
        .app_data(state)
        .route(
          "/api/analytics/page-views",
          web::post().to(record_page_view)
        )
    ).await;
    let req = test::TestRequest::post()
      .uri("/api/analytics/page-views")
      .set_json(&serde_json::json!({ "path": "  " }))
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(StatusCode::BAD_REQUEST, resp.status());
  }

  #[actix_rt::test]
  async fn engagement_writes_use_the_session_user_id() {
    let pool = test_pool();
    let token = logged_in(&pool, "engaged", "user");
    let state = web::Data::new(test_state(pool.clone()));
    let mut app = test::init_service(
      App::new()
        .app_data(state)
        .route(
          "/api/analytics/user-engagement",
          web::post().to(record_engagement)
        )
    ).await;
    // The payload claims to be user 999:
    let req = test::TestRequest::post()
      .uri("/api/analytics/user-engagement")
      .cookie(Cookie::new("blog_session", token))
      .set_json(&serde_json::json!({
        "userId": 999,
        "date": time_utils::current_timestamp(),
        "sessionCount": 1,
        "totalTimeSpent": 300
      }))
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(StatusCode::CREATED, resp.status());

    let rows = analytics::most_engaged_users(&pool, 10).unwrap();
    assert_eq!(1, rows.len());
    // And it isn't 999:
    assert_ne!(999, rows[0].user_id);
  }

  #[actix_rt::test]
  async fn engagement_with_an_extreme_date_is_a_400() {
    let pool = test_pool();
    let token = logged_in(&pool, "time-traveler", "user");
    let state = web::Data::new(test_state(pool.clone()));
    let mut app = test::init_service(
      App::new()
        .app_data(state)
        .route(
          "/api/analytics/user-engagement",
          web::post().to(record_engagement)
        )
    ).await;
    // A date chrono can't even represent, this used to
    // panic inside the day bucketing:
    let req = test::TestRequest::post()
      .uri("/api/analytics/user-engagement")
      .cookie(Cookie::new("blog_session", token))
      .set_json(&serde_json::json!({
        "date": i64::MAX,
        "sessionCount": 1,
        "totalTimeSpent": 300
      }))
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(StatusCode::BAD_REQUEST, resp.status());
    assert!(analytics::most_engaged_users(&pool, 10).unwrap().is_empty());
  }
}
