use serde::{Deserialize, Serialize};

// I'm sticking to ultra simple datatypes, which is
// something SQLite fits naturally into. Booleans are
// i32 columns, dates are unix timestamps.

// These are too simple to be immediately usable
// as JSON after auto-deserialization. The DTO-like
// objects live in app::dtos.

#[derive(Debug, Serialize, Deserialize)]
pub struct User {
  pub id: i32,
  pub username: String,
  // Argon2 hash, never serialized out of the db layer.
  pub password: String,
  pub role: String,
  pub created: i64
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Post {
  pub id: i32,
  pub title: String,
  pub slug: String,
  pub excerpt: String,
  pub content: String,
  pub featured_image: String,
  pub category_id: i32,
  pub author_id: i32,
  pub read_time: i32,
  pub is_featured: i32,
  pub published: i32,
  pub created: i64
}

// Object I use to fit my "update only what's in
// the request body" agenda.
#[derive(Debug)]
pub struct PostUpdate {
  pub id: i32,
  pub title: Option<String>,
  pub slug: Option<String>,
  pub excerpt: Option<String>,
  pub content: Option<String>,
  pub featured_image: Option<String>,
  pub category_id: Option<i32>,
  pub author_id: Option<i32>,
  pub read_time: Option<i32>,
  pub is_featured: Option<i32>,
  pub published: Option<i32>
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Category {
  pub id: i32,
  pub name: String,
  pub slug: String
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Author {
  pub id: i32,
  pub name: String,
  pub bio: String,
  pub avatar: String,
  // JSON string with the social network links:
  pub social: String
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Subscriber {
  pub id: i32,
  pub email: String,
  pub created: i64
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
  pub id: i32,
  pub name: String,
  pub email: String,
  pub subject: String,
  pub message: String,
  pub read: i32,
  pub created: i64
}

// One row per page load, append-only. The application
// never updates or deletes these.
#[derive(Debug, Serialize, Deserialize)]
pub struct PageView {
  pub id: i64,
  pub path: String,
  pub session_id: String,
  pub user_id: Option<i32>,
  pub referrer: Option<String>,
  pub user_agent: String,
  pub device: String,
  pub browser: String,
  pub country: String,
  pub region: String,
  pub city: String,
  pub metadata: Option<String>,
  pub timestamp: i64
}

// Rollup rows. At most one row per natural key is the
// intent, but nothing in the schema enforces it - see
// the upsert functions in db::analytics.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrafficStats {
  pub id: i32,
  pub date: i64,
  pub period_type: String,
  pub visitor_count: i32,
  pub page_view_count: i32,
  pub bounce_rate: f64,
  pub avg_session_duration: f64
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentPerformance {
  pub id: i32,
  pub post_id: i32,
  pub date: i64,
  pub views: i32,
  pub likes: i32,
  pub shares: i32,
  pub comments: i32,
  pub avg_read_time: f64,
  pub bounce_rate: f64
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserEngagement {
  pub id: i32,
  pub user_id: i32,
  pub date: i64,
  pub session_count: i32,
  pub total_time_spent: i32,
  pub pages_per_session: f64,
  pub last_active: i64
}

#[derive(Debug)]
pub struct Session {
  pub id: String,
  pub user_id: i32,
  pub created: i64,
  pub expires: i64
}
