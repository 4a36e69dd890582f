use serde::{Deserialize, Serialize};
use crate::db::entities::*;

// Entities come out of the db layer with i32 flags and
// are snake_case, the JSON API speaks camelCase with real
// booleans. The From trait does the conversion and that's
// what these are for. I only need it entity -> DTO,
// requests come in as separate *Form structs below.

pub use crate::db::entities::Category as CategoryDto;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
  pub id: i32,
  pub title: String,
  pub slug: String,
  pub excerpt: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
  pub featured_image: String,
  pub category_id: i32,
  pub author_id: i32,
  pub read_time: i32,
  pub is_featured: bool,
  pub published: bool,
  pub created_at: i64
}

impl From<Post> for PostDto {
  fn from(post: Post) -> Self {
    Self {
      id: post.id,
      title: post.title,
      slug: post.slug,
      excerpt: post.excerpt,
      content: Some(post.content),
      featured_image: post.featured_image,
      category_id: post.category_id,
      author_id: post.author_id,
      read_time: post.read_time,
      is_featured: post.is_featured != 0,
      published: post.published != 0,
      created_at: post.created
    }
  }
}

// List endpoints don't need to ship every full article
// body over the wire.
impl PostDto {
  pub fn without_content(mut self) -> Self {
    self.content = None;
    self
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDto {
  pub id: i32,
  pub name: String,
  pub bio: String,
  pub avatar: String,
  // Kept as parsed JSON in the response:
  pub social: serde_json::Value
}

impl From<Author> for AuthorDto {
  fn from(author: Author) -> Self {
    Self {
      id: author.id,
      name: author.name,
      bio: author.bio,
      avatar: author.avatar,
      // A bad JSON string in the column turns into an
      // empty object instead of breaking the endpoint:
      social: serde_json::from_str(&author.social)
        .unwrap_or_else(|_| serde_json::json!({}))
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithPostsDto {
  pub id: i32,
  pub name: String,
  pub slug: String,
  pub posts: Vec<PostDto>
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberDto {
  pub id: i32,
  pub email: String,
  pub created_at: i64
}

impl From<Subscriber> for SubscriberDto {
  fn from(subscriber: Subscriber) -> Self {
    Self {
      id: subscriber.id,
      email: subscriber.email,
      created_at: subscriber.created
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
  pub id: i32,
  pub name: String,
  pub email: String,
  pub subject: String,
  pub message: String,
  pub read: bool,
  pub created_at: i64
}

impl From<Message> for MessageDto {
  fn from(message: Message) -> Self {
    Self {
      id: message.id,
      name: message.name,
      email: message.email,
      subject: message.subject,
      message: message.message,
      read: message.read != 0,
      created_at: message.created
    }
  }
}

// Never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
  pub id: i32,
  pub username: String,
  pub role: String
}

impl From<User> for UserDto {
  fn from(user: User) -> Self {
    Self {
      id: user.id,
      username: user.username,
      role: user.role
    }
  }
}

impl From<crate::app::auth::SessionUser> for UserDto {
  fn from(user: crate::app::auth::SessionUser) -> Self {
    Self {
      id: user.id,
      username: user.username,
      role: user.role
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewDto {
  pub id: i64,
  pub path: String,
  pub session_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_id: Option<i32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub referrer: Option<String>,
  pub user_agent: String,
  pub device: String,
  pub browser: String,
  pub country: String,
  pub region: String,
  pub city: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub metadata: Option<String>,
  pub timestamp: i64
}

impl From<PageView> for PageViewDto {
  fn from(view: PageView) -> Self {
    Self {
      id: view.id,
      path: view.path,
      session_id: view.session_id,
      user_id: view.user_id,
      referrer: view.referrer,
      user_agent: view.user_agent,
      device: view.device,
      browser: view.browser,
      country: view.country,
      region: view.region,
      city: view.city,
      metadata: view.metadata,
      timestamp: view.timestamp
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficStatsDto {
  pub id: i32,
  pub date: i64,
  pub period_type: String,
  pub visitor_count: i32,
  pub page_view_count: i32,
  pub bounce_rate: f64,
  pub avg_session_duration: f64
}

impl From<TrafficStats> for TrafficStatsDto {
  fn from(stats: TrafficStats) -> Self {
    Self {
      id: stats.id,
      date: stats.date,
      period_type: stats.period_type,
      visitor_count: stats.visitor_count,
      page_view_count: stats.page_view_count,
      bounce_rate: stats.bounce_rate,
      avg_session_duration: stats.avg_session_duration
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPerformanceDto {
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

impl From<ContentPerformance> for ContentPerformanceDto {
  fn from(perf: ContentPerformance) -> Self {
    Self {
      id: perf.id,
      post_id: perf.post_id,
      date: perf.date,
      views: perf.views,
      likes: perf.likes,
      shares: perf.shares,
      comments: perf.comments,
      avg_read_time: perf.avg_read_time,
      bounce_rate: perf.bounce_rate
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEngagementDto {
  pub id: i32,
  pub user_id: i32,
  pub date: i64,
  pub session_count: i32,
  pub total_time_spent: i32,
  pub pages_per_session: f64,
  pub last_active: i64
}

impl From<UserEngagement> for UserEngagementDto {
  fn from(engagement: UserEngagement) -> Self {
    Self {
      id: engagement.id,
      user_id: engagement.user_id,
      date: engagement.date,
      session_count: engagement.session_count,
      total_time_spent: engagement.total_time_spent,
      pages_per_session: engagement.pages_per_session,
      last_active: engagement.last_active
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorCountDto {
  pub count: i64,
  pub days: i64
}

// The whole admin dashboard in one response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDto {
  pub unique_visitors: VisitorCountDto,
  pub recent_page_views: Vec<PageViewDto>,
  pub top_content: Vec<ContentPerformanceDto>,
  pub daily_traffic: Vec<TrafficStatsDto>
}

/* --- Request body or query or form objects --- */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
  pub username: String,
  pub password: String
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
  pub username: String,
  pub password: String
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostForm {
  pub title: String,
  pub slug: String,
  pub excerpt: Option<String>,
  pub content: String,
  pub featured_image: Option<String>,
  pub category_id: i32,
  pub author_id: i32,
  // Defaulted from the content length when absent:
  pub read_time: Option<i32>,
  pub is_featured: Option<bool>,
  pub published: Option<bool>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdateForm {
  pub title: Option<String>,
  pub slug: Option<String>,
  pub excerpt: Option<String>,
  pub content: Option<String>,
  pub featured_image: Option<String>,
  pub category_id: Option<i32>,
  pub author_id: Option<i32>,
  pub read_time: Option<i32>,
  pub is_featured: Option<bool>,
  pub published: Option<bool>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryForm {
  pub name: String,
  pub slug: String
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorForm {
  pub name: String,
  pub bio: Option<String>,
  pub avatar: Option<String>,
  pub social: Option<serde_json::Value>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeForm {
  pub email: String
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
  pub name: String,
  pub email: String,
  pub subject: String,
  pub message: String
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
  pub q: Option<String>,
  // Category slug, not id:
  pub category: Option<String>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewForm {
  pub path: String,
  // Optional: anonymous visitors without one get a
  // derived id server-side.
  pub session_id: Option<String>,
  pub referrer: Option<String>,
  pub metadata: Option<serde_json::Value>,
  // Client timestamps are ignored, the server clock
  // wins. Kept in the form so old clients sending it
  // don't break deserialization.
  pub timestamp: Option<i64>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficStatsForm {
  pub date: i64,
  pub period_type: String,
  pub visitor_count: i32,
  pub page_view_count: i32,
  pub bounce_rate: Option<f64>,
  pub avg_session_duration: Option<f64>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPerformanceForm {
  pub post_id: i32,
  pub date: i64,
  pub views: i32,
  pub likes: Option<i32>,
  pub shares: Option<i32>,
  pub comments: Option<i32>,
  pub avg_read_time: Option<f64>,
  pub bounce_rate: Option<f64>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEngagementForm {
  // Whatever the client sends here gets replaced by the
  // session's user id, see the handler.
  pub user_id: Option<i32>,
  pub date: i64,
  pub session_count: i32,
  pub total_time_spent: i32,
  pub pages_per_session: Option<f64>,
  pub last_active: Option<i64>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficQuery {
  pub period_type: Option<String>,
  pub limit: Option<usize>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitQuery {
  pub limit: Option<usize>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostIdQuery {
  pub post_id: i32
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorsQuery {
  pub days: Option<i64>
}

/* --- Sitemap template data --- */

#[derive(Debug, Serialize)]
pub struct SitemapUrl {
  pub loc: String,
  pub changefreq: &'static str,
  pub priority: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lastmod: Option<String>
}

#[derive(Debug, Serialize)]
pub struct SitemapData {
  pub urls: Vec<SitemapUrl>
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn post_dto_converts_flags_to_booleans() {
    let post = Post {
      id: 1,
      title: "Title".to_string(),
      slug: "title".to_string(),
      excerpt: "".to_string(),
      content: "Body".to_string(),
      featured_image: "".to_string(),
      category_id: 1,
      author_id: 1,
      read_time: 4,
      is_featured: 1,
      published: 0,
      created: 1615150740
    };
    let dto = PostDto::from(post);
    assert!(dto.is_featured);
    assert!(!dto.published);
    assert_eq!(Some("Body".to_string()), dto.content);
    assert!(dto.without_content().content.is_none());
  }

  #[test]
  fn author_dto_parses_social_json() {
    let author = Author {
      id: 1,
      name: "Alex".to_string(),
      bio: "".to_string(),
      avatar: "".to_string(),
      social: r#"{"twitter":"@alex"}"#.to_string()
    };
    let dto = AuthorDto::from(author);
    assert_eq!("@alex", dto.social["twitter"]);
    // Broken JSON degrades to an empty object:
    let broken = Author {
      id: 2,
      name: "B".to_string(),
      bio: "".to_string(),
      avatar: "".to_string(),
      social: "{not json".to_string()
    };
    assert!(AuthorDto::from(broken).social.as_object().unwrap().is_empty());
  }

  #[test]
  fn user_dto_has_no_password_field() {
    let user = User {
      id: 1,
      username: "franck".to_string(),
      password: "$argon2id$secret".to_string(),
      role: "admin".to_string(),
      created: 0
    };
    let json = serde_json::to_string(&UserDto::from(user)).unwrap();
    assert!(!json.contains("password"));
    assert!(!json.contains("argon2"));
  }
}
