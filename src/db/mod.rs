use color_eyre::Result;
use eyre::WrapErr;
use rusqlite::{params, OptionalExtension, Row, ToSql, NO_PARAMS};

pub mod entities;
mod mappers;
mod schema;
pub mod analytics;

use entities::*;
use mappers::*;
pub use schema::init_schema;

// Type alias to make function signatures much clearer:
pub type Pool = r2d2::Pool<r2d2_sqlite::SqliteConnectionManager>;

// All the DB stuff is done in a non-async way, handlers
// call into here directly.

// Stole most of the signature from the rusqlite doc.
fn select_many<T, P, F>(
  pool: &Pool,
  query: &str,
  params: P,
  mapper: F
) -> Result<Vec<T>>
  where
    P: IntoIterator,
    P::Item: ToSql,
    F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
{
  // Do the reference counting thing and get a connection
  let conn = pool.clone().get()?;
  let mut stmt = conn.prepare(query)?;
  stmt.query_map(params, mapper)
    .and_then(Iterator::collect)
    .context("Generic select_many query")
}

// Same thing for single row lookups, None when the row
// doesn't exist.
fn select_one<T, P, F>(
  pool: &Pool,
  query: &str,
  params: P,
  mapper: F
) -> Result<Option<T>>
  where
    P: IntoIterator,
    P::Item: ToSql,
    F: FnOnce(&Row<'_>) -> Result<T, rusqlite::Error>,
{
  let conn = pool.clone().get()?;
  let mut stmt = conn.prepare(query)?;
  stmt.query_row(params, mapper)
    .optional()
    .context("Generic select_one query")
}

/* --- Users & sessions --- */

pub fn user_by_username(pool: &Pool, username: &str) -> Result<Option<User>> {
  select_one(
    pool,
    "SELECT id, username, password, role, created
    FROM users WHERE username = ?",
    params![username],
    map_user
  )
}

pub fn insert_user(pool: &Pool, user: &mut User) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO users (username, password, role, created)
    VALUES (?, ?, ?, ?)",
    params![user.username, user.password, user.role, user.created]
  )?;
  user.id = conn.last_insert_rowid() as i32;
  Ok(())
}

pub fn insert_session(pool: &Pool, session: &Session) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO sessions (id, user_id, created, expires)
    VALUES (?, ?, ?, ?)",
    params![session.id, session.user_id, session.created, session.expires]
  )?;
  Ok(())
}

// Resolves a session cookie to its user in one go. Expired
// sessions resolve to nothing, cleanup is a separate call.
pub fn session_user(pool: &Pool, token: &str, now: i64) -> Result<Option<User>> {
  select_one(
    pool,
    "SELECT users.id, users.username, users.password, users.role, users.created
    FROM sessions, users
    WHERE sessions.id = ?
    AND sessions.expires > ?
    AND users.id = sessions.user_id",
    params![token, now],
    map_user
  )
}

pub fn delete_session(pool: &Pool, token: &str) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute("DELETE FROM sessions WHERE id = ?", params![token])?;
  Ok(())
}

pub fn purge_expired_sessions(pool: &Pool, now: i64) -> Result<usize> {
  let conn = pool.clone().get()?;
  conn.execute("DELETE FROM sessions WHERE expires <= ?", params![now])
    .context("Purging expired sessions")
}

/* --- Posts --- */

const POST_FIELDS: &'static str =
  "id, title, slug, excerpt, content, featured_image, category_id,
  author_id, read_time, is_featured, published, created";

pub fn all_posts(pool: &Pool) -> Result<Vec<Post>> {
  select_many(
    pool,
    &format!("SELECT {} FROM posts ORDER BY created DESC", POST_FIELDS),
    NO_PARAMS,
    map_post
  )
}

pub fn featured_posts(pool: &Pool) -> Result<Vec<Post>> {
  select_many(
    pool,
    &format!(
      "SELECT {} FROM posts
      WHERE is_featured = 1 AND published = 1
      ORDER BY created DESC",
      POST_FIELDS
    ),
    NO_PARAMS,
    map_post
  )
}

pub fn posts_by_category(pool: &Pool, category_id: i32) -> Result<Vec<Post>> {
  select_many(
    pool,
    &format!(
      "SELECT {} FROM posts
      WHERE category_id = ? AND published = 1
      ORDER BY created DESC",
      POST_FIELDS
    ),
    params![category_id],
    map_post
  )
}

pub fn post_by_id(pool: &Pool, id: i32) -> Result<Option<Post>> {
  select_one(
    pool,
    &format!("SELECT {} FROM posts WHERE id = ?", POST_FIELDS),
    params![id],
    map_post
  )
}

pub fn post_by_slug(pool: &Pool, slug: &str) -> Result<Option<Post>> {
  select_one(
    pool,
    &format!("SELECT {} FROM posts WHERE slug = ?", POST_FIELDS),
    params![slug],
    map_post
  )
}

pub fn insert_post(pool: &Pool, post: &mut Post) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO posts (title, slug, excerpt, content, featured_image,
    category_id, author_id, read_time, is_featured, published, created)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    params![
      post.title,
      post.slug,
      post.excerpt,
      post.content,
      post.featured_image,
      post.category_id,
      post.author_id,
      post.read_time,
      post.is_featured,
      post.published,
      post.created
    ]
  )?;
  post.id = conn.last_insert_rowid() as i32;
  Ok(())
}

// Only updates the fields present in the update object.
// The SET clause gets built dynamically, the values are
// still all bound as prepared statement params.
pub fn update_post(pool: &Pool, update: &PostUpdate) -> Result<Option<Post>> {
  let mut sets: Vec<&'static str> = Vec::new();
  let mut values: Vec<&dyn ToSql> = Vec::new();

  if let Some(title) = &update.title {
    sets.push("title = ?");
    values.push(title);
  }
  if let Some(slug) = &update.slug {
    sets.push("slug = ?");
    values.push(slug);
  }
  if let Some(excerpt) = &update.excerpt {
    sets.push("excerpt = ?");
    values.push(excerpt);
  }
  if let Some(content) = &update.content {
    sets.push("content = ?");
    values.push(content);
  }
  if let Some(featured_image) = &update.featured_image {
    sets.push("featured_image = ?");
    values.push(featured_image);
  }
  if let Some(category_id) = &update.category_id {
    sets.push("category_id = ?");
    values.push(category_id);
  }
  if let Some(author_id) = &update.author_id {
    sets.push("author_id = ?");
    values.push(author_id);
  }
  if let Some(read_time) = &update.read_time {
    sets.push("read_time = ?");
    values.push(read_time);
  }
  if let Some(is_featured) = &update.is_featured {
    sets.push("is_featured = ?");
    values.push(is_featured);
  }
  if let Some(published) = &update.published {
    sets.push("published = ?");
    values.push(published);
  }

  if !sets.is_empty() {
    values.push(&update.id);
    let query = format!(
      "UPDATE posts SET {} WHERE id = ?",
      sets.join(", ")
    );
    let conn = pool.clone().get()?;
    conn.execute(&query, &values[..])?;
  }
  post_by_id(pool, update.id)
}

// Returns false when there was nothing to delete.
pub fn delete_post(pool: &Pool, id: i32) -> Result<bool> {
  let conn = pool.clone().get()?;
  let deleted = conn.execute("DELETE FROM posts WHERE id = ?", params![id])?;
  Ok(deleted > 0)
}

// LIKE-based search, published posts only, newest first.
// There's a max number of results fixed here.
pub fn search_posts(
  pool: &Pool,
  terms: &str,
  category_id: Option<i32>,
  max: usize
) -> Result<Vec<Post>> {
  let pattern = format!("%{}%", terms);
  match category_id {
    Some(category_id) => select_many(
      pool,
      &format!(
        "SELECT {} FROM posts
        WHERE (title LIKE ?1 OR content LIKE ?1)
        AND category_id = ?2 AND published = 1
        ORDER BY created DESC LIMIT {}",
        POST_FIELDS, max
      ),
      params![pattern, category_id],
      map_post
    ),
    None => select_many(
      pool,
      &format!(
        "SELECT {} FROM posts
        WHERE (title LIKE ?1 OR content LIKE ?1) AND published = 1
        ORDER BY created DESC LIMIT {}",
        POST_FIELDS, max
      ),
      params![pattern],
      map_post
    )
  }
}

/* --- Categories --- */

pub fn all_categories(pool: &Pool) -> Result<Vec<Category>> {
  select_many(
    pool,
    "SELECT id, name, slug FROM categories ORDER BY name ASC",
    NO_PARAMS,
    map_category
  )
}

pub fn category_by_slug(pool: &Pool, slug: &str) -> Result<Option<Category>> {
  select_one(
    pool,
    "SELECT id, name, slug FROM categories WHERE slug = ?",
    params![slug],
    map_category
  )
}

pub fn insert_category(pool: &Pool, category: &mut Category) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO categories (name, slug) VALUES (?, ?)",
    params![category.name, category.slug]
  )?;
  category.id = conn.last_insert_rowid() as i32;
  Ok(())
}

/* --- Authors --- */

pub fn all_authors(pool: &Pool) -> Result<Vec<Author>> {
  select_many(
    pool,
    "SELECT id, name, bio, avatar, social FROM authors ORDER BY id ASC",
    NO_PARAMS,
    map_author
  )
}

pub fn author_by_id(pool: &Pool, id: i32) -> Result<Option<Author>> {
  select_one(
    pool,
    "SELECT id, name, bio, avatar, social FROM authors WHERE id = ?",
    params![id],
    map_author
  )
}

pub fn insert_author(pool: &Pool, author: &mut Author) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO authors (name, bio, avatar, social) VALUES (?, ?, ?, ?)",
    params![author.name, author.bio, author.avatar, author.social]
  )?;
  author.id = conn.last_insert_rowid() as i32;
  Ok(())
}

/* --- Subscribers --- */

pub fn all_subscribers(pool: &Pool) -> Result<Vec<Subscriber>> {
  select_many(
    pool,
    "SELECT id, email, created FROM subscribers ORDER BY created DESC",
    NO_PARAMS,
    map_subscriber
  )
}

pub fn insert_subscriber(pool: &Pool, subscriber: &mut Subscriber) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO subscribers (email, created) VALUES (?, ?)",
    params![subscriber.email, subscriber.created]
  )?;
  subscriber.id = conn.last_insert_rowid() as i32;
  Ok(())
}

/* --- Contact messages --- */

pub fn all_messages(pool: &Pool) -> Result<Vec<Message>> {
  select_many(
    pool,
    "SELECT id, name, email, subject, message, read, created
    FROM messages ORDER BY created DESC",
    NO_PARAMS,
    map_message
  )
}

pub fn message_by_id(pool: &Pool, id: i32) -> Result<Option<Message>> {
  select_one(
    pool,
    "SELECT id, name, email, subject, message, read, created
    FROM messages WHERE id = ?",
    params![id],
    map_message
  )
}

pub fn insert_message(pool: &Pool, message: &mut Message) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO messages (name, email, subject, message, read, created)
    VALUES (?, ?, ?, ?, 0, ?)",
    params![
      message.name,
      message.email,
      message.subject,
      message.message,
      message.created
    ]
  )?;
  message.id = conn.last_insert_rowid() as i32;
  Ok(())
}

pub fn mark_message_read(pool: &Pool, id: i32) -> Result<Option<Message>> {
  let conn = pool.clone().get()?;
  conn.execute("UPDATE messages SET read = 1 WHERE id = ?", params![id])?;
  message_by_id(pool, id)
}

// Lets the route layer turn UNIQUE violations into 400s
// instead of generic database errors.
pub fn is_unique_violation(report: &color_eyre::Report) -> bool {
  match report.downcast_ref::<rusqlite::Error>() {
    Some(rusqlite::Error::SqliteFailure(e, _)) =>
      e.code == rusqlite::ErrorCode::ConstraintViolation,
    _ => false
  }
}

#[cfg(test)]
pub fn test_pool() -> Pool {
  // A single connection, otherwise every pooled connection
  // gets its own empty in-memory database.
  let manager = r2d2_sqlite::SqliteConnectionManager::memory();
  let pool = r2d2::Pool::builder()
    .max_size(1)
    .build(manager)
    .unwrap();
  init_schema(&pool).unwrap();
  pool
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::utils::time_utils::current_timestamp;

  fn sample_post(slug: &str) -> Post {
    Post {
      id: -1,
      title: "Some Title".to_string(),
      slug: slug.to_string(),
      excerpt: "An excerpt".to_string(),
      content: "Some content with words in it".to_string(),
      featured_image: "https://example.com/img.jpg".to_string(),
      category_id: 1,
      author_id: 1,
      read_time: 5,
      is_featured: 0,
      published: 1,
      created: current_timestamp()
    }
  }

  #[test]
  fn insert_and_fetch_post_by_slug() {
    let pool = test_pool();
    let mut post = sample_post("some-title");
    insert_post(&pool, &mut post).unwrap();
    assert!(post.id > 0);
    let found = post_by_slug(&pool, "some-title").unwrap().unwrap();
    assert_eq!(post.id, found.id);
    assert_eq!("Some Title", found.title);
    assert!(post_by_slug(&pool, "nope").unwrap().is_none());
  }

  #[test]
  fn partial_update_only_touches_given_fields() {
    let pool = test_pool();
    let mut post = sample_post("update-me");
    insert_post(&pool, &mut post).unwrap();
    let update = PostUpdate {
      id: post.id,
      title: Some("New Title".to_string()),
      slug: None,
      excerpt: None,
      content: None,
      featured_image: None,
      category_id: None,
      author_id: None,
      read_time: None,
      is_featured: Some(1),
      published: None
    };
    let updated = update_post(&pool, &update).unwrap().unwrap();
    assert_eq!("New Title", updated.title);
    assert_eq!("update-me", updated.slug);
    assert_eq!(1, updated.is_featured);
    assert_eq!(1, updated.published);
  }

  #[test]
  fn delete_post_reports_misses() {
    let pool = test_pool();
    let mut post = sample_post("delete-me");
    insert_post(&pool, &mut post).unwrap();
    assert!(delete_post(&pool, post.id).unwrap());
    assert!(!delete_post(&pool, post.id).unwrap());
  }

  #[test]
  fn search_matches_title_and_content() {
    let pool = test_pool();
    let mut p1 = sample_post("minimalism-post");
    p1.title = "The Art of Minimalism".to_string();
    insert_post(&pool, &mut p1).unwrap();
    let mut p2 = sample_post("other-post");
    p2.content = "nothing relevant here".to_string();
    insert_post(&pool, &mut p2).unwrap();

    let found = search_posts(&pool, "minimalism", None, 10).unwrap();
    assert_eq!(1, found.len());
    assert_eq!(p1.id, found[0].id);
  }

  #[test]
  fn duplicate_subscriber_is_a_unique_violation() {
    let pool = test_pool();
    let mut s = Subscriber {
      id: -1,
      email: "reader@example.com".to_string(),
      created: current_timestamp()
    };
    insert_subscriber(&pool, &mut s).unwrap();
    let mut dup = Subscriber {
      id: -1,
      email: "reader@example.com".to_string(),
      created: current_timestamp()
    };
    let err = insert_subscriber(&pool, &mut dup).unwrap_err();
    assert!(is_unique_violation(&err));
  }

  #[test]
  fn session_user_honors_expiry() {
    let pool = test_pool();
    let now = current_timestamp();
    let mut user = User {
      id: -1,
      username: "franck".to_string(),
      password: "not-a-real-hash".to_string(),
      role: "user".to_string(),
      created: now
    };
    insert_user(&pool, &mut user).unwrap();
    let session = Session {
      id: "sometoken".to_string(),
      user_id: user.id,
      created: now,
      expires: now + 60
    };
    insert_session(&pool, &session).unwrap();
    assert!(session_user(&pool, "sometoken", now).unwrap().is_some());
    // Same token, but past the expiry:
    assert!(session_user(&pool, "sometoken", now + 61).unwrap().is_none());
  }
}
