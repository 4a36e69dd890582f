use super::entities::*;
use rusqlite::{Error, Row};

// Row mappers all assume the column order of the SELECT
// lists in the query functions. Keep them in sync.

pub fn map_user(row: &Row) -> Result<User, Error> {
  Ok(User {
    id: row.get(0)?,
    username: row.get(1)?,
    password: row.get(2)?,
    role: row.get(3)?,
    created: row.get(4)?
  })
}

pub fn map_post(row: &Row) -> Result<Post, Error> {
  Ok(Post {
    id: row.get(0)?,
    title: row.get(1)?,
    slug: row.get(2)?,
    excerpt: row.get(3)?,
    content: row.get(4)?,
    featured_image: row.get(5)?,
    category_id: row.get(6)?,
    author_id: row.get(7)?,
    read_time: row.get(8)?,
    is_featured: row.get(9)?,
    published: row.get(10)?,
    created: row.get(11)?
  })
}

pub fn map_category(row: &Row) -> Result<Category, Error> {
  Ok(Category {
    id: row.get(0)?,
    name: row.get(1)?,
    slug: row.get(2)?
  })
}

pub fn map_author(row: &Row) -> Result<Author, Error> {
  Ok(Author {
    id: row.get(0)?,
    name: row.get(1)?,
    bio: row.get(2)?,
    avatar: row.get(3)?,
    social: row.get(4)?
  })
}

pub fn map_subscriber(row: &Row) -> Result<Subscriber, Error> {
  Ok(Subscriber {
    id: row.get(0)?,
    email: row.get(1)?,
    created: row.get(2)?
  })
}

pub fn map_message(row: &Row) -> Result<Message, Error> {
  Ok(Message {
    id: row.get(0)?,
    name: row.get(1)?,
    email: row.get(2)?,
    subject: row.get(3)?,
    message: row.get(4)?,
    read: row.get(5)?,
    created: row.get(6)?
  })
}

pub fn map_page_view(row: &Row) -> Result<PageView, Error> {
  Ok(PageView {
    id: row.get(0)?,
    path: row.get(1)?,
    session_id: row.get(2)?,
    user_id: row.get(3)?,
    referrer: row.get(4)?,
    user_agent: row.get(5)?,
    device: row.get(6)?,
    browser: row.get(7)?,
    country: row.get(8)?,
    region: row.get(9)?,
    city: row.get(10)?,
    metadata: row.get(11)?,
    timestamp: row.get(12)?
  })
}

pub fn map_traffic_stats(row: &Row) -> Result<TrafficStats, Error> {
  Ok(TrafficStats {
    id: row.get(0)?,
    date: row.get(1)?,
    period_type: row.get(2)?,
    visitor_count: row.get(3)?,
    page_view_count: row.get(4)?,
    bounce_rate: row.get(5)?,
    avg_session_duration: row.get(6)?
  })
}

pub fn map_content_performance(row: &Row) -> Result<ContentPerformance, Error> {
  Ok(ContentPerformance {
    id: row.get(0)?,
    post_id: row.get(1)?,
    date: row.get(2)?,
    views: row.get(3)?,
    likes: row.get(4)?,
    shares: row.get(5)?,
    comments: row.get(6)?,
    avg_read_time: row.get(7)?,
    bounce_rate: row.get(8)?
  })
}

pub fn map_user_engagement(row: &Row) -> Result<UserEngagement, Error> {
  Ok(UserEngagement {
    id: row.get(0)?,
    user_id: row.get(1)?,
    date: row.get(2)?,
    session_count: row.get(3)?,
    total_time_spent: row.get(4)?,
    pages_per_session: row.get(5)?,
    last_active: row.get(6)?
  })
}
