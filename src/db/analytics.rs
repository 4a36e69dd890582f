/*
 * Storage functions for the analytics tables: page view
 * ingestion and the per-day rollups (traffic stats,
 * content performance, user engagement).
 *
 * The rollup tables are "one row per natural key" by
 * convention only. Each upsert does a read followed by a
 * conditional insert or update, as two separate round
 * trips with no transaction and no unique index behind
 * it. Two concurrent writers for the same key can both
 * see "absent" and both insert. Known hazard, kept as-is
 * on purpose - see DESIGN.md.
 */

use color_eyre::Result;
use eyre::eyre;
use rusqlite::{params, NO_PARAMS};

use super::entities::*;
use super::mappers::*;
use super::{select_many, select_one, Pool};
use crate::utils::time_utils;

// Period types accepted by the traffic stats table. Kept
// as strings in the DB, validated at the route boundary
// through this enum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeriodType {
  Daily,
  Weekly,
  Monthly
}

impl PeriodType {
  pub fn as_str(&self) -> &'static str {
    match self {
      PeriodType::Daily => "daily",
      PeriodType::Weekly => "weekly",
      PeriodType::Monthly => "monthly"
    }
  }

  pub fn parse(value: &str) -> Option<PeriodType> {
    match value {
      "daily" => Some(PeriodType::Daily),
      "weekly" => Some(PeriodType::Weekly),
      "monthly" => Some(PeriodType::Monthly),
      _ => None
    }
  }
}

/* --- Page views --- */

const PAGE_VIEW_FIELDS: &'static str =
  "id, path, session_id, user_id, referrer, user_agent, device,
  browser, country, region, city, metadata, timestamp";

// Append-only: there is deliberately no update or delete
// for page views anywhere in this module.
pub fn insert_page_view(pool: &Pool, view: &mut PageView) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO page_views (path, session_id, user_id, referrer,
    user_agent, device, browser, country, region, city, metadata, timestamp)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    params![
      view.path,
      view.session_id,
      view.user_id,
      view.referrer,
      view.user_agent,
      view.device,
      view.browser,
      view.country,
      view.region,
      view.city,
      view.metadata,
      view.timestamp
    ]
  )?;
  view.id = conn.last_insert_rowid();
  Ok(())
}

pub fn recent_page_views(pool: &Pool, limit: usize) -> Result<Vec<PageView>> {
  select_many(
    pool,
    &format!(
      "SELECT {} FROM page_views ORDER BY timestamp DESC LIMIT {}",
      PAGE_VIEW_FIELDS, limit
    ),
    NO_PARAMS,
    map_page_view
  )
}

// Distinct sessions seen over the last N days. A session
// with fifty page views still counts once.
pub fn unique_visitor_count(pool: &Pool, days: i64) -> Result<i64> {
  // Saturating on purpose, the days value comes straight
  // from a query string:
  let cutoff = time_utils::current_timestamp()
    .saturating_sub(days.saturating_mul(86400));
  let conn = pool.clone().get()?;
  let mut stmt = conn.prepare(
    "SELECT count(DISTINCT session_id) FROM page_views WHERE timestamp > ?"
  )?;
  let count: i64 = stmt.query_row(params![cutoff], |row| row.get(0))?;
  Ok(count)
}

/* --- Traffic stats --- */

const TRAFFIC_FIELDS: &'static str =
  "id, date, period_type, visitor_count, page_view_count,
  bounce_rate, avg_session_duration";

fn traffic_stats_for_day(
  pool: &Pool,
  period_type: &str,
  day_start: i64,
  day_end: i64
) -> Result<Option<TrafficStats>> {
  select_one(
    pool,
    &format!(
      "SELECT {} FROM traffic_stats
      WHERE period_type = ? AND date >= ? AND date < ?",
      TRAFFIC_FIELDS
    ),
    params![period_type, day_start, day_end],
    map_traffic_stats
  )
}

// Merge-by-natural-key, not accumulate: when a row for the
// same (day, period_type) bucket exists its metric columns
// get overwritten with whatever the caller sent. Callers
// are expected to send full running totals.
pub fn upsert_traffic_stats(
  pool: &Pool,
  stats: &TrafficStats
) -> Result<TrafficStats> {
  let (day_start, day_end) = time_utils::day_bounds(stats.date)
    .ok_or_else(|| eyre!("Date {} is not a representable day", stats.date))?;
  match traffic_stats_for_day(pool, &stats.period_type, day_start, day_end)? {
    Some(existing) => {
      let conn = pool.clone().get()?;
      conn.execute(
        "UPDATE traffic_stats SET visitor_count = ?, page_view_count = ?,
        bounce_rate = ?, avg_session_duration = ? WHERE id = ?",
        params![
          stats.visitor_count,
          stats.page_view_count,
          stats.bounce_rate,
          stats.avg_session_duration,
          existing.id
        ]
      )?;
      Ok(TrafficStats {
        id: existing.id,
        date: existing.date,
        period_type: existing.period_type,
        visitor_count: stats.visitor_count,
        page_view_count: stats.page_view_count,
        bounce_rate: stats.bounce_rate,
        avg_session_duration: stats.avg_session_duration
      })
    },
    None => {
      let conn = pool.clone().get()?;
      conn.execute(
        "INSERT INTO traffic_stats (date, period_type, visitor_count,
        page_view_count, bounce_rate, avg_session_duration)
        VALUES (?, ?, ?, ?, ?, ?)",
        params![
          stats.date,
          stats.period_type,
          stats.visitor_count,
          stats.page_view_count,
          stats.bounce_rate,
          stats.avg_session_duration
        ]
      )?;
      Ok(TrafficStats {
        id: conn.last_insert_rowid() as i32,
        date: stats.date,
        period_type: stats.period_type.clone(),
        visitor_count: stats.visitor_count,
        page_view_count: stats.page_view_count,
        bounce_rate: stats.bounce_rate,
        avg_session_duration: stats.avg_session_duration
      })
    }
  }
}

pub fn traffic_stats(
  pool: &Pool,
  period_type: PeriodType,
  limit: usize
) -> Result<Vec<TrafficStats>> {
  select_many(
    pool,
    &format!(
      "SELECT {} FROM traffic_stats
      WHERE period_type = ? ORDER BY date DESC LIMIT {}",
      TRAFFIC_FIELDS, limit
    ),
    params![period_type.as_str()],
    map_traffic_stats
  )
}

/* --- Content performance --- */

const PERFORMANCE_FIELDS: &'static str =
  "id, post_id, date, views, likes, shares, comments,
  avg_read_time, bounce_rate";

fn content_performance_for_day(
  pool: &Pool,
  post_id: i32,
  day_start: i64,
  day_end: i64
) -> Result<Option<ContentPerformance>> {
  select_one(
    pool,
    &format!(
      "SELECT {} FROM content_performance
      WHERE post_id = ? AND date >= ? AND date < ?",
      PERFORMANCE_FIELDS
    ),
    params![post_id, day_start, day_end],
    map_content_performance
  )
}

// Same last-write-wins-per-day policy as traffic stats,
// keyed additionally by post_id.
pub fn upsert_content_performance(
  pool: &Pool,
  perf: &ContentPerformance
) -> Result<ContentPerformance> {
  let (day_start, day_end) = time_utils::day_bounds(perf.date)
    .ok_or_else(|| eyre!("Date {} is not a representable day", perf.date))?;
  match content_performance_for_day(pool, perf.post_id, day_start, day_end)? {
    Some(existing) => {
      let conn = pool.clone().get()?;
      conn.execute(
        "UPDATE content_performance SET views = ?, likes = ?, shares = ?,
        comments = ?, avg_read_time = ?, bounce_rate = ? WHERE id = ?",
        params![
          perf.views,
          perf.likes,
          perf.shares,
          perf.comments,
          perf.avg_read_time,
          perf.bounce_rate,
          existing.id
        ]
      )?;
      Ok(ContentPerformance {
        id: existing.id,
        post_id: existing.post_id,
        date: existing.date,
        views: perf.views,
        likes: perf.likes,
        shares: perf.shares,
        comments: perf.comments,
        avg_read_time: perf.avg_read_time,
        bounce_rate: perf.bounce_rate
      })
    },
    None => {
      let conn = pool.clone().get()?;
      conn.execute(
        "INSERT INTO content_performance (post_id, date, views, likes,
        shares, comments, avg_read_time, bounce_rate)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
          perf.post_id,
          perf.date,
          perf.views,
          perf.likes,
          perf.shares,
          perf.comments,
          perf.avg_read_time,
          perf.bounce_rate
        ]
      )?;
      Ok(ContentPerformance {
        id: conn.last_insert_rowid() as i32,
        post_id: perf.post_id,
        date: perf.date,
        views: perf.views,
        likes: perf.likes,
        shares: perf.shares,
        comments: perf.comments,
        avg_read_time: perf.avg_read_time,
        bounce_rate: perf.bounce_rate
      })
    }
  }
}

pub fn content_performance_for_post(
  pool: &Pool,
  post_id: i32
) -> Result<Vec<ContentPerformance>> {
  select_many(
    pool,
    &format!(
      "SELECT {} FROM content_performance
      WHERE post_id = ? ORDER BY date DESC",
      PERFORMANCE_FIELDS
    ),
    params![post_id],
    map_content_performance
  )
}

// Ordered by views per row, NOT deduplicated by post: a
// post with several daily rows shows up several times.
// The dashboard displays it that way.
pub fn top_performing_content(
  pool: &Pool,
  limit: usize
) -> Result<Vec<ContentPerformance>> {
  select_many(
    pool,
    &format!(
      "SELECT {} FROM content_performance ORDER BY views DESC LIMIT {}",
      PERFORMANCE_FIELDS, limit
    ),
    NO_PARAMS,
    map_content_performance
  )
}

/* --- User engagement --- */

const ENGAGEMENT_FIELDS: &'static str =
  "id, user_id, date, session_count, total_time_spent,
  pages_per_session, last_active";

fn user_engagement_for_day(
  pool: &Pool,
  user_id: i32,
  day_start: i64,
  day_end: i64
) -> Result<Option<UserEngagement>> {
  select_one(
    pool,
    &format!(
      "SELECT {} FROM user_engagement
      WHERE user_id = ? AND date >= ? AND date < ?",
      ENGAGEMENT_FIELDS
    ),
    params![user_id, day_start, day_end],
    map_user_engagement
  )
}

pub fn upsert_user_engagement(
  pool: &Pool,
  engagement: &UserEngagement
) -> Result<UserEngagement> {
  let (day_start, day_end) = time_utils::day_bounds(engagement.date)
    .ok_or_else(|| {
      eyre!("Date {} is not a representable day", engagement.date)
    })?;
  match user_engagement_for_day(pool, engagement.user_id, day_start, day_end)? {
    Some(existing) => {
      let conn = pool.clone().get()?;
      conn.execute(
        "UPDATE user_engagement SET session_count = ?, total_time_spent = ?,
        pages_per_session = ?, last_active = ? WHERE id = ?",
        params![
          engagement.session_count,
          engagement.total_time_spent,
          engagement.pages_per_session,
          engagement.last_active,
          existing.id
        ]
      )?;
      Ok(UserEngagement {
        id: existing.id,
        user_id: existing.user_id,
        date: existing.date,
        session_count: engagement.session_count,
        total_time_spent: engagement.total_time_spent,
        pages_per_session: engagement.pages_per_session,
        last_active: engagement.last_active
      })
    },
    None => {
      let conn = pool.clone().get()?;
      conn.execute(
        "INSERT INTO user_engagement (user_id, date, session_count,
        total_time_spent, pages_per_session, last_active)
        VALUES (?, ?, ?, ?, ?, ?)",
        params![
          engagement.user_id,
          engagement.date,
          engagement.session_count,
          engagement.total_time_spent,
          engagement.pages_per_session,
          engagement.last_active
        ]
      )?;
      Ok(UserEngagement {
        id: conn.last_insert_rowid() as i32,
        user_id: engagement.user_id,
        date: engagement.date,
        session_count: engagement.session_count,
        total_time_spent: engagement.total_time_spent,
        pages_per_session: engagement.pages_per_session,
        last_active: engagement.last_active
      })
    }
  }
}

// Per row, same as top content: a user active on several
// days appears once per day row.
pub fn most_engaged_users(
  pool: &Pool,
  limit: usize
) -> Result<Vec<UserEngagement>> {
  select_many(
    pool,
    &format!(
      "SELECT {} FROM user_engagement
      ORDER BY total_time_spent DESC LIMIT {}",
      ENGAGEMENT_FIELDS, limit
    ),
    NO_PARAMS,
    map_user_engagement
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::test_pool;
  use crate::utils::time_utils::{current_timestamp, start_of_day};

  fn sample_view(session_id: &str, timestamp: i64) -> PageView {
    PageView {
      id: -1,
      path: "/blog/some-post".to_string(),
      session_id: session_id.to_string(),
      user_id: None,
      referrer: None,
      user_agent: "test-agent".to_string(),
      device: "desktop".to_string(),
      browser: "firefox".to_string(),
      country: String::new(),
      region: String::new(),
      city: String::new(),
      metadata: None,
      timestamp
    }
  }

  fn sample_traffic(date: i64, visitors: i32, views: i32) -> TrafficStats {
    TrafficStats {
      id: -1,
      date,
      period_type: "daily".to_string(),
      visitor_count: visitors,
      page_view_count: views,
      bounce_rate: 0.4,
      avg_session_duration: 120.0
    }
  }

  #[test]
  fn replaying_a_page_view_creates_two_rows() {
    let pool = test_pool();
    let now = current_timestamp();
    let mut v1 = sample_view("abc", now);
    let mut v2 = sample_view("abc", now);
    insert_page_view(&pool, &mut v1).unwrap();
    insert_page_view(&pool, &mut v2).unwrap();
    // No dedup whatsoever:
    assert_ne!(v1.id, v2.id);
    assert_eq!(2, recent_page_views(&pool, 10).unwrap().len());
  }

  #[test]
  fn visitor_count_is_distinct_by_session() {
    let pool = test_pool();
    let now = current_timestamp();
    for _ in 0..3 {
      insert_page_view(&pool, &mut sample_view("session-a", now)).unwrap();
    }
    insert_page_view(&pool, &mut sample_view("session-b", now)).unwrap();
    // One view way outside the window:
    insert_page_view(
      &pool,
      &mut sample_view("session-old", now - 30 * 86400)
    ).unwrap();
    assert_eq!(2, unique_visitor_count(&pool, 7).unwrap());
  }

  #[test]
  fn visitor_count_survives_absurd_day_windows() {
    let pool = test_pool();
    insert_page_view(
      &pool,
      &mut sample_view("session-a", current_timestamp())
    ).unwrap();
    // Would overflow with a plain multiplication:
    assert_eq!(1, unique_visitor_count(&pool, i64::MAX).unwrap());
    assert_eq!(0, unique_visitor_count(&pool, 0).unwrap());
  }

  #[test]
  fn sequential_traffic_upserts_keep_one_row_last_write_wins() {
    let pool = test_pool();
    let now = current_timestamp();
    upsert_traffic_stats(&pool, &sample_traffic(now, 10, 50)).unwrap();
    // Same calendar day, different time-of-day:
    let later = start_of_day(now) + 82800;
    let merged =
      upsert_traffic_stats(&pool, &sample_traffic(later, 12, 70)).unwrap();
    let rows = traffic_stats(&pool, PeriodType::Daily, 10).unwrap();
    assert_eq!(1, rows.len());
    // Overwritten, not summed:
    assert_eq!(12, rows[0].visitor_count);
    assert_eq!(70, rows[0].page_view_count);
    assert_eq!(rows[0].id, merged.id);
  }

  #[test]
  fn traffic_upserts_do_not_cross_period_types() {
    let pool = test_pool();
    let now = current_timestamp();
    upsert_traffic_stats(&pool, &sample_traffic(now, 10, 50)).unwrap();
    let mut weekly = sample_traffic(now, 99, 400);
    weekly.period_type = "weekly".to_string();
    upsert_traffic_stats(&pool, &weekly).unwrap();
    assert_eq!(1, traffic_stats(&pool, PeriodType::Daily, 10).unwrap().len());
    assert_eq!(1, traffic_stats(&pool, PeriodType::Weekly, 10).unwrap().len());
  }

  #[test]
  fn traffic_stats_respect_limit_and_date_order() {
    let pool = test_pool();
    let now = current_timestamp();
    for day in 0..8 {
      upsert_traffic_stats(
        &pool,
        &sample_traffic(now - day * 86400, day as i32, 10)
      ).unwrap();
    }
    let rows = traffic_stats(&pool, PeriodType::Daily, 5).unwrap();
    assert_eq!(5, rows.len());
    for pair in rows.windows(2) {
      assert!(pair[0].date > pair[1].date);
    }
  }

  fn sample_perf(post_id: i32, date: i64, views: i32) -> ContentPerformance {
    ContentPerformance {
      id: -1,
      post_id,
      date,
      views,
      likes: 5,
      shares: 2,
      comments: 1,
      avg_read_time: 180.0,
      bounce_rate: 0.3
    }
  }

  #[test]
  fn content_performance_upsert_is_keyed_by_post_and_day() {
    let pool = test_pool();
    let now = current_timestamp();
    upsert_content_performance(&pool, &sample_perf(7, now, 100)).unwrap();
    // Same day, same post - overwrites:
    upsert_content_performance(&pool, &sample_perf(7, now, 150)).unwrap();
    // Same day, other post - new row:
    upsert_content_performance(&pool, &sample_perf(8, now, 10)).unwrap();

    let top = top_performing_content(&pool, 10).unwrap();
    assert_eq!(2, top.len());
    assert_eq!(150, top[0].views);
    assert_eq!(7, top[0].post_id);
  }

  #[test]
  fn engagement_upsert_overwrites_per_user_day() {
    let pool = test_pool();
    let now = current_timestamp();
    let engagement = UserEngagement {
      id: -1,
      user_id: 3,
      date: now,
      session_count: 1,
      total_time_spent: 300,
      pages_per_session: 2.5,
      last_active: now
    };
    let first = upsert_user_engagement(&pool, &engagement).unwrap();
    let second = upsert_user_engagement(
      &pool,
      &UserEngagement { total_time_spent: 900, ..engagement }
    ).unwrap();
    assert_eq!(first.id, second.id);
    let rows = most_engaged_users(&pool, 10).unwrap();
    assert_eq!(1, rows.len());
    assert_eq!(900, rows[0].total_time_spent);
  }
}
