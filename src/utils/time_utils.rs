use chrono::{Duration, Local, LocalResult, TimeZone};

// The W3C-date style the sitemap lastmod fields expect.
// chrono formatting reference:
// https://docs.rs/chrono/0.4.19/chrono/format/strftime/index.html
const DATE_FORMAT: &'static str = "%Y-%m-%d";

// None when the timestamp doesn't map to a representable
// local date. Timestamps come from request bodies too, not
// just from our own clock.
pub fn timestamp_to_date_string(timestamp: i64) -> Option<String> {
  match Local.timestamp_opt(timestamp, 0) {
    LocalResult::Single(moment) =>
      Some(moment.format(DATE_FORMAT).to_string()),
    _ => None
  }
}

pub fn current_timestamp() -> i64 {
  Local::now().timestamp()
}

// The rollup tables bucket by calendar day (local time), not by
// exact date equality. Any timestamp inside the same day has to
// resolve to the same [start, end) pair. None for timestamps
// chrono can't represent, callers turn that into an error.
pub fn day_bounds(timestamp: i64) -> Option<(i64, i64)> {
  let moment = match Local.timestamp_opt(timestamp, 0) {
    LocalResult::Single(moment) => moment,
    // DST fold, both sides are the same calendar day:
    LocalResult::Ambiguous(moment, _) => moment,
    LocalResult::None => return None
  };
  let start = moment.date().and_hms_opt(0, 0, 0)?;
  Some((start.timestamp(), (start + Duration::days(1)).timestamp()))
}

// Infallible variant for timestamps we produced ourselves,
// out-of-range input just comes back unchanged.
pub fn start_of_day(timestamp: i64) -> i64 {
  day_bounds(timestamp).map_or(timestamp, |(start, _)| start)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn day_bounds_contain_the_timestamp() {
    let ts: i64 = 1615150740;
    let (start, end) = day_bounds(ts).unwrap();
    assert!(start <= ts);
    assert!(ts < end);
    assert_eq!(86400, end - start);
  }

  #[test]
  fn out_of_range_timestamps_have_no_bounds() {
    // These used to panic deep inside chrono:
    assert!(day_bounds(i64::MAX).is_none());
    assert!(day_bounds(i64::MIN).is_none());
    assert!(timestamp_to_date_string(i64::MAX).is_none());
    // And the infallible variant just echoes the input:
    assert_eq!(i64::MAX, start_of_day(i64::MAX));
  }

  #[test]
  fn date_strings_are_compact_dates() {
    let s = timestamp_to_date_string(1615150740).unwrap();
    assert_eq!(10, s.len());
    assert_eq!(2, s.matches('-').count());
  }

  #[test]
  fn start_of_day_is_idempotent() {
    let ts = current_timestamp();
    let start = start_of_day(ts);
    assert_eq!(start, start_of_day(start));
  }

  #[test]
  fn same_day_timestamps_share_a_bucket() {
    let ts = current_timestamp();
    let start = start_of_day(ts);
    // An hour into the day and twenty hours in land in the
    // same bucket:
    assert_eq!(
      day_bounds(start + 3600),
      day_bounds(start + 72000)
    );
  }
}
