/*
 * Page view enrichment: everything the ingestion endpoint
 * derives server-side before a view row is persisted.
 * Device and browser come from the user agent, geo fields
 * from the optional ip2location database, and anonymous
 * visitors without a client-provided session id get one
 * derived from their address and user agent.
 */

use sha1::{Digest, Sha1};

pub mod ip_location;
pub mod ua;

// Length of the derived hex session ids. Plenty for
// bucketing anonymous visitors.
const SESSION_ID_LENGTH: usize = 16;

// Deterministic per (address, user agent, day): the same
// anonymous visitor maps to the same session id all day
// without us storing their IP anywhere.
pub fn fallback_session_id(
  client_ip: &str,
  user_agent: &str,
  day_start: i64
) -> String {
  let mut hasher = Sha1::new();
  hasher.update(client_ip.as_bytes());
  hasher.update(user_agent.as_bytes());
  hasher.update(day_start.to_be_bytes());
  let digest = hasher.finalize();
  let mut hex = String::with_capacity(digest.len() * 2);
  for byte in digest {
    hex.push_str(&format!("{:02x}", byte));
  }
  hex.truncate(SESSION_ID_LENGTH);
  hex
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fallback_session_id_is_stable() {
    let a = fallback_session_id("127.0.0.1", "some-agent", 1615150740);
    let b = fallback_session_id("127.0.0.1", "some-agent", 1615150740);
    assert_eq!(a, b);
    assert_eq!(SESSION_ID_LENGTH, a.len());
  }

  #[test]
  fn fallback_session_id_varies_with_inputs() {
    let a = fallback_session_id("127.0.0.1", "some-agent", 1615150740);
    let b = fallback_session_id("127.0.0.2", "some-agent", 1615150740);
    let c = fallback_session_id("127.0.0.1", "some-agent", 1615150740 + 86400);
    assert_ne!(a, b);
    assert_ne!(a, c);
  }
}
