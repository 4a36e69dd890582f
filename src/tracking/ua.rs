// Tiny user-agent classifier. We only need coarse device
// and browser buckets for the analytics dashboard, so a
// couple of substring checks beat pulling in a full
// UA-parsing database.

pub fn device_from_ua(user_agent: &str) -> &'static str {
  let ua = user_agent.to_lowercase();
  // iPads say "mobile" too, so tablets go first:
  if ua.contains("ipad") || ua.contains("tablet") {
    "tablet"
  } else if ua.contains("mobile") || ua.contains("android") || ua.contains("iphone") {
    "mobile"
  } else if ua.is_empty() {
    ""
  } else {
    "desktop"
  }
}

pub fn browser_from_ua(user_agent: &str) -> &'static str {
  let ua = user_agent.to_lowercase();
  // Order matters: Edge UAs contain "chrome", Chrome UAs
  // contain "safari".
  if ua.contains("edg/") || ua.contains("edge") {
    "edge"
  } else if ua.contains("opr/") || ua.contains("opera") {
    "opera"
  } else if ua.contains("firefox") {
    "firefox"
  } else if ua.contains("chrome") || ua.contains("crios") {
    "chrome"
  } else if ua.contains("safari") {
    "safari"
  } else if ua.is_empty() {
    ""
  } else {
    "other"
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const CHROME_DESKTOP: &'static str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
  const FIREFOX_ANDROID: &'static str =
    "Mozilla/5.0 (Android 13; Mobile; rv:121.0) Gecko/121.0 Firefox/121.0";
  const SAFARI_IPAD: &'static str =
    "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X) AppleWebKit/605.1.15 \
    (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";
  const EDGE_DESKTOP: &'static str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";

  #[test]
  fn classifies_devices() {
    assert_eq!("desktop", device_from_ua(CHROME_DESKTOP));
    assert_eq!("mobile", device_from_ua(FIREFOX_ANDROID));
    assert_eq!("tablet", device_from_ua(SAFARI_IPAD));
    assert_eq!("", device_from_ua(""));
  }

  #[test]
  fn classifies_browsers() {
    assert_eq!("chrome", browser_from_ua(CHROME_DESKTOP));
    assert_eq!("firefox", browser_from_ua(FIREFOX_ANDROID));
    assert_eq!("safari", browser_from_ua(SAFARI_IPAD));
    assert_eq!("edge", browser_from_ua(EDGE_DESKTOP));
    assert_eq!("other", browser_from_ua("curl/8.0"));
  }
}
