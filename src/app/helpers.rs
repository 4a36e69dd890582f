use actix_web::HttpRequest;
use lazy_static::lazy_static;
use regex::Regex;
use std::net::IpAddr;
use std::str::FromStr;

// Actix header values can contain non-string garbage, so
// extracting one takes a couple of hops.
pub fn user_agent(req: &HttpRequest) -> String {
  req.headers().get("user-agent")
    .map(|h| String::from(h.to_str().unwrap_or("")))
    .unwrap_or(String::new())
}

// The "IP address" actix gives us may or may not carry a
// port part, the regex strips it when there is one.
pub fn real_ip_addr(req: &HttpRequest) -> Option<IpAddr> {
  lazy_static! {
    static ref PORT_REGEX: Regex = Regex::new(
      r"(.+):\d+$"
    ).unwrap();
  }

  req.connection_info().realip_remote_addr()
    .map(|ip| {
      IpAddr::from_str(&PORT_REGEX.replace(ip, "$1"))
        .ok()
    })
    // Option of an Option, one level has to go.
    .unwrap_or(None)
}
