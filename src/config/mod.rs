// Adding the context method to errors:
use eyre::WrapErr;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::convert::From;

#[derive(Debug, Deserialize)]
pub struct Config {
  pub db_path: String,
  pub bind_address: String,
  // Empty string disables the geo lookup on page views:
  pub iploc_path: String,
  pub template_dir: String,
  pub cors_origin: String,
  // Session cookie settings:
  pub session_cookie: String,
  pub session_max_age: i64,
  // Rate limiter settings (auth endpoints):
  pub rl_max_requests: u32,
  pub rl_max_requests_time: u32,
  pub rl_block_duration: u32,
  // Used to generate the sitemap URLs and SEO tags:
  pub site_title: String,
  pub site_root: String,
  pub site_description: String
}

// Looks redundant but I thought having another
// struct would be better than moving all of this
// info around the app_state, especially since
// there could be sensible info in the config.
#[derive(Serialize)]
pub struct SiteInfo {
  pub title: String,
  pub root: String,
  pub description: String
}

impl From<&Config> for SiteInfo {
  fn from(config: &Config) -> Self {
    Self {
      title: config.site_title.clone(),
      root: config.site_root.clone(),
      description: config.site_description.clone()
    }
  }
}

impl Config {

  pub fn from_env() -> Result<Config> {
    let mut c = config::Config::new();
    // RUST_LOG is already set in main.rs if it
    // was absent.
    // You have to use lowercase here when compared
    // to what's in the .env file.
    c.set_default("db_path", "./blog.db")?;
    c.set_default("bind_address", "127.0.0.1:5000")?;
    // No geo enrichment unless a BIN file is provided:
    c.set_default("iploc_path", "")?;
    c.set_default("template_dir", "./templates")?;
    c.set_default("cors_origin", "http://localhost:5000")?;
    c.set_default("session_cookie", "blog_session")?;
    // A week, in seconds:
    c.set_default("session_max_age", 604800)?;
    // Settings for the basic rate limiter on the auth
    // endpoints, modeled on the old API (5 requests
    // per 15 minutes):
    c.set_default("rl_max_requests", 5)?;
    c.set_default("rl_max_requests_time", 900)?;
    c.set_default("rl_block_duration", 900)?;
    // Default website URLs and OpenGraph etc. config:
    c.set_default("site_title", "Mindful Thoughts")?;
    // Should never have a trailing slash or THINGS WILL BREAK.
    c.set_default("site_root", "https://mindfulthoughts.com")?;
    c.set_default(
      "site_description",
      "Thoughts on design, technology, productivity and mindfulness."
    )?;

    c.merge(config::Environment::default())?;
    // The error has to be given a context for
    // color_eyre to work here:
    c.try_into()
      .context("Loading configuration from env")
  }

}
