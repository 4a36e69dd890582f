mod app;
mod config;
mod content;
mod db;
mod tracking;
mod utils;

use color_eyre::Result;
use dotenv::dotenv;
use std::env;

#[actix_web::main]
async fn main() -> Result<()> {
  dotenv().ok();
  // Default log level when RUST_LOG isn't set, actix is
  // too chatty at "debug":
  if env::var("RUST_LOG").is_err() {
    env::set_var("RUST_LOG", "info,actix_web=warn");
  }
  env_logger::init();

  app::run().await
}
