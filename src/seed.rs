// Seeding tool for fresh deployments: creates the schema
// and inserts the default author, the starter categories,
// a couple of sample posts and the admin user.
// Usage: blog-seed --admin-password <password> [--db <path>]

// The db module is shared with the server binary and most
// of it goes unused here:
#![allow(dead_code)]

mod content;
mod db;
mod utils;

use argon2::{
  password_hash::{PasswordHasher, SaltString},
  Argon2
};
use color_eyre::Result;
use eyre::eyre;
use getopts::Options;
use r2d2_sqlite::SqliteConnectionManager;
use rand::rngs::OsRng;
use std::env;
use std::process::exit;

use db::entities::{Author, Category, Post, User};
use db::Pool;
use utils::time_utils::current_timestamp;

const DEFAULT_AUTHOR_NAME: &'static str = "Alex Morgan";
const DEFAULT_AUTHOR_BIO: &'static str =
  "Writer and researcher exploring the intersection of design, \
  technology and intentional living.";
const STARTER_CATEGORIES: [(&'static str, &'static str); 4] = [
  ("Design", "design"),
  ("Technology", "technology"),
  ("Productivity", "productivity"),
  ("Mindfulness", "mindfulness")
];

fn print_usage(program: &str, opts: &Options) {
  let brief = format!("Usage: {} --admin-password PASSWORD [options]", program);
  print!("{}", opts.usage(&brief));
}

fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| eyre!("Password hashing failed - {}", e))
}

fn sample_posts(category_ids: &[i32], author_id: i32) -> Vec<Post> {
  // The number is an index into STARTER_CATEGORIES:
  let samples = vec![
    (
      "The Art of Minimalist Design",
      "the-art-of-minimalist-design",
      "Why less really is more when it comes to interfaces people \
      actually enjoy using.",
      "Minimalism in design is not about removing things until \
      nothing is left. It is about removing things until only what \
      matters is left.\n\nEvery element on a screen competes for \
      attention. The more elements, the more the competition, and \
      the less any single one of them can win.\n\nStart from an \
      empty page and justify every addition. The burden of proof \
      sits with the element, not with the empty space.",
      0,
      true
    ),
    (
      "Deep Work in a Distracted World",
      "deep-work-in-a-distracted-world",
      "Reclaiming long stretches of focused attention, one blocked \
      calendar at a time.",
      "The ability to concentrate without distraction is becoming \
      rare at exactly the moment it is becoming valuable.\n\nShallow \
      work feels productive. It fills the day, it produces visible \
      motion, and it asks nothing difficult of us.\n\nDeep work is \
      the opposite on every count, which is why it has to be \
      scheduled and defended rather than hoped for.",
      2,
      true
    ),
    (
      "A Five Minute Morning Practice",
      "a-five-minute-morning-practice",
      "A small mindfulness routine that survives contact with real \
      mornings.",
      "Most morning routines fail because they are designed for an \
      idealized person with an idealized morning.\n\nFive minutes \
      is short enough to survive a bad night, a sick child and a \
      missed alarm.\n\nSit, breathe, and notice. That is the whole \
      practice. The length is the feature.",
      3,
      false
    )
  ];

  samples
    .into_iter()
    .map(|(title, slug, excerpt, body, category, featured)| {
      let read_time = content::reading_time_minutes(body);
      Post {
        id: -1,
        title: title.to_string(),
        slug: slug.to_string(),
        excerpt: excerpt.to_string(),
        content: body.to_string(),
        featured_image: String::new(),
        category_id: category_ids[category],
        author_id,
        read_time,
        is_featured: featured as i32,
        published: 1,
        created: current_timestamp()
      }
    })
    .collect()
}

fn seed(pool: &Pool, admin_password: &str) -> Result<()> {
  db::init_schema(pool)?;

  // Refuse to seed on top of existing content:
  if !db::all_categories(pool)?.is_empty() {
    return Err(eyre!("Database already has categories, refusing to seed"));
  }

  let mut author = Author {
    id: -1,
    name: DEFAULT_AUTHOR_NAME.to_string(),
    bio: DEFAULT_AUTHOR_BIO.to_string(),
    avatar: String::new(),
    social: "{}".to_string()
  };
  db::insert_author(pool, &mut author)?;
  println!("Created author \"{}\" (id {})", author.name, author.id);

  let mut category_ids = Vec::new();
  for (name, slug) in STARTER_CATEGORIES.iter() {
    let mut category = Category {
      id: -1,
      name: name.to_string(),
      slug: slug.to_string()
    };
    db::insert_category(pool, &mut category)?;
    println!("Created category \"{}\" (id {})", category.name, category.id);
    category_ids.push(category.id);
  }

  for mut post in sample_posts(&category_ids, author.id) {
    db::insert_post(pool, &mut post)?;
    println!("Created post \"{}\" (id {})", post.title, post.id);
  }

  let mut admin = User {
    id: -1,
    username: "admin".to_string(),
    password: hash_password(admin_password)?,
    role: "admin".to_string(),
    created: current_timestamp()
  };
  db::insert_user(pool, &mut admin)?;
  println!("Created admin user (id {})", admin.id);

  Ok(())
}

fn main() -> Result<()> {
  let args: Vec<String> = env::args().collect();
  let program = args[0].clone();

  let mut opts = Options::new();
  opts.optopt(
    "p",
    "admin-password",
    "password for the admin account (required)",
    "PASSWORD"
  );
  opts.optopt("d", "db", "path to the SQLite database file", "PATH");
  opts.optflag("h", "help", "print this help menu");

  let matches = match opts.parse(&args[1..]) {
    Ok(m) => m,
    Err(e) => {
      eprintln!("{}", e);
      print_usage(&program, &opts);
      exit(1);
    }
  };
  if matches.opt_present("h") {
    print_usage(&program, &opts);
    return Ok(());
  }
  let admin_password = match matches.opt_str("p") {
    Some(p) if p.len() >= 8 => p,
    Some(_) => {
      eprintln!("The admin password must be at least 8 characters");
      exit(1);
    },
    None => {
      print_usage(&program, &opts);
      exit(1);
    }
  };
  let db_path = matches
    .opt_str("d")
    .unwrap_or_else(|| "./blog.db".to_string());

  let manager = SqliteConnectionManager::file(&db_path);
  let pool = Pool::new(manager)?;
  seed(&pool, &admin_password)?;
  println!("Done.");
  Ok(())
}
