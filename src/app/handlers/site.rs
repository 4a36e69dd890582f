use actix_web::{web, HttpResponse};
use handlebars::Handlebars;
use log::error;
use crate::db;
use crate::db::entities::{Author, Category, Message, Subscriber};
use crate::utils::{text_utils, time_utils};
use super::super::auth::{AdminUser, EditorUser};
use super::super::dtos::*;
use super::super::error::{map_db_error, Error};
use super::super::validation::Validator;
use super::super::AppState;

const MAX_MESSAGE_LENGTH: usize = 5000;
const MAX_SUBJECT_LENGTH: usize = 200;
const MAX_NAME_LENGTH: usize = 100;

/* --- Categories --- */

pub async fn categories(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  match db::all_categories(&app_state.pool) {
    Ok(categories) => Ok(
      HttpResponse::Ok().json(Vec::<CategoryDto>::from(categories))
    ),
    Err(e) => Err(map_db_error(e))
  }
}

// A category plus every published post in it.
pub async fn category(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>
) -> Result<HttpResponse, Error> {
  let slug = path.into_inner().0;
  let category = db::category_by_slug(&app_state.pool, &slug)
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound("Category does not exist".to_string()))?;
  let posts: Vec<PostDto> = db::posts_by_category(&app_state.pool, category.id)
    .map_err(map_db_error)?
    .into_iter()
    .map(|p| PostDto::from(p).without_content())
    .collect();
  Ok(HttpResponse::Ok().json(CategoryWithPostsDto {
    id: category.id,
    name: category.name,
    slug: category.slug,
    posts
  }))
}

pub async fn create_category(
  app_state: web::Data<AppState>,
  form: web::Json<CategoryForm>,
  _editor: EditorUser
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  Validator::new()
    .require("name", &form.name)
    .require("slug", &form.slug)
    .check()?;
  let mut category = Category {
    id: -1,
    name: form.name,
    slug: form.slug
  };
  db::insert_category(&app_state.pool, &mut category)
    .map_err(|e| {
      if db::is_unique_violation(&e) {
        Error::BadRequest("Category name or slug already exists".to_string())
      } else {
        map_db_error(e)
      }
    })?;
  Ok(HttpResponse::Created().json(category))
}

/* --- Authors --- */

pub async fn authors(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let authors: Vec<AuthorDto> = db::all_authors(&app_state.pool)
    .map_err(map_db_error)?
    .into_iter()
    .map(Into::into)
    .collect();
  Ok(HttpResponse::Ok().json(authors))
}

pub async fn author(
  app_state: web::Data<AppState>,
  path: web::Path<(i32,)>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  match db::author_by_id(&app_state.pool, id).map_err(map_db_error)? {
    Some(author) => Ok(HttpResponse::Ok().json(AuthorDto::from(author))),
    None => Err(Error::NotFound("Author does not exist".to_string()))
  }
}

pub async fn create_author(
  app_state: web::Data<AppState>,
  form: web::Json<AuthorForm>,
  _editor: EditorUser
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  Validator::new()
    .require("name", &form.name)
    .check()?;
  let mut author = Author {
    id: -1,
    name: form.name,
    bio: form.bio.unwrap_or_default(),
    avatar: form.avatar.unwrap_or_default(),
    // Stored as a JSON string:
    social: form.social
      .map(|v| v.to_string())
      .unwrap_or_else(|| "{}".to_string())
  };
  db::insert_author(&app_state.pool, &mut author).map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(AuthorDto::from(author)))
}

/* --- Newsletter --- */

pub async fn subscribe(
  app_state: web::Data<AppState>,
  form: web::Json<SubscribeForm>
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  let email = form.email.trim().to_lowercase();
  Validator::new()
    .email("email", &email)
    .check()?;
  let mut subscriber = Subscriber {
    id: -1,
    email,
    created: time_utils::current_timestamp()
  };
  db::insert_subscriber(&app_state.pool, &mut subscriber)
    .map_err(|e| {
      if db::is_unique_violation(&e) {
        Error::BadRequest("Email is already subscribed".to_string())
      } else {
        map_db_error(e)
      }
    })?;
  Ok(HttpResponse::Created().json(SubscriberDto::from(subscriber)))
}

pub async fn subscribers(
  app_state: web::Data<AppState>,
  _admin: AdminUser
) -> Result<HttpResponse, Error> {
  let subscribers: Vec<SubscriberDto> = db::all_subscribers(&app_state.pool)
    .map_err(map_db_error)?
    .into_iter()
    .map(Into::into)
    .collect();
  Ok(HttpResponse::Ok().json(subscribers))
}

/* --- Contact messages --- */

pub async fn contact(
  app_state: web::Data<AppState>,
  form: web::Json<ContactForm>
) -> Result<HttpResponse, Error> {
  let mut form = form.into_inner();
  text_utils::truncate_utf8(&mut form.name, MAX_NAME_LENGTH);
  text_utils::truncate_utf8(&mut form.subject, MAX_SUBJECT_LENGTH);
  text_utils::truncate_utf8(&mut form.message, MAX_MESSAGE_LENGTH);
  Validator::new()
    .require("name", &form.name)
    .email("email", &form.email)
    .require("subject", &form.subject)
    .require("message", &form.message)
    .check()?;
  let mut message = Message {
    id: -1,
    name: text_utils::escape_html(form.name.trim()),
    email: form.email.trim().to_string(),
    subject: text_utils::escape_html(form.subject.trim()),
    message: text_utils::escape_html(&form.message),
    read: 0,
    created: time_utils::current_timestamp()
  };
  db::insert_message(&app_state.pool, &mut message).map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(MessageDto::from(message)))
}

pub async fn messages(
  app_state: web::Data<AppState>,
  _admin: AdminUser
) -> Result<HttpResponse, Error> {
  let messages: Vec<MessageDto> = db::all_messages(&app_state.pool)
    .map_err(map_db_error)?
    .into_iter()
    .map(Into::into)
    .collect();
  Ok(HttpResponse::Ok().json(messages))
}

pub async fn mark_message_read(
  app_state: web::Data<AppState>,
  path: web::Path<(i32,)>,
  _admin: AdminUser
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  match db::mark_message_read(&app_state.pool, id).map_err(map_db_error)? {
    Some(message) => Ok(HttpResponse::Ok().json(MessageDto::from(message))),
    None => Err(Error::NotFound("Message does not exist".to_string()))
  }
}

/* --- SEO surfaces --- */

// Rendered live on each request. Static pages first, then
// every published post, then categories and authors.
pub async fn sitemap(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>
) -> Result<HttpResponse, Error> {
  let root = &app_state.site_info.root;
  let mut urls: Vec<SitemapUrl> = vec![
    SitemapUrl {
      loc: format!("{}/", root),
      changefreq: "daily",
      priority: "1.0",
      lastmod: None
    },
    SitemapUrl {
      loc: format!("{}/about", root),
      changefreq: "monthly",
      priority: "0.5",
      lastmod: None
    },
    SitemapUrl {
      loc: format!("{}/contact", root),
      changefreq: "monthly",
      priority: "0.5",
      lastmod: None
    }
  ];

  // DB errors degrade to a sitemap with only the static
  // pages rather than a 500, crawlers retry anyway.
  if let Ok(posts) = db::all_posts(&app_state.pool) {
    for post in posts.into_iter().filter(|p| p.published != 0) {
      urls.push(SitemapUrl {
        loc: format!("{}/blog/{}", root, post.slug),
        changefreq: "weekly",
        priority: "0.8",
        lastmod: time_utils::timestamp_to_date_string(post.created)
      });
    }
  }
  if let Ok(categories) = db::all_categories(&app_state.pool) {
    for category in categories {
      urls.push(SitemapUrl {
        loc: format!("{}/category/{}", root, category.slug),
        changefreq: "weekly",
        priority: "0.6",
        lastmod: None
      });
    }
  }
  if let Ok(authors) = db::all_authors(&app_state.pool) {
    for author in authors {
      urls.push(SitemapUrl {
        loc: format!("{}/author/{}", root, author.id),
        changefreq: "monthly",
        priority: "0.4",
        lastmod: None
      });
    }
  }

  let body = hb.render("sitemap", &SitemapData { urls })
    .map_err(|e| {
      error!("A template engine error occured when rendering \
        the sitemap: {}", e);
      Error::InternalServerError("Template engine error".to_string())
    })?;

  Ok(
    HttpResponse::Ok()
      .content_type("application/xml")
      .body(body)
  )
}

pub async fn robots(
  app_state: web::Data<AppState>
) -> HttpResponse {
  let body = format!(
    "User-agent: *\nAllow: /\nDisallow: /api/\n\nSitemap: {}/sitemap.xml\n",
    app_state.site_info.root
  );
  HttpResponse::Ok()
    .content_type("text/plain")
    .body(body)
}
