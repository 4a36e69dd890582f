use actix_web::{web, HttpResponse};
use log::info;
use crate::content;
use crate::db;
use crate::db::entities::{Post, PostUpdate};
use crate::utils::{option_bool_to_i32, time_utils};
use super::super::auth::EditorUser;
use super::super::dtos::*;
use super::super::error::{map_db_error, Error};
use super::super::validation::Validator;
use super::super::AppState;

// Max results on the search endpoint:
const MAX_SEARCH_RESULTS: usize = 10;

pub async fn all_posts(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let posts: Vec<PostDto> = db::all_posts(&app_state.pool)
    .map_err(map_db_error)?
    .into_iter()
    .map(|p| PostDto::from(p).without_content())
    .collect();
  Ok(HttpResponse::Ok().json(posts))
}

pub async fn featured_posts(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let posts: Vec<PostDto> = db::featured_posts(&app_state.pool)
    .map_err(map_db_error)?
    .into_iter()
    .map(|p| PostDto::from(p).without_content())
    .collect();
  Ok(HttpResponse::Ok().json(posts))
}

pub async fn posts_by_category(
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
  Ok(HttpResponse::Ok().json(posts))
}

// Accepts either a numeric id or a slug, same trick the
// old API used for articles.
pub async fn post(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>
) -> Result<HttpResponse, Error> {
  let id_or_slug = path.into_inner().0;
  let post = match id_or_slug.parse::<i32>() {
    Ok(id) => db::post_by_id(&app_state.pool, id),
    Err(_) => db::post_by_slug(&app_state.pool, &id_or_slug)
  }.map_err(map_db_error)?;
  match post {
    Some(p) => Ok(HttpResponse::Ok().json(PostDto::from(p))),
    None => Err(Error::NotFound("Post does not exist".to_string()))
  }
}

// The post body split into paragraph blocks with the ad
// slots spliced in. The client renders these in order.
pub async fn post_content(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>
) -> Result<HttpResponse, Error> {
  let slug = path.into_inner().0;
  let post = db::post_by_slug(&app_state.pool, &slug)
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound("Post does not exist".to_string()))?;
  let blocks = content::interleave_default(
    content::split_paragraphs(&post.content)
  );
  Ok(HttpResponse::Ok().json(blocks))
}

pub async fn create_post(
  app_state: web::Data<AppState>,
  form: web::Json<PostForm>,
  editor: EditorUser
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  Validator::new()
    .require("title", &form.title)
    .require("slug", &form.slug)
    .require("content", &form.content)
    .positive("categoryId", form.category_id)
    .positive("authorId", form.author_id)
    .check()?;

  // No read time given? Estimate one from the content:
  let read_time = form.read_time
    .unwrap_or_else(|| content::reading_time_minutes(&form.content));

  let mut post = Post {
    id: -1,
    title: form.title,
    slug: form.slug,
    excerpt: form.excerpt.unwrap_or_default(),
    content: form.content,
    featured_image: form.featured_image.unwrap_or_default(),
    category_id: form.category_id,
    author_id: form.author_id,
    read_time,
    is_featured: option_bool_to_i32(form.is_featured),
    published: option_bool_to_i32(form.published),
    created: time_utils::current_timestamp()
  };

  db::insert_post(&app_state.pool, &mut post)
    .map_err(|e| {
      if db::is_unique_violation(&e) {
        Error::BadRequest("A post with that slug already exists".to_string())
      } else {
        map_db_error(e)
      }
    })?;
  info!("Post {} created by {}", post.id, editor.0.username);
  Ok(HttpResponse::Created().json(PostDto::from(post)))
}

pub async fn update_post(
  app_state: web::Data<AppState>,
  path: web::Path<(i32,)>,
  form: web::Json<PostUpdateForm>,
  _editor: EditorUser
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let form = form.into_inner();
  // Only the fields present in the body get written:
  let update = PostUpdate {
    id,
    title: form.title,
    slug: form.slug,
    excerpt: form.excerpt,
    content: form.content,
    featured_image: form.featured_image,
    category_id: form.category_id,
    author_id: form.author_id,
    read_time: form.read_time,
    is_featured: form.is_featured.map(|b| b as i32),
    published: form.published.map(|b| b as i32)
  };
  match db::update_post(&app_state.pool, &update).map_err(map_db_error)? {
    Some(post) => Ok(HttpResponse::Ok().json(PostDto::from(post))),
    None => Err(Error::NotFound("Post does not exist".to_string()))
  }
}

pub async fn delete_post(
  app_state: web::Data<AppState>,
  path: web::Path<(i32,)>,
  editor: EditorUser
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  if db::delete_post(&app_state.pool, id).map_err(map_db_error)? {
    info!("Post {} deleted by {}", id, editor.0.username);
    Ok(HttpResponse::NoContent().finish())
  } else {
    Err(Error::NotFound("Post does not exist".to_string()))
  }
}

pub async fn search(
  app_state: web::Data<AppState>,
  query: web::Query<SearchQuery>
) -> Result<HttpResponse, Error> {
  let terms = query.q.as_deref().unwrap_or("").trim().to_string();
  // Not an error, an empty query just finds nothing:
  if terms.is_empty() {
    return Ok(HttpResponse::Ok().json(Vec::<PostDto>::new()));
  }
  // The category filter is a slug. An unknown slug finds
  // nothing rather than erroring.
  let category_id = match &query.category {
    Some(slug) => {
      match db::category_by_slug(&app_state.pool, slug)
        .map_err(map_db_error)? {
          Some(category) => Some(category.id),
          None => return Ok(HttpResponse::Ok().json(Vec::<PostDto>::new()))
        }
    },
    None => None
  };
  let posts: Vec<PostDto> = db::search_posts(
    &app_state.pool,
    &terms,
    category_id,
    MAX_SEARCH_RESULTS
  )
    .map_err(map_db_error)?
    .into_iter()
    .map(|p| PostDto::from(p).without_content())
    .collect();
  Ok(HttpResponse::Ok().json(posts))
}
