use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::Auth;
use crate::blog::{BlogDraft, BlogLifecycle};
use crate::config::AssetSettings;
use crate::error::ApiError;
use crate::guest::{GuestDraft, GuestLifecycle};
use crate::models::*;
use crate::repo::Repo;
use crate::storage::AssetStore;
use crate::upload::{read_form, FormData, UploadLimits, BLOG_FILES, GUEST_FILES};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/blogs")
                    .route(web::get().to(list_blogs))
                    .route(web::post().to(create_blog)),
            )
            .service(
                web::resource("/blogs/{id}")
                    .route(web::get().to(get_blog))
                    .route(web::put().to(update_blog))
                    .route(web::delete().to(delete_blog)),
            )
            .service(web::resource("/blogs/{id}/similar").route(web::get().to(similar_blogs)))
            .service(
                web::resource("/guests")
                    .route(web::get().to(list_guests))
                    .route(web::post().to(create_guest)),
            )
            .service(
                web::resource("/guests/{id}")
                    .route(web::get().to(get_guest))
                    .route(web::put().to(update_guest))
                    .route(web::delete().to(delete_guest)),
            ),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub blogs: Arc<BlogLifecycle>,
    pub guests: Arc<GuestLifecycle>,
    pub upload_limits: UploadLimits,
}

impl AppState {
    pub fn new<R>(repo: R, store: Arc<dyn AssetStore>, assets: &AssetSettings, upload_limits: UploadLimits) -> Self
    where
        R: Repo + 'static,
    {
        let repo = Arc::new(repo);
        Self {
            blogs: Arc::new(BlogLifecycle::new(repo.clone(), store.clone(), assets)),
            guests: Arc::new(GuestLifecycle::new(repo, store, assets)),
            upload_limits,
        }
    }
}

fn blog_draft(form: &FormData, auth: &Auth) -> BlogDraft {
    BlogDraft {
        title: form.text("title"),
        author: form.text("author"),
        content: form.raw("content"),
        user_id: Some(auth.subject().to_string()),
    }
}

fn guest_draft(form: &FormData, auth: &Auth) -> GuestDraft {
    GuestDraft {
        name: form.text("name"),
        role: form.text("role"),
        about: form.text("about"),
        instagram: form.text("instagram"),
        twitter: form.text("twitter"),
        threads: form.text("threads"),
        heading_one: form.text("heading_one"),
        description_one: form.text("description_one"),
        heading_two: form.text("heading_two"),
        description_two: form.text("description_two"),
        heading_three: form.text("heading_three"),
        description_three: form.text("description_three"),
        youtube_link: form.text("youtube_link"),
        user_id: Some(auth.subject().to_string()),
    }
}

fn parse_id(raw: &str) -> Result<Id, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound)
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/blogs",
    tag = "blogs",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of blog summaries, newest first", body = BlogPage),
        (status = 400, description = "Invalid page or limit")
    )
)]
pub async fn list_blogs(data: web::Data<AppState>, query: web::Query<PageQuery>) -> Result<HttpResponse, ApiError> {
    let page = PageRequest { page: query.page.unwrap_or(1), limit: query.limit.unwrap_or(10) };
    let page = data.blogs.list(page).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Multipart form: `title`, `author`, `content` (JSON array of blocks; an image
/// block's `value` is the index of a file in `images`), files `thumbnail`
/// (max 1) and `images` (max 50).
#[utoipa::path(
    post,
    path = "/api/blogs",
    tag = "blogs",
    responses(
        (status = 201, description = "Blog created", body = BlogPost),
        (status = 400, description = "Malformed content or missing title"),
        (status = 401, description = "Missing or invalid token"),
        (status = 413, description = "File too large"),
        (status = 415, description = "Unsupported media type")
    )
)]
pub async fn create_blog(auth: Auth, data: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let form = read_form(payload, BLOG_FILES, &data.upload_limits).await?;
    let draft = blog_draft(&form, &auth);
    let post = data.blogs.create(draft, form.files).await?;
    Ok(HttpResponse::Created().json(post))
}

#[utoipa::path(
    get,
    path = "/api/blogs/{id}",
    tag = "blogs",
    params(("id" = String, Path, description = "Blog id (UUID)")),
    responses(
        (status = 200, description = "Blog", body = BlogPost),
        (status = 404, description = "Blog not found")
    )
)]
pub async fn get_blog(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let post = data.blogs.get(parse_id(&path)?).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[utoipa::path(
    get,
    path = "/api/blogs/{id}/similar",
    tag = "blogs",
    params(("id" = String, Path, description = "Blog id (UUID)")),
    responses(
        (status = 200, description = "Blog with up to four other posts", body = SimilarBlogs),
        (status = 404, description = "Blog not found")
    )
)]
pub async fn similar_blogs(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let similar = data.blogs.similar(parse_id(&path)?).await?;
    Ok(HttpResponse::Ok().json(similar))
}

/// Multipart form as for create. The block sequence is replaced wholesale;
/// omitted `title`/`author` keep their stored values and the thumbnail is kept
/// unless a new one is sent. Media no longer referenced is deleted afterwards.
#[utoipa::path(
    put,
    path = "/api/blogs/{id}",
    tag = "blogs",
    params(("id" = String, Path, description = "Blog id (UUID)")),
    responses(
        (status = 200, description = "Blog updated", body = BlogPost),
        (status = 400, description = "Malformed content"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Blog not found")
    )
)]
pub async fn update_blog(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let form = read_form(payload, BLOG_FILES, &data.upload_limits).await?;
    let draft = blog_draft(&form, &auth);
    let post = data.blogs.update(id, draft, form.files).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[utoipa::path(
    delete,
    path = "/api/blogs/{id}",
    tag = "blogs",
    params(("id" = String, Path, description = "Blog id (UUID)")),
    responses(
        (status = 200, description = "Blog and its media deleted"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Blog not found")
    )
)]
pub async fn delete_blog(_auth: Auth, data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    data.blogs.delete(id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "blog deleted", "id": id })))
}

#[utoipa::path(
    get,
    path = "/api/guests",
    tag = "guests",
    responses((status = 200, description = "All guests", body = [GuestSummary]))
)]
pub async fn list_guests(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let guests = data.guests.list().await?;
    Ok(HttpResponse::Ok().json(guests))
}

/// Multipart form with the profile fields and the `guest_image` file.
#[utoipa::path(
    post,
    path = "/api/guests",
    tag = "guests",
    responses(
        (status = 201, description = "Guest created", body = Guest),
        (status = 400, description = "Missing required fields"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn create_guest(auth: Auth, data: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let form = read_form(payload, GUEST_FILES, &data.upload_limits).await?;
    let draft = guest_draft(&form, &auth);
    let guest = data.guests.create(draft, form.files).await?;
    Ok(HttpResponse::Created().json(guest))
}

#[utoipa::path(
    get,
    path = "/api/guests/{id}",
    tag = "guests",
    params(("id" = String, Path, description = "Guest id (UUID)")),
    responses(
        (status = 200, description = "Guest", body = Guest),
        (status = 404, description = "Guest not found")
    )
)]
pub async fn get_guest(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let guest = data.guests.get(parse_id(&path)?).await?;
    Ok(HttpResponse::Ok().json(guest))
}

#[utoipa::path(
    put,
    path = "/api/guests/{id}",
    tag = "guests",
    params(("id" = String, Path, description = "Guest id (UUID)")),
    responses(
        (status = 200, description = "Guest updated", body = Guest),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Guest not found")
    )
)]
pub async fn update_guest(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let form = read_form(payload, GUEST_FILES, &data.upload_limits).await?;
    let draft = guest_draft(&form, &auth);
    let guest = data.guests.update(id, draft, form.files).await?;
    Ok(HttpResponse::Ok().json(guest))
}

#[utoipa::path(
    delete,
    path = "/api/guests/{id}",
    tag = "guests",
    params(("id" = String, Path, description = "Guest id (UUID)")),
    responses(
        (status = 200, description = "Guest and image deleted"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Guest not found")
    )
)]
pub async fn delete_guest(_auth: Auth, data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    data.guests.delete(id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "guest deleted", "id": id })))
}
