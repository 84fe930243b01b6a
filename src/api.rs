//! HTTP routes for posts, comments and the feed.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::{self, Config};
use crate::db::Pool;
use crate::error::ServiceError;
use crate::feed::Feed;
use crate::model::{CommentResponse, NewComment, NewPost, PostResponse};
use crate::service;
use crate::upload::UploadDir;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub uploads: Arc<UploadDir>,
    pub feed: config::Feed,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pool: Pool, cfg: &Config) -> Self {
        Self {
            pool,
            uploads: Arc::new(UploadDir::new(cfg.image_dir())),
            feed: cfg.feed.clone(),
            max_upload_bytes: cfg.server.max_upload_bytes,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    Router::new()
        .route("/ping", get(ping))
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{post_id}/comments", post(add_comment))
        .route("/posts/{post_id}/comments/{comment_id}", delete(delete_comment))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ServiceError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "bad request", "error": msg }),
            ),
            ServiceError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "message": "not found", "error": msg }),
            ),
            ServiceError::Store(_) | ServiceError::Upload(_) => {
                error!(error = ?self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

async fn ping() -> &'static str {
    "pong\n"
}

/// Raw pagination parameters; parsed by [`parse_page`].
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub cursor: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

/// Resolve `(cursor, page_size)`, applying defaults for absent values.
pub fn parse_page(query: &FeedQuery, limits: &config::Feed) -> Result<(i64, i64), ServiceError> {
    let cursor = match query.cursor.as_deref().map(str::trim) {
        None | Some("") => 0,
        Some(raw) => parse_id(raw, "cursor")?,
    };
    let page_size = match query.page_size.as_deref().map(str::trim) {
        None | Some("") => limits.default_page_size,
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| ServiceError::Validation("invalid pageSize".into()))?,
    };
    if page_size < 1 || page_size > limits.max_page_size {
        return Err(ServiceError::Validation(format!(
            "pageSize must be between 1 and {}",
            limits.max_page_size
        )));
    }
    Ok((cursor, page_size))
}

fn parse_id(raw: &str, name: &str) -> Result<i64, ServiceError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or_else(|| ServiceError::Validation(format!("{name} should be a non-negative integer")))
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Feed>, ServiceError> {
    let (cursor, page_size) = parse_page(&query, &state.feed)?;
    let feed = service::feed_page(&state.pool, cursor, page_size).await?;
    Ok(Json(feed))
}

fn bad_multipart(err: MultipartError) -> ServiceError {
    ServiceError::Validation(format!("unable to parse multipart body: {err}"))
}

async fn create_post(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PostResponse>), ServiceError> {
    let mut image = None;
    let mut caption = String::new();
    let mut user_id = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                image = Some((file_name, bytes));
            }
            Some("caption") => caption = field.text().await.map_err(bad_multipart)?,
            Some("userId") => user_id = Some(field.text().await.map_err(bad_multipart)?),
            _ => {}
        }
    }

    let (file_name, bytes) =
        image.ok_or_else(|| ServiceError::Validation("error in image retrieval".into()))?;
    let user_id = match user_id.as_deref().map(str::trim) {
        None | Some("") => {
            return Err(ServiceError::Validation(
                "no userId present in the request".into(),
            ))
        }
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| ServiceError::Validation("userId should be integer".into()))?,
    };

    let post = NewPost { user_id, caption };
    let response =
        service::create_post(&state.pool, &state.uploads, &post, &file_name, &bytes).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentBody {
    pub user_id: i64,
    pub content: String,
}

async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    body: Result<Json<CommentBody>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentResponse>), ServiceError> {
    let post_id = parse_id(&post_id, "postId")?;
    let Json(body) = body.map_err(|rejection| {
        ServiceError::Validation(format!("unable to parse request body: {}", rejection.body_text()))
    })?;
    let comment = NewComment {
        post_id,
        user_id: body.user_id,
        content: body.content,
    };
    let response = service::add_comment(&state.pool, &comment).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn delete_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<Json<CommentResponse>, ServiceError> {
    parse_id(&post_id, "postId")?;
    let comment_id = parse_id(&comment_id, "commentId")?;
    let response = service::delete_comment(&state.pool, comment_id).await?;
    Ok(Json(response))
}
