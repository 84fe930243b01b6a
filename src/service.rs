//! Post, comment and feed operations behind the HTTP API.

use tracing::{info, instrument};

use crate::db::{self, Pool};
use crate::error::ServiceError;
use crate::feed::{self, Feed};
use crate::model::{CommentResponse, NewComment, NewImage, NewPost, PostResponse};
use crate::upload::UploadDir;

/// Save the uploaded image, then store the post and its image row.
#[instrument(skip_all, fields(user_id = post.user_id))]
pub async fn create_post(
    pool: &Pool,
    uploads: &UploadDir,
    post: &NewPost,
    file_name: &str,
    bytes: &[u8],
) -> Result<PostResponse, ServiceError> {
    let saved = uploads.save(file_name, bytes).await?;
    let image = NewImage {
        file_name: saved.file_name.clone(),
        location: saved.location.clone(),
    };
    let post_id = match db::insert_post(pool, post, &image).await {
        Ok(id) => id,
        Err(err) => {
            uploads.discard(&saved).await;
            return Err(err.into());
        }
    };
    info!(post_id, file = %saved.file_name, "post created");
    Ok(PostResponse {
        post_id,
        success: true,
    })
}

#[instrument(skip_all, fields(post_id = comment.post_id))]
pub async fn add_comment(pool: &Pool, comment: &NewComment) -> Result<CommentResponse, ServiceError> {
    if comment.content.trim().is_empty() {
        return Err(ServiceError::Validation("comment content must be non-empty".into()));
    }
    let comment_id = db::insert_comment(pool, comment).await?;
    Ok(CommentResponse {
        comment_id,
        success: true,
    })
}

#[instrument(skip(pool))]
pub async fn delete_comment(pool: &Pool, comment_id: i64) -> Result<CommentResponse, ServiceError> {
    db::delete_comment(pool, comment_id).await?;
    Ok(CommentResponse {
        comment_id,
        success: true,
    })
}

/// One feed page: posts after `cursor`, limited to `page_size` joined rows.
#[instrument(skip(pool))]
pub async fn feed_page(pool: &Pool, cursor: i64, page_size: i64) -> Result<Feed, ServiceError> {
    let rows = db::fetch_feed_window(pool, cursor, page_size).await?;
    Ok(feed::aggregate(rows))
}
