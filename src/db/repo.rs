use crate::converter::ConvertedImage;
use crate::db::model::{CommentRow, FlatJoinRow, ImageRecord};
use crate::error::StoreError;
use crate::model::{NewComment, NewImage, NewPost};
use anyhow::Result;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let options = SqliteConnectOptions::from_str(&normalized)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = format!("sqlite://{expanded_path}");
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Insert a post and its image in one transaction. Returns the new post id.
#[instrument(skip_all)]
pub async fn insert_post(pool: &Pool, post: &NewPost, image: &NewImage) -> Result<i64, StoreError> {
    let mut tx = pool.begin().await?;
    let post_id: i64 =
        sqlx::query("INSERT INTO posts (user_id, caption) VALUES (?, ?) RETURNING post_id")
            .bind(post.user_id)
            .bind(&post.caption)
            .fetch_one(&mut *tx)
            .await?
            .get("post_id");
    sqlx::query("INSERT INTO images (post_id, image_file_name, location) VALUES (?, ?, ?)")
        .bind(post_id)
        .bind(&image.file_name)
        .bind(&image.location)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(post_id)
}

/// Insert a comment. A missing post is reported as `NotFound`.
#[instrument(skip_all)]
pub async fn insert_comment(pool: &Pool, comment: &NewComment) -> Result<i64, StoreError> {
    let mut tx = pool.begin().await?;
    let exists = sqlx::query_scalar::<_, i64>("SELECT post_id FROM posts WHERE post_id = ?")
        .bind(comment.post_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(StoreError::NotFound {
            entity: "post",
            id: comment.post_id,
        });
    }
    let comment_id: i64 = sqlx::query(
        "INSERT INTO comments (post_id, user_id, comment) VALUES (?, ?, ?) RETURNING comment_id",
    )
    .bind(comment.post_id)
    .bind(comment.user_id)
    .bind(&comment.content)
    .fetch_one(&mut *tx)
    .await?
    .get("comment_id");
    tx.commit().await?;
    Ok(comment_id)
}

#[instrument(skip_all)]
pub async fn delete_comment(pool: &Pool, comment_id: i64) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM comments WHERE comment_id = ?")
        .bind(comment_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "comment",
            id: comment_id,
        });
    }
    Ok(())
}

/// Posts after `cursor` with at most their two newest comments each.
///
/// `page_size` limits raw joined rows, not posts, so the last post of a page
/// may be cut short and the number of distinct posts can be below `page_size`.
#[instrument(skip_all)]
pub async fn fetch_feed_window(
    pool: &Pool,
    cursor: i64,
    page_size: i64,
) -> Result<Vec<FlatJoinRow>, StoreError> {
    let rows = sqlx::query(
        "SELECT p.post_id, p.user_id, p.caption, p.created_at, \
                COALESCE(i.converted_image_name, '') AS image_name, \
                COALESCE(i.converted_image_location, '') AS image_location, \
                c.comment_id, c.user_id AS comment_user_id, c.comment, \
                c.created_at AS comment_created_at \
         FROM posts p \
         INNER JOIN images i ON i.post_id = p.post_id \
         LEFT JOIN ( \
             SELECT comment_id, post_id, user_id, comment, created_at, \
                    ROW_NUMBER() OVER (PARTITION BY post_id ORDER BY comment_id DESC) AS rn \
             FROM comments \
         ) c ON c.post_id = p.post_id AND c.rn <= 2 \
         WHERE p.post_id > ? \
         ORDER BY p.post_id ASC, c.comment_id DESC \
         LIMIT ?",
    )
    .bind(cursor)
    .bind(page_size)
    .fetch_all(pool)
    .await?;

    rows.iter().map(feed_row).collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
}

fn feed_row(row: &SqliteRow) -> Result<FlatJoinRow, sqlx::Error> {
    let comment = match row.try_get::<Option<i64>, _>("comment_id")? {
        Some(comment_id) => Some(CommentRow {
            comment_id,
            user_id: row.try_get("comment_user_id")?,
            content: row.try_get("comment")?,
            created_at: row.try_get("comment_created_at")?,
        }),
        None => None,
    };
    Ok(FlatJoinRow {
        post_id: row.try_get("post_id")?,
        user_id: row.try_get("user_id")?,
        caption: row.try_get("caption")?,
        created_at: row.try_get("created_at")?,
        image_name: row.try_get("image_name")?,
        image_location: row.try_get("image_location")?,
        comment,
    })
}

/// Images that have never been converted, oldest first.
#[instrument(skip_all)]
pub async fn fetch_pending_images(pool: &Pool) -> Result<Vec<ImageRecord>, StoreError> {
    let rows = sqlx::query(
        "SELECT image_id, post_id, image_file_name, location, \
                converted_image_name, converted_image_location, uploaded_at \
         FROM images WHERE converted_image_name IS NULL ORDER BY image_id",
    )
    .fetch_all(pool)
    .await?;

    let images = rows
        .iter()
        .map(|row| {
            Ok(ImageRecord {
                image_id: row.try_get("image_id")?,
                post_id: row.try_get("post_id")?,
                file_name: row.try_get("image_file_name")?,
                location: row.try_get("location")?,
                converted_name: row.try_get("converted_image_name")?,
                converted_location: row.try_get("converted_image_location")?,
                uploaded_at: row.try_get("uploaded_at")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;
    Ok(images)
}

#[instrument(skip_all)]
pub async fn apply_conversion_result(
    pool: &Pool,
    converted: &ConvertedImage,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE images SET converted_image_name = ?, converted_image_location = ? WHERE image_id = ?",
    )
    .bind(&converted.converted_name)
    .bind(converted.converted_location.to_string_lossy().as_ref())
    .bind(converted.image_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "image",
            id: converted.image_id,
        });
    }
    Ok(())
}
