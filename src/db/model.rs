//! Database entity and view models used by repositories.
//!
//! Keep these structs focused on the data returned by queries. Business logic
//! should live in higher layers.

use chrono::{DateTime, Utc};

/// One row of the `images` table.
///
/// `converted_name` stays `None` until a conversion has been applied; only
/// such rows are returned as pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub image_id: i64,
    pub post_id: i64,
    pub file_name: String,
    pub location: String,
    pub converted_name: Option<String>,
    pub converted_location: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Comment half of a feed join row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRow {
    pub comment_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One (post, comment) pairing from the windowed feed query. A post with no
/// comments arrives once with `comment == None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatJoinRow {
    pub post_id: i64,
    pub user_id: i64,
    pub caption: String,
    pub created_at: DateTime<Utc>,
    pub image_name: String,
    pub image_location: String,
    pub comment: Option<CommentRow>,
}
