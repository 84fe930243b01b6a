use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input of a post upload; the image arrives separately as a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub user_id: i64,
    pub caption: String,
}

/// Image row written together with its post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub file_name: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub post_id: i64,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub comment_id: i64,
    pub success: bool,
}

/// A comment as shown in the feed. `post_id` is a back-reference only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A post with its most recent comments, newest first.
///
/// Treated as a value: adding a comment builds a new aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostAggregate {
    pub post_id: i64,
    pub user_id: i64,
    pub caption: String,
    pub image_name: String,
    pub image_location: String,
    pub created_at: DateTime<Utc>,
    pub comments: Vec<Comment>,
}

impl PostAggregate {
    /// Returns a new aggregate with `comment` appended after the existing ones.
    #[must_use]
    pub fn with_comment(self, comment: Comment) -> Self {
        let mut comments = self.comments;
        comments.push(comment);
        Self { comments, ..self }
    }
}
