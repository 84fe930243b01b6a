//! Folds flat feed join rows into per-post aggregates.

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::db::model::FlatJoinRow;
use crate::model::{Comment, PostAggregate};

/// Posts keyed by id, in the order their first row arrived.
pub type Feed = IndexMap<i64, PostAggregate>;

/// Group `rows` by post id in a single forward pass.
///
/// Rows must already be ordered by post id, then comment id descending, with
/// each post's rows contiguous. Comments keep arrival order, so each post
/// lists its newest comment first. A row without a comment (a post nobody
/// has commented on) yields an aggregate with an empty comment list.
pub fn aggregate(rows: impl IntoIterator<Item = FlatJoinRow>) -> Feed {
    let mut feed = Feed::new();
    for row in rows {
        let comment = row_comment(&row);
        match feed.entry(row.post_id) {
            Entry::Occupied(mut slot) => {
                if let Some(comment) = comment {
                    let updated = slot.get().clone().with_comment(comment);
                    slot.insert(updated);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(PostAggregate {
                    post_id: row.post_id,
                    user_id: row.user_id,
                    caption: row.caption,
                    image_name: row.image_name,
                    image_location: row.image_location,
                    created_at: row.created_at,
                    comments: comment.into_iter().collect(),
                });
            }
        }
    }
    feed
}

fn row_comment(row: &FlatJoinRow) -> Option<Comment> {
    row.comment.as_ref().map(|c| Comment {
        post_id: row.post_id,
        user_id: c.user_id,
        content: c.content.clone(),
        created_at: c.created_at,
    })
}
