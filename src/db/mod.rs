//! Database module: entity models, SQL repositories and the image store seam.
//!
//! - `model`: rows returned by repositories.
//! - `repo`: SQL-only functions that map rows into entities.
//! - `store`: the `ImageStore` trait the conversion job runs against.
//!
//! External modules import from `imagegram::db`; the repository API and the
//! commonly used models are re-exported here.

pub mod model;
pub mod repo;
pub mod store;

pub use repo::*;

pub use model::{CommentRow, FlatJoinRow, ImageRecord};
pub use store::{ImageStore, SqliteImageStore};
