//! Error types, one enum per layer.
//!
//! Per-image conversion failures are values (`ConvertError` inside a
//! `ConversionOutcome::Failure`), never control flow. Every wrapper keeps the
//! underlying cause as its `source()`.

use std::path::PathBuf;
use thiserror::Error;

/// Storage-layer errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An update or delete matched zero rows, or a referenced row is missing.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Why a single image could not be converted. Always recoverable at item
/// granularity.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("error opening image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error decoding image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("error creating destination file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error encoding image {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// The converted-output directory could not be provisioned. Aborts the batch.
#[derive(Error, Debug)]
#[error("unable to create subdirectory for images {path}: {source}")]
pub struct ProvisionError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Errors surfaced by the service layer to the HTTP API.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Store(#[source] StoreError),

    #[error("error saving upload: {0}")]
    Upload(#[source] std::io::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
            other => ServiceError::Store(other),
        }
    }
}

/// Errors that end a conversion job run.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("error fetching or saving images: {0}")]
    Store(#[from] StoreError),

    #[error("conversion task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn not_found_maps_to_service_not_found() {
        let err: ServiceError = StoreError::NotFound {
            entity: "comment",
            id: 7,
        }
        .into();
        match err {
            ServiceError::NotFound(msg) => assert_eq!(msg, "comment 7 not found"),
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn database_errors_keep_their_source() {
        let err: ServiceError = StoreError::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, ServiceError::Store(StoreError::Database(_))));
        assert!(err.source().is_some());
    }

    #[test]
    fn provision_error_exposes_io_cause() {
        let err = ProvisionError {
            path: PathBuf::from("/nope/converted"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        let cause = err
            .source()
            .and_then(|s| s.downcast_ref::<std::io::Error>())
            .unwrap();
        assert_eq!(cause.kind(), std::io::ErrorKind::PermissionDenied);
    }
}
