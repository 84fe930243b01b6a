//! One run of the image conversion job: fetch pending, convert, sync.

use std::path::Path;
use tracing::{info, instrument, warn};

use crate::converter;
use crate::db::ImageStore;
use crate::error::JobError;
use crate::sync;

/// Counts from a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    pub pending: usize,
    pub converted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub synced: usize,
}

/// Convert every pending image under `image_dir` to `width`×`height` JPEGs
/// and record the results.
///
/// Conversion failures are logged one per image and do not fail the run.
/// The run fails if the output directory cannot be created (nothing is
/// converted then) or if any database update fails.
#[instrument(skip_all, fields(dir = %image_dir.display()))]
pub async fn run_conversion(
    store: &dyn ImageStore,
    image_dir: &Path,
    width: u32,
    height: u32,
) -> Result<JobReport, JobError> {
    let pending = store.fetch_pending_images().await?;
    let pending_count = pending.len();
    info!(pending = pending_count, "converting pending images");

    let dir = image_dir.to_path_buf();
    let batch = tokio::task::spawn_blocking(move || {
        converter::convert_pending(&pending, &dir, width, height)
    })
    .await??;

    if !batch.failures.is_empty() {
        warn!(failed = batch.failures.len(), "unable to convert some images");
    }
    for failed in &batch.failures {
        warn!(
            image_id = failed.image_id,
            location = %failed.source_location,
            error = %failed.cause,
            "image conversion failed"
        );
    }

    let synced = sync::apply_conversions(store, &batch.successes).await?;
    let report = JobReport {
        pending: pending_count,
        converted: batch.successes.len(),
        failed: batch.failures.len(),
        skipped: batch.skipped.len(),
        synced,
    };
    info!(?report, "conversion completed");
    Ok(report)
}
