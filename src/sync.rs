use tracing::{instrument, warn};

use crate::converter::ConvertedImage;
use crate::db::ImageStore;
use crate::error::StoreError;

/// Write each converted image back to the store, one update per image.
///
/// A failed update is logged and skipped; the remaining images are still
/// applied and nothing is retried. Returns the number of rows updated, or
/// the error of the *last* failed update. Earlier failures are only visible
/// in the log.
#[instrument(skip_all, fields(count = converted.len()))]
pub async fn apply_conversions(
    store: &dyn ImageStore,
    converted: &[ConvertedImage],
) -> Result<usize, StoreError> {
    let mut applied = 0;
    let mut last_err = None;
    for image in converted {
        match store.apply_conversion_result(image).await {
            Ok(()) => applied += 1,
            Err(err) => {
                warn!(
                    image_id = image.image_id,
                    converted = %image.converted_name,
                    error = %err,
                    "unable to save converted image in database"
                );
                last_err = Some(err);
            }
        }
    }
    match last_err {
        Some(err) => Err(err),
        None => Ok(applied),
    }
}
