use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use imagegram::converter::ConvertedImage;
use imagegram::db::{ImageRecord, ImageStore};
use imagegram::error::StoreError;
use imagegram::sync::apply_conversions;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct RecordingStore {
    responses: Arc<Mutex<VecDeque<Result<(), StoreError>>>>,
    applied: Arc<Mutex<Vec<i64>>>,
}

impl RecordingStore {
    fn with_responses(responses: Vec<Result<(), StoreError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Default::default()
        }
    }

    async fn applied(&self) -> Vec<i64> {
        self.applied.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl ImageStore for RecordingStore {
    async fn fetch_pending_images(&self) -> Result<Vec<ImageRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn apply_conversion_result(&self, converted: &ConvertedImage) -> Result<(), StoreError> {
        self.applied.lock().await.push(converted.image_id);
        let mut guard = self.responses.lock().await;
        guard.pop_front().unwrap_or(Ok(()))
    }
}

fn converted(image_id: i64) -> ConvertedImage {
    ConvertedImage {
        image_id,
        source_name: format!("{image_id}.png"),
        source_location: format!("/images/{image_id}.png"),
        converted_name: format!("{image_id}converted{image_id}.jpg"),
        converted_location: PathBuf::from(format!("/images/converted/{image_id}converted{image_id}.jpg")),
    }
}

#[tokio::test]
async fn applies_every_image_in_order() {
    let store = RecordingStore::default();
    let batch = vec![converted(1), converted(2), converted(3)];

    let applied = apply_conversions(&store, &batch).await.unwrap();

    assert_eq!(applied, 3);
    assert_eq!(store.applied().await, vec![1, 2, 3]);
}

#[tokio::test]
async fn failure_in_the_middle_still_attempts_the_rest() {
    let store = RecordingStore::with_responses(vec![
        Ok(()),
        Err(StoreError::NotFound { entity: "image", id: 2 }),
        Ok(()),
    ]);
    let batch = vec![converted(1), converted(2), converted(3)];

    let err = apply_conversions(&store, &batch).await.unwrap_err();

    assert!(matches!(err, StoreError::NotFound { id: 2, .. }));
    assert_eq!(store.applied().await, vec![1, 2, 3]);
}

#[tokio::test]
async fn last_failure_is_the_one_returned() {
    let store = RecordingStore::with_responses(vec![
        Err(StoreError::NotFound { entity: "image", id: 1 }),
        Ok(()),
        Err(StoreError::NotFound { entity: "image", id: 3 }),
    ]);
    let batch = vec![converted(1), converted(2), converted(3)];

    let err = apply_conversions(&store, &batch).await.unwrap_err();

    assert!(matches!(err, StoreError::NotFound { id: 3, .. }));
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let store = RecordingStore::default();
    assert_eq!(apply_conversions(&store, &[]).await.unwrap(), 0);
    assert!(store.applied().await.is_empty());
}
