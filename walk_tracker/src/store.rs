use std::sync::Arc;

use async_trait::async_trait;
use walk_tracker_lib::{location_sample::LocationSample, walk::WalkPayload};

use crate::PersistenceError;

/// Durable storage for finished walks. The store assigns the walk id.
#[async_trait]
pub trait WalkStore: Send + Sync {
    async fn save_session(&self, payload: &WalkPayload) -> Result<i64, PersistenceError>;

    async fn save_samples(&self, walk_id: i64, samples: &[LocationSample]) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedWalk {
    pub walk_id: i64,
    pub payload: Arc<WalkPayload>,
}
