use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;
use walk_tracker::{PersistenceError, WalkStore};
use walk_tracker_lib::{location_sample::LocationSample, pet::PetId, walk::{WalkPayload, WalkRecord}};

use crate::{database::db::WalkDatabase, DataManagerError, DATABASE_PATH};

#[derive(Clone)]
pub struct DataManager {
    pub(crate) database: WalkDatabase,
}

/// The public interface for all walk data management.
impl DataManager {
    /// Opens the database under the project root.
    pub async fn start() -> Result<Self, DataManagerError> {
        let root: PathBuf = project_root::get_project_root()
            .map_err(|err| DataManagerError::Io(format!("Failed to find project root: {}", err)))?;
        Self::open(&root.join(DATABASE_PATH)).await
    }

    /// Opens the database file at `path`, creating its directory if needed.
    pub async fn open(path: &Path) -> Result<Self, DataManagerError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)
                    .map_err(|err| DataManagerError::Io(format!("Failed to create data directory {:?}: {}", dir, err)))?;
            }
        }

        let database = WalkDatabase::connect(path).await?;

        Ok(DataManager {
            database,
        })
    }

    /// Stores a finished walk with all its locations, in one transaction, and returns its id.
    pub async fn save_walk(&self, payload: &WalkPayload) -> Result<i64, DataManagerError> {
        let walk_id = self.database.insert_walk_with_locations(payload).await?;
        info!(walk_id, pet_id = %payload.pet_id, samples = payload.samples.len(), "Stored walk");
        Ok(walk_id)
    }

    /// The walk with its locations loaded.
    pub async fn get_walk(&self, walk_id: i64) -> Result<WalkRecord, DataManagerError> {
        let mut walk = self.database.get_walk(walk_id).await?;
        walk.samples = self.database.get_walk_locations(walk_id).await?;
        Ok(walk)
    }

    /// Walks without their locations, newest first.
    pub async fn get_walks(&self, pet_id: Option<&PetId>) -> Result<Vec<WalkRecord>, DataManagerError> {
        self.database.get_walks(pet_id).await
    }

    pub async fn set_walk_title(&self, walk_id: i64, title: &str) -> Result<(), DataManagerError> {
        self.database.set_walk_title(walk_id, title).await
    }

    pub async fn set_walk_description(&self, walk_id: i64, description: &str) -> Result<(), DataManagerError> {
        self.database.set_walk_description(walk_id, description).await
    }

    pub async fn set_walk_notes(&self, walk_id: i64, notes: &str) -> Result<(), DataManagerError> {
        self.database.set_walk_notes(walk_id, notes).await
    }

    pub async fn delete_walk(&self, walk_id: i64) -> Result<(), DataManagerError> {
        self.database.delete_walk(walk_id).await?;
        info!(walk_id, "Deleted walk");
        Ok(())
    }
}

#[async_trait]
impl WalkStore for DataManager {
    async fn save_session(&self, payload: &WalkPayload) -> Result<i64, PersistenceError> {
        self.database.insert_walk(payload).await.map_err(|err| PersistenceError(err.to_string()))
    }

    async fn save_samples(&self, walk_id: i64, samples: &[LocationSample]) -> Result<(), PersistenceError> {
        self.database
            .insert_locations(walk_id, samples)
            .await
            .map_err(|err| PersistenceError(err.to_string()))
    }
}
