use std::path::Path;

use const_format::concatcp;
use sqlx::{query, query_as, sqlite::SqliteConnectOptions, sqlite::SqliteQueryResult, types::Json, Executor, Pool, Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;
use walk_tracker_lib::{location_sample::LocationSample, pet::PetId, walk::{WalkPayload, WalkRecord}};

use crate::DataManagerError;

use super::constants::*;

const WALK_COLUMNS: &str = concatcp!(
    WALK_ID, ", ", PET_ID, ", ", TITLE, ", ", DESCRIPTION, ", ", NOTES, ", ",
    START_TIME, ", ", END_TIME, ", ", DURATION, ", ", DISTANCE, ", ", ROUTE_DATA
);

#[derive(Clone)]
pub struct WalkDatabase {
    pool: Pool<Sqlite>,
}

impl WalkDatabase {
    /// Opens the database file at `path`, creating it and its tables if missing.
    pub async fn connect(path: &Path) -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await
            .map_err(|err| DataManagerError::Database(format!("Failed to connect to database: {}", err)))?;

        let db = Self {
            pool
        };

        db.init().await?;
        debug!(path = %path.display(), "Connected to walk database");

        Ok(db)
    }

    async fn init(&self) -> Result<(), DataManagerError> {
        self.pool.execute(concatcp!("
            CREATE TABLE IF NOT EXISTS ", WALKS_TABLE_NAME, "(",
                WALK_ID,     " INTEGER PRIMARY KEY AUTOINCREMENT,",
                PET_ID,      " TEXT NOT NULL,",
                TITLE,       " TEXT NOT NULL,",
                DESCRIPTION, " TEXT NOT NULL,",
                NOTES,       " TEXT NOT NULL,",
                START_TIME,  " TIMESTAMP NOT NULL,",
                END_TIME,    " TIMESTAMP NOT NULL,",
                DURATION,    " INTEGER NOT NULL,",
                DISTANCE,    " REAL NOT NULL,",
                ROUTE_DATA,  " TEXT NOT NULL);

            CREATE TABLE IF NOT EXISTS ", WALK_LOCATIONS_TABLE_NAME, "(",
                WALK_ID,   " INTEGER NOT NULL,",
                SEQ,       " INTEGER NOT NULL,",
                LATITUDE,  " REAL NOT NULL,",
                LONGITUDE, " REAL NOT NULL,",
                ACCURACY,  " REAL,",
                TIMESTAMP, " TIMESTAMP NOT NULL,
                PRIMARY KEY(", WALK_ID, ", ", SEQ, "),
                FOREIGN KEY(", WALK_ID, ") REFERENCES ", WALKS_TABLE_NAME, "(", WALK_ID, ") ON DELETE CASCADE
            )")).await
                .map_err(|err| DataManagerError::Database(format!("Failed to create tables: {}", err)))
                .map(|_| ())
    }

    /// Stores the walk itself. Locations go in separately with `insert_locations`.
    pub async fn insert_walk(&self, payload: &WalkPayload) -> Result<i64, DataManagerError> {
        let mut conn = self.pool.acquire().await
            .map_err(|err| DataManagerError::Database(format!("Failed to acquire connection: {}", err)))?;
        insert_walk_row(&mut conn, payload).await
    }

    /// Writes all samples in capture order, in one transaction.
    pub async fn insert_locations(&self, walk_id: i64, samples: &[LocationSample]) -> Result<(), DataManagerError> {
        let mut tx = self.begin().await?;
        insert_location_rows(&mut tx, walk_id, samples).await?;
        commit(tx).await
    }

    /// Stores the walk and its locations together. Nothing is kept if either part fails.
    pub async fn insert_walk_with_locations(&self, payload: &WalkPayload) -> Result<i64, DataManagerError> {
        let mut tx = self.begin().await?;
        let walk_id = insert_walk_row(&mut tx, payload).await?;
        insert_location_rows(&mut tx, walk_id, &payload.samples).await?;
        commit(tx).await?;
        Ok(walk_id)
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>, DataManagerError> {
        self.pool.begin().await
            .map_err(|err| DataManagerError::Database(format!("Failed to begin transaction: {}", err)))
    }

    pub async fn get_walk(&self, walk_id: i64) -> Result<WalkRecord, DataManagerError> {
        query_as::<_, WalkRecord>(concatcp!("SELECT ", WALK_COLUMNS, " FROM ", WALKS_TABLE_NAME, " WHERE ", WALK_ID, " = ?1"))
            .bind(walk_id)
            .fetch_optional(&self.pool).await
            .map_err(|err| DataManagerError::Database(format!("Failed to get walk: {}", err)))?
            .ok_or_else(|| DataManagerError::Database(format!("No walk with id {}", walk_id)))
    }

    pub async fn get_walk_locations(&self, walk_id: i64) -> Result<Vec<LocationSample>, DataManagerError> {
        query_as::<_, LocationSample>(concatcp!(
            "SELECT ", LATITUDE, ", ", LONGITUDE, ", ", ACCURACY, ", ", TIMESTAMP,
            " FROM ", WALK_LOCATIONS_TABLE_NAME, " WHERE ", WALK_ID, " = ?1 ORDER BY ", SEQ))
            .bind(walk_id)
            .fetch_all(&self.pool).await
            .map_err(|err| DataManagerError::Database(format!("Failed to get walk locations: {}", err)))
    }

    /// Newest first. Without a pet, every walk is returned.
    pub async fn get_walks(&self, pet_id: Option<&PetId>) -> Result<Vec<WalkRecord>, DataManagerError> {
        let walks = match pet_id {
            Some(pet_id) => query_as::<_, WalkRecord>(concatcp!(
                "SELECT ", WALK_COLUMNS, " FROM ", WALKS_TABLE_NAME, " WHERE ", PET_ID, " = ?1 ORDER BY ", START_TIME, " DESC"))
                    .bind(pet_id.as_str())
                    .fetch_all(&self.pool).await,
            None => query_as::<_, WalkRecord>(concatcp!(
                "SELECT ", WALK_COLUMNS, " FROM ", WALKS_TABLE_NAME, " ORDER BY ", START_TIME, " DESC"))
                    .fetch_all(&self.pool).await,
        };

        walks.map_err(|err| DataManagerError::Database(format!("Failed to get walks: {}", err)))
    }

    pub async fn set_walk_title(&self, walk_id: i64, title: &str) -> Result<(), DataManagerError> {
        let result = query(concatcp!("UPDATE ", WALKS_TABLE_NAME, " SET ", TITLE, " = ?1 WHERE ", WALK_ID, " = ?2"))
                .bind(title)
                .bind(walk_id)
                .execute(&self.pool).await;
        updated_one(result, walk_id, "title")
    }

    pub async fn set_walk_description(&self, walk_id: i64, description: &str) -> Result<(), DataManagerError> {
        let result = query(concatcp!("UPDATE ", WALKS_TABLE_NAME, " SET ", DESCRIPTION, " = ?1 WHERE ", WALK_ID, " = ?2"))
                .bind(description)
                .bind(walk_id)
                .execute(&self.pool).await;
        updated_one(result, walk_id, "description")
    }

    pub async fn set_walk_notes(&self, walk_id: i64, notes: &str) -> Result<(), DataManagerError> {
        let result = query(concatcp!("UPDATE ", WALKS_TABLE_NAME, " SET ", NOTES, " = ?1 WHERE ", WALK_ID, " = ?2"))
                .bind(notes)
                .bind(walk_id)
                .execute(&self.pool).await;
        updated_one(result, walk_id, "notes")
    }

    /// Also removes the walk's locations.
    pub async fn delete_walk(&self, walk_id: i64) -> Result<(), DataManagerError> {
        let result = query(concatcp!("DELETE FROM ", WALKS_TABLE_NAME, " WHERE ", WALK_ID, " = ?1"))
                .bind(walk_id)
                .execute(&self.pool).await;
        updated_one(result, walk_id, "deletion")
    }
}

async fn insert_walk_row(conn: &mut SqliteConnection, payload: &WalkPayload) -> Result<i64, DataManagerError> {
    query_as::<_, (i64,)>(concatcp!("
        INSERT INTO ", WALKS_TABLE_NAME, "(", WALK_COLUMNS, ")
        VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) RETURNING ", WALK_ID))
            .bind(payload.pet_id.as_str())
            .bind(payload.title_or_default())
            .bind(&payload.details.description)
            .bind(&payload.details.notes)
            .bind(payload.started_at)
            .bind(payload.ended_at)
            .bind(payload.duration_seconds)
            .bind(payload.distance_meters)
            .bind(Json(payload.route_summary()))
            .fetch_one(&mut *conn).await
            .map_err(|err| DataManagerError::Database(format!("Failed to insert walk: {}", err)))
            .map(|row| row.0)
}

async fn insert_location_rows(conn: &mut SqliteConnection, walk_id: i64, samples: &[LocationSample]) -> Result<(), DataManagerError> {
    for (seq, sample) in samples.iter().enumerate() {
        query(concatcp!("
            INSERT INTO ", WALK_LOCATIONS_TABLE_NAME,
            "(", WALK_ID, ", ", SEQ, ", ", LATITUDE, ", ", LONGITUDE, ", ", ACCURACY, ", ", TIMESTAMP, ")
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)"))
                .bind(walk_id)
                .bind(seq as i64)
                .bind(sample.latitude)
                .bind(sample.longitude)
                .bind(sample.accuracy)
                .bind(sample.timestamp)
                .execute(&mut *conn).await
                .map_err(|err| DataManagerError::Database(format!("Failed to insert location: {}", err)))?;
    }
    Ok(())
}

async fn commit(tx: Transaction<'_, Sqlite>) -> Result<(), DataManagerError> {
    tx.commit().await
        .map_err(|err| DataManagerError::Database(format!("Failed to commit: {}", err)))
}

fn updated_one(result: Result<SqliteQueryResult, sqlx::Error>, walk_id: i64, what: &str) -> Result<(), DataManagerError> {
    let result = result.map_err(|err| DataManagerError::Database(format!("Failed walk {}: {}", what, err)))?;
    if result.rows_affected() == 0 {
        return Err(DataManagerError::Database(format!("No walk with id {}", walk_id)));
    }
    Ok(())
}
