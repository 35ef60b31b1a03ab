use const_format::concatcp;
use thiserror::Error;

pub mod database;
pub mod gpx_util;
mod data_manager;

pub use data_manager::*;

pub const DATA_DIR: &str = "data/";
pub const DATABASE_PATH: &str = concatcp!(DATA_DIR, "database.db");
pub const GPX_DIR: &str = concatcp!(DATA_DIR, "gpx");

#[derive(Debug, Error)]
pub enum DataManagerError {
    #[error("database error: {0}")]
    Database(String),
    #[error("gpx error: {0}")]
    Gpx(String),
    #[error("io error: {0}")]
    Io(String),
}
