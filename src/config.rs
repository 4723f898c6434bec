//! Runtime configuration: storage backend selection

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use tracing::info;

use crate::db::{Database, MemStorage, Storage};

pub const DEFAULT_DB_PATH: &str = "data/fitness.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    /// Maps in process memory, lost on exit
    Memory,
    /// SQLite file at `--db`
    Sqlite,
}

/// Storage options shared by every subcommand
#[derive(Debug, Clone, Args)]
pub struct StorageConfig {
    /// Storage backend
    #[arg(long, value_enum, env = "FITPLAN_STORAGE", default_value = "sqlite", global = true)]
    pub storage: StorageKind,

    /// SQLite database path
    #[arg(long, env = "FITPLAN_DB", default_value = DEFAULT_DB_PATH, global = true)]
    pub db: PathBuf,
}

impl StorageConfig {
    /// Construct the configured backend
    pub fn open(&self) -> Result<Box<dyn Storage + Send>> {
        match self.storage {
            StorageKind::Memory => {
                info!("Using in-memory storage");
                Ok(Box::new(MemStorage::new()))
            }
            StorageKind::Sqlite => {
                info!("Using SQLite storage at {}", self.db.display());
                Ok(Box::new(Database::open(&self.db)?))
            }
        }
    }
}
