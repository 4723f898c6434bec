//! fitplan - Personal workout plan tracker
//!
//! Upload a multi-day plan as JSON or CSV, work through it day by day and
//! keep an eye on completion and streaks.

pub mod config;
pub mod db;
pub mod plan;
pub mod progress;
pub mod server;
pub mod timer;
pub mod tracker;
pub mod tui;

pub use db::{Database, MemStorage, Storage};
pub use plan::{FileFormat, IngestError, Plan, ingest};
