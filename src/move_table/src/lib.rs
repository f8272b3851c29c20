#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation, clippy::missing_panics_doc)]

//! Breadth first exploration of a cube's configuration space into a table of undo moves, with
//! periodic checkpoints of the table to disk.

pub mod checkpoint;
pub mod config;
pub mod explorer;
pub mod table;

pub use checkpoint::{
    CheckpointError, Checkpointer, Manifest, latest_checkpoint, latest_checkpoint_for,
    read_manifest, read_table, write_table,
};
pub use config::{Budget, CheckpointConfig, ConfigError, ExploreConfig};
pub use explorer::{ExploreError, ExploreOutcome, Explorer, Stats};
pub use table::{LookupTable, TableError};

#[macro_export]
macro_rules! start {
    ($msg:expr) => {
        concat!("⏳ ", $msg)
    };
}

#[macro_export]
macro_rules! working {
    ($msg:expr) => {
        concat!("🛠  ", $msg)
    };
}

#[macro_export]
macro_rules! success {
    ($msg:expr) => {
        concat!("✅ ", $msg)
    };
}
