//! Client-side history for predicted ghosts.
//!
//! Components marked client-only never travel over the wire, so a client that
//! rolls back to an authoritative tick has to restore them itself. This crate
//! keeps a tick-indexed [`BackupRing`] per predicted ghost and runs the
//! backup, restore and prune passes over chunks of ghosts in parallel.

mod backup;
mod config;
mod error;
mod ring;

pub use backup::{ClientOnlyBackup, PassReport, PredictedChunk, PredictedGhost};
pub use config::BackupConfig;
pub use error::{HistoryError, HistoryResult};
pub use ring::BackupRing;
