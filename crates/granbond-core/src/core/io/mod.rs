//! Provides input/output for particle snapshots.
//!
//! Snapshots are plain CSV tables with one row per particle, read and written
//! through the [`traits::ParticleFile`] interface.

pub mod snapshot;
pub mod traits;
