//! # Engine Module
//!
//! The per-pair force law and the passes built on it.
//!
//! ## Overview
//!
//! The engine turns validated material constants and the persistent contact stores
//! into forces. A [`kernel::ContactForceKernel`] evaluates one candidate pair at a
//! time and reports, rather than applies, any bond failure; the owning workflow
//! commits those failures after the pass so that the result does not depend on the
//! order in which pairs are visited.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Timestep, ownership convention and recording switches
//! - **Force Kernel** ([`kernel`]) - Normal, tangential and cohesive response of one pair
//! - **Bond Formation** ([`formation`]) - The one-shot pass that decides initial bonds
//! - **Rigid Aggregates** ([`rigid`]) - Effective-mass overrides and their ghost exchange
//! - **Diagnostics** ([`diagnostics`]) - Per-contact inspection records
//! - **Restart** ([`restart`]) - Binary persistence of material constants and type-pair flags
//! - **State Tracking** ([`state`]) - Formation and step reports
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod formation;
pub mod kernel;
pub mod progress;
pub mod restart;
pub mod rigid;
pub mod state;
