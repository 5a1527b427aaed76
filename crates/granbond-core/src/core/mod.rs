//! # Core Module
//!
//! Stateless building blocks of the cohesive contact model.
//!
//! - **Particle Representation** ([`models`]) - Particles, tags and the owned/ghost particle set
//! - **Force Law** ([`forcefield`]) - Material parameters, type-pair coefficients and the
//!   pure normal/tangential force functions
//! - **Contact State** ([`contact`]) - The bond table, per-slot contact history and the
//!   neighbor list contract
//! - **File I/O** ([`io`]) - CSV particle snapshots

pub mod contact;
pub mod forcefield;
pub mod io;
pub mod models;
