//! # Force Field Module
//!
//! The cohesive contact force law and its parameters.
//!
//! ## Key Components
//!
//! - [`params`] - Material constants, defaults and validation
//! - [`potentials`] - Pure functions of the elasto-plastic force law
//! - [`coefficients`] - Per-type-pair activation flags and cutoffs
//! - [`term`] - Pair force and virial accumulation types

pub mod coefficients;
pub mod params;
pub mod potentials;
pub mod term;
