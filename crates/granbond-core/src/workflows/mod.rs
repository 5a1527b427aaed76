//! # Workflows Module
//!
//! The public entry point the host simulation drives.
//!
//! ## Overview
//!
//! [`contact_model::CohesiveContactModel`] owns everything that persists across
//! timesteps (bond table, contact history, rigid-mass overrides) and sequences the
//! engine passes: initialization checks, the one-shot bond formation, and the
//! per-step force evaluation with staged bond failures.

pub mod contact_model;
