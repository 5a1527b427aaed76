//! # granbond
//!
//! Pairwise contact forces for discrete-element (granular) simulations with a
//! cohesive, breakable bond model. Particles that start close enough are bonded
//! once at the beginning of a run; the bond resists tensile separation and shear
//! sliding until a failure threshold is exceeded, after which the pair reverts to
//! ordinary frictional contact.
//!
//! ## Architecture
//!
//! The crate follows a three-layer layout:
//!
//! - **[`core`]: The Foundation.** Particle data models, the pure force law
//!   (`potentials`), material parameters and their validation, per-contact stores
//!   (bond table, contact history, neighbor list) and snapshot I/O.
//!
//! - **[`engine`]: The Logic Core.** The per-pair `ContactForceKernel`, the one-shot
//!   bond formation pass, rigid-aggregate mass resolution, diagnostics and restart
//!   persistence.
//!
//! - **[`workflows`]: The Public API.** [`workflows::contact_model::CohesiveContactModel`]
//!   owns the persistent state and exposes `init`, `form_bonds` and `compute` to the
//!   host simulation's step loop.

pub mod core;
pub mod engine;
pub mod workflows;
