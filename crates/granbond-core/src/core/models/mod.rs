//! Particle data models.
//!
//! The host simulation owns particle storage; the contact model reads kinematic
//! state from it and accumulates forces and torques into it.

pub mod ids;
pub mod particle;
pub mod system;
