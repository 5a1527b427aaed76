//! # Contact State Module
//!
//! Persistent per-pair state of the cohesive contact model and the neighbor list
//! contract it is evaluated over.
//!
//! Bond identity and contact history live in two stores with different lifetimes.
//! A bond is a property of a particle pair for the whole run, so [`bond`] keys it
//! on particle tags and never drops an entry. Contact history follows the neighbor
//! list: [`history`] records appear and disappear as relations enter and leave the
//! list, and are realigned by tag whenever the list is rebuilt.

pub mod bond;
pub mod history;
pub mod neighbor;
