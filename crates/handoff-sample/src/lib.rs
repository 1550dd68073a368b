//! # Handoff Sample App Library
//!
//! Two actors built with [`handoff_framework::actor!`] that call into each other.
//! Exposed as a library for integration testing.

pub mod directory_actor;
pub mod user_actor;
