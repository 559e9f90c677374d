//! # Communications interface crate.
//!
//! Provides the common interface types shared between the alignment core and the equipment
//! around it, along with the traits the external collaborators (pose estimator, cameras, drive
//! base) must implement.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Poses and velocities in the field frame
pub mod geom;

/// Interface definitions for equipment (cameras and the drive base)
pub mod eqpt;

/// Localisation interfaces, pose sinks and sources
pub mod loc;
