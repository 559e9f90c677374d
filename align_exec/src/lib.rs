//! # Alignment library.
//!
//! Pose tracking and autonomous alignment core for an omnidirectional drive base. This library
//! allows the executable (and benchmarks) to access the modules defined inside the alignment
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Alignment control - drives the vehicle onto a fixed goal pose with profiled feedback
pub mod align_ctrl;

/// Per-cycle data store for the executable
pub mod data_store;

/// Field layout - the static catalog of fiducial landmarks
pub mod field;

/// Goal catalog - goal poses derived from landmarks and nearest goal selection
pub mod goal;

/// Localisation - fiducial pose estimation and the fused pose store
pub mod loc;

/// Parameters of the executable itself
pub mod params;

/// Simulation - stand-ins for the drive base and cameras
pub mod sim;
