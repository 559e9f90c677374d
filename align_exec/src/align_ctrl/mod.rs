//! # Alignment control module
//!
//! Alignment control drives the vehicle from wherever it currently is onto a goal pose, and holds
//! it there. It does this using a pair of profiled PID controllers, one operating on the straight
//! line distance to the goal and one on the heading. These concepts are explained below.
//!
//! Rather than controlling X and Y separately the vehicle is always driven along the line joining
//! it to the goal. The linear controller sees the distance to the goal as its measurement and
//! zero as its goal, and its output is a speed along that line. This produces straight line
//! approaches regardless of the starting offset.
//!
//! Both controllers follow a trapezoid profile towards their goal. Far from the goal the profile
//! velocity is added to the controller output as a feedforward, which is blended out as the
//! vehicle approaches the goal so that the final approach is driven by feedback alone. The goal
//! moves relative to the vehicle, so each cycle the previous linear setpoint is projected onto
//! the current approach line and the profile restarts from that distance, keeping its velocity.
//! The gap between that setpoint and the vehicle is left to the feedback term.
//!
//! An alignment is complete once both axes have stayed within tolerance continuously for the
//! settle time. Starting a new alignment always discards the previous one entirely.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod profile;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use controllers::*;
pub use params::Params;
pub use state::*;
use crate::goal::GoalVariant;
use util::archive::ArchiveError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A request to align onto the nearest suitable goal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignRequest {
    /// Only goals of this variant are considered, or all goals if `None`.
    pub variant: Option<GoalVariant>,

    /// The profile limits to use.
    pub mode: ProfileMode,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Selects which set of profile limits an alignment uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileMode {
    Fast,
    Slow,
}

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum AlignCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Could not write the status archive: {0}")]
    ArchiveError(ArchiveError),

    /// The goal pose contains a non-finite value.
    #[error("The goal pose is not finite")]
    InvalidGoal,

    /// The cycle period must be finite and positive.
    #[error("Invalid cycle period: {0} s")]
    InvalidCyclePeriod(f64),
}
