//! # Alignment Executable Parameters
//!
//! This module provide parameters for the alignment executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::{align_ctrl::ProfileMode, sim};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AlignExecParams {
    /// Target period of one cycle
    pub cycle_period_s: f64,

    /// The alignment is abandoned if it hasn't settled after this long
    pub align_timeout_s: f64,

    /// Profile limits used unless overridden on the command line
    pub profile_mode: ProfileMode,

    /// Start pose of the vehicle on the blue alliance, as `[x_m, y_m, heading_deg]`. Mirrored
    /// when playing for red.
    pub start_pose: [f64; 3],

    /// Field layout file, relative to the params directory
    pub field_layout_file: String,

    pub sim: sim::Params,
}
