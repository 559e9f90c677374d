//! # Data Store

use comms_if::geom::{FieldVelocity, Pose2D, VelFrame};
use log::warn;
use serde::Serialize;

use crate::{align_ctrl, loc::vision};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the vehicle has been stopped
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SafeModeCause {
    /// The alignment did not settle within the allowed time
    AlignTimeout,

    /// AlignCtrl returned an error
    AlignCtrlError,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Simulation time, advanced by one cycle period per cycle
    pub sim_time_s: f64,

    // Safe mode variables
    /// Determines if the vehicle is in safe mode.
    pub safe: bool,

    /// Gives the reason for the vehicle being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    // Localisation
    pub true_pose: Pose2D,
    pub est_pose: Pose2D,
    pub vision_status_rpt: vision::StatusReport,

    // AlignCtrl
    pub align_ctrl_input: Option<align_ctrl::InputData>,
    pub align_ctrl_output: Option<FieldVelocity>,
    pub align_ctrl_status_rpt: align_ctrl::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

/// One row of the cycle telemetry archive.
#[derive(Debug, Serialize)]
pub struct CycleRecord {
    pub sim_time_s: f64,
    pub true_x_m: f64,
    pub true_y_m: f64,
    pub true_heading_rad: f64,
    pub est_x_m: f64,
    pub est_y_m: f64,
    pub est_heading_rad: f64,
    pub est_error_m: f64,
    pub cmd_vx_ms: f64,
    pub cmd_vy_ms: f64,
    pub cmd_omega_rads: f64,
    pub num_fused: usize,
    pub num_discarded: usize,
    pub dist_to_goal_m: f64,
    pub at_goal: bool,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Puts the vehicle into safe mode with the given cause.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        self.is_1_hz_cycle = self.num_cycles % (cycle_frequency_hz.round().max(1.0) as u128) == 0;

        self.align_ctrl_input = None;
        self.align_ctrl_output = None;
        self.align_ctrl_status_rpt = align_ctrl::StatusReport::default();
        self.vision_status_rpt = vision::StatusReport::default();
    }

    /// Build the telemetry record for this cycle.
    pub fn cycle_record(&self) -> CycleRecord {
        let cmd = self
            .align_ctrl_output
            .unwrap_or_else(|| FieldVelocity::zero(VelFrame::Robot));

        CycleRecord {
            sim_time_s: self.sim_time_s,
            true_x_m: self.true_pose.x(),
            true_y_m: self.true_pose.y(),
            true_heading_rad: self.true_pose.heading_rad,
            est_x_m: self.est_pose.x(),
            est_y_m: self.est_pose.y(),
            est_heading_rad: self.est_pose.heading_rad,
            est_error_m: self.est_pose.distance_to(&self.true_pose),
            cmd_vx_ms: cmd.vx_ms,
            cmd_vy_ms: cmd.vy_ms,
            cmd_omega_rads: cmd.omega_rads,
            num_fused: self.vision_status_rpt.num_fused,
            num_discarded: self.vision_status_rpt.num_discarded,
            dist_to_goal_m: self.align_ctrl_status_rpt.dist_to_goal_m,
            at_goal: self.align_ctrl_status_rpt.at_goal,
        }
    }
}
