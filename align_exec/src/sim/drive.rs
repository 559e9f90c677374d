//! Simulated drive base

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use super::DriveParams;
use crate::loc::OdomDelta;
use comms_if::{
    eqpt::drive::DriveActuator,
    geom::{FieldVelocity, Pose2D, VelFrame},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A drive base which follows its commands perfectly, but measures its own motion imperfectly.
pub struct SimDrive {
    params: DriveParams,

    true_pose: Pose2D,

    /// The current command, robot-relative
    cmd: FieldVelocity,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimDrive {
    pub fn new(params: DriveParams, start_pose: Pose2D) -> Self {
        Self {
            params,
            true_pose: start_pose,
            cmd: FieldVelocity::zero(VelFrame::Robot),
        }
    }

    pub fn true_pose(&self) -> Pose2D {
        self.true_pose
    }

    /// The true velocity of the vehicle, in the field frame.
    pub fn true_velocity(&self) -> FieldVelocity {
        self.cmd.to_field_relative(self.true_pose.heading_rad)
    }

    /// Move the vehicle for `dt_s` under the current command, returning the odometry measurement
    /// of the move.
    pub fn step(&mut self, dt_s: f64) -> OdomDelta {
        let forward_m = self.cmd.vx_ms * dt_s;
        let left_m = self.cmd.vy_ms * dt_s;
        let turn_rad = self.cmd.omega_rads * dt_s;

        self.true_pose = self.true_pose.offset(forward_m, left_m, turn_rad);

        let scale = 1.0 + self.params.odom_scale_error;

        OdomDelta {
            forward_m: forward_m * scale,
            left_m: left_m * scale,
            heading_rad: turn_rad + self.params.odom_heading_drift_rads * dt_s,
        }
    }
}

impl DriveActuator for SimDrive {
    fn run_velocity(&mut self, cmd: FieldVelocity) {
        let cmd = cmd.to_robot_relative(self.true_pose.heading_rad);

        // Saturate the linear speed keeping its direction
        let speed_ms = cmd.linear().norm();
        let lin_scale = if speed_ms > self.params.max_linear_vel_ms {
            self.params.max_linear_vel_ms / speed_ms
        } else {
            1.0
        };
        let max_omega = self.params.max_angular_vel_rads;

        self.cmd = FieldVelocity::robot(
            cmd.vx_ms * lin_scale,
            cmd.vy_ms * lin_scale,
            cmd.omega_rads.max(-max_omega).min(max_omega),
        );

        trace!("SimDrive command: {:?}", self.cmd);
    }
}
