//! # Localisation Interface
//!
//! The corrected pose estimate is single writer, multiple reader: only the fiducial pose
//! estimator writes to it through a [`PoseSink`], everything else reads it through a
//! [`PoseSource`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    eqpt::cam::{CamId, FiducialObservation},
    geom::{FieldVelocity, Pose2D},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Standard deviations attached to a pose estimate.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdDevs {
    /// Units: meters
    pub x_m: f64,

    /// Units: meters
    pub y_m: f64,

    /// Units: radians
    pub heading_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Consumer of vision pose measurements.
pub trait PoseSink {
    /// Fuse a vision measurement taken at `timestamp_s` into the running estimate.
    ///
    /// Must not block.
    fn fuse_observation(&mut self, pose: Pose2D, timestamp_s: f64, std_devs: StdDevs);
}

/// Provider of the current corrected vehicle state.
pub trait PoseSource {
    /// The current corrected pose of the vehicle.
    fn current_pose(&self) -> Pose2D;

    /// The current estimate of the vehicle's field-relative velocity.
    fn field_velocity(&self) -> FieldVelocity;
}

/// Resolves one camera sample's detections into a single candidate vehicle pose.
pub trait PoseResolver {
    /// Returns `None` if the detections cannot be resolved into a pose.
    fn resolve(&self, cam_id: CamId, observations: &[FiducialObservation]) -> Option<Pose2D>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StdDevs {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            x_m,
            y_m,
            heading_rad,
        }
    }

    /// Multiply every component by `factor`.
    pub fn scale(&self, factor: f64) -> Self {
        Self::new(
            self.x_m * factor,
            self.y_m * factor,
            self.heading_rad * factor,
        )
    }

    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x_m, self.y_m, self.heading_rad)
    }

    /// True if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x_m.is_finite() && self.y_m.is_finite() && self.heading_rad.is_finite()
    }
}
