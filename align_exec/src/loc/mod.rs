//! # Localisation module
//!
//! Localisation keeps the corrected pose estimate of the vehicle. Odometry advances the estimate
//! every cycle, and fiducial landmark sightings from the cameras pull it back towards the truth.
//!
//! The estimate itself lives in [`FusedPose`], shared with the rest of the executable through a
//! [`PoseHandle`]. The [`VisionMgr`] drains the cameras, turns each new sample into a candidate
//! pose with an uncertainty, and fuses it into the estimate.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod fused_pose;
mod params;
mod resolver;
pub mod vision;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use fused_pose::{FusedPose, OdomDelta, PoseHandle};
pub use params::{FusedPoseParams, Params};
pub use resolver::MeanResolver;
pub use vision::{calc_uncertainty, tag_stats, TagStats, Uncertainty, VisionMgr};

/// Errors which can occur while setting up localisation.
#[derive(Debug, thiserror::Error)]
pub enum LocError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

impl Params {
    /// Check that the parameters describe a usable estimator.
    pub fn validate(&self) -> Result<(), LocError> {
        let std_devs = [
            self.single_tag_std_devs,
            self.multi_tag_std_devs,
            self.fused_pose.odom_std_devs,
        ];

        for s in std_devs.iter() {
            if !s.is_finite() || s.x_m < 0.0 || s.y_m < 0.0 || s.heading_rad < 0.0 {
                return Err(LocError::InvalidParams(format!(
                    "standard deviations must be finite and not negative, got {:?}",
                    s
                )));
            }
        }

        if !(self.dist_scale_divisor_m2 > 0.0 && self.fused_pose.history_s > 0.0) {
            return Err(LocError::InvalidParams(
                "distance divisor and history length must be positive".into(),
            ));
        }

        Ok(())
    }
}
