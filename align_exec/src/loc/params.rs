//! Localisation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use comms_if::loc::StdDevs;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the vision pose estimator
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Base uncertainty of an estimate made from a single landmark
    pub single_tag_std_devs: StdDevs,

    /// Base uncertainty of an estimate made from two or more landmarks
    pub multi_tag_std_devs: StdDevs,

    /// Single landmark estimates made from further away than this are discarded
    pub max_single_tag_dist_m: f64,

    /// Uncertainty grows by a factor of `1 + d^2 / dist_scale_divisor_m2` with the mean distance
    /// `d` to the landmarks.
    pub dist_scale_divisor_m2: f64,

    pub fused_pose: FusedPoseParams,
}

/// Parameters for the fused pose estimate
#[derive(Deserialize, Debug, Clone)]
pub struct FusedPoseParams {
    /// Trust in the odometry, the higher the value the more vision corrections are trusted.
    pub odom_std_devs: StdDevs,

    /// Length of the pose history kept for latency compensation
    pub history_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            single_tag_std_devs: StdDevs::new(4.0, 4.0, 8.0),
            multi_tag_std_devs: StdDevs::new(0.5, 0.5, 1.0),
            max_single_tag_dist_m: 4.0,
            dist_scale_divisor_m2: 30.0,
            fused_pose: FusedPoseParams::default(),
        }
    }
}

impl Default for FusedPoseParams {
    fn default() -> Self {
        Self {
            odom_std_devs: StdDevs::new(0.1, 0.1, 0.1),
            history_s: 1.5,
        }
    }
}
