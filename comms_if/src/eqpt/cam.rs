//! # Camera Equipment Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::geom::Pose2D;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single fiducial marker detection from one camera sample.
///
/// The observed pose has already been resolved from the camera frame into the field frame using
/// the fixed camera-to-vehicle transform, i.e. it is the vehicle pose implied by this one
/// detection. Observations are ephemeral and only live for the cycle which drained them.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiducialObservation {
    /// Identifier of the detected marker.
    pub id: u32,

    /// Vehicle pose in the field frame implied by this detection.
    pub observed_pose: Pose2D,

    /// Capture time of the camera sample, in the same timebase as the pose estimator.
    ///
    /// Units: seconds
    pub timestamp_s: f64,

    /// Monotonic sequence number of the camera sample this detection came from. All detections
    /// from the same sample share a sequence number.
    pub frame_seq: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Cameras available on the vehicle
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Hash, Eq, PartialEq)]
pub enum CamId {
    /// The forward facing camera
    Front,

    /// The rearward facing camera
    Back,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of fiducial observations, one per physical camera.
pub trait CamSource {
    /// The camera this source reads from.
    fn cam_id(&self) -> CamId;

    /// Take every observation produced since the last call.
    ///
    /// Must not block, and returns an empty vector if nothing new is available.
    fn drain_observations(&mut self) -> Vec<FiducialObservation>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T: CamSource + ?Sized> CamSource for Box<T> {
    fn cam_id(&self) -> CamId {
        (**self).cam_id()
    }

    fn drain_observations(&mut self) -> Vec<FiducialObservation> {
        (**self).drain_observations()
    }
}
