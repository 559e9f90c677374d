//! # Simulated equipment
//!
//! Stand-ins for the drive base and cameras so that the executable can run a full alignment
//! without hardware. The simulation keeps the true vehicle pose. The drive reports odometry with
//! a scale error and heading drift, and the cameras report noisy landmark sightings after a
//! latency, so the pose estimate has something real to correct.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod camera;
mod drive;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use std::collections::HashSet;

pub use camera::SimCamera;
pub use drive::SimDrive;
use comms_if::eqpt::cam::CamId;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the whole simulation.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Seed for the noise generators
    pub seed: u64,

    /// Offset of the initial pose estimate from the true start pose, as `[x_m, y_m, heading_rad]`
    pub initial_est_error: [f64; 3],

    pub drive: DriveParams,

    pub cameras: Vec<CameraParams>,
}

/// Parameters for the simulated drive base.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveParams {
    /// Commands are saturated at these speeds
    pub max_linear_vel_ms: f64,
    pub max_angular_vel_rads: f64,

    /// Fractional error in the distances reported by odometry
    pub odom_scale_error: f64,

    /// Rate at which the odometry heading drifts away from the truth
    pub odom_heading_drift_rads: f64,
}

/// Parameters for one simulated camera.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraParams {
    pub cam_id: CamId,

    /// Direction the camera points, relative to the vehicle's forward direction
    pub mount_heading_rad: f64,

    /// Full horizontal field of view
    pub fov_rad: f64,

    /// Landmarks further away than this are not detected
    pub max_range_m: f64,

    pub frame_rate_hz: f64,

    /// Time between capture and the sample becoming available
    pub latency_s: f64,

    /// Noise on the pose implied by a detection at 1 m, growing linearly with range
    pub pos_noise_m: f64,
    pub heading_noise_rad: f64,
}

/// Errors in the simulation setup.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Camera {0:?} is configured more than once")]
    DuplicateCamera(CamId),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the simulation can be built from these parameters.
    ///
    /// Camera samples are tracked per `CamId`, so each id may only be used by one camera.
    pub fn validate(&self) -> Result<(), SimError> {
        let mut seen = HashSet::new();

        for cam in self.cameras.iter() {
            if !seen.insert(cam.cam_id) {
                return Err(SimError::DuplicateCamera(cam.cam_id));
            }

            if !(cam.frame_rate_hz.is_finite() && cam.frame_rate_hz > 0.0) {
                return Err(SimError::InvalidParams(format!(
                    "{:?} frame rate must be positive, got {}",
                    cam.cam_id, cam.frame_rate_hz
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn camera(cam_id: CamId) -> CameraParams {
        CameraParams {
            cam_id,
            mount_heading_rad: 0.0,
            fov_rad: 1.2,
            max_range_m: 6.0,
            frame_rate_hz: 30.0,
            latency_s: 0.04,
            pos_noise_m: 0.01,
            heading_noise_rad: 0.005,
        }
    }

    fn params(cameras: Vec<CameraParams>) -> Params {
        Params {
            seed: 1,
            initial_est_error: [0.0; 3],
            drive: DriveParams {
                max_linear_vel_ms: 4.5,
                max_angular_vel_rads: 10.0,
                odom_scale_error: 0.0,
                odom_heading_drift_rads: 0.0,
            },
            cameras,
        }
    }

    #[test]
    fn test_duplicate_cameras_rejected() {
        assert!(params(vec![camera(CamId::Front), camera(CamId::Back)])
            .validate()
            .is_ok());

        assert!(matches!(
            params(vec![camera(CamId::Front), camera(CamId::Front)]).validate(),
            Err(SimError::DuplicateCamera(CamId::Front))
        ));
    }

    #[test]
    fn test_zero_frame_rate_rejected() {
        let mut cam = camera(CamId::Back);
        cam.frame_rate_hz = 0.0;

        assert!(matches!(
            params(vec![cam]).validate(),
            Err(SimError::InvalidParams(_))
        ));
    }
}
