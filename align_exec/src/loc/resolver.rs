//! Resolution of a camera sample's detections into one candidate pose

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use comms_if::{
    eqpt::cam::{CamId, FiducialObservation},
    geom::Pose2D,
    loc::PoseResolver,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Resolves a sample to the mean of the poses implied by each of its detections.
///
/// Headings are averaged on the circle so that detections either side of +/-pi don't cancel out.
#[derive(Debug, Default, Copy, Clone)]
pub struct MeanResolver;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PoseResolver for MeanResolver {
    fn resolve(&self, _cam_id: CamId, observations: &[FiducialObservation]) -> Option<Pose2D> {
        if observations.is_empty() {
            return None;
        }

        let mut position_sum = Vector2::zeros();
        let mut heading_sum = Vector2::zeros();

        for obs in observations {
            let pose = &obs.observed_pose;
            if !(pose.x().is_finite() && pose.y().is_finite() && pose.heading_rad.is_finite()) {
                return None;
            }

            position_sum += pose.position_m;
            heading_sum += pose.forward2();
        }

        let mean = position_sum / observations.len() as f64;

        Some(Pose2D::new(
            mean[0],
            mean[1],
            heading_sum[1].atan2(heading_sum[0]),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn obs(x: f64, y: f64, heading_deg: f64) -> FiducialObservation {
        FiducialObservation {
            id: 1,
            observed_pose: Pose2D::from_degrees(x, y, heading_deg),
            timestamp_s: 0.0,
            frame_seq: 0,
        }
    }

    #[test]
    fn test_mean() {
        let pose = MeanResolver
            .resolve(CamId::Front, &[obs(1.0, 2.0, 10.0), obs(3.0, 4.0, 30.0)])
            .unwrap();

        assert!((pose.x() - 2.0).abs() < 1e-12);
        assert!((pose.y() - 3.0).abs() < 1e-12);
        assert!((pose.heading_rad - 20f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_heading_across_pi() {
        let pose = MeanResolver
            .resolve(CamId::Back, &[obs(0.0, 0.0, 179.0), obs(0.0, 0.0, -179.0)])
            .unwrap();

        assert!((pose.heading_rad.abs() - PI).abs() < 1e-9);
    }

    #[test]
    fn test_nothing_to_resolve() {
        assert!(MeanResolver.resolve(CamId::Front, &[]).is_none());
        assert!(MeanResolver
            .resolve(CamId::Front, &[obs(std::f64::NAN, 0.0, 0.0)])
            .is_none());
    }
}
