//! # Fused pose estimate
//!
//! The fused estimate is driven forward by odometry every cycle and pulled towards vision
//! measurements as they arrive. Vision measurements describe where the vehicle was when the
//! camera sample was captured, which can be a few cycles in the past, so a short history of the
//! estimate is kept. Each measurement is compared against the estimate at its capture time and
//! the resulting correction is applied to everything after it.
//!
//! The size of each correction is set per axis from the odometry and vision uncertainties as
//! `k = q / (q + sqrt(q * r))`, where `q` and `r` are the odometry and vision variances.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{Vector2, Vector3};
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

// Internal
use super::FusedPoseParams;
use comms_if::{
    geom::{normalise_heading, FieldVelocity, Pose2D, VelFrame},
    loc::{PoseSink, PoseSource, StdDevs},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Vehicle motion measured by odometry since the previous update, in the vehicle frame.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct OdomDelta {
    pub forward_m: f64,
    pub left_m: f64,
    pub heading_rad: f64,
}

/// The fused pose estimate.
#[derive(Debug, Clone)]
pub struct FusedPose {
    params: FusedPoseParams,

    pose: Pose2D,

    velocity: FieldVelocity,

    /// Past estimates, oldest first
    history: VecDeque<Sample>,
}

/// A shared handle to the fused pose.
///
/// The estimator writes through the [`PoseSink`] side and the controller reads through the
/// [`PoseSource`] side. All access happens from the main cycle so no locking is needed.
#[derive(Debug, Clone)]
pub struct PoseHandle(Rc<RefCell<FusedPose>>);

#[derive(Debug, Copy, Clone)]
struct Sample {
    time_s: f64,
    pose: Pose2D,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FusedPose {
    /// Create a new estimate starting from the given pose.
    pub fn new(params: FusedPoseParams, initial_pose: Pose2D, time_s: f64) -> Self {
        let mut fused = Self {
            params,
            pose: initial_pose,
            velocity: FieldVelocity::zero(VelFrame::Field),
            history: VecDeque::new(),
        };
        fused.reset(initial_pose, time_s);

        fused
    }

    /// Move the estimate to a known pose, forgetting all history.
    pub fn reset(&mut self, pose: Pose2D, time_s: f64) {
        self.pose = pose;
        self.velocity = FieldVelocity::zero(VelFrame::Field);
        self.history.clear();
        self.history.push_back(Sample { time_s, pose });
    }

    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    /// Field-relative velocity over the last odometry update.
    pub fn velocity(&self) -> FieldVelocity {
        self.velocity
    }

    /// Advance the estimate by an odometry measurement taken at `time_s`.
    pub fn apply_odometry(&mut self, time_s: f64, delta: &OdomDelta) {
        let prev = self.pose;
        self.pose = prev.offset(delta.forward_m, delta.left_m, delta.heading_rad);

        let prev_time_s = self.history.back().map(|s| s.time_s);

        match prev_time_s {
            Some(t) if time_s > t => {
                let dt_s = time_s - t;
                let vel = (self.pose.position_m - prev.position_m) / dt_s;
                self.velocity = FieldVelocity::field(vel[0], vel[1], delta.heading_rad / dt_s);

                self.history.push_back(Sample {
                    time_s,
                    pose: self.pose,
                });
            }
            // Time hasn't moved on, so fold this delta into the latest sample
            _ => {
                if let Some(last) = self.history.back_mut() {
                    last.pose = self.pose;
                }
            }
        }

        // Forget anything too old to be corrected
        let oldest_s = time_s - self.params.history_s;
        while self.history.len() > 1 && self.history[0].time_s < oldest_s {
            self.history.pop_front();
        }
    }

    /// Correct the estimate with a vision measurement of the pose at `timestamp_s`.
    ///
    /// Returns false if the measurement was ignored because it was older than the history or
    /// not finite.
    pub fn add_vision_measurement(
        &mut self,
        pose: Pose2D,
        timestamp_s: f64,
        std_devs: StdDevs,
    ) -> bool {
        if !(timestamp_s.is_finite() && std_devs.is_finite()) {
            return false;
        }

        let then = match self.sample_at(timestamp_s) {
            Some(p) => p,
            None => {
                trace!("Vision measurement at {:.3} s is outside the history", timestamp_s);
                return false;
            }
        };

        let k = self.gains(&std_devs);
        let correction = Vector3::new(
            k[0] * (pose.x() - then.x()),
            k[1] * (pose.y() - then.y()),
            k[2] * normalise_heading(pose.heading_rad - then.heading_rad),
        );

        let shift = |p: &Pose2D| Pose2D {
            position_m: p.position_m + Vector2::new(correction[0], correction[1]),
            heading_rad: normalise_heading(p.heading_rad + correction[2]),
        };

        self.pose = shift(&self.pose);
        for sample in self.history.iter_mut().filter(|s| s.time_s >= timestamp_s) {
            sample.pose = shift(&sample.pose);
        }

        true
    }

    /// Per axis correction gains for a vision measurement with the given uncertainty.
    fn gains(&self, std_devs: &StdDevs) -> Vector3<f64> {
        let odom = self.params.odom_std_devs.as_vector();
        let vision = std_devs.as_vector();
        let q = odom.component_mul(&odom);
        let r = vision.component_mul(&vision);

        Vector3::from_fn(|i, _| {
            if q[i] == 0.0 {
                0.0
            } else {
                q[i] / (q[i] + (q[i] * r[i]).sqrt())
            }
        })
    }

    /// The estimate at the given time, interpolated between history samples.
    fn sample_at(&self, time_s: f64) -> Option<Pose2D> {
        let first = self.history.front()?;
        let last = self.history.back()?;

        if time_s < first.time_s {
            return None;
        }
        if time_s >= last.time_s {
            return Some(last.pose);
        }

        // Find the samples either side of the time
        let after = self.history.iter().position(|s| s.time_s > time_s)?;
        let a = &self.history[after - 1];
        let b = &self.history[after];

        let frac = (time_s - a.time_s) / (b.time_s - a.time_s);
        let position_m = a.pose.position_m + (b.pose.position_m - a.pose.position_m) * frac;
        let heading_rad = a.pose.heading_rad + a.pose.heading_error_to(&b.pose) * frac;

        Some(Pose2D::new(position_m[0], position_m[1], heading_rad))
    }
}

impl PoseHandle {
    pub fn new(fused: FusedPose) -> Self {
        Self(Rc::new(RefCell::new(fused)))
    }

    pub fn apply_odometry(&self, time_s: f64, delta: &OdomDelta) {
        self.0.borrow_mut().apply_odometry(time_s, delta);
    }
}

impl PoseSink for PoseHandle {
    fn fuse_observation(&mut self, pose: Pose2D, timestamp_s: f64, std_devs: StdDevs) {
        self.0
            .borrow_mut()
            .add_vision_measurement(pose, timestamp_s, std_devs);
    }
}

impl PoseSource for PoseHandle {
    fn current_pose(&self) -> Pose2D {
        self.0.borrow().pose()
    }

    fn field_velocity(&self) -> FieldVelocity {
        self.0.borrow().velocity()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DT: f64 = 0.02;

    fn drive_forward(fused: &mut FusedPose, cycles: usize, speed_ms: f64) -> f64 {
        let mut time_s = 0.0;
        for i in 1..=cycles {
            time_s = i as f64 * DT;
            fused.apply_odometry(
                time_s,
                &OdomDelta {
                    forward_m: speed_ms * DT,
                    ..Default::default()
                },
            );
        }
        time_s
    }

    #[test]
    fn test_odometry_and_velocity() {
        let mut fused = FusedPose::new(
            FusedPoseParams::default(),
            Pose2D::from_degrees(1.0, 1.0, 90.0),
            0.0,
        );

        drive_forward(&mut fused, 50, 2.0);

        // Facing +Y, so driving forward moves along +Y
        assert!((fused.pose().y() - 3.0).abs() < 1e-9);
        assert!((fused.pose().x() - 1.0).abs() < 1e-9);
        assert!((fused.velocity().vy_ms - 2.0).abs() < 1e-6);
        assert_eq!(fused.velocity().frame, VelFrame::Field);
    }

    #[test]
    fn test_vision_pulls_towards_measurement() {
        let mut fused = FusedPose::new(FusedPoseParams::default(), Pose2D::default(), 0.0);
        let truth = Pose2D::new(1.0, -0.5, 0.2);

        let mut prev_err = fused.pose().distance_to(&truth);
        for i in 1..=20 {
            let time_s = i as f64 * DT;
            fused.apply_odometry(time_s, &OdomDelta::default());
            assert!(fused.add_vision_measurement(truth, time_s, StdDevs::new(0.5, 0.5, 1.0)));

            let err = fused.pose().distance_to(&truth);
            assert!(err < prev_err);
            prev_err = err;
        }
    }

    #[test]
    fn test_tighter_measurements_correct_more() {
        let start = Pose2D::default();
        let truth = Pose2D::new(1.0, 0.0, 0.0);

        let mut loose = FusedPose::new(FusedPoseParams::default(), start, 0.0);
        loose.add_vision_measurement(truth, 0.0, StdDevs::new(4.0, 4.0, 8.0));

        let mut tight = FusedPose::new(FusedPoseParams::default(), start, 0.0);
        tight.add_vision_measurement(truth, 0.0, StdDevs::new(0.5, 0.5, 1.0));

        assert!(tight.pose().x() > loose.pose().x());
        assert!(loose.pose().x() > 0.0);
    }

    #[test]
    fn test_latency_compensation() {
        let mut fused = FusedPose::new(FusedPoseParams::default(), Pose2D::default(), 0.0);
        let end_time_s = drive_forward(&mut fused, 50, 1.0);
        let before = fused.pose();

        // A measurement from half a second ago which agrees with the history there
        let agrees = Pose2D::new(0.5, 0.0, 0.0);
        let std_devs = StdDevs::new(0.5, 0.5, 1.0);
        assert!(fused.add_vision_measurement(agrees, end_time_s - 0.5, std_devs));
        assert!(fused.pose().distance_to(&before) < 1e-9);

        // Too old to apply
        assert!(!fused.add_vision_measurement(agrees, end_time_s - 2.0, std_devs));
    }

    #[test]
    fn test_heading_correction_wraps() {
        let mut fused = FusedPose::new(
            FusedPoseParams::default(),
            Pose2D::from_degrees(0.0, 0.0, 179.0),
            0.0,
        );

        fused.add_vision_measurement(
            Pose2D::from_degrees(0.0, 0.0, -179.0),
            0.0,
            StdDevs::new(0.5, 0.5, 0.1),
        );

        // Moved towards 180 through the short way
        let err = fused
            .pose()
            .heading_error_to(&Pose2D::from_degrees(0.0, 0.0, -179.0));
        assert!(err.abs() < 2f64.to_radians());
    }

    #[test]
    fn test_handle_shares_state() {
        let mut handle = PoseHandle::new(FusedPose::new(
            FusedPoseParams::default(),
            Pose2D::default(),
            0.0,
        ));
        let reader = handle.clone();

        handle.fuse_observation(Pose2D::new(2.0, 0.0, 0.0), 0.0, StdDevs::new(0.1, 0.1, 0.1));

        assert!(reader.current_pose().x() > 0.0);
    }
}
