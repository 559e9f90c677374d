//! Simulated fiducial camera

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::collections::VecDeque;

use super::CameraParams;
use crate::field::{FieldLayout, Landmark};
use comms_if::{
    eqpt::cam::{CamId, CamSource, FiducialObservation},
    geom::{normalise_heading, Pose2D},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A camera which detects the landmarks in its field of view.
pub struct SimCamera {
    params: CameraParams,

    layout: FieldLayout,

    rng: SmallRng,

    /// Time of the next capture
    next_capture_s: f64,

    /// Sequence number of the next sample
    next_seq: u64,

    /// Captured samples waiting out the latency, with the time they become available
    in_flight: VecDeque<(f64, Vec<FiducialObservation>)>,

    /// Samples ready to be drained
    ready: Vec<FiducialObservation>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimCamera {
    pub fn new(params: CameraParams, layout: FieldLayout, seed: u64) -> Self {
        Self {
            params,
            layout,
            rng: SmallRng::seed_from_u64(seed),
            next_capture_s: 0.0,
            next_seq: 0,
            in_flight: VecDeque::new(),
            ready: Vec::new(),
        }
    }

    /// Advance the camera to `time_s`, capturing if a frame is due and releasing any samples
    /// whose latency has passed.
    pub fn step(&mut self, time_s: f64, true_pose: &Pose2D) {
        if time_s >= self.next_capture_s {
            self.capture(time_s, true_pose);
            self.next_capture_s = time_s + 1.0 / self.params.frame_rate_hz;
        }

        while let Some((available_s, _)) = self.in_flight.front() {
            if *available_s > time_s {
                break;
            }

            if let Some((_, sample)) = self.in_flight.pop_front() {
                self.ready.extend(sample);
            }
        }
    }

    /// Landmarks the camera can see from the given vehicle pose.
    pub fn visible_landmarks(&self, true_pose: &Pose2D) -> Vec<Landmark> {
        let cam_heading_rad = true_pose.heading_rad + self.params.mount_heading_rad;

        self.layout
            .landmarks()
            .filter(|l| {
                let to_landmark = l.field_pose.position_m - true_pose.position_m;
                let range_m = to_landmark.norm();
                let bearing_rad =
                    normalise_heading(to_landmark[1].atan2(to_landmark[0]) - cam_heading_rad);

                // Only the front face of a marker can be detected
                let facing_camera = l.field_pose.forward2().dot(&-to_landmark) > 0.0;

                range_m <= self.params.max_range_m
                    && bearing_rad.abs() <= self.params.fov_rad / 2.0
                    && facing_camera
            })
            .copied()
            .collect()
    }

    fn capture(&mut self, time_s: f64, true_pose: &Pose2D) {
        let visible = self.visible_landmarks(true_pose);
        if visible.is_empty() {
            return;
        }

        let frame_seq = self.next_seq;
        self.next_seq += 1;

        let sample: Vec<FiducialObservation> = visible
            .iter()
            .map(|l| {
                let range_m = l.field_pose.distance_to(true_pose);
                let pos_noise_m = self.params.pos_noise_m * range_m;
                let head_noise_rad = self.params.heading_noise_rad * range_m;

                FiducialObservation {
                    id: l.id,
                    observed_pose: Pose2D::new(
                        true_pose.x() + self.noise(pos_noise_m),
                        true_pose.y() + self.noise(pos_noise_m),
                        true_pose.heading_rad + self.noise(head_noise_rad),
                    ),
                    timestamp_s: time_s,
                    frame_seq,
                }
            })
            .collect();

        trace!(
            "{:?} captured sample {} with {} landmarks",
            self.params.cam_id,
            frame_seq,
            sample.len()
        );

        self.in_flight
            .push_back((time_s + self.params.latency_s, sample));
    }

    /// Uniform noise in `[-amplitude, amplitude)`.
    fn noise(&mut self, amplitude: f64) -> f64 {
        if amplitude > 0.0 {
            self.rng.gen_range(-amplitude..amplitude)
        } else {
            0.0
        }
    }
}

impl CamSource for SimCamera {
    fn cam_id(&self) -> CamId {
        self.params.cam_id
    }

    fn drain_observations(&mut self) -> Vec<FiducialObservation> {
        std::mem::take(&mut self.ready)
    }
}
