//! # Vision pose estimation
//!
//! Every camera sample which sees at least one landmark produces a candidate vehicle pose. How
//! far that candidate can be trusted depends mostly on how many known landmarks were seen and how
//! far away they were, so the uncertainty handed to the fused estimate is scaled on both.
//!
//! Camera feeds run independently of the control cycle, so a single drain may return several
//! samples from one camera, or none at all. Each camera keeps a cursor of the last sample it
//! fused, and every newer sample is fused exactly once in capture order.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

// Internal
use super::Params;
use crate::field::FieldLayout;
use comms_if::{
    eqpt::cam::{CamId, CamSource, FiducialObservation},
    geom::Pose2D,
    loc::{PoseResolver, PoseSink, StdDevs},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Manages fusion of camera samples into the pose estimate.
pub struct VisionMgr<R: PoseResolver> {
    params: Params,

    layout: FieldLayout,

    resolver: R,

    /// Sequence number of the last sample processed from each camera
    cursors: HashMap<CamId, u64>,
}

/// Landmark statistics of one camera sample.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct TagStats {
    /// Number of detections of landmarks which are in the field layout
    pub num_tags: usize,

    /// Mean distance from the candidate pose to those landmarks
    pub mean_dist_m: f64,
}

/// Counts of what happened to the camera samples in one cycle.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    pub num_fused: usize,
    pub num_discarded: usize,
    pub num_stale: usize,
    pub num_unresolved: usize,

    /// Samples fused with the coarse default because none of their landmarks are in the layout
    pub num_unmatched: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Trust assigned to a candidate pose.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Uncertainty {
    /// Fuse the candidate with these standard deviations.
    Fuse(StdDevs),

    /// The candidate is too unreliable to fuse.
    Discard,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<R: PoseResolver> VisionMgr<R> {
    pub fn new(params: Params, layout: FieldLayout, resolver: R) -> Self {
        Self {
            params,
            layout,
            resolver,
            cursors: HashMap::new(),
        }
    }

    /// Drain every camera and fuse all new samples into the sink.
    pub fn proc<C: CamSource>(&mut self, cams: &mut [C], sink: &mut dyn PoseSink) -> StatusReport {
        let mut report = StatusReport::default();

        for cam in cams.iter_mut() {
            let observations = cam.drain_observations();
            self.process_camera(cam.cam_id(), observations, sink, &mut report);
        }

        report
    }

    /// Fuse the new samples in one camera's observations.
    ///
    /// Observations are grouped into samples by sequence number. Samples at or before the
    /// camera's cursor have already been handled and are skipped.
    pub fn process_camera(
        &mut self,
        cam_id: CamId,
        observations: Vec<FiducialObservation>,
        sink: &mut dyn PoseSink,
        report: &mut StatusReport,
    ) {
        let mut samples: BTreeMap<u64, Vec<FiducialObservation>> = BTreeMap::new();
        for obs in observations {
            samples.entry(obs.frame_seq).or_default().push(obs);
        }

        for (frame_seq, sample) in samples {
            if let Some(&cursor) = self.cursors.get(&cam_id) {
                if frame_seq <= cursor {
                    trace!("{:?} sample {} already processed", cam_id, frame_seq);
                    report.num_stale += 1;
                    continue;
                }
            }
            self.cursors.insert(cam_id, frame_seq);

            let candidate = match self.resolver.resolve(cam_id, &sample) {
                Some(p) => p,
                None => {
                    debug!("{:?} sample {} could not be resolved", cam_id, frame_seq);
                    report.num_unresolved += 1;
                    continue;
                }
            };

            let stats = tag_stats(&candidate, &sample, &self.layout);

            match calc_uncertainty(&stats, &self.params) {
                Uncertainty::Fuse(std_devs) => {
                    // Every detection in a sample shares the capture time
                    let timestamp_s = sample[0].timestamp_s;

                    if stats.num_tags == 0 {
                        debug!(
                            "{:?} sample {} matched no known landmarks, using default std devs",
                            cam_id, frame_seq
                        );
                        report.num_unmatched += 1;
                    }

                    trace!(
                        "Fusing {:?} sample {} ({} tags at {:.2} m)",
                        cam_id,
                        frame_seq,
                        stats.num_tags,
                        stats.mean_dist_m
                    );

                    sink.fuse_observation(candidate, timestamp_s, std_devs);
                    report.num_fused += 1;
                }
                Uncertainty::Discard => {
                    debug!(
                        "Discarding {:?} sample {}, single tag at {:.2} m",
                        cam_id, frame_seq, stats.mean_dist_m
                    );
                    report.num_discarded += 1;
                }
            }
        }
    }

    /// The last sample processed from the given camera.
    pub fn cursor(&self, cam_id: CamId) -> Option<u64> {
        self.cursors.get(&cam_id).copied()
    }
}

/// Count the known landmarks in a sample and find their mean distance from the candidate pose.
pub fn tag_stats(
    candidate: &Pose2D,
    observations: &[FiducialObservation],
    layout: &FieldLayout,
) -> TagStats {
    let mut num_tags = 0;
    let mut total_dist_m = 0.0;

    for obs in observations {
        if let Some(landmark) = layout.landmark(obs.id) {
            num_tags += 1;
            total_dist_m += candidate.distance_to(&landmark.field_pose);
        }
    }

    let mean_dist_m = if num_tags > 0 {
        total_dist_m / num_tags as f64
    } else {
        0.0
    };

    TagStats {
        num_tags,
        mean_dist_m,
    }
}

/// Decide how much to trust a candidate pose.
///
/// With no known landmarks the single tag uncertainty is used unscaled. A single landmark beyond
/// the distance limit is discarded. Otherwise the single or multi tag uncertainty is scaled up
/// with the square of the mean distance.
pub fn calc_uncertainty(stats: &TagStats, params: &Params) -> Uncertainty {
    if stats.num_tags == 0 {
        return Uncertainty::Fuse(params.single_tag_std_devs);
    }

    let base = if stats.num_tags == 1 {
        if stats.mean_dist_m > params.max_single_tag_dist_m {
            return Uncertainty::Discard;
        }
        params.single_tag_std_devs
    } else {
        params.multi_tag_std_devs
    };

    let scale = 1.0 + stats.mean_dist_m.powi(2) / params.dist_scale_divisor_m2;

    Uncertainty::Fuse(base.scale(scale))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{field::Landmark, loc::MeanResolver};

    /// Sink which records everything fused into it
    #[derive(Default)]
    struct Recorder(Vec<(Pose2D, f64, StdDevs)>);

    impl PoseSink for Recorder {
        fn fuse_observation(&mut self, pose: Pose2D, timestamp_s: f64, std_devs: StdDevs) {
            self.0.push((pose, timestamp_s, std_devs));
        }
    }

    fn layout() -> FieldLayout {
        FieldLayout::new(
            vec![
                Landmark {
                    id: 1,
                    field_pose: Pose2D::new(5.0, 0.0, 0.0),
                },
                Landmark {
                    id: 2,
                    field_pose: Pose2D::new(5.0, 2.0, 0.0),
                },
            ],
            17.548,
            8.052,
        )
        .unwrap()
    }

    fn obs(id: u32, x: f64, frame_seq: u64) -> FiducialObservation {
        FiducialObservation {
            id,
            observed_pose: Pose2D::new(x, 1.0, 0.0),
            timestamp_s: frame_seq as f64 * 0.1,
            frame_seq,
        }
    }

    fn unwrap_fuse(u: Uncertainty) -> StdDevs {
        match u {
            Uncertainty::Fuse(s) => s,
            Uncertainty::Discard => panic!("Expected the estimate to be fused"),
        }
    }

    #[test]
    fn test_more_tags_more_trust() {
        let params = Params::default();

        for dist in [0.5, 1.0, 2.5, 3.9].iter() {
            let one = unwrap_fuse(calc_uncertainty(
                &TagStats {
                    num_tags: 1,
                    mean_dist_m: *dist,
                },
                &params,
            ));
            let two = unwrap_fuse(calc_uncertainty(
                &TagStats {
                    num_tags: 2,
                    mean_dist_m: *dist,
                },
                &params,
            ));

            assert!(two.x_m < one.x_m);
            assert!(two.y_m < one.y_m);
            assert!(two.heading_rad < one.heading_rad);
        }
    }

    #[test]
    fn test_single_tag_distance_limit() {
        let params = Params::default();
        let single = |d: f64| {
            calc_uncertainty(
                &TagStats {
                    num_tags: 1,
                    mean_dist_m: d,
                },
                &params,
            )
        };

        assert_eq!(single(4.01), Uncertainty::Discard);
        assert_eq!(single(10.0), Uncertainty::Discard);

        // Within the limit uncertainty is finite and grows with distance
        let mut prev = unwrap_fuse(single(0.0));
        assert_eq!(prev, params.single_tag_std_devs);
        for i in 1..=40 {
            let next = unwrap_fuse(single(i as f64 * 0.1));
            assert!(next.is_finite());
            assert!(next.x_m > prev.x_m);
            prev = next;
        }

        // Several tags are never discarded for distance
        assert!(matches!(
            calc_uncertainty(
                &TagStats {
                    num_tags: 3,
                    mean_dist_m: 8.0
                },
                &params
            ),
            Uncertainty::Fuse(_)
        ));
    }

    #[test]
    fn test_distance_scaling() {
        let params = Params::default();
        let std_devs = unwrap_fuse(calc_uncertainty(
            &TagStats {
                num_tags: 2,
                mean_dist_m: 3.0,
            },
            &params,
        ));

        // 1 + 9/30
        assert!((std_devs.x_m - 0.5 * 1.3).abs() < 1e-12);
        assert!((std_devs.heading_rad - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_tags_use_coarse_default() {
        let params = Params::default();
        let stats = tag_stats(&Pose2D::default(), &[obs(99, 0.0, 1)], &layout());

        assert_eq!(stats.num_tags, 0);
        assert_eq!(
            calc_uncertainty(&stats, &params),
            Uncertainty::Fuse(params.single_tag_std_devs)
        );
    }

    #[test]
    fn test_unmatched_sample_is_fused_coarsely() {
        let mut mgr = VisionMgr::new(Params::default(), layout(), MeanResolver);
        let mut sink = Recorder::default();
        let mut report = StatusReport::default();

        mgr.process_camera(CamId::Front, vec![obs(99, 2.0, 1)], &mut sink, &mut report);

        assert_eq!(report.num_fused, 1);
        assert_eq!(report.num_unmatched, 1);
        assert_eq!(sink.0[0].2, Params::default().single_tag_std_devs);

        // A matched sample is not counted
        let mut report = StatusReport::default();
        mgr.process_camera(CamId::Front, vec![obs(1, 2.0, 2)], &mut sink, &mut report);
        assert_eq!(report.num_fused, 1);
        assert_eq!(report.num_unmatched, 0);
    }

    #[test]
    fn test_tag_stats() {
        let candidate = Pose2D::new(2.0, 0.0, 0.0);
        let stats = tag_stats(&candidate, &[obs(1, 2.0, 1), obs(99, 2.0, 1)], &layout());

        assert_eq!(stats.num_tags, 1);
        assert!((stats.mean_dist_m - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_each_sample_fused_once_in_order() {
        let mut mgr = VisionMgr::new(Params::default(), layout(), MeanResolver);
        let mut sink = Recorder::default();
        let mut report = StatusReport::default();

        // Two samples, delivered out of order, one with two detections
        let batch = vec![obs(1, 3.0, 5), obs(1, 2.0, 4), obs(2, 2.2, 4)];
        mgr.process_camera(CamId::Front, batch.clone(), &mut sink, &mut report);

        assert_eq!(report.num_fused, 2);
        assert_eq!(mgr.cursor(CamId::Front), Some(5));
        assert!((sink.0[0].1 - 0.4).abs() < 1e-12);
        assert!((sink.0[1].1 - 0.5).abs() < 1e-12);

        // Sample 4 was a multi tag sample at the mean of its detections
        assert!((sink.0[0].0.x() - 2.1).abs() < 1e-12);
        assert!(sink.0[0].2.x_m < sink.0[1].2.x_m);

        // Delivering the same samples again changes nothing
        let mut report = StatusReport::default();
        mgr.process_camera(CamId::Front, batch, &mut sink, &mut report);
        assert_eq!(report.num_fused, 0);
        assert_eq!(report.num_stale, 2);
        assert_eq!(sink.0.len(), 2);

        // Cameras have independent cursors
        let mut report = StatusReport::default();
        mgr.process_camera(CamId::Back, vec![obs(2, 2.0, 1)], &mut sink, &mut report);
        assert_eq!(report.num_fused, 1);
        assert_eq!(mgr.cursor(CamId::Back), Some(1));
    }

    #[test]
    fn test_empty_drain_does_nothing() {
        let mut mgr = VisionMgr::new(Params::default(), layout(), MeanResolver);
        let mut sink = Recorder::default();
        let mut report = StatusReport::default();

        mgr.process_camera(CamId::Front, vec![], &mut sink, &mut report);

        assert!(sink.0.is_empty());
        assert_eq!(mgr.cursor(CamId::Front), None);
    }

    #[test]
    fn test_far_single_tag_is_discarded() {
        let mut mgr = VisionMgr::new(Params::default(), layout(), MeanResolver);
        let mut sink = Recorder::default();
        let mut report = StatusReport::default();

        // Candidate about 9 m from landmark 1
        let far = FiducialObservation {
            id: 1,
            observed_pose: Pose2D::new(14.0, 0.0, 0.0),
            timestamp_s: 0.0,
            frame_seq: 1,
        };
        mgr.process_camera(CamId::Front, vec![far], &mut sink, &mut report);

        assert_eq!(report.num_discarded, 1);
        assert!(sink.0.is_empty());
        assert_eq!(mgr.cursor(CamId::Front), Some(1));
    }
}
