//! Alignment control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::*;
use crate::goal::{GoalCatalog, Selection};
use comms_if::{
    geom::{FieldVelocity, Pose2D},
    loc::PoseSource,
};
use util::{
    archive::{Archived, Archiver},
    maths::lin_map_clamped,
    module::State,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Distances below this are treated as being exactly on the goal, where the approach direction
/// is undefined.
const MIN_APPROACH_DIST_M: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct AlignCtrl {
    params: Params,

    /// Executing mode
    mode: AlignCtrlMode,

    /// Provider of the corrected pose, shared with the estimator.
    pose_source: Box<dyn PoseSource>,

    /// The current alignment, if one has been started.
    session: Option<AlignSession>,

    output_cmd: Option<FieldVelocity>,
    report: StatusReport,

    arch_report: Archiver,
}

/// Input data to alignment control.
#[derive(Debug, Copy, Clone)]
pub struct InputData {
    /// Time since the previous call to `proc`.
    pub cycle_period_s: f64,
}

/// The status report containing the errors and controller outputs of the cycle.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Session time the report was produced at
    pub time_s: f64,

    /// Distance from the vehicle to the goal
    pub dist_to_goal_m: f64,

    /// Signed heading error to the goal
    pub head_error_rad: f64,

    /// Fraction of the profile velocity fed forward
    pub ff_scale: f64,

    /// Position of the linear profile setpoint, as a distance from the goal
    pub linear_setpoint_m: f64,

    /// Velocity of the linear profile setpoint
    pub linear_setpoint_ms: f64,

    /// Speed demand along the approach line
    pub linear_dem_ms: f64,

    /// Turn rate demand
    pub angular_dem_rads: f64,

    pub linear_at_goal: bool,
    pub theta_at_goal: bool,

    /// How long both axes have continuously been at the goal
    pub settled_for_s: f64,

    /// True if the alignment is complete
    pub at_goal: bool,
}

/// State for one alignment towards a single goal.
///
/// A session is never reused: starting a new alignment builds a fresh one.
struct AlignSession {
    /// Parameters captured when the session was started.
    params: Params,

    goal: Pose2D,

    profile_mode: ProfileMode,

    linear_ctrl: ProfiledPidController,
    theta_ctrl: ProfiledPidController,

    /// The field position corresponding to the linear setpoint of the last cycle
    last_setpoint_m: Vector2<f64>,

    /// Time both axes have continuously been at the goal, or `None` if they currently are not.
    settled_for_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible modes of execution of AlignCtrl. Each mode is handled by a
/// `mode_xyz` function.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AlignCtrlMode {
    Off,

    /// A session has been started but not yet seeded from the vehicle state.
    Initialising,

    Tracking,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for AlignCtrl {
    const NAME: &'static str = "AlignCtrl";

    type InitData = &'static str;
    type InitError = AlignCtrlError;

    type InputData = InputData;
    type OutputData = Option<FieldVelocity>;
    type StatusReport = StatusReport;
    type ProcError = AlignCtrlError;

    /// Initialise the AlignCtrl module.
    ///
    /// Expected init data is a path to the parameter file.
    fn init(&mut self, params_path: &'static str, session: &Session) -> Result<(), AlignCtrlError> {
        let params: Params =
            util::params::load(params_path).map_err(AlignCtrlError::ParamLoadError)?;
        self.set_params(params)?;

        self.arch_report = Archiver::from_path(session, "align_ctrl/status_report.csv")
            .map_err(AlignCtrlError::ArchiveError)?;

        Ok(())
    }

    /// Process alignment control.
    ///
    /// Produces a robot-relative velocity command while an alignment is running, and no command
    /// otherwise.
    fn proc(
        &mut self,
        input_data: &InputData,
    ) -> Result<(Option<FieldVelocity>, StatusReport), AlignCtrlError> {
        let dt_s = input_data.cycle_period_s;
        if !(dt_s.is_finite() && dt_s > 0.0) {
            return Err(AlignCtrlError::InvalidCyclePeriod(dt_s));
        }

        // Setup cycle data
        self.output_cmd = None;
        self.report = StatusReport {
            time_s: session::get_elapsed_seconds(),
            ..Default::default()
        };

        // Mode execution
        match self.mode {
            AlignCtrlMode::Off => (),
            AlignCtrlMode::Initialising => {
                self.mode_initialise();
                self.mode_track(dt_s);
            }
            AlignCtrlMode::Tracking => self.mode_track(dt_s),
        }

        Ok((self.output_cmd, self.report))
    }
}

impl Archived for AlignCtrl {
    fn write(&mut self) -> Result<(), util::archive::ArchiveError> {
        if self.mode == AlignCtrlMode::Off {
            return Ok(());
        }

        self.arch_report.serialise(self.report)
    }
}

impl AlignCtrl {
    /// Create a new controller reading from the given pose source, using the default
    /// parameters.
    pub fn new(pose_source: Box<dyn PoseSource>) -> Self {
        Self {
            params: Params::default(),
            mode: AlignCtrlMode::Off,
            pose_source,
            session: None,
            output_cmd: None,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
        }
    }

    /// Replace the parameters.
    ///
    /// A running alignment keeps the parameters it was started with, the new ones are used from
    /// the next call to `begin`.
    pub fn set_params(&mut self, params: Params) -> Result<(), AlignCtrlError> {
        params.validate()?;
        self.params = params;

        Ok(())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn mode(&self) -> AlignCtrlMode {
        self.mode
    }

    /// The goal of the running alignment.
    pub fn goal(&self) -> Option<Pose2D> {
        self.session.as_ref().map(|s| s.goal)
    }

    /// Begin aligning onto the given goal.
    ///
    /// Any running alignment is discarded, along with all of its controller state. The new
    /// alignment is seeded from the vehicle's pose and velocity on the next call to `proc`.
    pub fn begin(&mut self, goal: Pose2D, profile_mode: ProfileMode) -> Result<(), AlignCtrlError> {
        if !(goal.x().is_finite() && goal.y().is_finite() && goal.heading_rad.is_finite()) {
            return Err(AlignCtrlError::InvalidGoal);
        }

        if self.session.is_some() {
            debug!("Discarding the current alignment");
        }

        info!(
            "Begin {:?} alignment to ({:.3}, {:.3}, {:.1} deg)",
            profile_mode,
            goal.x(),
            goal.y(),
            goal.heading_rad.to_degrees()
        );

        self.session = Some(AlignSession::new(&self.params, goal, profile_mode));
        self.mode = AlignCtrlMode::Initialising;

        Ok(())
    }

    /// Begin aligning onto the goal in the catalog nearest to the vehicle.
    ///
    /// If the catalog has no suitable goals no alignment is started and the `NoTargets`
    /// selection is returned.
    pub fn begin_nearest(
        &mut self,
        catalog: &GoalCatalog,
        request: AlignRequest,
    ) -> Result<Selection, AlignCtrlError> {
        let pose = self.pose_source.current_pose();
        let selection = catalog.select_nearest(&pose, request.variant);

        match selection {
            Selection::Goal(ref goal) => {
                debug!(
                    "Nearest goal is {:?} of landmark {}",
                    goal.variant, goal.landmark_id
                );
                self.begin(goal.pose, request.mode)?;
            }
            Selection::NoTargets(_) => {
                warn!("No goals matching {:?}, alignment not started", request.variant)
            }
        }

        Ok(selection)
    }

    /// Stop the running alignment. No further commands are produced until `begin` is called.
    pub fn abort(&mut self) {
        if self.session.take().is_some() {
            info!("Alignment aborted");
        }

        self.mode = AlignCtrlMode::Off;
    }

    /// True if the running alignment has settled on its goal.
    pub fn at_goal(&self) -> bool {
        match self.session {
            Some(ref s) => s.is_settled(),
            None => false,
        }
    }

    /// Seed the session from the current vehicle state.
    fn mode_initialise(&mut self) {
        if let Some(ref mut session) = self.session {
            let pose = self.pose_source.current_pose();
            let vel = self
                .pose_source
                .field_velocity()
                .to_field_relative(pose.heading_rad);

            session.initialise(&pose, &vel);
        }

        self.mode = AlignCtrlMode::Tracking;
    }

    /// Calculate the command to move towards the goal.
    fn mode_track(&mut self, dt_s: f64) {
        let session = match self.session {
            Some(ref mut s) => s,
            None => {
                self.mode = AlignCtrlMode::Off;
                return;
            }
        };

        let pose = self.pose_source.current_pose();
        let was_settled = session.is_settled();

        self.output_cmd = Some(session.step(&pose, dt_s, &mut self.report));

        if session.is_settled() && !was_settled {
            info!("Alignment settled at goal");
        }
    }
}

impl AlignSession {
    fn new(params: &Params, goal: Pose2D, profile_mode: ProfileMode) -> Self {
        let limits = params.limits(profile_mode);

        let mut linear_ctrl =
            ProfiledPidController::new(params.linear_k_p, 0.0, params.linear_k_d, limits.linear());
        linear_ctrl.set_tolerance(params.linear_tolerance_m);

        let mut theta_ctrl =
            ProfiledPidController::new(params.theta_k_p, 0.0, params.theta_k_d, limits.angular());
        theta_ctrl.set_tolerance(params.theta_tolerance_rad);
        theta_ctrl.enable_continuous_input(-std::f64::consts::PI, std::f64::consts::PI);

        Self {
            params: params.clone(),
            goal,
            profile_mode,
            linear_ctrl,
            theta_ctrl,
            last_setpoint_m: goal.position_m,
            settled_for_s: None,
        }
    }

    /// Reset both controllers onto the vehicle's current state.
    ///
    /// Only the component of velocity towards the goal is carried into the linear profile, and
    /// velocity away from the goal is ignored.
    fn initialise(&mut self, pose: &Pose2D, field_vel: &FieldVelocity) {
        let to_goal = self.goal.position_m - pose.position_m;
        let dist_m = to_goal.norm();
        let toward = if dist_m > MIN_APPROACH_DIST_M {
            to_goal / dist_m
        } else {
            Vector2::new(1.0, 0.0)
        };

        // Rate of change of the distance to the goal
        let closing_ms = field_vel.linear().dot(&toward);

        self.linear_ctrl.reset(dist_m, (-closing_ms).min(0.0));
        self.theta_ctrl.reset(pose.heading_rad, field_vel.omega_rads);
        self.last_setpoint_m = pose.position_m;
        self.settled_for_s = None;

        debug!(
            "{:?} alignment seeded at {:.3} m, closing at {:.3} m/s",
            self.profile_mode, dist_m, closing_ms
        );
    }

    /// Run one control cycle, returning the robot-relative command.
    fn step(&mut self, pose: &Pose2D, dt_s: f64, report: &mut StatusReport) -> FieldVelocity {
        let away = pose.position_m - self.goal.position_m;
        let dist_m = away.norm();
        let away_unit = if dist_m > MIN_APPROACH_DIST_M {
            away / dist_m
        } else {
            Vector2::new(1.0, 0.0)
        };

        let ff_scale = lin_map_clamped(
            (self.params.ff_min_radius_m, self.params.ff_max_radius_m),
            (0.0, 1.0),
            dist_m,
        );

        // ---- LINEAR ----

        // Move the profile onto where the last setpoint actually lies relative to the goal
        self.linear_ctrl
            .reseed_position((self.last_setpoint_m - self.goal.position_m).norm());

        let mut linear_dem_ms = self.linear_ctrl.setpoint().velocity * ff_scale
            + self.linear_ctrl.calculate(dist_m, 0.0, dt_s);

        let linear_at_goal = self.linear_ctrl.at_goal();
        if linear_at_goal {
            linear_dem_ms = 0.0;
        }

        self.last_setpoint_m =
            self.goal.position_m + away_unit * self.linear_ctrl.setpoint().position;

        // ---- HEADING ----

        let mut angular_dem_rads = self.theta_ctrl.setpoint().velocity * ff_scale
            + self
                .theta_ctrl
                .calculate(pose.heading_rad, self.goal.heading_rad, dt_s);

        let theta_at_goal = self.theta_ctrl.at_goal();
        if theta_at_goal {
            angular_dem_rads = 0.0;
        }

        // ---- SETTLING ----

        self.settled_for_s = if linear_at_goal && theta_at_goal {
            Some(self.settled_for_s.unwrap_or(0.0) + dt_s)
        } else {
            None
        };

        // ---- OUTPUT ----

        // The linear demand is a rate of change of distance, so drive along the line away from
        // the goal
        let lin_vel_ms = away_unit * linear_dem_ms;

        report.dist_to_goal_m = dist_m;
        report.head_error_rad = pose.heading_error_to(&self.goal);
        report.ff_scale = ff_scale;
        report.linear_setpoint_m = self.linear_ctrl.setpoint().position;
        report.linear_setpoint_ms = self.linear_ctrl.setpoint().velocity;
        report.linear_dem_ms = linear_dem_ms;
        report.angular_dem_rads = angular_dem_rads;
        report.linear_at_goal = linear_at_goal;
        report.theta_at_goal = theta_at_goal;
        report.settled_for_s = self.settled_for_s.unwrap_or(0.0);
        report.at_goal = self.is_settled();

        FieldVelocity::field(lin_vel_ms[0], lin_vel_ms[1], angular_dem_rads)
            .to_robot_relative(pose.heading_rad)
    }

    fn is_settled(&self) -> bool {
        match self.settled_for_s {
            Some(t) => t >= self.params.settle_time_s,
            None => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::geom::VelFrame;
    use std::{cell::Cell, rc::Rc};

    const DT: f64 = 0.02;

    #[derive(Clone)]
    struct FakeSource(Rc<Cell<(Pose2D, FieldVelocity)>>);

    impl FakeSource {
        fn at(pose: Pose2D) -> Self {
            Self(Rc::new(Cell::new((pose, FieldVelocity::zero(VelFrame::Field)))))
        }

        fn set(&self, pose: Pose2D, vel: FieldVelocity) {
            self.0.set((pose, vel));
        }

        fn pose(&self) -> Pose2D {
            self.0.get().0
        }
    }

    impl PoseSource for FakeSource {
        fn current_pose(&self) -> Pose2D {
            self.0.get().0
        }

        fn field_velocity(&self) -> FieldVelocity {
            self.0.get().1
        }
    }

    fn tick(ctrl: &mut AlignCtrl) -> FieldVelocity {
        let (cmd, _) = ctrl.proc(&InputData { cycle_period_s: DT }).unwrap();
        cmd.unwrap()
    }

    /// Move the fake vehicle by one cycle of the given robot-relative command.
    fn integrate(source: &FakeSource, cmd: &FieldVelocity) {
        let pose = source.pose();
        let field = cmd.to_field_relative(pose.heading_rad);
        let next = Pose2D::new(
            pose.x() + field.vx_ms * DT,
            pose.y() + field.vy_ms * DT,
            pose.heading_rad + field.omega_rads * DT,
        );
        source.set(next, field);
    }

    #[test]
    fn test_off_produces_no_command() {
        let mut ctrl = AlignCtrl::new(Box::new(FakeSource::at(Pose2D::default())));

        let (cmd, _) = ctrl.proc(&InputData { cycle_period_s: DT }).unwrap();

        assert!(cmd.is_none());
        assert!(!ctrl.at_goal());
    }

    #[test]
    fn test_bad_cycle_period() {
        let mut ctrl = AlignCtrl::new(Box::new(FakeSource::at(Pose2D::default())));

        assert!(matches!(
            ctrl.proc(&InputData { cycle_period_s: 0.0 }),
            Err(AlignCtrlError::InvalidCyclePeriod(_))
        ));
    }

    #[test]
    fn test_settles_when_on_goal() {
        let goal = Pose2D::new(3.0, 2.0, 0.5);
        let mut ctrl = AlignCtrl::new(Box::new(FakeSource::at(goal)));
        ctrl.begin(goal, ProfileMode::Fast).unwrap();

        let cmd = tick(&mut ctrl);
        assert_eq!(cmd.linear().norm(), 0.0);
        assert_eq!(cmd.omega_rads, 0.0);
        assert_eq!(cmd.frame, VelFrame::Robot);
        assert!(!ctrl.at_goal());

        // Settle time is 0.5 s
        for _ in 0..20 {
            tick(&mut ctrl);
        }
        assert!(!ctrl.at_goal());

        for _ in 0..10 {
            tick(&mut ctrl);
        }
        assert!(ctrl.at_goal());
    }

    #[test]
    fn test_outside_tolerance_never_settles() {
        let goal = Pose2D::new(0.0, 0.0, 0.0);
        let mut ctrl = AlignCtrl::new(Box::new(FakeSource::at(Pose2D::new(0.09, 0.0, 0.0))));
        ctrl.begin(goal, ProfileMode::Fast).unwrap();

        for _ in 0..200 {
            let (_, report) = ctrl.proc(&InputData { cycle_period_s: DT }).unwrap();
            assert!(!report.linear_at_goal);
        }

        assert!(!ctrl.at_goal());
    }

    #[test]
    fn test_heading_wraps_short_way() {
        let source = FakeSource::at(Pose2D::from_degrees(1.0, 1.0, -179.0));
        let mut ctrl = AlignCtrl::new(Box::new(source.clone()));
        ctrl.begin(Pose2D::from_degrees(1.0, 1.0, 179.0), ProfileMode::Fast)
            .unwrap();

        let mut max_omega: f64 = 0.0;
        for _ in 0..10 {
            let cmd = tick(&mut ctrl);

            // Turning clockwise through 180 deg is the short way
            assert!(cmd.omega_rads <= 0.0);
            max_omega = max_omega.max(cmd.omega_rads.abs());

            integrate(&source, &cmd);
        }

        // A 2 deg correction on the vehicle's own spot gets no feedforward and only a small
        // feedback demand
        assert!(max_omega > 0.0);
        assert!(max_omega < 0.1);
    }

    #[test]
    fn test_first_command_points_at_goal() {
        let mut ctrl = AlignCtrl::new(Box::new(FakeSource::at(Pose2D::default())));
        ctrl.begin(Pose2D::new(2.0, 0.0, 0.0), ProfileMode::Fast).unwrap();

        let cmd = tick(&mut ctrl);

        assert!(cmd.vx_ms > 0.0);
        assert!(cmd.vy_ms.abs() < 1e-9);
        assert!(cmd.omega_rads.abs() < 1e-9);
    }

    #[test]
    fn test_robot_relative_output() {
        // Vehicle facing +Y with the goal along +X should be commanded to its right
        let mut ctrl = AlignCtrl::new(Box::new(FakeSource::at(Pose2D::from_degrees(
            0.0, 0.0, 90.0,
        ))));
        ctrl.begin(Pose2D::from_degrees(2.0, 0.0, 90.0), ProfileMode::Fast)
            .unwrap();

        tick(&mut ctrl);
        let cmd = tick(&mut ctrl);

        assert_eq!(cmd.frame, VelFrame::Robot);
        assert!(cmd.vy_ms < 0.0);
        assert!(cmd.vx_ms.abs() < 1e-9);
    }

    #[test]
    fn test_closed_loop_converges_smoothly() {
        let source = FakeSource::at(Pose2D::default());
        let goal = Pose2D::from_degrees(3.0, 1.0, 30.0);
        let mut ctrl = AlignCtrl::new(Box::new(source.clone()));
        ctrl.begin(goal, ProfileMode::Fast).unwrap();

        let mut prev = FieldVelocity::zero(VelFrame::Robot);
        let mut num_cycles = 0;
        while !ctrl.at_goal() {
            let cmd = tick(&mut ctrl);

            let jump = (cmd.linear() - prev.linear()).norm();
            assert!(jump < 1.0, "command jumped by {} m/s", jump);
            assert!((cmd.omega_rads - prev.omega_rads).abs() < 1.0);

            integrate(&source, &cmd);
            prev = cmd;

            num_cycles += 1;
            assert!(num_cycles < 750, "alignment did not settle");
        }

        let pose = source.pose();
        assert!(pose.distance_to(&goal) < 0.08);
        assert!(pose.heading_error_to(&goal).abs() < 2f64.to_radians());
    }

    #[test]
    fn test_slow_mode_is_slower() {
        let mut peak = Vec::new();

        for mode in [ProfileMode::Fast, ProfileMode::Slow].iter() {
            let source = FakeSource::at(Pose2D::default());
            let mut ctrl = AlignCtrl::new(Box::new(source.clone()));
            ctrl.begin(Pose2D::new(4.0, 0.0, 0.0), *mode).unwrap();

            let mut max_speed: f64 = 0.0;
            for _ in 0..15 {
                let cmd = tick(&mut ctrl);
                max_speed = max_speed.max(cmd.linear().norm());
                integrate(&source, &cmd);
            }
            peak.push(max_speed);
        }

        assert!(peak[1] < peak[0]);
    }

    #[test]
    fn test_restart_matches_cold_start() {
        let start = Pose2D::new(1.0, 1.0, 0.3);
        let first_goal = Pose2D::new(3.0, -1.0, 1.0);
        let second_goal = Pose2D::new(0.0, 2.5, -2.0);

        // Run the first alignment for a while, then switch goals
        let source = FakeSource::at(start);
        let mut ctrl = AlignCtrl::new(Box::new(source.clone()));
        ctrl.begin(first_goal, ProfileMode::Fast).unwrap();
        for _ in 0..30 {
            let cmd = tick(&mut ctrl);
            integrate(&source, &cmd);
        }
        ctrl.begin(second_goal, ProfileMode::Slow).unwrap();
        let restarted = tick(&mut ctrl);

        // A fresh controller in the same vehicle state
        let fresh_source = FakeSource::at(source.pose());
        fresh_source.set(source.pose(), source.field_velocity());
        let mut fresh = AlignCtrl::new(Box::new(fresh_source));
        fresh.begin(second_goal, ProfileMode::Slow).unwrap();
        let cold = tick(&mut fresh);

        assert_eq!(restarted, cold);
    }

    #[test]
    fn test_approaching_velocity_is_kept() {
        // Vehicle already driving at the goal
        let source = FakeSource::at(Pose2D::default());
        source.set(Pose2D::default(), FieldVelocity::field(1.5, 0.0, 0.0));

        let mut ctrl = AlignCtrl::new(Box::new(source.clone()));
        ctrl.begin(Pose2D::new(3.0, 0.0, 0.0), ProfileMode::Fast).unwrap();
        let (_, moving) = ctrl.proc(&InputData { cycle_period_s: DT }).unwrap();

        // Vehicle driving away from the goal
        source.set(Pose2D::default(), FieldVelocity::field(-1.5, 0.0, 0.0));
        ctrl.begin(Pose2D::new(3.0, 0.0, 0.0), ProfileMode::Fast).unwrap();
        let (_, retreating) = ctrl.proc(&InputData { cycle_period_s: DT }).unwrap();

        assert!(moving.linear_setpoint_ms < -1.0);
        assert!(retreating.linear_setpoint_ms > -0.5);
    }

    #[test]
    fn test_abort() {
        let mut ctrl = AlignCtrl::new(Box::new(FakeSource::at(Pose2D::default())));
        ctrl.begin(Pose2D::new(1.0, 0.0, 0.0), ProfileMode::Fast).unwrap();
        tick(&mut ctrl);

        ctrl.abort();

        let (cmd, _) = ctrl.proc(&InputData { cycle_period_s: DT }).unwrap();
        assert!(cmd.is_none());
        assert!(ctrl.goal().is_none());
        assert_eq!(ctrl.mode(), AlignCtrlMode::Off);
    }

    #[test]
    fn test_begin_nearest_with_no_goals() {
        let mut ctrl = AlignCtrl::new(Box::new(FakeSource::at(Pose2D::new(1.0, 2.0, 0.0))));

        let selection = ctrl
            .begin_nearest(
                &GoalCatalog::default(),
                AlignRequest {
                    variant: None,
                    mode: ProfileMode::Fast,
                },
            )
            .unwrap();

        assert_eq!(selection, Selection::NoTargets(Pose2D::new(1.0, 2.0, 0.0)));
        assert_eq!(ctrl.mode(), AlignCtrlMode::Off);
    }

    #[test]
    fn test_params_apply_to_next_session() {
        let source = FakeSource::at(Pose2D::default());
        let mut ctrl = AlignCtrl::new(Box::new(source.clone()));
        ctrl.begin(Pose2D::new(4.0, 0.0, 0.0), ProfileMode::Fast).unwrap();
        tick(&mut ctrl);

        let mut params = Params::default();
        params.fast.max_linear_vel_ms = 0.5;
        params.fast.max_linear_accel_mss = 1.0;
        ctrl.set_params(params).unwrap();
        assert_eq!(ctrl.params().fast.max_linear_vel_ms, 0.5);

        // Running session still uses the old limits
        let (_, report) = ctrl.proc(&InputData { cycle_period_s: DT }).unwrap();
        assert!((report.linear_setpoint_ms + 2.0 * 9.144 * DT).abs() < 1e-9);

        ctrl.begin(Pose2D::new(4.0, 0.0, 0.0), ProfileMode::Fast).unwrap();
        let (_, report) = ctrl.proc(&InputData { cycle_period_s: DT }).unwrap();
        assert!((report.linear_setpoint_ms + 1.0 * DT).abs() < 1e-9);
    }
}
