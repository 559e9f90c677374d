//! # Alignment controllers module
//!
//! This module provides the PID controller and the profiled PID controller used by AlignCtrl.
//! The profiled controller runs the PID loop against a moving setpoint which is advanced along a
//! trapezoid profile towards the goal on every call, rather than against the goal itself.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::profile::{Constraints, ProfileState, TrapezoidProfile};
use util::maths::input_modulus;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Input range which wraps around, if the input is continuous
    continuous_range: Option<(f64, f64)>,

    /// Position error below which the controller is considered at its setpoint
    tolerance: f64,

    /// The most recent error
    error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// A PID controller which tracks a trapezoid profile towards its goal.
#[derive(Debug, Serialize, Clone)]
pub struct ProfiledPidController {
    pid: PidController,

    #[serde(skip)]
    profile: TrapezoidProfile,

    goal: ProfileState,

    setpoint: ProfileState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            continuous_range: None,
            tolerance: 0.05,
            error: None,
            integral: 0f64,
        }
    }

    /// Treat the input as wrapping between `min` and `max`, so that errors are always taken the
    /// short way around.
    pub fn enable_continuous_input(&mut self, min: f64, max: f64) {
        self.continuous_range = Some((min, max));
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    /// Forget all previous errors.
    pub fn reset(&mut self) {
        self.error = None;
        self.integral = 0f64;
    }

    /// Get the output of the controller for the given measurement and setpoint, `dt_s` seconds
    /// after the previous call.
    pub fn calculate(&mut self, measurement: f64, setpoint: f64, dt_s: f64) -> f64 {
        let error = match self.continuous_range {
            Some((min, max)) => {
                let half_range = (max - min) / 2.0;
                input_modulus(setpoint - measurement, -half_range, half_range)
            }
            None => setpoint - measurement,
        };

        // Without a previous error there is nothing to differentiate against, so no derivative
        // is applied on the first call after a reset. This avoids a kick on startup.
        let deriv = match self.error {
            Some(e) if dt_s > 0.0 => (error - e) / dt_s,
            _ => 0f64,
        };

        self.integral += error * dt_s;
        self.error = Some(error);

        self.k_p * error + self.k_i * self.integral + self.k_d * deriv
    }

    /// True if the last error was strictly inside the tolerance.
    ///
    /// A controller which has not yet been given a measurement is never at its setpoint.
    pub fn at_setpoint(&self) -> bool {
        match self.error {
            Some(e) => e.abs() < self.tolerance,
            None => false,
        }
    }

    fn wrap_range(&self) -> Option<(f64, f64)> {
        self.continuous_range
    }
}

impl ProfiledPidController {
    /// Create a new profiled controller.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, constraints: Constraints) -> Self {
        Self {
            pid: PidController::new(k_p, k_i, k_d),
            profile: TrapezoidProfile::new(constraints),
            goal: ProfileState::default(),
            setpoint: ProfileState::default(),
        }
    }

    pub fn enable_continuous_input(&mut self, min: f64, max: f64) {
        self.pid.enable_continuous_input(min, max);
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.pid.set_tolerance(tolerance);
    }

    /// Clear the PID state and restart the profile from the given state.
    pub fn reset(&mut self, position: f64, velocity: f64) {
        self.pid.reset();
        self.setpoint = ProfileState::new(position, velocity);
    }

    /// Move the profile setpoint to a new position, keeping the setpoint velocity and the PID
    /// state.
    pub fn reseed_position(&mut self, position: f64) {
        self.setpoint.position = position;
    }

    pub fn setpoint(&self) -> ProfileState {
        self.setpoint
    }

    /// The goal of the last call to `calculate`, shifted onto the measurement's wrap.
    pub fn goal(&self) -> ProfileState {
        self.goal
    }

    /// Advance the profile by `dt_s` and get the PID output tracking the new setpoint.
    pub fn calculate(&mut self, measurement: f64, goal_position: f64, dt_s: f64) -> f64 {
        self.goal = ProfileState::new(goal_position, 0.0);

        // Shift the goal and setpoint onto the same wrap as the measurement so the profile
        // travels the short way around.
        if let Some((min, max)) = self.pid.wrap_range() {
            let half_range = (max - min) / 2.0;
            self.goal.position =
                input_modulus(self.goal.position - measurement, -half_range, half_range)
                    + measurement;
            self.setpoint.position =
                input_modulus(self.setpoint.position - measurement, -half_range, half_range)
                    + measurement;
        }

        self.setpoint = self.profile.calculate(dt_s, self.setpoint, self.goal);

        self.pid.calculate(measurement, self.setpoint.position, dt_s)
    }

    /// True once the profile has reached the goal and the measurement is within tolerance of it.
    pub fn at_goal(&self) -> bool {
        self.pid.at_setpoint() && self.goal == self.setpoint
    }}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_pid_proportional() {
        let mut pid = PidController::new(2.0, 0.0, 0.0);

        assert!(!pid.at_setpoint());
        assert!((pid.calculate(1.0, 1.5, 0.02) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pid_continuous_takes_short_way() {
        let mut pid = PidController::new(1.0, 0.0, 0.0);
        pid.enable_continuous_input(-PI, PI);

        let out = pid.calculate(179f64.to_radians(), (-179f64).to_radians(), 0.02);

        assert!((out - 2f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_pid_tolerance_is_strict() {
        let mut pid = PidController::new(1.0, 0.0, 0.0);
        pid.set_tolerance(0.5);

        pid.calculate(0.0, 0.25, 0.02);
        assert!(pid.at_setpoint());

        pid.calculate(0.0, 1.0, 0.02);
        assert!(!pid.at_setpoint());
    }

    #[test]
    fn test_profiled_settles_at_goal() {
        let mut ctrl = ProfiledPidController::new(1.0, 0.0, 0.0, Constraints::new(1.0, 2.0));
        ctrl.set_tolerance(0.01);
        ctrl.reset(0.0, 0.0);

        // Measurement follows the setpoint perfectly
        let mut measurement = 0.0;
        for _ in 0..200 {
            ctrl.calculate(measurement, 1.0, 0.02);
            measurement = ctrl.setpoint().position;
        }
        ctrl.calculate(measurement, 1.0, 0.02);

        assert!(ctrl.at_goal());
    }

    #[test]
    fn test_profiled_wraps_through_pi() {
        let mut ctrl = ProfiledPidController::new(1.0, 0.0, 0.0, Constraints::new(1.0, 1.0));
        ctrl.enable_continuous_input(-PI, PI);

        let start = 179f64.to_radians();
        ctrl.reset(start, 0.0);
        ctrl.calculate(start, (-179f64).to_radians(), 0.02);

        // Heading should be increasing through +pi rather than unwinding all the way round
        assert!(ctrl.setpoint().velocity > 0.0);
        assert!((ctrl.goal().position - 181f64.to_radians()).abs() < 1e-9);
    }
}
