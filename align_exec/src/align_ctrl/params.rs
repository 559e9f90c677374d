//! Alignment control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::{profile::Constraints, AlignCtrlError, ProfileMode};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for alignment control
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Params {
    /// Linear (distance to goal) controller proportional gain
    pub linear_k_p: f64,

    /// Linear controller derivative gain
    pub linear_k_d: f64,

    /// Heading controller proportional gain
    pub theta_k_p: f64,

    /// Heading controller derivative gain
    pub theta_k_d: f64,

    /// Distance below which the linear axis is considered at the goal
    pub linear_tolerance_m: f64,

    /// Heading error below which the heading axis is considered at the goal
    pub theta_tolerance_rad: f64,

    /// How long both axes must continuously be within tolerance before the alignment is
    /// considered complete.
    pub settle_time_s: f64,

    /// Below this distance from the goal no profile feedforward is applied
    pub ff_min_radius_m: f64,

    /// Above this distance from the goal the full profile feedforward is applied
    pub ff_max_radius_m: f64,

    /// Limits used for a normal alignment
    pub fast: ProfileLimits,

    /// Limits used for a precise, low speed alignment
    pub slow: ProfileLimits,
}

/// Motion profile limits for both axes.
#[derive(Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct ProfileLimits {
    pub max_linear_vel_ms: f64,
    pub max_linear_accel_mss: f64,
    pub max_angular_vel_rads: f64,
    pub max_angular_accel_radss: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check that the parameters describe a usable controller.
    pub fn validate(&self) -> Result<(), AlignCtrlError> {
        let positive = [
            ("linear_tolerance_m", self.linear_tolerance_m),
            ("theta_tolerance_rad", self.theta_tolerance_rad),
            ("ff_max_radius_m", self.ff_max_radius_m),
        ];

        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(AlignCtrlError::InvalidParams(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if !(self.settle_time_s.is_finite() && self.settle_time_s >= 0.0) {
            return Err(AlignCtrlError::InvalidParams(format!(
                "settle_time_s must not be negative, got {}",
                self.settle_time_s
            )));
        }

        if self.ff_min_radius_m < 0.0 || self.ff_min_radius_m >= self.ff_max_radius_m {
            return Err(AlignCtrlError::InvalidParams(format!(
                "feedforward radii must satisfy 0 <= min < max, got [{}, {}]",
                self.ff_min_radius_m, self.ff_max_radius_m
            )));
        }

        for mode in [ProfileMode::Fast, ProfileMode::Slow].iter() {
            let limits = self.limits(*mode);
            if !limits.linear().is_valid() || !limits.angular().is_valid() {
                return Err(AlignCtrlError::InvalidParams(format!(
                    "{:?} profile limits must be positive, got {:?}",
                    mode, limits
                )));
            }
        }

        Ok(())
    }

    /// Get the profile limits for the given mode.
    pub fn limits(&self, mode: ProfileMode) -> ProfileLimits {
        match mode {
            ProfileMode::Fast => self.fast,
            ProfileMode::Slow => self.slow,
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            linear_k_p: 3.5,
            linear_k_d: 0.0,
            theta_k_p: 1.4,
            theta_k_d: 0.0,
            linear_tolerance_m: 0.08,
            theta_tolerance_rad: 2f64.to_radians(),
            settle_time_s: 0.5,
            ff_min_radius_m: 0.2,
            ff_max_radius_m: 0.8,
            fast: ProfileLimits {
                max_linear_vel_ms: 2.3622,
                max_linear_accel_mss: 9.144,
                max_angular_vel_rads: 9.6,
                max_angular_accel_radss: 4.8,
            },
            slow: ProfileLimits {
                max_linear_vel_ms: 2.25,
                max_linear_accel_mss: 3.0,
                max_angular_vel_rads: std::f64::consts::FRAC_PI_2,
                max_angular_accel_radss: std::f64::consts::PI,
            },
        }
    }
}

impl ProfileLimits {
    pub fn linear(&self) -> Constraints {
        Constraints::new(self.max_linear_vel_ms, self.max_linear_accel_mss)
    }

    pub fn angular(&self) -> Constraints {
        Constraints::new(self.max_angular_vel_rads, self.max_angular_accel_radss)
    }
}
