//! # Trapezoid motion profile
//!
//! A one dimensional motion profile limited by a maximum velocity and a maximum acceleration.
//! The profile accelerates at the limit, cruises at the velocity limit, then decelerates at the
//! limit so that it arrives at the goal state. Profiles which start or end with a nonzero
//! velocity are handled by treating them as truncated sections of a full trapezoid which starts
//! and ends at rest.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Velocity and acceleration limits of a profile.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Units: position units/second
    pub max_velocity: f64,

    /// Units: position units/second^2
    pub max_acceleration: f64,
}

/// A point along a profile.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct ProfileState {
    pub position: f64,
    pub velocity: f64,
}

/// A trapezoid motion profile.
#[derive(Debug, Copy, Clone)]
pub struct TrapezoidProfile {
    constraints: Constraints,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Constraints {
    pub fn new(max_velocity: f64, max_acceleration: f64) -> Self {
        Self {
            max_velocity,
            max_acceleration,
        }
    }

    /// True if both limits are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.max_velocity.is_finite()
            && self.max_acceleration.is_finite()
            && self.max_velocity > 0.0
            && self.max_acceleration > 0.0
    }
}

impl ProfileState {
    pub fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }

    /// Flip the state onto the positive direction of travel.
    fn direct(&self, direction: f64) -> Self {
        Self::new(self.position * direction, self.velocity * direction)
    }
}

impl TrapezoidProfile {
    pub fn new(constraints: Constraints) -> Self {
        Self { constraints }
    }

    /// Calculate the state of the profile `t_s` seconds after `current`, on the way to `goal`.
    ///
    /// Once the profile has run its full course the goal is returned exactly, so callers may
    /// compare the result against the goal to find out if the profile has finished.
    pub fn calculate(&self, t_s: f64, current: ProfileState, goal: ProfileState) -> ProfileState {
        let max_vel = self.constraints.max_velocity;
        let max_acc = self.constraints.max_acceleration;

        // All calculations are done as if moving in the positive direction
        let direction = if current.position > goal.position {
            -1.0
        } else {
            1.0
        };
        let mut start = current.direct(direction);
        let end = goal.direct(direction);

        if start.velocity.abs() > max_vel {
            start.velocity = max_vel.copysign(start.velocity);
        }

        // Work out how much of a full (rest to rest) trapezoid has been cut off at each end
        let cutoff_begin_s = start.velocity / max_acc;
        let cutoff_dist_begin = cutoff_begin_s * cutoff_begin_s * max_acc / 2.0;

        let cutoff_end_s = end.velocity / max_acc;
        let cutoff_dist_end = cutoff_end_s * cutoff_end_s * max_acc / 2.0;

        let full_trapezoid_dist =
            cutoff_dist_begin + (end.position - start.position) + cutoff_dist_end;
        let mut accel_time_s = max_vel / max_acc;
        let mut full_speed_dist = full_trapezoid_dist - accel_time_s * accel_time_s * max_acc;

        // A triangular profile which never reaches full speed
        if full_speed_dist < 0.0 {
            accel_time_s = (full_trapezoid_dist / max_acc).sqrt();
            full_speed_dist = 0.0;
        }

        let end_accel_s = accel_time_s - cutoff_begin_s;
        let end_full_speed_s = end_accel_s + full_speed_dist / max_vel;
        let end_decel_s = end_full_speed_s + accel_time_s - cutoff_end_s;

        let result = if t_s < end_accel_s {
            ProfileState::new(
                start.position + (start.velocity + t_s * max_acc / 2.0) * t_s,
                start.velocity + t_s * max_acc,
            )
        } else if t_s < end_full_speed_s {
            ProfileState::new(
                start.position
                    + (start.velocity + end_accel_s * max_acc / 2.0) * end_accel_s
                    + max_vel * (t_s - end_accel_s),
                max_vel,
            )
        } else if t_s <= end_decel_s {
            let time_left_s = end_decel_s - t_s;
            ProfileState::new(
                end.position - (end.velocity + time_left_s * max_acc / 2.0) * time_left_s,
                end.velocity + time_left_s * max_acc,
            )
        } else {
            end
        };

        result.direct(direction)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DT: f64 = 0.02;

    #[test]
    fn test_reaches_goal_exactly() {
        let profile = TrapezoidProfile::new(Constraints::new(1.0, 2.0));
        let goal = ProfileState::new(3.0, 0.0);
        let mut state = ProfileState::default();

        for _ in 0..1000 {
            state = profile.calculate(DT, state, goal);
        }

        assert_eq!(state, goal);
    }

    #[test]
    fn test_respects_limits() {
        let profile = TrapezoidProfile::new(Constraints::new(1.5, 3.0));
        let goal = ProfileState::new(-4.0, 0.0);
        let mut state = ProfileState::default();

        for _ in 0..500 {
            let next = profile.calculate(DT, state, goal);

            assert!(next.velocity.abs() <= 1.5 + 1e-9);
            assert!((next.velocity - state.velocity).abs() <= 3.0 * DT + 1e-9);

            state = next;
        }

        assert_eq!(state, goal);
    }

    #[test]
    fn test_at_goal_stays_at_goal() {
        let profile = TrapezoidProfile::new(Constraints::new(1.0, 1.0));
        let goal = ProfileState::new(0.5, 0.0);

        assert_eq!(profile.calculate(DT, goal, goal), goal);
    }

    #[test]
    fn test_first_step_from_rest() {
        let profile = TrapezoidProfile::new(Constraints::new(2.0, 4.0));
        let next = profile.calculate(DT, ProfileState::new(2.0, 0.0), ProfileState::default());

        // Moving towards zero, so velocity is negative and position has barely changed
        assert!((next.velocity + 4.0 * DT).abs() < 1e-12);
        assert!((next.position - (2.0 - 0.5 * 4.0 * DT * DT)).abs() < 1e-12);
    }
}
