//! # Geometry Types
//!
//! The field frame has its origin in the blue alliance corner of the field, with X running along
//! the length of the field, Y across it and Z upwards. Headings are measured counter-clockwise
//! from the +X axis.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A position and heading in the field frame.
///
/// Used for the vehicle pose, landmark poses and goal poses.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2D {
    /// Position in the field frame.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Heading, normalised into (-pi, pi].
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// A linear and angular velocity, tagged with the frame it is expressed in.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldVelocity {
    /// Velocity along the frame's X axis.
    ///
    /// Units: meters/second
    pub vx_ms: f64,

    /// Velocity along the frame's Y axis.
    ///
    /// Units: meters/second
    pub vy_ms: f64,

    /// Angular rate about Z, counter-clockwise positive.
    ///
    /// Units: radians/second
    pub omega_rads: f64,

    /// The frame the linear components are expressed in.
    pub frame: VelFrame,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reference frame of a [`FieldVelocity`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VelFrame {
    /// Linear components along the field X and Y axes.
    Field,

    /// Linear components along the vehicle's forward and left axes.
    Robot,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose2D {
    /// Create a new pose, normalising the heading.
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad: normalise_heading(heading_rad),
        }
    }

    /// Create a new pose with the heading given in degrees.
    pub fn from_degrees(x_m: f64, y_m: f64, heading_deg: f64) -> Self {
        Self::new(x_m, y_m, heading_deg.to_radians())
    }

    pub fn x(&self) -> f64 {
        self.position_m[0]
    }

    pub fn y(&self) -> f64 {
        self.position_m[1]
    }

    /// Unit vector pointing along the pose's heading.
    pub fn forward2(&self) -> Vector2<f64> {
        Vector2::new(self.heading_rad.cos(), self.heading_rad.sin())
    }

    /// Unit vector pointing to the left of the pose's heading.
    pub fn left2(&self) -> Vector2<f64> {
        Vector2::new(-self.heading_rad.sin(), self.heading_rad.cos())
    }

    /// Straight line distance between the two positions. Heading is ignored.
    pub fn distance_to(&self, other: &Pose2D) -> f64 {
        (other.position_m - self.position_m).norm()
    }

    /// Signed shortest angle which takes this heading onto the other pose's heading.
    pub fn heading_error_to(&self, other: &Pose2D) -> f64 {
        normalise_heading(other.heading_rad - self.heading_rad)
    }

    /// Move the pose within its own frame and then rotate it.
    ///
    /// `forward_m` is applied along the pose's heading and `left_m` perpendicular to it, after
    /// which `heading_offset_rad` is added to the heading.
    pub fn offset(&self, forward_m: f64, left_m: f64, heading_offset_rad: f64) -> Self {
        let position_m = self.position_m + self.forward2() * forward_m + self.left2() * left_m;

        Self {
            position_m,
            heading_rad: normalise_heading(self.heading_rad + heading_offset_rad),
        }
    }
}

impl FieldVelocity {
    /// A field-relative velocity.
    pub fn field(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
            frame: VelFrame::Field,
        }
    }

    /// A robot-relative velocity.
    pub fn robot(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
            frame: VelFrame::Robot,
        }
    }

    /// A zero velocity in the given frame.
    pub fn zero(frame: VelFrame) -> Self {
        Self {
            vx_ms: 0.0,
            vy_ms: 0.0,
            omega_rads: 0.0,
            frame,
        }
    }

    /// The linear components as a vector in this velocity's frame.
    pub fn linear(&self) -> Vector2<f64> {
        Vector2::new(self.vx_ms, self.vy_ms)
    }

    /// Express the velocity in the vehicle's frame, given the vehicle heading.
    pub fn to_robot_relative(&self, heading_rad: f64) -> Self {
        match self.frame {
            VelFrame::Robot => *self,
            VelFrame::Field => {
                let v = Rotation2::new(-heading_rad) * self.linear();
                Self::robot(v[0], v[1], self.omega_rads)
            }
        }
    }

    /// Express the velocity in the field frame, given the vehicle heading.
    pub fn to_field_relative(&self, heading_rad: f64) -> Self {
        match self.frame {
            VelFrame::Field => *self,
            VelFrame::Robot => {
                let v = Rotation2::new(heading_rad) * self.linear();
                Self::field(v[0], v[1], self.omega_rads)
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Normalise an angle into the range (-pi, pi].
pub fn normalise_heading(angle_rad: f64) -> f64 {
    let wrapped = (angle_rad + PI).rem_euclid(TAU) - PI;

    if wrapped <= -PI {
        PI
    } else {
        wrapped
    }
}
