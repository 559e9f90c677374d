//! Goal catalog parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::{GoalError, GoalVariant};
use crate::field::Alliance;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for building the goal catalog
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Distance of every goal in front of its landmark, along the landmark's facing direction.
    pub backward_offset_m: f64,

    /// Sideways distance of the left and right goals from the landmark's centre line.
    pub lateral_offset_m: f64,

    /// Rotation of the goal heading relative to the landmark heading. A half turn makes the
    /// vehicle face the landmark.
    pub heading_offset_rad: f64,

    /// Variants generated for every landmark, in catalog order.
    pub variants: Vec<GoalVariant>,

    /// Landmarks which carry goals when playing on the blue alliance.
    pub blue_landmark_ids: Vec<u32>,

    /// Landmarks which carry goals when playing on the red alliance.
    pub red_landmark_ids: Vec<u32>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn landmark_ids(&self, alliance: Alliance) -> &[u32] {
        match alliance {
            Alliance::Blue => &self.blue_landmark_ids,
            Alliance::Red => &self.red_landmark_ids,
        }
    }

    pub fn validate(&self) -> Result<(), GoalError> {
        if !(self.backward_offset_m.is_finite()
            && self.lateral_offset_m.is_finite()
            && self.heading_offset_rad.is_finite())
        {
            return Err(GoalError::InvalidOffsets);
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            backward_offset_m: 0.395,
            lateral_offset_m: 0.165,
            heading_offset_rad: std::f64::consts::PI,
            variants: vec![GoalVariant::Left, GoalVariant::Right],
            blue_landmark_ids: vec![17, 18, 19, 20, 21, 22],
            red_landmark_ids: vec![6, 7, 8, 9, 10, 11],
        }
    }
}
