//! # Drive Equipment Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::geom::{FieldVelocity, VelFrame};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The drive base actuation layer.
///
/// Implementors are responsible for the kinematics which convert the velocity command into
/// individual drive module demands.
pub trait DriveActuator {
    /// Execute the given velocity command until the next one arrives.
    fn run_velocity(&mut self, cmd: FieldVelocity);

    /// Bring the drive base to a stop.
    fn stop(&mut self) {
        self.run_velocity(FieldVelocity::zero(VelFrame::Robot))
    }
}
