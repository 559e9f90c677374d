//! Cyclic module interface
//!
//! Modules which run every cycle of `align_exec` implement `State`. The executable initialises
//! each one once, before the main loop, then calls `proc` every cycle with that cycle's inputs.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use log::info;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// A module processed once per cycle.
pub trait State {
    /// Name used when logging about the module.
    const NAME: &'static str;

    /// Data needed to initialise the module, usually the parameter file path.
    type InitData;
    type InitError;

    type InputData;
    type OutputData;

    /// Per-cycle report, written to the module's archive.
    type StatusReport;
    type ProcError;

    /// Load parameters and open archives in the session. Called once before the first `proc`.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Run one cycle, returning the cycle's output and a report on how it went.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;

    /// Initialise the module, logging once it is ready.
    fn init_logged(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        self.init(init_data, session)?;
        info!("{} init complete", Self::NAME);

        Ok(())
    }
}
