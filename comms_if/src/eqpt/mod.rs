//! # Equipment Interface
//!
//! This module defines the interface structures and traits shared with the equipment the
//! alignment core consumes from (cameras) and produces for (the drive base).

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod cam;
pub mod drive;
