//! Application core: the acquisition engine.
//!
//! This module ties the scheduler, parser, window store and daily log
//! into one polling loop. All interaction with the serial line, the wall
//! clock and diagnostics output happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real
//! peripherals.

pub mod engine;
pub mod events;
pub mod ports;
