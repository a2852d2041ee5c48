//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters. All tests run on the host with no serial port
//! or GPIO required.

mod engine_tests;
mod mock_link;
mod persistence_tests;
