//! Health-monitor acquisition engine.
//!
//! Polls two facility controllers over a shared half-duplex serial line,
//! keeps bounded per-channel history for display consumers and appends
//! every joined sample to a daily CSV log.
//!
//! The modules are exposed for integration testing and for display
//! front-ends that read state through [`EngineHandle`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod persistence;
pub mod protocol;
pub mod scheduler;
pub mod sensors;

pub use app::engine::{Engine, EngineHandle};
pub use config::EngineConfig;
pub use error::{Error, Result};
