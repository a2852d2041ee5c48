//! Host time adapters.
//!
//! - [`SystemClock`]: local wall clock through `chrono::Local`; frame
//!   timestamps and daily-log dates follow the host's timezone.
//! - [`StdDelay`]: blocking [`DelayNs`] over `std::thread::sleep`, used
//!   for the settle holds around the request byte.

use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use embedded_hal::delay::DelayNs;

use crate::app::ports::Clock;

/// Process-local wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Thread-sleeping delay provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}
