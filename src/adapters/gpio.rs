//! Direction-control pin adapters.
//!
//! | Pin         | Use                                                  |
//! |-------------|------------------------------------------------------|
//! | `SysfsPin`  | Linux `/sys/class/gpio` output driving the DE/RE line |
//! | `NoPin`     | transceivers that switch direction automatically     |
//!
//! Both implement [`embedded_hal::digital::OutputPin`] so the serial
//! transport stays generic over how the line is switched.

use core::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};
use log::{debug, info};

const GPIO_ROOT: &str = "/sys/class/gpio";

/// Time udev needs to apply permissions to a freshly exported pin.
const EXPORT_SETTLE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioError(pub io::ErrorKind);

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpio: {}", self.0)
    }
}

impl std::error::Error for GpioError {}

impl digital::Error for GpioError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl From<io::Error> for GpioError {
    fn from(e: io::Error) -> Self {
        Self(e.kind())
    }
}

// ───────────────────────────────────────────────────────────────
// Sysfs output pin
// ───────────────────────────────────────────────────────────────

/// GPIO output through the sysfs interface, exported on open.
pub struct SysfsPin {
    number: u32,
    value: PathBuf,
}

impl SysfsPin {
    /// Export `number` (if needed), configure it as an output and drive it low.
    pub fn open(number: u32) -> Result<Self, GpioError> {
        let base = PathBuf::from(format!("{GPIO_ROOT}/gpio{number}"));
        if !base.exists() {
            fs::write(format!("{GPIO_ROOT}/export"), number.to_string())?;
            thread::sleep(EXPORT_SETTLE);
            debug!("GPIO: exported {}", number);
        }
        // "low" sets the direction to output with an initial low level.
        fs::write(base.join("direction"), "low")?;
        info!("GPIO: pin {} ready as direction control", number);
        Ok(Self {
            number,
            value: base.join("value"),
        })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    fn write_level(&mut self, high: bool) -> Result<(), GpioError> {
        let mut file = OpenOptions::new().write(true).open(&self.value)?;
        file.write_all(if high { b"1" } else { b"0" })?;
        Ok(())
    }
}

impl ErrorType for SysfsPin {
    type Error = GpioError;
}

impl OutputPin for SysfsPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write_level(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write_level(true)
    }
}

// ───────────────────────────────────────────────────────────────
// No-op pin
// ───────────────────────────────────────────────────────────────

/// Placeholder for auto-direction adapters and simulation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Either a real sysfs pin or none, chosen at startup from configuration.
pub enum DirectionPin {
    Sysfs(SysfsPin),
    Auto(NoPin),
}

impl DirectionPin {
    /// `Some(n)` opens sysfs pin `n`; `None` selects automatic direction.
    pub fn from_config(gpio: Option<u32>) -> Result<Self, GpioError> {
        match gpio {
            Some(number) => Ok(Self::Sysfs(SysfsPin::open(number)?)),
            None => Ok(Self::Auto(NoPin)),
        }
    }
}

impl ErrorType for DirectionPin {
    type Error = GpioError;
}

impl OutputPin for DirectionPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        match self {
            Self::Sysfs(pin) => pin.set_low(),
            Self::Auto(_) => Ok(()),
        }
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        match self {
            Self::Sysfs(pin) => pin.set_high(),
            Self::Auto(_) => Ok(()),
        }
    }
}
