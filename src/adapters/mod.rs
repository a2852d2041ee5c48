//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                     |
//! |------------|---------------------|---------------------------------|
//! | `serial`   | Transport           | `serialport` device (RS-485)    |
//! | `gpio`     | OutputPin           | sysfs GPIO direction line       |
//! | `sim`      | Transport           | synthetic facility controllers  |
//! | `log_sink` | EventSink           | `log` facade                    |
//! | `time`     | Clock, DelayNs      | host wall clock, thread sleep   |

pub mod gpio;
pub mod log_sink;
pub mod serial;
pub mod sim;
pub mod time;
