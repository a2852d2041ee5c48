//! Half-duplex polling protocol.
//!
//! ```text
//!   engine ──'1'──▶ line ──▶ facility 1 ──"1A.. B.. K.. U.."──▶ engine
//!   engine ──'2'──▶ line ──▶ facility 2 ──"2A.. B.. K.. U.."──▶ engine
//! ```
//!
//! The engine raises the direction line only while it sends the one-byte
//! request; both controllers answer on the same wire.

pub mod frame;
pub mod transport;
