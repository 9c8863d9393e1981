//! Calibrated analog clock driven through two moving-coil meters.
//!
//! A minute meter and an hour meter are deflected by PWM. Once per minute the duty values are
//! advanced by per-segment calibrated amounts, so each meter's nonlinear response lands the
//! needle on its printed marks.
#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod calibration;
pub mod clock;
pub mod dispatcher;
mod error;
pub mod meter;

pub use calibration::{CalIndex, CalibrationProfile};
pub use clock::ClockState;
pub use dispatcher::{Button, Buttons, Cadence, Dispatcher, Event, Ignore, Instant, Reaction};
pub use error::{Error, Result};
pub use meter::{MeterDrive, MeterOutput};
