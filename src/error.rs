use derive_more::derive::{Display, Error};

/// A specialized `Result` where the error is this crate's `Error` type.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Reasons a calibration profile is rejected.
///
/// Profiles are validated in `const` context, so for the built-in profile these surface at
/// compile time rather than on the device.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[display("calibration span {span} at mark {mark} is not divisible by {divisor}")]
    SpanNotDivisible { mark: u8, span: u16, divisor: u16 },

    #[display("PWM period must be non-zero")]
    ZeroPeriod,

    #[display("zero offset must be non-zero; the meter cannot be driven to literal zero")]
    ZeroOffset,

    #[display("zero offset {zero_offset} plus calibrated travel {travel} exceeds PWM period {period}")]
    SpanExceedsPeriod {
        zero_offset: u16,
        travel: u32,
        period: u16,
    },
}
