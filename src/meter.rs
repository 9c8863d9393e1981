use crate::clock::ClockState;

/// One PWM setting for a meter: the output is high for `on` counts out of every `period`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeterDrive {
    pub period: u16,
    pub on: u16,
}

impl MeterDrive {
    /// Duty cycle in tenths of a percent.
    #[must_use]
    pub const fn duty_permille(self) -> u16 {
        (self.on as u32 * 1000 / self.period as u32) as u16
    }
}

/// A PWM channel wired to a meter coil.
///
/// Implementations only ever receive a `(period, on)` pair; how the hardware produces the edges
/// is their own business.
pub trait MeterOutput {
    fn drive(&mut self, drive: MeterDrive);
}

/// Drive for the minute meter from the current clock state.
#[must_use]
pub const fn minute_drive(clock: &ClockState) -> MeterDrive {
    MeterDrive {
        period: clock.profile().minute.period(),
        on: clock.minute_duty(),
    }
}

/// Drive for the hour meter from the current clock state.
#[must_use]
pub const fn hour_drive(clock: &ClockState) -> MeterDrive {
    MeterDrive {
        period: clock.profile().hour.period(),
        on: clock.hour_duty(),
    }
}

/// Pushes both duty values out to their channels.
pub fn apply<M: MeterOutput, H: MeterOutput>(clock: &ClockState, minute: &mut M, hour: &mut H) {
    minute.drive(minute_drive(clock));
    hour.drive(hour_drive(clock));
}
