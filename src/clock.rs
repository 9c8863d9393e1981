use crate::calibration::{CalIndex, CalibrationProfile, HOUR_DIVISOR, MARKS, MINUTE_DIVISOR};

const MINUTES_PER_HOUR: u8 = 60;
const HOURS_PER_CYCLE: u8 = MARKS as u8;

/// Shared state for the clock: the second counter plus both meters' duty accumulators.
///
/// Starts at the meters' zero position on power-on and is never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClockState {
    profile: CalibrationProfile,
    secs: u8,
    m_on: u16,
    m_tick: u8,
    m_index: CalIndex,
    m_cntr: u8,
    h_on: u16,
    h_tick: u8,
    h_index: CalIndex,
    h_cntr: u8,
}

impl ClockState {
    #[must_use]
    pub const fn new(profile: CalibrationProfile) -> Self {
        Self {
            secs: 0,
            m_on: profile.minute.zero_offset(),
            m_tick: 0,
            m_index: CalIndex::ZERO,
            m_cntr: 0,
            h_on: profile.hour.zero_offset(),
            h_tick: 0,
            h_index: CalIndex::ZERO,
            h_cntr: 0,
            profile,
        }
    }

    /// Counts one second. Returns true if a minute step was applied.
    pub fn tick(&mut self) -> bool {
        self.secs += 1;
        if self.secs >= self.profile.ticks_per_minute {
            self.advance_one_minute();
            return true;
        }
        false
    }

    /// One minute step followed by a second-counter reset.
    pub fn advance_one_minute(&mut self) {
        self.step();
        self.secs = 0;
    }

    pub fn reset_seconds(&mut self) {
        self.secs = 0;
    }

    /// Advances both meters by one calibrated minute.
    ///
    /// The minute meter moves every call; the hour meter moves once per 5-minute mark. The minute
    /// meter returns to zero after 60 calls and the hour meter after 12 hours.
    pub fn step(&mut self) {
        self.m_tick += 1;
        self.m_cntr += 1;
        self.m_on += self.profile.minute.table().increment(self.m_index);

        if u16::from(self.m_tick) == MINUTE_DIVISOR {
            self.m_index = self.m_index.advance();
            self.m_tick = 0;
            self.h_tick += 1;
            self.h_on += self.profile.hour.table().increment(self.h_index);
        }

        if u16::from(self.h_tick) == HOUR_DIVISOR {
            self.h_index = self.h_index.advance();
            self.h_tick = 0;
        }

        if self.m_cntr >= MINUTES_PER_HOUR {
            self.m_on = self.profile.minute.zero_offset();
            self.m_index = CalIndex::ZERO;
            self.m_tick = 0;
            self.m_cntr = 0;
            self.h_tick = 0;
            self.h_cntr += 1;
            #[cfg(feature = "defmt")]
            defmt::info!("hour boundary: hours this cycle = {}", self.h_cntr);
        }

        if self.h_cntr >= HOURS_PER_CYCLE {
            self.h_on = self.profile.hour.zero_offset();
            self.h_index = CalIndex::ZERO;
            self.h_cntr = 0;
            #[cfg(feature = "defmt")]
            defmt::info!("12-hour boundary: hour meter back to zero");
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("step: m_on={} h_on={}", self.m_on, self.h_on);
    }

    #[must_use]
    pub const fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    #[must_use]
    pub const fn seconds(&self) -> u8 {
        self.secs
    }

    /// Minute-meter PWM on-duration.
    #[must_use]
    pub const fn minute_duty(&self) -> u16 {
        self.m_on
    }

    /// Hour-meter PWM on-duration.
    #[must_use]
    pub const fn hour_duty(&self) -> u16 {
        self.h_on
    }

    #[must_use]
    pub const fn minute_sub_tick(&self) -> u8 {
        self.m_tick
    }

    #[must_use]
    pub const fn hour_sub_tick(&self) -> u8 {
        self.h_tick
    }

    #[must_use]
    pub const fn minute_cal_index(&self) -> CalIndex {
        self.m_index
    }

    #[must_use]
    pub const fn hour_cal_index(&self) -> CalIndex {
        self.h_index
    }

    #[must_use]
    pub const fn minutes_this_hour(&self) -> u8 {
        self.m_cntr
    }

    #[must_use]
    pub const fn hours_this_cycle(&self) -> u8 {
        self.h_cntr
    }
}

impl Default for ClockState {
    fn default() -> Self {
        Self::new(CalibrationProfile::DEFAULT)
    }
}
