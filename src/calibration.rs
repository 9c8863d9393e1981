//! Per-unit calibration profile for the two meters.
//!
//! Each meter's travel is split into 12 segments (5-minute marks on the minute meter, hour marks
//! on the hour meter). Every segment carries its own PWM span, which corrects for the meter's
//! nonlinear deflection. Recalibrating a unit means editing [`CalibrationProfile::DEFAULT`] and
//! rebuilding; an invalid edit fails the build.

use crate::error::{Error, Result};

/// Number of calibration marks on either meter.
pub const MARKS: usize = 12;

/// Minute steps between two minute-meter marks.
pub const MINUTE_DIVISOR: u16 = 5;

/// Minute-meter marks between two hour-meter marks.
pub const HOUR_DIVISOR: u16 = 12;

/// Index into a calibration table. Always in `0..12`; advancing past the last mark wraps to 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalIndex(u8);

impl CalIndex {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn advance(self) -> Self {
        Self((self.0 + 1) % MARKS as u8)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Twelve segment spans, each divisible by `DIVISOR` so a segment is covered in equal steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationTable<const DIVISOR: u16> {
    spans: [u16; MARKS],
}

pub type MinuteTable = CalibrationTable<MINUTE_DIVISOR>;
pub type HourTable = CalibrationTable<HOUR_DIVISOR>;

impl<const DIVISOR: u16> CalibrationTable<DIVISOR> {
    /// # Errors
    ///
    /// Returns [`Error::SpanNotDivisible`] for the first span that `DIVISOR` does not divide.
    pub const fn new(spans: [u16; MARKS]) -> Result<Self> {
        let mut mark = 0;
        while mark < MARKS {
            let span = spans[mark];
            if span % DIVISOR != 0 {
                return Err(Error::SpanNotDivisible {
                    mark: mark as u8,
                    span,
                    divisor: DIVISOR,
                });
            }
            mark += 1;
        }
        Ok(Self { spans })
    }

    /// Duty added per step while inside segment `index`.
    #[must_use]
    pub const fn increment(&self, index: CalIndex) -> u16 {
        self.spans[index.get() as usize] / DIVISOR
    }

    /// Duty covered by the full travel of the meter.
    #[must_use]
    pub const fn total(&self) -> u32 {
        let mut total = 0u32;
        let mut mark = 0;
        while mark < MARKS {
            total += self.spans[mark] as u32;
            mark += 1;
        }
        total
    }

    #[must_use]
    pub const fn spans(&self) -> &[u16; MARKS] {
        &self.spans
    }
}

/// PWM setup of one meter: period, the "zero" floor, and its calibration table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeterProfile<const DIVISOR: u16> {
    period: u16,
    zero_offset: u16,
    table: CalibrationTable<DIVISOR>,
}

impl<const DIVISOR: u16> MeterProfile<DIVISOR> {
    /// # Errors
    ///
    /// Rejects a zero period, a zero offset, or a table whose travel plus the offset overruns
    /// the period.
    pub const fn new(period: u16, zero_offset: u16, table: CalibrationTable<DIVISOR>) -> Result<Self> {
        if period == 0 {
            return Err(Error::ZeroPeriod);
        }
        if zero_offset == 0 {
            return Err(Error::ZeroOffset);
        }
        let travel = table.total();
        if zero_offset as u32 + travel > period as u32 {
            return Err(Error::SpanExceedsPeriod {
                zero_offset,
                travel,
                period,
            });
        }
        Ok(Self {
            period,
            zero_offset,
            table,
        })
    }

    #[must_use]
    pub const fn period(&self) -> u16 {
        self.period
    }

    #[must_use]
    pub const fn zero_offset(&self) -> u16 {
        self.zero_offset
    }

    #[must_use]
    pub const fn table(&self) -> &CalibrationTable<DIVISOR> {
        &self.table
    }
}

/// Everything that differs between one physical meter pair and the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationProfile {
    pub minute: MeterProfile<MINUTE_DIVISOR>,
    pub hour: MeterProfile<HOUR_DIVISOR>,
    /// Timer ticks per minute step.
    pub ticks_per_minute: u8,
    /// Minute steps applied per minute-button press.
    pub minute_button_steps: u8,
}

//  min meter                                 5   10   15   20   25   30   35   40   45   50   55   60
const MINUTE_SPANS: [u16; MARKS] = [640, 690, 740, 715, 655, 620, 635, 625, 600, 610, 620, 790];
// Marks 2 and 5 were measured as 796 and 760; stored as the multiples of 12 the meter actually
// reaches, since the per-step increment truncates the remainder away.
//  hr meter                                  1    2    3    4    5    6    7    8    9   10   11   12
const HOUR_SPANS: [u16; MARKS] = [744, 792, 708, 708, 756, 720, 708, 768, 684, 684, 780, 732];

const DEFAULT_MINUTE: MeterProfile<MINUTE_DIVISOR> = match MinuteTable::new(MINUTE_SPANS) {
    Ok(table) => match MeterProfile::new(10_000, 5, table) {
        Ok(profile) => profile,
        Err(_) => panic!("minute meter profile overruns its PWM period"),
    },
    Err(_) => panic!("minute spans must be divisible by 5"),
};

const DEFAULT_HOUR: MeterProfile<HOUR_DIVISOR> = match HourTable::new(HOUR_SPANS) {
    Ok(table) => match MeterProfile::new(10_000, 5, table) {
        Ok(profile) => profile,
        Err(_) => panic!("hour meter profile overruns its PWM period"),
    },
    Err(_) => panic!("hour spans must be divisible by 12"),
};

impl CalibrationProfile {
    /// Calibration of the reference meter pair.
    pub const DEFAULT: Self = Self {
        minute: DEFAULT_MINUTE,
        hour: DEFAULT_HOUR,
        ticks_per_minute: 60,
        minute_button_steps: if cfg!(feature = "tuning") {
            MINUTE_DIVISOR as u8
        } else {
            1
        },
    };
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self::DEFAULT
    }
}
