//! Serialized handling of the clock's three trigger sources.
//!
//! The periodic timer and the two setting buttons each become an [`Event`]. Every event is run
//! to completion by [`Dispatcher::dispatch`] before the next one is looked at, which is what
//! keeps a 60-step hour burst atomic with respect to ticks and other presses. The caller owns the
//! hardware; the returned [`Reaction`] tells it what to reconfigure.

use fugit::{MicrosDurationU32, MicrosDurationU64, TimerInstantU64};

use crate::calibration::CalibrationProfile;
use crate::clock::ClockState;
use crate::meter::{self, MeterDrive, MeterOutput};

/// Timer period while counting seconds.
pub const TICK_PERIOD: MicrosDurationU32 = MicrosDurationU32::millis(1_000);

/// Timer period while the buttons are suppressed after a press.
pub const DEBOUNCE_WINDOW: MicrosDurationU32 = MicrosDurationU32::millis(250);

/// Minute steps applied by one hour-button press.
pub const HOUR_BUTTON_STEPS: u8 = 60;

/// Reading of the free-running 1 MHz hardware timer.
pub type Instant = TimerInstantU64<1_000_000>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    Minute,
    Hour,
}

/// Which setting inputs were asserted when the edge interrupt fired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons {
    pub minute: bool,
    pub hour: bool,
}

impl Buttons {
    pub const MINUTE: Self = Self {
        minute: true,
        hour: false,
    };
    pub const HOUR: Self = Self {
        minute: false,
        hour: true,
    };
    pub const BOTH: Self = Self {
        minute: true,
        hour: true,
    };

    /// The pressed button, if exactly one is asserted.
    #[must_use]
    pub const fn single(self) -> Option<Button> {
        match (self.minute, self.hour) {
            (true, false) => Some(Button::Minute),
            (false, true) => Some(Button::Hour),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The periodic timer expired.
    Timer,
    /// A falling edge on one or both setting inputs.
    Buttons(Buttons),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ignore {
    /// The press arrived inside a debounce window.
    Debouncing,
    /// Both buttons (or neither) were asserted.
    Conflict,
}

/// What changed as a result of one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reaction {
    /// A second was counted; `advanced` if it completed a minute.
    Tick { advanced: bool },
    /// The debounce window ended. Inputs are live again and the timer is back to
    /// [`TICK_PERIOD`]. No second is counted for this expiry.
    Released,
    /// A button press was applied. Inputs are suppressed and the timer should be restarted with
    /// [`DEBOUNCE_WINDOW`].
    Pressed { button: Button, steps: u8 },
    Ignored(Ignore),
}

impl Reaction {
    /// True if the duty values may have changed and the meters need re-driving.
    #[must_use]
    pub const fn moved_meters(self) -> bool {
        matches!(self, Self::Tick { advanced: true } | Self::Pressed { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gate {
    Armed,
    Debouncing,
}

/// Owner of the clock state and the only writer to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dispatcher {
    clock: ClockState,
    gate: Gate,
}

impl Dispatcher {
    #[must_use]
    pub const fn new(profile: CalibrationProfile) -> Self {
        Self {
            clock: ClockState::new(profile),
            gate: Gate::Armed,
        }
    }

    /// Runs one event to completion.
    pub fn dispatch(&mut self, event: Event) -> Reaction {
        match (event, self.gate) {
            (Event::Timer, Gate::Armed) => Reaction::Tick {
                advanced: self.clock.tick(),
            },
            (Event::Timer, Gate::Debouncing) => {
                self.gate = Gate::Armed;
                #[cfg(feature = "defmt")]
                defmt::debug!("debounce window over, buttons re-armed");
                Reaction::Released
            }
            (Event::Buttons(_), Gate::Debouncing) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("press ignored: debouncing");
                Reaction::Ignored(Ignore::Debouncing)
            }
            (Event::Buttons(buttons), Gate::Armed) => match buttons.single() {
                Some(button) => self.press(button),
                None => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("press ignored: {}", buttons);
                    Reaction::Ignored(Ignore::Conflict)
                }
            },
        }
    }

    fn press(&mut self, button: Button) -> Reaction {
        let steps = match button {
            Button::Minute => {
                self.clock.reset_seconds();
                self.clock.profile().minute_button_steps
            }
            // Leaves the second counter alone, unlike the minute button.
            Button::Hour => HOUR_BUTTON_STEPS,
        };
        for _ in 0..steps {
            self.clock.step();
        }
        self.gate = Gate::Debouncing;
        #[cfg(feature = "defmt")]
        defmt::info!("{} button: {} minute steps", button, steps);
        Reaction::Pressed { button, steps }
    }

    /// Period the timer should be armed with next.
    #[must_use]
    pub const fn timer_period(&self) -> MicrosDurationU32 {
        match self.gate {
            Gate::Armed => TICK_PERIOD,
            Gate::Debouncing => DEBOUNCE_WINDOW,
        }
    }

    #[must_use]
    pub const fn clock(&self) -> &ClockState {
        &self.clock
    }

    #[must_use]
    pub const fn minute_drive(&self) -> MeterDrive {
        meter::minute_drive(&self.clock)
    }

    #[must_use]
    pub const fn hour_drive(&self) -> MeterDrive {
        meter::hour_drive(&self.clock)
    }

    pub fn apply<M: MeterOutput, H: MeterOutput>(&self, minute: &mut M, hour: &mut H) {
        meter::apply(&self.clock, minute, hour);
    }
}

/// Absolute deadlines for the periodic timer.
///
/// While ticking, each deadline is the previous deadline plus the period, never "now" plus the
/// period, so interrupt latency and handler time do not accumulate into the second count. Only a
/// button press restarts the sequence from the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadence {
    deadline: Instant,
}

impl Cadence {
    /// First deadline one tick period after power-on.
    #[must_use]
    pub fn start(now: Instant) -> Self {
        Self {
            deadline: now + MicrosDurationU64::from(TICK_PERIOD),
        }
    }

    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// False for a timer interrupt left pending after the deadline was moved by a press.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Next deadline after a timer event; `period` is [`Dispatcher::timer_period`] after dispatch.
    pub fn after_timer(&mut self, period: MicrosDurationU32) -> Instant {
        self.deadline = self.deadline + MicrosDurationU64::from(period);
        self.deadline
    }

    /// Restarts the sequence at a press so the debounce window runs from `now`.
    pub fn after_press(&mut self, now: Instant, period: MicrosDurationU32) -> Instant {
        self.deadline = now + MicrosDurationU64::from(period);
        self.deadline
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(CalibrationProfile::DEFAULT)
    }
}
