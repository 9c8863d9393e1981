//! Host-level tests for event dispatch: ticks, setting buttons and debounce.

use meter_clock::dispatcher::{DEBOUNCE_WINDOW, HOUR_BUTTON_STEPS, TICK_PERIOD};
use meter_clock::{
    Button, Buttons, Cadence, CalibrationProfile, ClockState, Dispatcher, Event, Ignore, Instant,
    MeterDrive, MeterOutput, Reaction,
};
use fugit::MicrosDurationU64;

const PROFILE: CalibrationProfile = CalibrationProfile::DEFAULT;

fn at_ms(ms: u64) -> Instant {
    Instant::from_ticks(ms * 1_000)
}

/// Simulated timeline standing in for the hardware alarm, driven the way the firmware drives it.
struct Bench {
    dispatcher: Dispatcher,
    cadence: Cadence,
    now: Instant,
    reactions: Vec<Reaction>,
}

impl Bench {
    fn new() -> Self {
        Self {
            dispatcher: Dispatcher::new(PROFILE),
            cadence: Cadence::start(at_ms(0)),
            now: at_ms(0),
            reactions: Vec::new(),
        }
    }

    /// Fires every alarm due up to and including `ms`.
    fn run_until(&mut self, ms: u64) {
        let until = at_ms(ms);
        while self.cadence.deadline() <= until {
            self.now = self.cadence.deadline();
            let reaction = self.dispatcher.dispatch(Event::Timer);
            self.reactions.push(reaction);
            self.cadence.after_timer(self.dispatcher.timer_period());
        }
        self.now = until;
    }

    fn press(&mut self, buttons: Buttons) -> Reaction {
        let reaction = self.dispatcher.dispatch(Event::Buttons(buttons));
        if let Reaction::Pressed { .. } = reaction {
            self.cadence
                .after_press(self.now, self.dispatcher.timer_period());
        }
        self.reactions.push(reaction);
        reaction
    }

    fn clock(&self) -> &ClockState {
        self.dispatcher.clock()
    }
}

#[derive(Default)]
struct RecordingMeter {
    last: Option<MeterDrive>,
    writes: usize,
}

impl MeterOutput for RecordingMeter {
    fn drive(&mut self, drive: MeterDrive) {
        self.last = Some(drive);
        self.writes += 1;
    }
}

#[test]
fn timer_periods() {
    assert_eq!(TICK_PERIOD.to_millis(), 1_000);
    assert_eq!(DEBOUNCE_WINDOW.to_millis(), 250);
    let mut dispatcher = Dispatcher::default();
    assert_eq!(dispatcher.timer_period(), TICK_PERIOD);
    dispatcher.dispatch(Event::Buttons(Buttons::MINUTE));
    assert_eq!(dispatcher.timer_period(), DEBOUNCE_WINDOW);
    assert_eq!(dispatcher.dispatch(Event::Timer), Reaction::Released);
    assert_eq!(dispatcher.timer_period(), TICK_PERIOD);
}

#[test]
fn sixty_seconds_make_one_minute() {
    let mut bench = Bench::new();
    bench.run_until(59_000);
    assert_eq!(bench.clock().minutes_this_hour(), 0);
    assert_eq!(bench.clock().seconds(), 59);
    bench.run_until(60_000);
    assert_eq!(
        bench.reactions.last(),
        Some(&Reaction::Tick { advanced: true })
    );
    assert_eq!(bench.clock().minute_duty(), 133);
    assert_eq!(bench.dispatcher.minute_drive(), MeterDrive { period: 10_000, on: 133 });
    assert_eq!(bench.dispatcher.hour_drive(), MeterDrive { period: 10_000, on: 5 });
}

#[test]
fn minute_button_is_one_step_and_second_reset() {
    let mut bench = Bench::new();
    bench.run_until(30_000);

    let mut expected = ClockState::new(PROFILE);
    for _ in 0..30 {
        expected.tick();
    }
    for _ in 0..PROFILE.minute_button_steps {
        expected.step();
    }
    expected.reset_seconds();

    assert_eq!(
        bench.press(Buttons::MINUTE),
        Reaction::Pressed {
            button: Button::Minute,
            steps: PROFILE.minute_button_steps
        }
    );
    assert_eq!(bench.clock(), &expected);
    assert_eq!(bench.clock().seconds(), 0);
}

#[test]
fn hour_button_is_sixty_steps_and_keeps_seconds() {
    let mut bench = Bench::new();
    bench.run_until(30_000);

    let mut expected = ClockState::new(PROFILE);
    for _ in 0..30 {
        expected.tick();
    }
    for _ in 0..60 {
        expected.step();
    }

    assert_eq!(
        bench.press(Buttons::HOUR),
        Reaction::Pressed {
            button: Button::Hour,
            steps: HOUR_BUTTON_STEPS
        }
    );
    assert_eq!(bench.clock(), &expected);
    assert_eq!(bench.clock().seconds(), 30);
    assert_eq!(bench.clock().hours_this_cycle(), 1);
    assert_eq!(bench.clock().minute_duty(), PROFILE.minute.zero_offset());
}

#[test]
fn press_inside_debounce_window_is_dropped() {
    let mut bench = Bench::new();
    bench.run_until(500);
    bench.press(Buttons::MINUTE);
    let after_first = bench.clock().clone();

    bench.run_until(600);
    assert_eq!(
        bench.press(Buttons::MINUTE),
        Reaction::Ignored(Ignore::Debouncing)
    );
    bench.run_until(740);
    assert_eq!(
        bench.press(Buttons::HOUR),
        Reaction::Ignored(Ignore::Debouncing)
    );
    assert_eq!(bench.clock(), &after_first);

    // Window ends 250 ms after the press
    bench.run_until(750);
    assert_eq!(bench.reactions.last(), Some(&Reaction::Released));
    assert_eq!(bench.dispatcher.timer_period(), TICK_PERIOD);

    bench.run_until(800);
    assert!(matches!(bench.press(Buttons::MINUTE), Reaction::Pressed { .. }));
    assert_eq!(
        bench.clock().minutes_this_hour(),
        2 * PROFILE.minute_button_steps
    );
}

#[test]
fn debounce_expiry_does_not_count_a_second() {
    let mut bench = Bench::new();
    bench.run_until(10_000);
    bench.press(Buttons::MINUTE);
    bench.run_until(10_250);
    assert_eq!(bench.clock().seconds(), 0);
    bench.run_until(11_250);
    assert_eq!(bench.clock().seconds(), 1);
    assert_eq!(
        bench.reactions.last(),
        Some(&Reaction::Tick { advanced: false })
    );
}

#[test]
fn both_buttons_together_do_nothing() {
    let mut bench = Bench::new();
    bench.run_until(5_000);
    let before = bench.clock().clone();

    assert_eq!(bench.press(Buttons::BOTH), Reaction::Ignored(Ignore::Conflict));
    assert_eq!(
        bench.press(Buttons::default()),
        Reaction::Ignored(Ignore::Conflict)
    );
    assert_eq!(bench.clock(), &before);
    assert_eq!(bench.dispatcher.timer_period(), TICK_PERIOD);

    // The regular tick cadence is untouched
    bench.run_until(6_000);
    assert_eq!(bench.clock().seconds(), 6);
}

#[test]
fn only_meter_moving_reactions_ask_for_a_redrive() {
    assert!(Reaction::Tick { advanced: true }.moved_meters());
    assert!(!Reaction::Tick { advanced: false }.moved_meters());
    assert!(!Reaction::Released.moved_meters());
    assert!(!Reaction::Ignored(Ignore::Conflict).moved_meters());
    assert!(Reaction::Pressed {
        button: Button::Hour,
        steps: 60
    }
    .moved_meters());
}

#[test]
fn apply_drives_both_meters() {
    let mut dispatcher = Dispatcher::default();
    let mut minute = RecordingMeter::default();
    let mut hour = RecordingMeter::default();

    dispatcher.apply(&mut minute, &mut hour);
    assert_eq!(minute.last, Some(MeterDrive { period: 10_000, on: 5 }));
    assert_eq!(hour.last, Some(MeterDrive { period: 10_000, on: 5 }));

    // Five minute steps whatever the per-press step count
    for _ in 0..5 / PROFILE.minute_button_steps {
        dispatcher.dispatch(Event::Buttons(Buttons::MINUTE));
        dispatcher.dispatch(Event::Timer);
    }
    dispatcher.apply(&mut minute, &mut hour);
    assert_eq!(dispatcher.clock().minutes_this_hour(), 5);
    assert_eq!(minute.last.map(|drive| drive.on), Some(5 + 640));
    assert_eq!(hour.last.map(|drive| drive.on), Some(67));
    assert_eq!(minute.writes, 2);
    assert_eq!(hour.writes, 2);
    assert_eq!(MeterDrive { period: 10_000, on: 645 }.duty_permille(), 64);
}

#[test]
fn half_day_of_hour_presses_wraps_both_meters() {
    let mut dispatcher = Dispatcher::default();
    for hour in 1..=12u8 {
        dispatcher.dispatch(Event::Buttons(Buttons::HOUR));
        assert_eq!(dispatcher.dispatch(Event::Timer), Reaction::Released);
        assert_eq!(dispatcher.clock().hours_this_cycle(), hour % 12);
    }
    assert_eq!(dispatcher.clock(), &ClockState::new(PROFILE));
}

#[test]
fn late_timer_handlers_do_not_drift_the_tick_cadence() {
    let mut cadence = Cadence::start(at_ms(0));
    let mut dispatcher = Dispatcher::default();
    for _ in 0..3_600 {
        // Each handler runs 700 us after its deadline
        let now = cadence.deadline() + MicrosDurationU64::micros(700);
        assert!(cadence.is_due(now));
        dispatcher.dispatch(Event::Timer);
        cadence.after_timer(dispatcher.timer_period());
    }
    assert_eq!(cadence.deadline(), at_ms(3_601_000));
    assert_eq!(dispatcher.clock().hours_this_cycle(), 1);
    assert_eq!(dispatcher.clock().minutes_this_hour(), 0);
}

#[test]
fn timer_interrupt_pended_before_a_press_is_not_due() {
    let mut cadence = Cadence::start(at_ms(0));
    let mut dispatcher = Dispatcher::default();

    // The 1 s alarm has fired, but the press handler runs first
    let pressed_at = at_ms(1_000) + MicrosDurationU64::micros(20);
    dispatcher.dispatch(Event::Buttons(Buttons::MINUTE));
    let deadline = cadence.after_press(pressed_at, dispatcher.timer_period());
    assert_eq!(deadline, pressed_at + MicrosDurationU64::millis(250));

    let stale = pressed_at + MicrosDurationU64::micros(30);
    assert!(!cadence.is_due(stale));
    assert_eq!(
        dispatcher.dispatch(Event::Buttons(Buttons::HOUR)),
        Reaction::Ignored(Ignore::Debouncing)
    );
    assert!(!cadence.is_due(deadline - MicrosDurationU64::micros(1)));

    assert!(cadence.is_due(deadline));
    assert_eq!(dispatcher.dispatch(Event::Timer), Reaction::Released);
    assert_eq!(
        cadence.after_timer(dispatcher.timer_period()),
        deadline + MicrosDurationU64::millis(1_000)
    );
}

#[cfg(feature = "tuning")]
#[test]
fn tuning_press_lands_on_next_minute_mark() {
    let mut dispatcher = Dispatcher::default();
    assert_eq!(
        dispatcher.dispatch(Event::Buttons(Buttons::MINUTE)),
        Reaction::Pressed {
            button: Button::Minute,
            steps: 5
        }
    );
    let clock = dispatcher.clock();
    assert_eq!(clock.minutes_this_hour(), 5);
    assert_eq!(clock.minute_cal_index().get(), 1);
    assert_eq!(clock.minute_sub_tick(), 0);
    assert_eq!(clock.minute_duty(), 645);
    assert_eq!(clock.hour_duty(), 67);
}
