#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;
use rtic::app;

use embedded_hal::PwmPin;
use meter_clock::{MeterDrive, MeterOutput};
use rp_pico::hal::pwm::{FreeRunning, Slice, SliceId, ValidSliceMode};

// 125 MHz / 200 / 10_000 counts is roughly 62 Hz at the meter coils.
const PWM_DIV_INT: u8 = 200;

/// A meter coil on channel A of its own PWM slice, so the two periods can differ.
pub struct Meter<I>
where
    I: SliceId,
    FreeRunning: ValidSliceMode<I>,
{
    slice: Slice<I, FreeRunning>,
}

impl<I> Meter<I>
where
    I: SliceId,
    FreeRunning: ValidSliceMode<I>,
{
    /// Takes a slice whose channel A is already routed to the meter pin.
    pub fn new(mut slice: Slice<I, FreeRunning>) -> Self {
        slice.set_div_int(PWM_DIV_INT);
        slice.enable();
        Self { slice }
    }
}

impl<I> MeterOutput for Meter<I>
where
    I: SliceId,
    FreeRunning: ValidSliceMode<I>,
{
    fn drive(&mut self, drive: MeterDrive) {
        self.slice.set_top(drive.period.saturating_sub(1));
        self.slice.channel_a.set_duty(drive.on);
    }
}

#[app(device = rp_pico::hal::pac, peripherals = true, dispatchers = [I2C0_IRQ])]
mod app {
    use embedded_hal::digital::v2::{InputPin, ToggleableOutputPin};
    use meter_clock::{Buttons, Cadence, CalibrationProfile, Dispatcher, Event, Reaction};

    use super::Meter;
    use rp_pico::hal::{
        clocks::init_clocks_and_plls,
        gpio::{
            bank0::{Gpio14, Gpio15, Gpio25},
            FunctionSio, Interrupt, Pin, PullDown, PullUp, SioInput, SioOutput,
        },
        pwm::{Pwm0, Pwm1, Slices},
        sio::Sio,
        timer::{Alarm, Alarm0, Timer},
        watchdog::Watchdog,
    };

    type MinuteButton = Pin<Gpio14, FunctionSio<SioInput>, PullUp>;
    type HourButton = Pin<Gpio15, FunctionSio<SioInput>, PullUp>;
    type Led = Pin<Gpio25, FunctionSio<SioOutput>, PullDown>;

    // Shared resources (accessed by multiple tasks)
    #[shared]
    struct Shared {
        dispatcher: Dispatcher,
        minute_button: MinuteButton,
        hour_button: HourButton,
        alarm: Alarm0,
        timer: Timer,
        cadence: Cadence,
    }

    // Local resources (accessed by single tasks)
    #[local]
    struct Local {
        led: Led,
        minute_meter: Meter<Pwm0>,
        hour_meter: Meter<Pwm1>,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local, init::Monotonics) {
        let mut pac = ctx.device;
        let mut watchdog = Watchdog::new(pac.WATCHDOG);
        let sio = Sio::new(pac.SIO);

        let Ok(clocks) = init_clocks_and_plls(
            rp_pico::XOSC_CRYSTAL_FREQ,
            pac.XOSC,
            pac.CLOCKS,
            pac.PLL_SYS,
            pac.PLL_USB,
            &mut pac.RESETS,
            &mut watchdog,
        ) else {
            defmt::panic!("clock init failed");
        };

        let mut timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
        let Some(mut alarm) = timer.alarm_0() else {
            defmt::panic!("alarm 0 already taken");
        };

        let pins = rp_pico::Pins::new(
            pac.IO_BANK0,
            pac.PADS_BANK0,
            sio.gpio_bank0,
            &mut pac.RESETS,
        );

        let led = pins.led.into_push_pull_output();

        // Setting buttons idle high and pull to ground when pressed
        let minute_button = pins.gpio14.into_pull_up_input();
        let hour_button = pins.gpio15.into_pull_up_input();
        minute_button.set_interrupt_enabled(Interrupt::EdgeLow, true);
        hour_button.set_interrupt_enabled(Interrupt::EdgeLow, true);

        let pwm_slices = Slices::new(pac.PWM, &mut pac.RESETS);
        let mut minute_slice = pwm_slices.pwm0;
        let _minute_pin = minute_slice.channel_a.output_to(pins.gpio0);
        let mut minute_meter = Meter::new(minute_slice);

        let mut hour_slice = pwm_slices.pwm1;
        let _hour_pin = hour_slice.channel_a.output_to(pins.gpio2);
        let mut hour_meter = Meter::new(hour_slice);

        let dispatcher = Dispatcher::new(CalibrationProfile::DEFAULT);
        dispatcher.apply(&mut minute_meter, &mut hour_meter);

        let cadence = Cadence::start(timer.get_counter());
        if alarm.schedule_at(cadence.deadline()).is_err() {
            defmt::panic!("first tick deadline rejected");
        }
        alarm.enable_interrupt();

        defmt::info!(
            "meter clock started: minute {} / hour {} permille",
            dispatcher.minute_drive().duty_permille(),
            dispatcher.hour_drive().duty_permille()
        );

        (
            Shared {
                dispatcher,
                minute_button,
                hour_button,
                alarm,
                timer,
                cadence,
            },
            Local {
                led,
                minute_meter,
                hour_meter,
            },
            init::Monotonics(),
        )
    }

    // Hardware Task: Timer Interrupt (1 Hz, 4 Hz while debouncing)
    #[task(binds = TIMER_IRQ_0, priority = 1, shared = [dispatcher, minute_button, hour_button, alarm, timer, cadence], local = [led])]
    fn timer_fired(ctx: timer_fired::Context) {
        let led = ctx.local.led;
        (
            ctx.shared.dispatcher,
            ctx.shared.minute_button,
            ctx.shared.hour_button,
            ctx.shared.alarm,
            ctx.shared.timer,
            ctx.shared.cadence,
        )
            .lock(|dispatcher, minute_button, hour_button, alarm, timer, cadence| {
                alarm.clear_interrupt();

                // A press can move the deadline after this interrupt was already pended
                if !cadence.is_due(timer.get_counter()) {
                    return;
                }

                let reaction = dispatcher.dispatch(Event::Timer);
                match reaction {
                    Reaction::Tick { .. } => {
                        led.toggle().ok();
                    }
                    Reaction::Released => {
                        // Drop edges latched during the window before listening again
                        minute_button.clear_interrupt(Interrupt::EdgeLow);
                        hour_button.clear_interrupt(Interrupt::EdgeLow);
                        minute_button.set_interrupt_enabled(Interrupt::EdgeLow, true);
                        hour_button.set_interrupt_enabled(Interrupt::EdgeLow, true);
                    }
                    Reaction::Pressed { .. } | Reaction::Ignored(_) => {}
                }

                let next = cadence.after_timer(dispatcher.timer_period());
                if alarm.schedule_at(next).is_err() {
                    defmt::error!("failed to re-arm timer");
                }

                if reaction.moved_meters() {
                    drive_meters::spawn().ok();
                }
            });
    }

    // Hardware Task: GPIO Interrupt (Button Press)
    #[task(binds = IO_IRQ_BANK0, priority = 1, shared = [dispatcher, minute_button, hour_button, alarm, timer, cadence])]
    fn button_pressed(ctx: button_pressed::Context) {
        (
            ctx.shared.dispatcher,
            ctx.shared.minute_button,
            ctx.shared.hour_button,
            ctx.shared.alarm,
            ctx.shared.timer,
            ctx.shared.cadence,
        )
            .lock(|dispatcher, minute_button, hour_button, alarm, timer, cadence| {
                let buttons = Buttons {
                    minute: minute_button.interrupt_status(Interrupt::EdgeLow)
                        || minute_button.is_low().unwrap_or(false),
                    hour: hour_button.interrupt_status(Interrupt::EdgeLow)
                        || hour_button.is_low().unwrap_or(false),
                };
                minute_button.clear_interrupt(Interrupt::EdgeLow);
                hour_button.clear_interrupt(Interrupt::EdgeLow);

                let reaction = dispatcher.dispatch(Event::Buttons(buttons));
                if let Reaction::Pressed { .. } = reaction {
                    // Disable interrupt to prevent bouncing re-entry
                    minute_button.set_interrupt_enabled(Interrupt::EdgeLow, false);
                    hour_button.set_interrupt_enabled(Interrupt::EdgeLow, false);

                    // Restart the timer so the window runs from this press
                    alarm.clear_interrupt();
                    let next = cadence.after_press(timer.get_counter(), dispatcher.timer_period());
                    if alarm.schedule_at(next).is_err() {
                        defmt::error!("failed to arm debounce window");
                    }

                    drive_meters::spawn().ok();
                }
            });
    }

    // Software Task: push new duty values to both meters
    #[task(shared = [dispatcher], local = [minute_meter, hour_meter])]
    fn drive_meters(mut ctx: drive_meters::Context) {
        let minute_meter = ctx.local.minute_meter;
        let hour_meter = ctx.local.hour_meter;
        ctx.shared.dispatcher.lock(|dispatcher| {
            dispatcher.apply(minute_meter, hour_meter);
            defmt::debug!(
                "meters at {} / {} permille",
                dispatcher.minute_drive().duty_permille(),
                dispatcher.hour_drive().duty_permille()
            );
        });
    }
}
