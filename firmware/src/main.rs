// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # dcservo firmware
//!
//! Board support for the servo core on a NUCLEO-F767ZI with a DRV8873 H-bridge.
//!
//! | Context | Handler | Priority | State |
//! | ------- | ------- | -------- | ----- |
//! | Encoder edges | `EXTI3`, `EXTI4` | highest | `TICKS` through `EDGE_A` / `EDGE_B` |
//! | Control cycle, reset | `TIM6_DAC` | below the edges | control task, drains `TICKS`, reads `SETTINGS` |
//! | Console RX | `USART3` | below the control cycle | receive queue producer |
//! | Thread mode | `main` loop | lowest | parser, console, telemetry consumer |
//!
//! The control task and the RX producer are handed to their interrupts once, through `CONTROL`
//! and `RX`, and owned there afterwards. Nothing masks the edge interrupts while a cycle runs.
//!
//! Flash the board:
//!
//! ```bash
//! cargo run --release
//! ```

#![no_main]
#![no_std]

use core::cell::RefCell;

use cortex_m::interrupt::{free, Mutex};
use cortex_m::peripheral::NVIC;
use cortex_m_rt::entry;
use defmt_rtt as _;
use heapless::spsc::{Producer, Queue};
use panic_halt as _;
use portable_atomic::{AtomicBool, Ordering};

use hal::{
    gpio::{gpioa, Alternate},
    pac::{self, interrupt, Interrupt},
    prelude::*,
    serial::{Config, Serial},
    spi::{Mode, Phase, Polarity, Spi},
};
use stm32f7xx_hal as hal;

use dcservo::{
    config,
    control::{ControlLoop, LoopError, PeriodicTask, Scheduler},
    encoder::{Channel, EdgeHandler, TickAccumulator},
    motor::{self, Telemetry},
    protocol::{Console, Parser, Reply},
    state::Settings,
};

mod drivers;
mod hw;
use drivers::{drv8873::ControlPins, Drv8873};
use hw::{
    encoder,
    pins::IPROPI_CHANNEL,
    timer,
    usart::{self, RxItem, RxSink},
    Adc, BoardPins, ControlTimer, EncoderInputs, EncoderPort, Led, Pwm, SpiDevice, Usart,
};

/// H-bridge switching frequency, above the audible range.
const PWM_FREQUENCY_HZ: u32 = 20_000;

/// Current-sense settle time after bring-up.
const SETTLE_MS: u32 = 10;

/// Telemetry samples buffered between the control interrupt and the console.
const TELEMETRY_DEPTH: usize = 16;

// NVIC priorities, upper four bits significant, lower value preempts
const PRIO_ENCODER: u8 = 0x00;
const PRIO_CONTROL: u8 = 0x40;
const PRIO_CONSOLE: u8 = 0x80;

type Spi1Pins = (
    gpioa::PA5<Alternate<5>>,
    gpioa::PA6<Alternate<5>>,
    gpioa::PA7<Alternate<5>>,
);
type Motor = Drv8873<pac::SPI1, Spi1Pins, 'C', 3>;
type RxQueue = Queue<RxItem, { usart::RX_DEPTH }>;
type TelemetryQueue = Queue<f32, TELEMETRY_DEPTH>;

// Encoder edge path: handlers only reach the accumulator
static TICKS: TickAccumulator = TickAccumulator::new();
static EDGE_A: EdgeHandler<'static> = EdgeHandler::new(Channel::A, &TICKS);
static EDGE_B: EdgeHandler<'static> = EdgeHandler::new(Channel::B, &TICKS);

// Console-owned values, read by the control cycle
static SETTINGS: Settings = Settings::new();

static SCHEDULER: Scheduler = Scheduler::new(config::CADENCE);
static CONTROL: Mutex<RefCell<Option<ControlTask>>> = Mutex::new(RefCell::new(None));
static RX: Mutex<RefCell<Option<RxSink<{ usart::RX_DEPTH }>>>> = Mutex::new(RefCell::new(None));

/// Set by the control cycle when the driver reports a fault.
static FAULTED: AtomicBool = AtomicBool::new(false);

/// Set by the console, cleared by `TIM6_DAC` once the loop is reset.
static RESET_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Telemetry sink feeding the console through an SPSC queue. Drops samples when full.
struct QueueTelemetry(Producer<'static, f32, TELEMETRY_DEPTH>);

impl Telemetry for QueueTelemetry {
    #[inline]
    fn speed(&mut self, rad_per_s: f32) {
        let _ = self.0.enqueue(rad_per_s);
    }
}

/// Everything the control interrupt owns.
struct ControlTask {
    control: ControlLoop,
    motor: Motor,
    telemetry: QueueTelemetry,
}

impl PeriodicTask for ControlTask {
    // Float estimator + PID, two CCR writes, one nFAULT read
    const BUDGET_US: u32 = 200;

    fn run(&mut self) {
        let result = self.control.run_cycle(
            &TICKS,
            &SETTINGS,
            &mut self.motor,
            &mut self.telemetry,
        );
        match result {
            Ok(_) | Err(LoopError::Halted) => {}
            Err(LoopError::MotorFault) => {
                self.log_fault();
                FAULTED.store(true, Ordering::Release);
            }
            Err(LoopError::Driver(e)) => {
                defmt::warn!("motor command rejected: {}", defmt::Debug2Format(&e))
            }
        }
    }
}

impl ControlTask {
    /// Zero the loop state and stop the motor.
    fn reset(&mut self) {
        if let Err(e) = self.control.reset(&TICKS, &SETTINGS, &mut self.motor) {
            defmt::warn!("reset: stop command rejected: {}", defmt::Debug2Format(&e));
        }
    }

    /// Dump the DRV8873 FAULT and DIAG registers.
    fn log_fault(&mut self) {
        match (self.motor.read_fault(), self.motor.read_diag()) {
            (Ok(fault), Ok(diag)) => defmt::error!(
                "DRV8873 fault={=bool} ocp={=bool} tsd={=bool} uvlo={=bool} cpuv={=bool} \
                 otw={=bool} old={=bool} FAULT={=u8:#x} DIAG={=u8:#x}",
                fault.fault(),
                fault.ocp(),
                fault.tsd(),
                fault.uvlo(),
                fault.cpuv(),
                fault.otw(),
                fault.old(),
                fault.raw(),
                diag.raw()
            ),
            _ => defmt::error!("DRV8873 fault registers unreadable"),
        }
    }
}

#[entry]
fn main() -> ! {
    // Peripherals
    let dp = pac::Peripherals::take().unwrap();
    let mut cp = cortex_m::Peripherals::take().unwrap();
    defmt::info!("dcservo firmware {}", env!("CARGO_PKG_VERSION"));

    // Clocks
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.freeze();
    let mut apb2 = rcc.apb2;

    // GPIO
    let pins = BoardPins::new(dp.GPIOA, dp.GPIOB, dp.GPIOC, dp.GPIOD, dp.GPIOE);

    // LED
    let mut led_run = Led::new(pins.leds.green);
    let mut led_telemetry = Led::new(pins.leds.blue);
    let mut led_fault = Led::new(pins.leds.red);

    // USART3 (ST-LINK VCP)
    let usart_cfg = Config {
        baud_rate: config::BAUD_RATE.bps(),
        ..Default::default()
    };
    let serial = Serial::new(dp.USART3, (pins.usart3.tx, pins.usart3.rx), &clocks, usart_cfg);
    let mut usart = Usart::new(serial);

    // SPI1, DRV8873 wants CPOL = 0, CPHA = 1
    let spi_mode = Mode {
        polarity: Polarity::IdleLow,
        phase: Phase::CaptureOnSecondTransition,
    };
    let spi1 = Spi::new(dp.SPI1, (pins.spi1.sck, pins.spi1.miso, pins.spi1.mosi))
        .enable::<u8>(spi_mode, 1.MHz(), &clocks, &mut apb2);
    let spi = SpiDevice::new(spi1, pins.motor.cs);

    // H-bridge
    let pwm = Pwm::tim4(
        dp.TIM4,
        (pins.motor.in1, pins.motor.in2),
        &clocks,
        PWM_FREQUENCY_HZ,
    );
    let iprop = Adc::adc1(dp.ADC1, IPROPI_CHANNEL);
    let control_pins = ControlPins {
        nsleep: pins.motor.nsleep,
        disable: pins.motor.disable,
        nfault: pins.motor.nfault,
        iprop: pins.motor.iprop,
    };
    let mut driver = Drv8873::new(spi, pwm, control_pins, iprop);

    if let Err(e) = motor::bring_up(&mut driver) {
        defmt::error!("DRV8873 bring-up failed: {}", defmt::Debug2Format(&e));
        led_fault.on();
        halt();
    }
    cortex_m::asm::delay(clocks.sysclk().raw() / 1_000 * SETTLE_MS);
    defmt::info!("IPROPI offset: {=u16} counts", driver.current_offset());

    // Queues between interrupts and the main loop
    let telemetry_queue: &'static mut TelemetryQueue =
        cortex_m::singleton!(: TelemetryQueue = Queue::new()).unwrap();
    let (telemetry_tx, mut telemetry_rx) = telemetry_queue.split();
    let rx_queue: &'static mut RxQueue = cortex_m::singleton!(: RxQueue = Queue::new()).unwrap();
    let (rx_tx, mut rx_rx) = rx_queue.split();

    let task = ControlTask {
        control: ControlLoop::new(config::GEOMETRY, config::CADENCE),
        motor: driver,
        telemetry: QueueTelemetry(telemetry_tx),
    };
    if !SCHEDULER.admits::<ControlTask>() {
        defmt::warn!(
            "control budget {=u32} us does not fit a {=u32} us period",
            ControlTask::BUDGET_US,
            SCHEDULER.cadence().period_us()
        );
    }

    // Hand the task and the RX producer to their interrupts. Note `free()` disables interrupts.
    free(|cs| {
        CONTROL.borrow(cs).replace(Some(task));
        RX.borrow(cs).replace(Some(RxSink::new(rx_tx)));
    });

    // Interrupt sources
    let _encoder = EncoderInputs::new(pins.encoder, &dp.SYSCFG, &dp.EXTI);
    let mut control_timer = ControlTimer::tim6(dp.TIM6, &clocks, SCHEDULER.cadence());
    usart::listen_usart3_rx();

    unsafe {
        cp.NVIC.set_priority(Interrupt::EXTI3, PRIO_ENCODER);
        cp.NVIC.set_priority(Interrupt::EXTI4, PRIO_ENCODER);
        cp.NVIC.set_priority(Interrupt::TIM6_DAC, PRIO_CONTROL);
        cp.NVIC.set_priority(Interrupt::USART3, PRIO_CONSOLE);

        NVIC::unmask(Interrupt::EXTI3);
        NVIC::unmask(Interrupt::EXTI4);
        NVIC::unmask(Interrupt::USART3);
        NVIC::unmask(Interrupt::TIM6_DAC);
    }
    control_timer.start();

    led_run.on();
    defmt::info!(
        "control loop at {=u32} Hz, fault polling {=bool}",
        SCHEDULER.cadence().frequency_hz(),
        cfg!(feature = "fault-check")
    );

    let console = Console::new(&SETTINGS, config::GEOMETRY);
    let mut parser: Parser<{ config::LINE_CAPACITY }> = Parser::new(config::COMMAND_PREFIX);
    let mut overruns = 0;

    loop {
        while let Some(item) = rx_rx.dequeue() {
            let Some(byte) = item else {
                defmt::warn!("console input lost, dropping line");
                parser.discard_line();
                continue;
            };
            if let Some(command) = parser.push(byte) {
                defmt::debug!("command: {}", command);
                let reply = console.execute(command, reset_control);
                usart.write_line(reply.framed(parser.prefix()));
            }
        }

        while let Some(speed) = telemetry_rx.dequeue() {
            usart.write_line(Reply::Speed(speed).framed(config::COMMAND_PREFIX));
            led_telemetry.toggle();
        }

        if FAULTED.load(Ordering::Acquire) {
            control_timer.stop();
            NVIC::mask(Interrupt::TIM6_DAC);

            usart.write_line(Reply::MotorFault.framed(config::COMMAND_PREFIX));
            usart.flush();

            led_run.off();
            led_fault.on();
            halt();
        }

        let seen = SCHEDULER.overruns();
        if seen != overruns {
            defmt::warn!(
                "{=u32} control cycles skipped, {=u32} run",
                seen.wrapping_sub(overruns),
                SCHEDULER.cycles()
            );
            overruns = seen;
        }
    }
}

/// Have `TIM6_DAC` reset the loop and return once it has.
///
/// The reset runs in the control interrupt, so it can never interleave with a cycle, and the
/// encoder edges stay live throughout.
fn reset_control() {
    RESET_REQUESTED.store(true, Ordering::Release);
    NVIC::pend(Interrupt::TIM6_DAC);
    cortex_m::asm::dsb();
    cortex_m::asm::isb();

    // Thread mode is below every interrupt: the pend is taken before this returns
    while RESET_REQUESTED.load(Ordering::Acquire) && NVIC::is_enabled(Interrupt::TIM6_DAC) {
        core::hint::spin_loop();
    }
}

/// Park the CPU for good. Encoder and console interrupts may still fire.
fn halt() -> ! {
    defmt::error!("halted");
    loop {
        cortex_m::asm::wfi();
    }
}

#[interrupt]
fn EXTI3() {
    encoder::clear_pending(Channel::A);
    EDGE_A.on_edge_from(&EncoderPort);
}

#[interrupt]
fn EXTI4() {
    encoder::clear_pending(Channel::B);
    EDGE_B.on_edge_from(&EncoderPort);
}

#[interrupt]
fn TIM6_DAC() {
    static mut TASK: Option<ControlTask> = None;

    if TASK.is_none() {
        *TASK = free(|cs| CONTROL.borrow(cs).take());
    }
    let updated = timer::take_update();
    let Some(task) = TASK.as_mut() else {
        if updated {
            SCHEDULER.record_overrun();
        }
        return;
    };

    if RESET_REQUESTED.load(Ordering::Acquire) {
        task.reset();
        RESET_REQUESTED.store(false, Ordering::Release);
    }
    if updated {
        SCHEDULER.tick(task);
    }
}

#[interrupt]
fn USART3() {
    static mut SINK: Option<RxSink<{ usart::RX_DEPTH }>> = None;

    if SINK.is_none() {
        *SINK = free(|cs| RX.borrow(cs).take());
    }
    if let Some(sink) = SINK.as_mut() {
        sink.on_usart3_rx();
    }
}
