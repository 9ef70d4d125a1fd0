// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! DRV8873-Q1 H-bridge in PWM input mode.
//!
//! IN1/IN2 come from TIM4 CH1/CH2: forward drives IN1 with the duty cycle and holds IN2 low,
//! reverse the other way round. nSLEEP and DISABLE are plain GPIO, nFAULT is an open-drain input.
//! The SPI interface selects the input mode at init and exposes the FAULT/DIAG registers for
//! diagnostics.

use dcservo::motor::{MotorCommand, MotorDriver};
use stm32f7xx_hal::{
    gpio::{gpioc, gpioe, Analog, Input, Output, PullUp, PushPull},
    spi,
};

use crate::hw::{Adc, Pwm, PwmChannel, SpiDevice};

// Register addresses
pub mod reg {
    pub const FAULT: u8 = 0x00;
    pub const DIAG: u8 = 0x01;
    pub const IC1: u8 = 0x02;
    pub const IC3: u8 = 0x04;
}

/// IC1: TOFF = 01, SPI_IN = 0, SR = 100, MODE = 01 (PWM).
const IC1_PWM_MODE: u8 = 0b01_0_100_01;

/// IC3: CLR_FLT.
const IC3_CLEAR_FAULTS: u8 = 1 << 7;

/// IPROPI samples averaged for the zero-current offset.
const OFFSET_SAMPLES: u16 = 32;

/// FAULT status register.
#[derive(Copy, Clone, Debug, defmt::Format)]
pub struct Fault {
    raw: u8,
}

impl Fault {
    #[inline]
    pub fn raw(&self) -> u8 {
        self.raw
    }

    /// Global FAULT status register. Complements the nFAULT pin.
    #[inline]
    pub fn fault(&self) -> bool {
        (self.raw & (1 << 6)) != 0
    }

    /// Overtemperature warning.
    #[inline]
    pub fn otw(&self) -> bool {
        (self.raw & (1 << 5)) != 0
    }

    /// UVLO fault condition.
    #[inline]
    pub fn uvlo(&self) -> bool {
        (self.raw & (1 << 4)) != 0
    }

    /// Charge-pump undervoltage fault condition.
    #[inline]
    pub fn cpuv(&self) -> bool {
        (self.raw & (1 << 3)) != 0
    }

    /// Overcurrent condition.
    #[inline]
    pub fn ocp(&self) -> bool {
        (self.raw & (1 << 2)) != 0
    }

    /// Overtemperature shutdown.
    #[inline]
    pub fn tsd(&self) -> bool {
        (self.raw & (1 << 1)) != 0
    }

    /// Open-load detection.
    #[inline]
    pub fn old(&self) -> bool {
        (self.raw & 1) != 0
    }
}

/// DIAG status register. Only the raw byte is logged.
#[derive(Copy, Clone, Debug, defmt::Format)]
pub struct Diag {
    raw: u8,
}

impl Diag {
    #[inline]
    pub fn raw(&self) -> u8 {
        self.raw
    }
}

/// nSLEEP, DISABLE, nFAULT and the IPROPI input.
pub struct ControlPins {
    pub nsleep: gpioe::PE9<Output<PushPull>>,
    pub disable: gpioe::PE11<Output<PushPull>>,
    pub nfault: gpioe::PE13<Input<PullUp>>,
    pub iprop: gpioc::PC0<Analog>,
}

/// The bench's H-bridge: register access, PWM outputs, control pins and current sense.
pub struct Drv8873<I, P, const CP: char, const CN: u8> {
    spi: SpiDevice<I, P, CP, CN>,
    pwm: Pwm,
    pins: ControlPins,
    iprop: Adc,
    current_offset: u16,
}

impl<I, P, const CP: char, const CN: u8> Drv8873<I, P, CP, CN>
where
    I: spi::Instance,
    P: spi::Pins<I>,
{
    /// Assemble the driver. Outputs are disabled and the chip kept asleep until [`MotorDriver::init`].
    pub fn new(
        spi: SpiDevice<I, P, CP, CN>,
        mut pwm: Pwm,
        mut pins: ControlPins,
        iprop: Adc,
    ) -> Self {
        pwm.off();
        pins.disable.set_high();
        pins.nsleep.set_low();
        Self {
            spi,
            pwm,
            pins,
            iprop,
            current_offset: 0,
        }
    }

    /// Build a 16-bit SPI word for this device.
    /// - `is_read`: true for read, false for write
    /// - `addr`: 5-bit register address
    /// - `data`: 8-bit data payload (ignored for reads by the device)
    #[inline]
    fn build_word(is_read: bool, addr: u8, data: u8) -> u16 {
        // B15 = 0, B14 = W (1 = read), B13..B9 = address, B8 = X, B7..B0 = data
        ((is_read as u16) << 14) | (((addr as u16) & 0x1F) << 9) | data as u16
    }

    /// Write a register; returns the status byte the device shifted out.
    pub fn write_reg(&mut self, addr: u8, value: u8) -> Result<u8, spi::Error> {
        let sdo = self.spi.transfer_u16(Self::build_word(false, addr, value))?;
        Ok((sdo >> 8) as u8)
    }

    /// Read a register value.
    pub fn read_reg(&mut self, addr: u8) -> Result<u8, spi::Error> {
        let sdo = self.spi.transfer_u16(Self::build_word(true, addr, 0x00))?;
        Ok(sdo as u8)
    }

    pub fn read_fault(&mut self) -> Result<Fault, spi::Error> {
        Ok(Fault {
            raw: self.read_reg(reg::FAULT)?,
        })
    }

    pub fn read_diag(&mut self) -> Result<Diag, spi::Error> {
        Ok(Diag {
            raw: self.read_reg(reg::DIAG)?,
        })
    }

    /// IPROPI reading at zero drive, in ADC counts.
    #[inline]
    pub fn current_offset(&self) -> u16 {
        self.current_offset
    }
}

impl<I, P, const CP: char, const CN: u8> MotorDriver for Drv8873<I, P, CP, CN>
where
    I: spi::Instance,
    P: spi::Pins<I>,
{
    type Error = spi::Error;

    /// Select PWM input mode and clear latched faults. SPI only answers while awake, so this
    /// leaves nSLEEP high.
    fn init(&mut self) -> Result<(), Self::Error> {
        self.pwm.off();
        self.pins.nsleep.set_high();
        // t_WAKE is 1 ms max; the core clock is at least 16 MHz
        cortex_m::asm::delay(16_000);

        self.write_reg(reg::IC1, IC1_PWM_MODE)?;
        self.write_reg(reg::IC3, IC3_CLEAR_FAULTS)?;
        Ok(())
    }

    fn set_speed(&mut self, command: MotorCommand) -> Result<(), Self::Error> {
        let duty = command.duty();
        let (in1, in2) = match command.get() {
            c if c > 0 => (duty, 0.0),
            c if c < 0 => (0.0, duty),
            _ => (0.0, 0.0),
        };
        self.pwm.set_duty(PwmChannel::Ch1, in1);
        self.pwm.set_duty(PwmChannel::Ch2, in2);
        Ok(())
    }

    #[inline]
    fn fault(&mut self) -> bool {
        self.pins.nfault.is_low()
    }

    fn sleep(&mut self) {
        self.pwm.off();
        self.pins.disable.set_high();
        self.pins.nsleep.set_low();
    }

    fn wake(&mut self) {
        self.pins.nsleep.set_high();
        self.pins.disable.set_low();
    }

    fn calibrate_current_offset(&mut self) -> Result<(), Self::Error> {
        self.pwm.off();
        self.current_offset = self.iprop.read_average(OFFSET_SAMPLES);
        Ok(())
    }
}
