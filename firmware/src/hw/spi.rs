// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! SPI device with its own chip select.
//!
//! The bench has a single device on SPI1, so bus and chip select are owned together and every
//! transfer is one framed transaction. Chip select is released even when the transfer fails.

use stm32f7xx_hal::{
    gpio::{self, Output, PinState, PushPull},
    prelude::*,
    spi::{self, Enabled, Spi},
};

/// Enabled 8-bit SPI instance plus an active-low chip-select pin.
pub struct SpiDevice<I, P, const CP: char, const CN: u8> {
    spi: Spi<I, P, Enabled<u8>>,
    cs: gpio::Pin<CP, CN, Output<PushPull>>,
}

impl<I, P, const CP: char, const CN: u8> SpiDevice<I, P, CP, CN>
where
    I: spi::Instance,
    P: spi::Pins<I>,
{
    /// Take ownership of the bus and the chip-select pin. CS starts deasserted (high).
    pub fn new<MODE>(spi: Spi<I, P, Enabled<u8>>, cs: gpio::Pin<CP, CN, MODE>) -> Self {
        let mut cs = cs.into_push_pull_output();
        cs.set_state(PinState::High);
        Self { spi, cs }
    }

    /// Full-duplex transfer of one 16-bit frame, MSB first.
    pub fn transfer_u16(&mut self, word: u16) -> Result<u16, spi::Error> {
        let mut buf = word.to_be_bytes();

        self.cs.set_low();
        let result = self.spi.transfer(&mut buf).map(|_| ());
        self.cs.set_high();

        result?;
        Ok(u16::from_be_bytes(buf))
    }
}
