// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! USART console.
//!
//! Transmit is blocking, one byte at a time, through the HAL. Receive is interrupt driven: the
//! `USART3` handler moves each byte into an SPSC queue that the main loop drains, so nothing is
//! lost while a telemetry line is going out. Where bytes do get lost (receiver overrun, full
//! queue) the queue carries a `None` in their place so the consumer can drop the damaged line.
//!
//! Every line goes out with a CRLF terminator.
//!
//! To access the console on the host machine, connect to the ST-LINK USB port and use
//! ```text
//! $ screen /dev/tty.usbmodem* 115200
//! ```
//!
//! To close the terminal, press `Ctrl+A` then `Ctrl+\` then `y`.

use core::fmt::{self, Write as _};
use heapless::spsc::Producer;
use nb::block;

use stm32f7xx_hal::{
    pac,
    prelude::*,
    serial::{Instance, Pins, Serial, Tx},
};

/// Receive queue slots (one is kept free by the queue).
pub const RX_DEPTH: usize = 128;

/// ISR bits.
const ISR_ORE: u32 = 1 << 3;
const ISR_RXNE: u32 = 1 << 5;

pub struct Usart<U: Instance> {
    tx: Tx<U>,
}

impl<U: Instance> Usart<U> {
    pub fn new<PINS: Pins<U>>(serial: Serial<U, PINS>) -> Self {
        let (tx, _rx) = serial.split();
        Self { tx }
    }

    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        let _ = block!(self.tx.write(b));
    }

    pub fn write_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.write_byte(b);
        }
    }

    /// Format `line` and terminate it with CRLF.
    pub fn write_line<D: fmt::Display>(&mut self, line: D) {
        let _ = write!(self, "{line}\r\n");
    }

    /// Block until the hardware TX FIFO/drain is flushed.
    #[inline]
    pub fn flush(&mut self) {
        let _ = block!(self.tx.flush());
    }
}

// Implement `core::fmt::Write` so we can use `write!` / `writeln!` on `Usart`.
impl<U: Instance> fmt::Write for Usart<U> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Usart::write_str(self, s);
        Ok(())
    }
}

/// Enable the USART3 receive interrupt. Unmask `USART3` in the NVIC afterwards.
pub fn listen_usart3_rx() {
    let usart = unsafe { &*pac::USART3::ptr() };
    usart.cr1.modify(|_, w| w.rxneie().set_bit());
}

/// One receive queue slot: a byte, or `None` where one or more bytes were lost.
pub type RxItem = Option<u8>;

/// Producer side of the receive queue, owned by the `USART3` handler.
pub struct RxSink<const N: usize> {
    queue: Producer<'static, RxItem, N>,
    lost: bool,
}

impl<const N: usize> RxSink<N> {
    pub fn new(queue: Producer<'static, RxItem, N>) -> Self {
        Self { queue, lost: false }
    }

    /// Body of the `USART3` handler: move the received byte into the queue.
    pub fn on_usart3_rx(&mut self) {
        let usart = unsafe { &*pac::USART3::ptr() };
        let isr = usart.isr.read().bits();

        if isr & ISR_ORE != 0 {
            usart.icr.write(|w| unsafe { w.bits(ISR_ORE) });
            self.lost = true;
        }
        if isr & ISR_RXNE != 0 {
            // Reading RDR clears RXNE
            let byte = usart.rdr.read().bits() as u8;
            self.push(byte);
        }
    }

    fn push(&mut self, byte: u8) {
        // The loss marker goes in before the first byte that makes it through
        if self.lost {
            if self.queue.enqueue(None).is_err() {
                return;
            }
            self.lost = false;
        }
        if self.queue.enqueue(Some(byte)).is_err() {
            self.lost = true;
        }
    }
}
