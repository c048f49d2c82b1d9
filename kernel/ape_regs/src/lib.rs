//! Register access for the APE (Application Processing Engine) of the NIC.
//!
//! Everything above this crate talks to hardware through the [`RegisterPort`] trait,
//! naming registers with the closed [`Register`] enum rather than raw addresses.
//! The firmware build backs the port with [`MmioPort`]; host builds back it with a simulator.
//!
//! The bit layouts of the multi-field registers live in [`layout`],
//! and the two unbounded hardware handshakes (TX FIFO space, buffer allocation)
//! poll through a [`WaitStrategy`].

#![no_std]

#[macro_use] extern crate log;

pub mod layout;
mod mmio;
mod register;
mod wait;

pub use mmio::MmioPort;
pub use register::Register;
pub use wait::{BoundedSpin, DefaultWait, Spin, WaitError, WaitStrategy};

/// A 32-bit read/write capability over the APE registers.
///
/// Reads take `&mut self` because many APE registers have side effects when read
/// (status registers advance state machines, FIFOs pop).
pub trait RegisterPort {
    /// Reads the current value of `register`.
    fn read(&mut self, register: Register) -> u32;

    /// Writes `value` to `register`.
    fn write(&mut self, register: Register, value: u32);

    /// Reads `register`, applies `f` to its value, and writes the result back.
    fn modify<F: FnOnce(u32) -> u32>(&mut self, register: Register, f: F) {
        let value = self.read(register);
        self.write(register, f(value));
    }
}

impl<P: RegisterPort + ?Sized> RegisterPort for &mut P {
    fn read(&mut self, register: Register) -> u32 {
        (**self).read(register)
    }

    fn write(&mut self, register: Register, value: u32) {
        (**self).write(register, value)
    }
}
