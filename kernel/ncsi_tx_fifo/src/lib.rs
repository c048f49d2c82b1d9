//! The direct transmit path from the APE to the management controller.
//!
//! A frame is pushed into the BMC-bound FIFO one 32-bit word at a time.
//! All words but the last go through [`Register::TxFifoWrite`]; the last word goes
//! through [`Register::TxFifoWriteLast`], right after [`Register::TxFifoControl`] has been
//! loaded with the number of valid bytes in that word. Writing the last word ends the frame.
//!
//! Words are formed from the frame bytes in network order, so the first byte
//! of the frame is the most significant byte of the first word.

#![no_std]

#[macro_use] extern crate log;

use core::fmt;
use ape_config::ethernet::{FCS_LEN, FRAME_MIN};
use ape_regs::{Register, RegisterPort, WaitError, WaitStrategy};
use ape_regs::layout::{TxFifoControl, TxFifoStatus};

/// The shortest frame handed to the FIFO; the MAC appends the FCS.
pub const MIN_TRANSMIT_LENGTH: usize = FRAME_MIN - FCS_LEN;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxFifoError {
    /// The frame, after being sized up to the Ethernet minimum, runs past the end of its buffer.
    BufferTooShort { needed: usize, available: usize },
    /// The FIFO never reported enough free space.
    Wait(WaitError),
}

impl From<WaitError> for TxFifoError {
    fn from(e: WaitError) -> Self {
        TxFifoError::Wait(e)
    }
}

impl fmt::Display for TxFifoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxFifoError::BufferTooShort { needed, available } =>
                write!(f, "frame needs {} bytes but its buffer holds {}", needed, available),
            TxFifoError::Wait(e) => write!(f, "TX FIFO: {}", e),
        }
    }
}

/// Returns the number of bytes actually sent for a frame of `byte_length` bytes.
pub fn transmit_length(byte_length: usize) -> usize {
    byte_length.max(MIN_TRANSMIT_LENGTH)
}

/// Sends frames through the transmit FIFO.
pub struct TxFifoTransport<P, W> {
    port: P,
    wait: W,
}

impl<P: RegisterPort, W: WaitStrategy> TxFifoTransport<P, W> {
    pub fn new(port: P, wait: W) -> TxFifoTransport<P, W> {
        TxFifoTransport { port, wait }
    }

    /// Sends the first `byte_length` bytes of `buffer` as one frame.
    ///
    /// Frames shorter than [`MIN_TRANSMIT_LENGTH`] are sized up; the extra bytes are
    /// whatever `buffer` already holds there, so `buffer` must be at least that long.
    /// Blocks until the FIFO has room for the whole frame, as decided by the wait strategy.
    pub fn send(&mut self, buffer: &[u8], byte_length: usize) -> Result<(), TxFifoError> {
        let length = transmit_length(byte_length);
        let frame = buffer.get(..length).ok_or(TxFifoError::BufferTooShort {
            needed: length,
            available: buffer.len(),
        })?;
        let word_count = length.div_ceil(4);

        let port = &mut self.port;
        self.wait.wait_until(|| {
            TxFifoStatus(port.read(Register::TxFifoStatus)).free_words() as usize >= word_count
        })?;

        let mut words = frame.chunks(4).map(word_from_bytes);
        for _ in 1..word_count {
            if let Some(word) = words.next() {
                trace!("TxFifoTransport::send(): word {:#010x}", word);
                self.port.write(Register::TxFifoWrite, word);
            }
        }
        let last = words.next().unwrap_or(0);
        self.port.write(Register::TxFifoControl, TxFifoControl::with_last_byte_count((length % 4) as u32).0);
        self.port.write(Register::TxFifoWriteLast, last);
        trace!("TxFifoTransport::send(): sent {} bytes in {} words", length, word_count);
        Ok(())
    }

    /// Gives back the port and wait strategy this transport was built from.
    pub fn into_inner(self) -> (P, W) {
        (self.port, self.wait)
    }
}

/// Packs up to four bytes into a word, most significant byte first, zero-filling a short tail.
fn word_from_bytes(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word[..bytes.len()].copy_from_slice(bytes);
    u32::from_be_bytes(word)
}
