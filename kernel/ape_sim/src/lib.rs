//! A simulated APE register file, for running the NC-SI firmware on a host.
//!
//! Most registers are plain memory. The registers that drive hardware state machines
//! are modeled:
//! * the transmit FIFO reports its free space, collects pushed words and closes a frame
//!   on a write to [`Register::TxFifoWriteLast`], trimming the final word to the
//!   last-byte count written to [`Register::TxFifoControl`];
//! * the buffer allocator hands out block indices from a pool, spending a configurable
//!   number of status reads in the "processing" state and failing once the pool is empty;
//! * doorbell writes are recorded.
//!
//! Every access made through the [`RegisterPort`] impl is appended to an access log.

#![no_std]

extern crate alloc;
#[macro_use] extern crate log;

use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;
use ape_regs::{Register, RegisterPort};
use ape_regs::layout::{AllocatorState, TxAllocator, TxDoorbell, TxFifoControl};

/// One register access observed by the simulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read(Register, u32),
    Write(Register, u32),
}

/// Default number of words the simulated transmit FIFO can hold.
pub const DEFAULT_FIFO_WORDS: u32 = 512;
/// Number of blocks in the simulated transmit buffer pool.
pub const DEFAULT_POOL_BLOCKS: u32 = 64;

pub struct SimulatedPort {
    memory: BTreeMap<Register, u32>,
    log: Vec<Access>,

    fifo_capacity: u32,
    fifo_stall: u32,
    fifo_pending: Vec<u32>,
    frames: Vec<Vec<u8>>,

    free_blocks: VecDeque<u32>,
    granted: Vec<u32>,
    allocation_latency: u32,
    allocation_remaining: u32,
    allocator_status: TxAllocator,
    doorbells: Vec<TxDoorbell>,
}

impl Default for SimulatedPort {
    fn default() -> Self {
        SimulatedPort::new()
    }
}

impl SimulatedPort {
    /// Creates a simulator with an empty FIFO and a pool of blocks `1..DEFAULT_POOL_BLOCKS`.
    ///
    /// Block 0 is left out of the default pool so that a next-block index of 0
    /// always means "end of chain" in tests.
    pub fn new() -> SimulatedPort {
        SimulatedPort {
            memory: BTreeMap::new(),
            log: Vec::new(),
            fifo_capacity: DEFAULT_FIFO_WORDS,
            fifo_stall: 0,
            fifo_pending: Vec::new(),
            frames: Vec::new(),
            free_blocks: (1..DEFAULT_POOL_BLOCKS).collect(),
            granted: Vec::new(),
            allocation_latency: 0,
            allocation_remaining: 0,
            allocator_status: TxAllocator::status(AllocatorState::Idle, 0),
            doorbells: Vec::new(),
        }
    }

    /// Replaces the pool of free transmit blocks; they are granted in iteration order.
    pub fn with_free_blocks<I: IntoIterator<Item = u32>>(mut self, blocks: I) -> SimulatedPort {
        self.free_blocks = blocks.into_iter().collect();
        self
    }

    /// Sets how many words the FIFO holds when empty.
    pub fn with_fifo_capacity(mut self, words: u32) -> SimulatedPort {
        self.fifo_capacity = words;
        self
    }

    /// Makes the next `polls` reads of the FIFO status report no free space.
    pub fn stall_fifo(&mut self, polls: u32) {
        self.fifo_stall = polls;
    }

    /// Makes every allocation stay in the processing state for `polls` status reads.
    pub fn set_allocation_latency(&mut self, polls: u32) {
        self.allocation_latency = polls;
    }

    /// Stores `value` without logging the access.
    pub fn set(&mut self, register: Register, value: u32) {
        self.memory.insert(register, value);
    }

    /// Returns the stored value of `register` without logging the access.
    pub fn get(&self, register: Register) -> u32 {
        self.memory.get(&register).copied().unwrap_or(0)
    }

    /// The words of one transmit buffer block, as last written.
    pub fn block(&self, block: u32) -> [u32; Register::TX_BLOCK_WORDS as usize] {
        let mut words = [0; Register::TX_BLOCK_WORDS as usize];
        for (word, slot) in words.iter_mut().enumerate() {
            *slot = self.get(Register::TxBlockWord { block, word: word as u32 });
        }
        words
    }

    pub fn accesses(&self) -> &[Access] {
        &self.log
    }

    pub fn clear_accesses(&mut self) {
        self.log.clear();
    }

    /// All values written to `register`, oldest first.
    pub fn writes_to(&self, register: Register) -> Vec<u32> {
        self.log.iter()
            .filter_map(|access| match *access {
                Access::Write(r, value) if r == register => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Number of writes made to any register.
    pub fn write_count(&self) -> usize {
        self.log.iter().filter(|access| matches!(access, Access::Write(..))).count()
    }

    /// Whether any access, read or write, touched `register`.
    pub fn touched(&self, register: Register) -> bool {
        self.log.iter().any(|access| match *access {
            Access::Read(r, _) | Access::Write(r, _) => r == register,
        })
    }

    /// Frames completed on the transmit FIFO, oldest first.
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    /// Words pushed into the FIFO that have not been closed into a frame yet.
    pub fn pending_fifo_words(&self) -> &[u32] {
        &self.fifo_pending
    }

    /// Block indices granted by the allocator, in grant order.
    pub fn granted_blocks(&self) -> &[u32] {
        &self.granted
    }

    pub fn doorbells(&self) -> &[TxDoorbell] {
        &self.doorbells
    }

    fn fifo_free_words(&mut self) -> u32 {
        if self.fifo_stall > 0 {
            self.fifo_stall -= 1;
            return 0;
        }
        self.fifo_capacity.saturating_sub(self.fifo_pending.len() as u32)
    }

    fn close_frame(&mut self) {
        let last_byte_count = TxFifoControl(self.get(Register::TxFifoControl)).last_byte_count() as usize;
        let mut frame: Vec<u8> = self.fifo_pending.drain(..)
            .flat_map(u32::to_be_bytes)
            .collect();
        if last_byte_count != 0 {
            let trimmed = frame.len() - (4 - last_byte_count);
            frame.truncate(trimmed);
        }
        trace!("SimulatedPort::close_frame(): frame of {} bytes", frame.len());
        self.frames.push(frame);
    }

    fn request_allocation(&mut self) {
        self.allocation_remaining = self.allocation_latency;
        self.allocator_status = match self.free_blocks.pop_front() {
            Some(index) => {
                self.granted.push(index);
                TxAllocator::status(AllocatorState::AllocationOk, index)
            }
            None => {
                debug!("SimulatedPort::request_allocation(): buffer pool exhausted");
                TxAllocator::status(AllocatorState::AllocationFailed, 0)
            }
        };
    }

    fn allocator_read(&mut self) -> u32 {
        if self.allocation_remaining > 0 {
            self.allocation_remaining -= 1;
            return TxAllocator::status(AllocatorState::Processing, 0).0;
        }
        self.allocator_status.0
    }
}

impl RegisterPort for SimulatedPort {
    fn read(&mut self, register: Register) -> u32 {
        let value = match register {
            Register::TxFifoStatus => self.fifo_free_words(),
            Register::TxAllocator => self.allocator_read(),
            other => self.get(other),
        };
        self.log.push(Access::Read(register, value));
        value
    }

    fn write(&mut self, register: Register, value: u32) {
        self.log.push(Access::Write(register, value));
        match register {
            Register::TxFifoWrite => self.fifo_pending.push(value),
            Register::TxFifoWriteLast => {
                self.fifo_pending.push(value);
                self.close_frame();
            }
            Register::TxAllocator if TxAllocator(value).is_request() => self.request_allocation(),
            Register::TxDoorbell => {
                self.doorbells.push(TxDoorbell(value));
                self.set(register, value);
            }
            other => self.set(other, value),
        }
    }
}
