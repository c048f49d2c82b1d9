//! Bit layouts of the multi-field APE registers and of the transmit buffer blocks.
//!
//! Each wrapper is a plain `u32` newtype: construct it from a value read through a
//! [`RegisterPort`](crate::RegisterPort), or build one and write `.0` back.

use bit_field::BitField;

/// The transmit FIFO status register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxFifoStatus(pub u32);

impl TxFifoStatus {
    /// Number of words the FIFO can currently accept.
    pub fn free_words(&self) -> u32 {
        self.0.get_bits(0..12)
    }
}

/// The control value written alongside the final word of a FIFO frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxFifoControl(pub u32);

impl TxFifoControl {
    /// `count` is the number of valid bytes in the final word, where 0 means all four.
    pub fn with_last_byte_count(count: u32) -> TxFifoControl {
        let mut value = 0u32;
        value.set_bits(0..2, count & 0x3);
        TxFifoControl(value)
    }

    pub fn last_byte_count(&self) -> u32 {
        self.0.get_bits(0..2)
    }
}

/// States of the transmit buffer allocator state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocatorState {
    Idle,
    Processing,
    AllocationOk,
    AllocationFailed,
    Reserved(u32),
}

impl From<u32> for AllocatorState {
    fn from(value: u32) -> Self {
        match value {
            0 => AllocatorState::Idle,
            1 => AllocatorState::Processing,
            2 => AllocatorState::AllocationOk,
            3 => AllocatorState::AllocationFailed,
            other => AllocatorState::Reserved(other),
        }
    }
}

/// The transmit buffer allocator register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxAllocator(pub u32);

impl TxAllocator {
    const INDEX: core::ops::Range<usize> = 0..6;
    const STATE: core::ops::Range<usize> = 8..12;
    const REQUEST_ALLOCATION: usize = 16;

    /// The value that asks the allocator for one more block.
    pub fn request() -> TxAllocator {
        let mut value = 0u32;
        value.set_bit(Self::REQUEST_ALLOCATION, true);
        TxAllocator(value)
    }

    /// Builds a status value, as hardware would report it.
    pub fn status(state: AllocatorState, index: u32) -> TxAllocator {
        let raw_state = match state {
            AllocatorState::Idle => 0,
            AllocatorState::Processing => 1,
            AllocatorState::AllocationOk => 2,
            AllocatorState::AllocationFailed => 3,
            AllocatorState::Reserved(v) => v & 0xF,
        };
        let mut value = 0u32;
        value.set_bits(Self::INDEX, index & 0x3F);
        value.set_bits(Self::STATE, raw_state);
        TxAllocator(value)
    }

    pub fn is_request(&self) -> bool {
        self.0.get_bit(Self::REQUEST_ALLOCATION)
    }

    pub fn state(&self) -> AllocatorState {
        AllocatorState::from(self.0.get_bits(Self::STATE))
    }

    /// The block index granted by the last successful allocation.
    pub fn index(&self) -> u32 {
        self.0.get_bits(Self::INDEX)
    }
}

/// The transmit doorbell, which hands a chain of blocks to the hardware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxDoorbell(pub u32);

impl TxDoorbell {
    const HEAD: core::ops::Range<usize> = 0..12;
    const TAIL: core::ops::Range<usize> = 12..24;
    const LENGTH: core::ops::Range<usize> = 24..32;

    /// The largest chain length the doorbell can describe.
    pub const MAX_LENGTH: u32 = 0xFF;

    pub fn new(head: u32, tail: u32, length: u32) -> TxDoorbell {
        let mut value = 0u32;
        value.set_bits(Self::HEAD, head & 0xFFF);
        value.set_bits(Self::TAIL, tail & 0xFFF);
        value.set_bits(Self::LENGTH, length & Self::MAX_LENGTH);
        TxDoorbell(value)
    }

    pub fn head(&self) -> u32 { self.0.get_bits(Self::HEAD) }
    pub fn tail(&self) -> u32 { self.0.get_bits(Self::TAIL) }
    pub fn length(&self) -> u32 { self.0.get_bits(Self::LENGTH) }
}

/// Word offsets inside a transmit buffer block.
pub mod tx_block {
    /// The control word, see [`BlockControl`](super::BlockControl).
    pub const CONTROL_WORD: u32 = 0;
    /// First block only: total frame length in bytes.
    pub const FRAME_LEN_WORD: u32 = 3;
    /// First block only: number of blocks in the chain.
    pub const NUM_BLOCKS_WORD: u32 = 9;
    /// Where frame data starts in the first block.
    pub const FIRST_PAYLOAD_WORD: u32 = 12;
    /// Where frame data starts in every following block.
    pub const ADDITIONAL_PAYLOAD_WORD: u32 = 2;
    /// Header words of the first block that are cleared before the frame is queued.
    pub const FIRST_CLEARED_WORDS: [u32; 6] = [2, 4, 5, 6, 7, 8];
}

/// The control word at the start of every transmit buffer block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockControl(pub u32);

impl BlockControl {
    const PAYLOAD_LENGTH: core::ops::Range<usize> = 0..7;
    const NEXT_BLOCK: core::ops::Range<usize> = 7..30;
    const FIRST: usize = 30;
    const NOT_LAST: usize = 31;

    pub fn new(payload_length: u32, next_block: u32, first: bool, not_last: bool) -> BlockControl {
        let mut value = 0u32;
        value.set_bits(Self::PAYLOAD_LENGTH, payload_length & 0x7F);
        value.set_bits(Self::NEXT_BLOCK, next_block & 0x7F_FFFF);
        value.set_bit(Self::FIRST, first);
        value.set_bit(Self::NOT_LAST, not_last);
        BlockControl(value)
    }

    pub fn payload_length(&self) -> u32 { self.0.get_bits(Self::PAYLOAD_LENGTH) }
    pub fn next_block(&self) -> u32 { self.0.get_bits(Self::NEXT_BLOCK) }
    pub fn is_first(&self) -> bool { self.0.get_bit(Self::FIRST) }
    pub fn is_not_last(&self) -> bool { self.0.get_bit(Self::NOT_LAST) }
}
