//! Transmits arbitrary packets to the network through the APE's transmit buffer ring.
//!
//! Transmit buffer memory is carved into blocks of [`Register::TX_BLOCK_WORDS`] words.
//! A packet is spread over a chain of blocks granted one by one by the buffer allocator.
//! The first block carries a header (frame length, block count) and up to
//! [`FIRST_BLOCK_CAPACITY`] bytes; every following block carries up to
//! [`ADDITIONAL_BLOCK_CAPACITY`] bytes. Each block's control word links it to the next one.
//! Writing the doorbell hands the whole chain to hardware, which returns the blocks
//! to the allocator itself once the packet is on the wire.

#![no_std]

extern crate alloc;
#[macro_use] extern crate log;

use alloc::vec::Vec;
use core::fmt;
use ape_config::ethernet::FRAME_MIN;
use ape_regs::{Register, RegisterPort, WaitError, WaitStrategy};
use ape_regs::layout::{tx_block, AllocatorState, BlockControl, TxAllocator, TxDoorbell};

/// Payload bytes carried by the first block of a chain.
pub const FIRST_BLOCK_CAPACITY: usize = ((Register::TX_BLOCK_WORDS - tx_block::FIRST_PAYLOAD_WORD) * 4) as usize;
/// Payload bytes carried by every block after the first.
pub const ADDITIONAL_BLOCK_CAPACITY: usize = ((Register::TX_BLOCK_WORDS - tx_block::ADDITIONAL_PAYLOAD_WORD) * 4) as usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxChainError {
    /// The allocator finished in `state` instead of granting a block.
    /// `granted` blocks had already been handed out for this packet; hardware reclaims them.
    AllocationFailed { state: AllocatorState, granted: usize },
    /// The packet needs more blocks than a doorbell can describe.
    PacketTooLarge { length: usize, blocks: usize },
    Wait(WaitError),
}

impl From<WaitError> for TxChainError {
    fn from(e: WaitError) -> Self {
        TxChainError::Wait(e)
    }
}

impl fmt::Display for TxChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxChainError::AllocationFailed { state, granted } =>
                write!(f, "TX buffer allocation ended in state {:?} after {} blocks were granted", state, granted),
            TxChainError::PacketTooLarge { length, blocks } =>
                write!(f, "a {}-byte packet needs {} TX blocks, more than a doorbell can hold", length, blocks),
            TxChainError::Wait(e) => write!(f, "TX buffer allocator: {}", e),
        }
    }
}

/// Returns how many blocks a packet of `length` bytes occupies.
pub fn blocks_needed(length: usize) -> usize {
    if length <= FIRST_BLOCK_CAPACITY {
        1
    } else {
        1 + (length - FIRST_BLOCK_CAPACITY).div_ceil(ADDITIONAL_BLOCK_CAPACITY)
    }
}

/// Builds block chains in transmit buffer memory and rings the transmit doorbell.
pub struct ChainedTxEngine<P, W> {
    port: P,
    wait: W,
}

impl<P: RegisterPort, W: WaitStrategy> ChainedTxEngine<P, W> {
    pub fn new(port: P, wait: W) -> ChainedTxEngine<P, W> {
        ChainedTxEngine { port, wait }
    }

    pub fn into_inner(self) -> (P, W) {
        (self.port, self.wait)
    }

    /// Queues `packet` for transmission.
    ///
    /// Every block is allocated before anything is written, so a failed allocation
    /// leaves block memory and the doorbell untouched. Nothing is retried.
    pub fn transmit(&mut self, packet: &[u8]) -> Result<(), TxChainError> {
        let count = blocks_needed(packet.len());
        if count > TxDoorbell::MAX_LENGTH as usize {
            warn!("ChainedTxEngine::transmit(): {}-byte packet needs {} blocks", packet.len(), count);
            return Err(TxChainError::PacketTooLarge { length: packet.len(), blocks: count });
        }

        let mut blocks = Vec::with_capacity(count);
        for _ in 0..count {
            blocks.push(self.allocate_block(blocks.len())?);
        }
        let head = blocks[0];
        let tail = blocks[count - 1];

        let mut consumed = self.write_first_block(head, packet, count as u32, blocks.get(1).copied());
        for (i, &block) in blocks.iter().enumerate().skip(1) {
            consumed += self.write_additional_block(block, &packet[consumed..], blocks.get(i + 1).copied());
        }

        let doorbell = TxDoorbell::new(head, tail, count as u32);
        debug!("ChainedTxEngine::transmit(): {} bytes in {} blocks, head {} tail {}",
            packet.len(), count, head, tail);
        self.port.write(Register::TxDoorbell, doorbell.0);
        Ok(())
    }

    /// Requests one block from the allocator and waits for its answer.
    fn allocate_block(&mut self, granted: usize) -> Result<u32, TxChainError> {
        self.port.write(Register::TxAllocator, TxAllocator::request().0);

        let port = &mut self.port;
        let mut status = TxAllocator(0);
        self.wait.wait_until(|| {
            status = TxAllocator(port.read(Register::TxAllocator));
            status.state() != AllocatorState::Processing
        })?;

        match status.state() {
            AllocatorState::AllocationOk => {
                trace!("ChainedTxEngine::allocate_block(): granted block {}", status.index());
                Ok(status.index())
            }
            state => {
                error!("ChainedTxEngine::allocate_block(): allocator ended in {:?} after {} blocks", state, granted);
                Err(TxChainError::AllocationFailed { state, granted })
            }
        }
    }

    /// Fills the first block of a chain and returns how many packet bytes it consumed.
    ///
    /// A packet shorter than the Ethernet minimum is zero-padded to it,
    /// and the padded length is what the header reports.
    fn write_first_block(&mut self, block: u32, packet: &[u8], count: u32, next: Option<u32>) -> usize {
        let copy_length = packet.len().min(FIRST_BLOCK_CAPACITY);
        let placed = copy_length.max(FRAME_MIN);
        let frame_length = packet.len().max(FRAME_MIN);

        self.write_payload(block, tx_block::FIRST_PAYLOAD_WORD, &packet[..copy_length]);
        let copied_words = copy_length.div_ceil(4);
        for word in copied_words..placed.div_ceil(4) {
            self.write_word(block, tx_block::FIRST_PAYLOAD_WORD + word as u32, 0);
        }

        for word in tx_block::FIRST_CLEARED_WORDS {
            self.write_word(block, word, 0);
        }
        self.write_word(block, tx_block::FRAME_LEN_WORD, frame_length as u32);
        self.write_word(block, tx_block::NUM_BLOCKS_WORD, count);

        let control = BlockControl::new(placed as u32, next.unwrap_or(0), true, next.is_some());
        self.write_word(block, tx_block::CONTROL_WORD, control.0);
        copy_length
    }

    /// Fills a continuation block and returns how many packet bytes it consumed.
    fn write_additional_block(&mut self, block: u32, remaining: &[u8], next: Option<u32>) -> usize {
        let copy_length = remaining.len().min(ADDITIONAL_BLOCK_CAPACITY);
        self.write_payload(block, tx_block::ADDITIONAL_PAYLOAD_WORD, &remaining[..copy_length]);

        let control = BlockControl::new(copy_length as u32, next.unwrap_or(0), false, next.is_some());
        self.write_word(block, tx_block::CONTROL_WORD, control.0);
        copy_length
    }

    /// Writes `bytes` as big-endian words starting at `first_word`, zero-filling a short tail.
    fn write_payload(&mut self, block: u32, first_word: u32, bytes: &[u8]) {
        for (i, chunk) in bytes.chunks(4).enumerate() {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.write_word(block, first_word + i as u32, u32::from_be_bytes(word));
        }
    }

    fn write_word(&mut self, block: u32, word: u32, value: u32) {
        trace!("ChainedTxEngine::write_word(): block {} word {} = {:#010x}", block, word, value);
        self.port.write(Register::TxBlockWord { block, word }, value);
    }
}
