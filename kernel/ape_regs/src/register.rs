//! The set of APE registers used by the NC-SI firmware and where they live
//! in the APE's view of the address space.

/// Base of the APE control block (buffer allocator and doorbells).
const APE_BASE: usize = 0x6020_0000;
/// Base of the APE peripheral block (BMC <-> NC sideband FIFOs).
const APE_PERI_BASE: usize = 0xA004_0000;
/// Base of the memory shared with the host driver.
const SHM_BASE: usize = 0x6022_0000;
/// Base of the per-channel shared memory blocks.
const SHM_CHANNEL_BASE: usize = SHM_BASE + 0x0B00;
/// Distance between two consecutive per-channel shared memory blocks.
const SHM_CHANNEL_STRIDE: usize = 0x40;
/// Base of the device register block, which mirrors PCI configuration space.
const DEVICE_BASE: usize = 0xA000_0000;
/// Base of the transmit buffer memory, carved into fixed-size blocks.
const TX_PORT_BASE: usize = 0xA000_9000;

/// An APE register, named by its function.
///
/// Channel registers carry the channel index (`0..MAX_CHANNELS`);
/// [`Register::TxBlockWord`] carries a block index and a word offset within that block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Register {
    /// Free space (in words) of the BMC-bound transmit FIFO.
    TxFifoStatus,
    /// Control value that qualifies the final word of a frame.
    TxFifoControl,
    /// Pushes one word into the transmit FIFO.
    TxFifoWrite,
    /// Pushes the final word of a frame and ends it.
    TxFifoWriteLast,
    /// Transmit buffer allocator: request bit, state machine and granted index.
    TxAllocator,
    /// Transmit doorbell: head, tail and length of a block chain.
    TxDoorbell,
    /// One word of one transmit buffer block.
    TxBlockWord { block: u32, word: u32 },
    /// Bitmask of NC-SI opcodes accepted since initialization.
    CommandsSeen,
    /// Package status flags shared with the host driver.
    PackageStatus,
    /// PCI vendor id (low half) and device id (high half).
    PciVendorDeviceId,
    /// PCI subsystem vendor id (low half) and subsystem id (high half).
    PciSubsystemId,
    /// Channel info bits (ready, enabled, passthrough, VLAN).
    ChannelInfo(u8),
    /// AEN management controller id / AEN control.
    ChannelMcid(u8),
    /// Last link status reported to the management controller.
    ChannelStatus(u8),
    /// Link settings from Set Link.
    ChannelSetting1(u8),
    /// OEM link settings from Set Link.
    ChannelSetting2(u8),
    /// Count of control packets accepted on this channel.
    ChannelRxControlCount(u8),
    /// Count of passthrough receive pumps serviced on this channel.
    ChannelRxAllCount(u8),
}

impl Register {
    /// Words in one transmit buffer block.
    pub const TX_BLOCK_WORDS: u32 = 32;

    /// Returns the address of this register in the APE's memory map.
    pub const fn address(&self) -> usize {
        match *self {
            Register::TxFifoStatus          => APE_PERI_BASE + 0x0104,
            Register::TxFifoControl         => APE_PERI_BASE + 0x0108,
            Register::TxFifoWrite           => APE_PERI_BASE + 0x0110,
            Register::TxFifoWriteLast       => APE_PERI_BASE + 0x0114,
            Register::TxAllocator           => APE_BASE + 0x0044,
            Register::TxDoorbell            => APE_BASE + 0x0010,
            Register::TxBlockWord { block, word } =>
                TX_PORT_BASE + ((block * Self::TX_BLOCK_WORDS + word) as usize) * 4,
            Register::CommandsSeen          => SHM_BASE + 0x0000,
            Register::PackageStatus         => SHM_BASE + 0x0004,
            Register::PciVendorDeviceId     => DEVICE_BASE + 0x0000,
            Register::PciSubsystemId        => DEVICE_BASE + 0x002C,
            Register::ChannelInfo(ch)           => channel_base(ch) + 0x00,
            Register::ChannelMcid(ch)           => channel_base(ch) + 0x04,
            Register::ChannelStatus(ch)         => channel_base(ch) + 0x08,
            Register::ChannelSetting1(ch)       => channel_base(ch) + 0x0C,
            Register::ChannelSetting2(ch)       => channel_base(ch) + 0x10,
            Register::ChannelRxControlCount(ch) => channel_base(ch) + 0x14,
            Register::ChannelRxAllCount(ch)     => channel_base(ch) + 0x18,
        }
    }
}

const fn channel_base(channel: u8) -> usize {
    SHM_CHANNEL_BASE + (channel as usize) * SHM_CHANNEL_STRIDE
}
