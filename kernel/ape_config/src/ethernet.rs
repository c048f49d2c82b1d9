/// The smallest Ethernet frame on the wire, including the frame check sequence.
pub const FRAME_MIN: usize = 64;

/// Length of the trailing frame check sequence, which the MAC appends itself.
pub const FCS_LEN: usize = 4;

/// EtherType carried by every NC-SI control packet.
pub const ETHER_TYPE_NCSI: u16 = 0x88F8;
