//! Wire layouts of NC-SI control packets.
//!
//! All multi-byte fields are big-endian. Every structure here is `Unaligned`,
//! so it can be read straight out of a received byte buffer.

use core::mem::size_of;
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};
use zerocopy::byteorder::network_endian::{U16, U32};
use ape_config::ethernet::ETHER_TYPE_NCSI;
use crate::error::NcsiError;

/// Channel id value that addresses the whole package rather than one channel.
pub const BROADCAST_CHANNEL: u8 = 0x1F;
/// Set in the control packet type of every response.
pub const CONTROL_PACKET_TYPE_RESPONSE: u8 = 0x80;
pub const HEADER_REVISION: u8 = 0x01;

const PACKAGE_ID_SHIFT: u8 = 5;
const CHANNEL_ID_MASK: u8 = 0x1F;
const PAYLOAD_LENGTH_MASK: u16 = 0x0FFF;

#[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct EthernetHeader {
    pub destination: [u8; 6],
    pub source: [u8; 6],
    pub ether_type: U16,
}

impl EthernetHeader {
    /// Responses go to the broadcast address from the broadcast address;
    /// the sideband bus has no other endpoints.
    fn broadcast() -> EthernetHeader {
        EthernetHeader {
            destination: [0xFF; 6],
            source: [0xFF; 6],
            ether_type: U16::new(ETHER_TYPE_NCSI),
        }
    }
}

/// The Ethernet header and NC-SI control packet header that start every control packet.
#[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct ControlPacketHeader {
    pub ethernet: EthernetHeader,
    pub mc_id: u8,
    pub header_revision: u8,
    _reserved0: u8,
    pub instance_id: u8,
    pub control_packet_type: u8,
    pub channel_id: u8,
    /// The low 12 bits hold the payload length; the high 4 bits are reserved.
    payload_length: U16,
    _reserved1: [u8; 8],
}
const _: () = assert!(size_of::<ControlPacketHeader>() == 30);

impl ControlPacketHeader {
    pub const LEN: usize = size_of::<ControlPacketHeader>();

    /// Reads the header at the start of `frame`.
    pub fn parse(frame: &[u8]) -> Result<&ControlPacketHeader, NcsiError> {
        ControlPacketHeader::ref_from_prefix(frame).ok_or(NcsiError::Truncated {
            needed: Self::LEN,
            available: frame.len(),
        })
    }

    /// Builds a broadcast-addressed header with zero instance and channel ids.
    pub fn new(control_packet_type: u8, payload_length: u16) -> ControlPacketHeader {
        let mut header = ControlPacketHeader::new_zeroed();
        header.ethernet = EthernetHeader::broadcast();
        header.header_revision = HEADER_REVISION;
        header.control_packet_type = control_packet_type;
        header.set_payload_length(payload_length);
        header
    }

    pub fn package_id(&self) -> u8 {
        self.channel_id >> PACKAGE_ID_SHIFT
    }

    /// The channel index within the package; [`BROADCAST_CHANNEL`] addresses the package itself.
    pub fn channel(&self) -> u8 {
        self.channel_id & CHANNEL_ID_MASK
    }

    pub fn payload_length(&self) -> u16 {
        self.payload_length.get() & PAYLOAD_LENGTH_MASK
    }

    pub fn set_payload_length(&mut self, length: u16) {
        self.payload_length = U16::new(length & PAYLOAD_LENGTH_MASK);
    }

    /// Sets the fields that tie a response to its command.
    pub fn set_address(&mut self, instance_id: u8, channel_id: u8) {
        self.instance_id = instance_id;
        self.channel_id = channel_id;
    }
}

/// Reads a fixed-size command payload, failing if the frame is too short to hold it.
pub fn read_payload<T: FromBytes + Unaligned>(payload: &[u8]) -> Result<&T, NcsiError> {
    T::ref_from_prefix(payload).ok_or(NcsiError::Truncated {
        needed: ControlPacketHeader::LEN + size_of::<T>(),
        available: ControlPacketHeader::LEN + payload.len(),
    })
}

#[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct SelectPackagePayload {
    _reserved: [u8; 3],
    pub flags: u8,
}

impl SelectPackagePayload {
    pub fn hardware_arbitration_disabled(&self) -> bool {
        self.flags & 0x01 != 0
    }
}

#[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct AenEnablePayload {
    _reserved: [u8; 3],
    pub mc_id: u8,
    pub control: U32,
}

#[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct SetLinkPayload {
    pub link_settings: U32,
    pub oem_link_settings: U32,
}

#[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct SetMacAddressPayload {
    pub mac: [u8; 6],
    pub mac_number: u8,
    /// Bits 7:5 are the address type, bit 0 enables the filter.
    pub flags: u8,
}

impl SetMacAddressPayload {
    pub fn enable(&self) -> bool {
        self.flags & 0x01 != 0
    }

    pub fn address_type(&self) -> u8 {
        self.flags >> 5
    }

    /// The first two bytes of the address.
    pub fn high(&self) -> u16 {
        u16::from_be_bytes([self.mac[0], self.mac[1]])
    }

    /// The last four bytes of the address.
    pub fn low(&self) -> u32 {
        u32::from_be_bytes([self.mac[2], self.mac[3], self.mac[4], self.mac[5]])
    }
}
