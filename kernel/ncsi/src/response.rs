//! Response codes and the four response frames the dispatcher sends.
//!
//! Each frame is built once and then patched in place for every response:
//! only the addressing fields, the codes and the command-specific data change.
//! Because a template is reused, a response must be fully sent before the
//! same template is built again, which the single-threaded dispatcher guarantees.

use core::mem::size_of;
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};
use zerocopy::byteorder::network_endian::{U16, U32};
use ncsi_tx_fifo::MIN_TRANSMIT_LENGTH;
use crate::command::opcode;
use crate::frame::{ControlPacketHeader, CONTROL_PACKET_TYPE_RESPONSE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum ResponseCode {
    CommandComplete = 0x0000,
    CommandFailed = 0x0001,
    CommandUnsupported = 0x0003,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum ReasonCode {
    None = 0x0000,
    InitializationRequired = 0x0001,
    InvalidParam = 0x0002,
    InvalidPayloadLength = 0x0005,
    UnknownUnsupported = 0x7FFF,
}

/// Trailing bytes that bring the short responses up to the minimum frame length.
const GENERIC_PAD: usize = 22;
const LINK_STATUS_PAD: usize = 10;

#[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct GenericResponseFrame {
    pub header: ControlPacketHeader,
    pub response_code: U16,
    pub reason_code: U16,
    pub checksum: U32,
    _pad: [u8; GENERIC_PAD],
}

#[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct LinkStatusResponseFrame {
    pub header: ControlPacketHeader,
    pub response_code: U16,
    pub reason_code: U16,
    pub link_status: U32,
    pub other_indications: U32,
    pub oem_link_status: U32,
    pub checksum: U32,
    _pad: [u8; LINK_STATUS_PAD],
}

#[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct CapabilitiesResponseFrame {
    pub header: ControlPacketHeader,
    pub response_code: U16,
    pub reason_code: U16,
    pub capabilities: U32,
    pub broadcast_filter_capabilities: U32,
    pub multicast_filter_capabilities: U32,
    pub buffering_capabilities: U32,
    pub aen_control_support: U32,
    pub vlan_filter_count: u8,
    pub mixed_filter_count: u8,
    pub multicast_filter_count: u8,
    pub unicast_filter_count: u8,
    _reserved: [u8; 2],
    pub vlan_mode_support: u8,
    pub channel_count: u8,
    pub checksum: U32,
}

#[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct VersionResponseFrame {
    pub header: ControlPacketHeader,
    pub response_code: U16,
    pub reason_code: U16,
    pub ncsi_major: u8,
    pub ncsi_minor: u8,
    pub ncsi_update: u8,
    pub ncsi_alpha1: u8,
    _reserved: [u8; 3],
    pub ncsi_alpha2: u8,
    pub firmware_name: [u8; 12],
    pub firmware_version: U32,
    pub pci_device: U16,
    pub pci_vendor: U16,
    pub pci_subsystem_device: U16,
    pub pci_subsystem_vendor: U16,
    pub manufacturer_id: U32,
    pub checksum: U32,
}

const _: () = assert!(size_of::<GenericResponseFrame>() == MIN_TRANSMIT_LENGTH);
const _: () = assert!(size_of::<LinkStatusResponseFrame>() == MIN_TRANSMIT_LENGTH);
const _: () = assert!(size_of::<CapabilitiesResponseFrame>() == 66);
const _: () = assert!(size_of::<VersionResponseFrame>() == 74);

const FIRMWARE_NAME: &[u8; 12] = b"BCM5719 NCSI";
const FIRMWARE_VERSION: u32 = 0x0102_01A0;
const MANUFACTURER_ID: u32 = 0x5454_3232;

/// Payload length field of a response: the frame minus its header, checksum and padding.
const fn payload_length<T>(padding: usize) -> u16 {
    (size_of::<T>() - ControlPacketHeader::LEN - size_of::<U32>() - padding) as u16
}

/// PCI identifiers reported by Get Version ID.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PciIds {
    pub vendor: u16,
    pub device: u16,
    pub subsystem_vendor: u16,
    pub subsystem: u16,
}

impl PciIds {
    /// Decodes the device's vendor/device and subsystem id registers,
    /// which hold the vendor half in their low 16 bits.
    pub fn from_registers(vendor_device: u32, subsystem: u32) -> PciIds {
        PciIds {
            vendor: vendor_device as u16,
            device: (vendor_device >> 16) as u16,
            subsystem_vendor: subsystem as u16,
            subsystem: (subsystem >> 16) as u16,
        }
    }
}

/// The four response frames, owned by one dispatcher.
pub struct FrameTemplates {
    generic: GenericResponseFrame,
    link_status: LinkStatusResponseFrame,
    capabilities: CapabilitiesResponseFrame,
    version: VersionResponseFrame,
}

impl FrameTemplates {
    /// Builds the templates for a package reporting `channel_count` channels.
    pub fn new(channel_count: u8) -> FrameTemplates {
        let mut generic = GenericResponseFrame::new_zeroed();
        generic.header = ControlPacketHeader::new(0, payload_length::<GenericResponseFrame>(GENERIC_PAD));

        let mut link_status = LinkStatusResponseFrame::new_zeroed();
        link_status.header = ControlPacketHeader::new(
            opcode::GET_LINK_STATUS | CONTROL_PACKET_TYPE_RESPONSE,
            payload_length::<LinkStatusResponseFrame>(LINK_STATUS_PAD),
        );

        let mut capabilities = CapabilitiesResponseFrame::new_zeroed();
        capabilities.header = ControlPacketHeader::new(
            opcode::GET_CAPABILITIES | CONTROL_PACKET_TYPE_RESPONSE,
            payload_length::<CapabilitiesResponseFrame>(0),
        );
        capabilities.broadcast_filter_capabilities = U32::new(0xF);
        capabilities.multicast_filter_capabilities = U32::new(0x7);
        capabilities.buffering_capabilities = U32::new(0x7);
        capabilities.vlan_filter_count = 1;
        capabilities.mixed_filter_count = 1;
        capabilities.multicast_filter_count = 1;
        capabilities.unicast_filter_count = 1;
        capabilities.vlan_mode_support = 0x7;
        capabilities.channel_count = channel_count;

        let mut version = VersionResponseFrame::new_zeroed();
        version.header = ControlPacketHeader::new(
            opcode::GET_VERSION_ID | CONTROL_PACKET_TYPE_RESPONSE,
            payload_length::<VersionResponseFrame>(0),
        );
        version.ncsi_major = 1;
        version.ncsi_minor = 2;
        version.ncsi_update = 4;
        version.ncsi_alpha1 = b'a';
        version.ncsi_alpha2 = b'b';
        version.firmware_name = *FIRMWARE_NAME;
        version.firmware_version = U32::new(FIRMWARE_VERSION);
        version.pci_device = U16::new(0xFFFF);
        version.pci_vendor = U16::new(0xFFFF);
        version.pci_subsystem_device = U16::new(0xFFFF);
        version.pci_subsystem_vendor = U16::new(0xFFFF);
        version.manufacturer_id = U32::new(MANUFACTURER_ID);

        FrameTemplates { generic, link_status, capabilities, version }
    }

    /// A response carrying only a response code and a reason code.
    pub fn generic(
        &mut self,
        instance_id: u8,
        channel_id: u8,
        control_packet_type: u8,
        response: ResponseCode,
        reason: ReasonCode,
    ) -> &[u8] {
        let frame = &mut self.generic;
        frame.header.set_address(instance_id, channel_id);
        frame.header.control_packet_type = control_packet_type | CONTROL_PACKET_TYPE_RESPONSE;
        frame.response_code = U16::new(response as u16);
        frame.reason_code = U16::new(reason as u16);
        frame.as_bytes()
    }

    /// A successful Get Link Status response.
    ///
    /// The control packet type is fixed in the template rather than taken from the command.
    pub fn link_status(
        &mut self,
        instance_id: u8,
        channel_id: u8,
        link_status: u32,
        oem_link_status: u32,
        other_indications: u32,
    ) -> &[u8] {
        let frame = &mut self.link_status;
        frame.header.set_address(instance_id, channel_id);
        frame.response_code = U16::new(ResponseCode::CommandComplete as u16);
        frame.reason_code = U16::new(ReasonCode::None as u16);
        frame.link_status = U32::new(link_status);
        frame.oem_link_status = U32::new(oem_link_status);
        frame.other_indications = U32::new(other_indications);
        frame.as_bytes()
    }

    /// A successful Get Capabilities response.
    pub fn capabilities(&mut self, instance_id: u8, channel_id: u8, control_packet_type: u8) -> &[u8] {
        let frame = &mut self.capabilities;
        frame.header.set_address(instance_id, channel_id);
        frame.header.control_packet_type = control_packet_type | CONTROL_PACKET_TYPE_RESPONSE;
        frame.response_code = U16::new(ResponseCode::CommandComplete as u16);
        frame.reason_code = U16::new(ReasonCode::None as u16);
        frame.as_bytes()
    }

    /// A successful Get Version ID response reporting `pci` as the device identity.
    pub fn version(&mut self, instance_id: u8, channel_id: u8, control_packet_type: u8, pci: PciIds) -> &[u8] {
        let frame = &mut self.version;
        frame.header.set_address(instance_id, channel_id);
        frame.header.control_packet_type = control_packet_type | CONTROL_PACKET_TYPE_RESPONSE;
        frame.response_code = U16::new(ResponseCode::CommandComplete as u16);
        frame.reason_code = U16::new(ReasonCode::None as u16);
        frame.pci_vendor = U16::new(pci.vendor);
        frame.pci_device = U16::new(pci.device);
        frame.pci_subsystem_vendor = U16::new(pci.subsystem_vendor);
        frame.pci_subsystem_device = U16::new(pci.subsystem);
        frame.as_bytes()
    }
}
