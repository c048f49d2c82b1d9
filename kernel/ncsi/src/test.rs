extern crate std;
use std::collections::BTreeMap;
use std::vec::Vec;
use zerocopy::{AsBytes, FromBytes};
use ape_regs::{BoundedSpin, Register, RegisterPort, WaitError};
use ape_sim::{Access, SimulatedPort};
use ncsi_tx_fifo::TxFifoError;
use super::*;
use super::command::{descriptor, opcode, Handler, COMMANDS, COMMAND_COUNT};
use super::link::{mii, LinkStatus};
use super::response::{CapabilitiesResponseFrame, GenericResponseFrame, LinkStatusResponseFrame, VersionResponseFrame};
use super::state::{ChannelInfo, PACKAGE_STATUS_DESELECTED, PACKAGE_STATUS_SELECTED};

/// A platform that serves PHY registers from a map and records every call.
#[derive(Default)]
struct RecordingPlatform {
    phy_registers: BTreeMap<(u8, u8), u16>,
    phy_reads: Vec<(u8, u8)>,
    reads_without_lock: usize,
    lock_held: bool,
    lock_acquisitions: usize,
    mac_addresses: Vec<(u8, u16, u32, u8, bool)>,
    passthrough: Vec<u8>,
}

impl NcsiPlatform for RecordingPlatform {
    fn acquire_phy_lock(&mut self) {
        assert!(!self.lock_held, "PHY lock acquired twice");
        self.lock_held = true;
        self.lock_acquisitions += 1;
    }

    fn release_phy_lock(&mut self) {
        assert!(self.lock_held, "PHY lock released while not held");
        self.lock_held = false;
    }

    fn read_phy_register(&mut self, phy: u8, register: u8) -> u16 {
        if !self.lock_held {
            self.reads_without_lock += 1;
        }
        self.phy_reads.push((phy, register));
        self.phy_registers.get(&(phy, register)).copied().unwrap_or(0)
    }

    fn set_mac_address(&mut self, channel: u8, high: u16, low: u32, mac_number: u8, enable: bool) {
        self.mac_addresses.push((channel, high, low, mac_number, enable));
    }

    fn passthrough_receive(&mut self, channel: u8) {
        self.passthrough.push(channel);
    }
}

type TestNcsi = Ncsi<SimulatedPort, RecordingPlatform, BoundedSpin>;

fn dispatcher(channel_count: u8) -> TestNcsi {
    let mut ncsi = Ncsi::with_wait(
        SimulatedPort::new(),
        RecordingPlatform::default(),
        BoundedSpin::new(100),
        channel_count,
    ).unwrap();
    ncsi.init();
    ncsi.port_mut().clear_accesses();
    ncsi
}

fn command_with_length(channel_id: u8, opcode: u8, instance_id: u8, payload: &[u8], declared: u16) -> Vec<u8> {
    let mut header = ControlPacketHeader::new(opcode, declared);
    header.set_address(instance_id, channel_id);
    let mut frame = header.as_bytes().to_vec();
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&[0; 4]);
    frame
}

fn command(channel_id: u8, opcode: u8, instance_id: u8, payload: &[u8]) -> Vec<u8> {
    command_with_length(channel_id, opcode, instance_id, payload, payload.len() as u16)
}

fn send(ncsi: &mut TestNcsi, channel_id: u8, opcode: u8, payload: &[u8]) -> Outcome {
    ncsi.handle_frame(&command(channel_id, opcode, 0x33, payload)).unwrap()
}

/// Runs Clear Initial State on `channel` and forgets the register traffic it caused.
fn make_ready(ncsi: &mut TestNcsi, channel: u8) {
    assert_eq!(send(ncsi, channel, opcode::CLEAR_INITIAL_STATE, &[]), Outcome::COMPLETE);
    ncsi.port_mut().clear_accesses();
}

fn failed(reason: ReasonCode) -> Outcome {
    Outcome::Responded { response: ResponseCode::CommandFailed, reason }
}

const UNSUPPORTED: Outcome = Outcome::Responded {
    response: ResponseCode::CommandUnsupported,
    reason: ReasonCode::UnknownUnsupported,
};

fn last_frame(ncsi: &TestNcsi) -> Vec<u8> {
    ncsi.port().frames().last().cloned().unwrap()
}

fn last_generic(ncsi: &TestNcsi) -> GenericResponseFrame {
    GenericResponseFrame::read_from_prefix(&last_frame(ncsi)).unwrap()
}

/// Register writes other than the ones that stream a response into the FIFO.
fn state_writes(port: &SimulatedPort) -> Vec<(Register, u32)> {
    port.accesses().iter()
        .filter_map(|access| match *access {
            Access::Write(Register::TxFifoWrite, _)
            | Access::Write(Register::TxFifoWriteLast, _)
            | Access::Write(Register::TxFifoControl, _) => None,
            Access::Write(register, value) => Some((register, value)),
            Access::Read(..) => None,
        })
        .collect()
}

#[test]
fn command_table_covers_every_opcode() {
    assert_eq!(COMMAND_COUNT, 0x1B);
    assert_eq!(COMMANDS.len(), COMMAND_COUNT);
    assert!(descriptor(opcode::CLEAR_INITIAL_STATE).ignores_init());
    assert!(descriptor(opcode::SELECT_PACKAGE).applies_to_package());
    assert!(descriptor(opcode::DESELECT_PACKAGE).applies_to_package());
    assert_eq!(descriptor(opcode::GET_LINK_STATUS).handler, Handler::GetLinkStatus);
    assert_eq!(descriptor(opcode::SET_MAC_ADDRESS).expected_payload_length, 8);
    for stub in [0x0B, 0x0F, 0x11, 0x12, 0x13, 0x14, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x7F, 0xFF] {
        assert!(!descriptor(stub).is_supported(), "opcode {:#x}", stub);
    }
}

#[test]
fn unsupported_opcodes_answer_without_touching_state() {
    let mut ncsi = dispatcher(1);
    for stub in [0x0B, 0x0F, 0x11, 0x12, 0x13, 0x14, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0xFF] {
        ncsi.port_mut().clear_accesses();
        let outcome = ncsi.handle_frame(&command_with_length(0x00, stub, 7, &[0; 8], 3)).unwrap();
        assert_eq!(outcome, UNSUPPORTED, "opcode {:#x}", stub);
        assert!(state_writes(ncsi.port()).is_empty(), "opcode {:#x}", stub);

        let response = last_generic(&ncsi);
        assert_eq!(response.header.control_packet_type, stub | 0x80);
        assert_eq!(response.response_code.get(), 0x0003);
        assert_eq!(response.reason_code.get(), 0x7FFF);
    }
    assert!(!ncsi.state().package().selected);
}

#[test]
fn wrong_payload_length_fails_before_channel_checks() {
    let mut ncsi = dispatcher(1);
    for channel_id in [0x00, 0x03, BROADCAST_CHANNEL] {
        for (op, declared) in [(opcode::SELECT_PACKAGE, 0), (opcode::ENABLE_CHANNEL, 4), (opcode::SET_LINK, 4)] {
            ncsi.port_mut().clear_accesses();
            let frame = command_with_length(channel_id, op, 1, &[0; 8], declared);
            assert_eq!(ncsi.handle_frame(&frame).unwrap(), failed(ReasonCode::InvalidPayloadLength));
            assert!(state_writes(ncsi.port()).is_empty());
            assert_eq!(last_generic(&ncsi).reason_code.get(), 0x0005);
        }
    }
    assert!(!ncsi.state().package().selected);
}

#[test]
fn uninitialized_channel_requires_init_and_skips_phy() {
    let mut ncsi = dispatcher(4);
    let outcome = send(&mut ncsi, 0x02, opcode::GET_LINK_STATUS, &[]);
    assert_eq!(outcome, failed(ReasonCode::InitializationRequired));
    assert!(ncsi.platform().phy_reads.is_empty());
    assert_eq!(ncsi.platform().lock_acquisitions, 0);
    assert!(state_writes(ncsi.port()).is_empty());

    let response = last_generic(&ncsi);
    assert_eq!(response.header.channel_id, 0x02);
    assert_eq!(response.header.control_packet_type, 0x8A);
    assert_eq!(response.reason_code.get(), 0x0001);
}

#[test]
fn clear_initial_state_readies_the_channel() {
    let mut ncsi = dispatcher(2);
    assert_eq!(send(&mut ncsi, 0x01, opcode::CLEAR_INITIAL_STATE, &[]), Outcome::COMPLETE);
    let channel = ncsi.channel(1).unwrap();
    assert!(channel.ready);
    assert_eq!(channel.rx_control_count, 1);
    assert!(!ncsi.channel(0).unwrap().ready);
    assert!(ncsi.state().package().selected);
    assert_eq!(ncsi.port().get(Register::CommandsSeen), 1 << opcode::CLEAR_INITIAL_STATE);

    assert_eq!(send(&mut ncsi, 0x01, opcode::CLEAR_INITIAL_STATE, &[]), Outcome::COMPLETE);
    assert!(ncsi.channel(1).unwrap().ready);
}

#[test]
fn channel_past_the_count_is_an_invalid_parameter() {
    let mut ncsi = dispatcher(1);
    assert_eq!(send(&mut ncsi, 0x02, opcode::ENABLE_CHANNEL, &[]), failed(ReasonCode::InvalidParam));
    assert_eq!(send(&mut ncsi, 0x05, opcode::CLEAR_INITIAL_STATE, &[]), failed(ReasonCode::InvalidParam));
    assert_eq!(send(&mut ncsi, BROADCAST_CHANNEL, opcode::CLEAR_INITIAL_STATE, &[]), failed(ReasonCode::InvalidParam));
    assert_eq!(send(&mut ncsi, BROADCAST_CHANNEL, opcode::GET_VERSION_ID, &[]), failed(ReasonCode::InvalidParam));
    assert!(state_writes(ncsi.port()).is_empty());
    assert_eq!(last_generic(&ncsi).reason_code.get(), 0x0002);
}

#[test]
fn broadcast_select_package() {
    let mut ncsi = dispatcher(1);
    let frame = command(BROADCAST_CHANNEL, opcode::SELECT_PACKAGE, 0x42, &[0, 0, 0, 1]);
    assert_eq!(ncsi.handle_frame(&frame).unwrap(), Outcome::COMPLETE);
    assert!(ncsi.state().package().selected);

    let response = last_generic(&ncsi);
    assert_eq!(response.header.channel_id, 0x1F);
    assert_eq!(response.header.instance_id, 0x42);
    assert_eq!(response.header.control_packet_type, 0x81);
    assert_eq!(response.header.payload_length(), 4);
    assert_eq!(response.response_code.get(), 0);
    assert_eq!(response.reason_code.get(), 0);
    assert_eq!(response.checksum.get(), 0);
    assert_eq!(last_frame(&ncsi).len(), 60);

    assert_eq!(
        state_writes(ncsi.port()),
        [
            (Register::CommandsSeen, 1 << opcode::SELECT_PACKAGE),
            (Register::PackageStatus, PACKAGE_STATUS_SELECTED),
        ]
    );
}

#[test]
fn deselect_package_clears_selection() {
    let mut ncsi = dispatcher(1);
    send(&mut ncsi, BROADCAST_CHANNEL, opcode::SELECT_PACKAGE, &[0; 4]);
    assert_eq!(send(&mut ncsi, BROADCAST_CHANNEL, opcode::DESELECT_PACKAGE, &[]), Outcome::COMPLETE);
    assert!(!ncsi.state().package().selected);
    assert_eq!(
        ncsi.port().get(Register::PackageStatus),
        PACKAGE_STATUS_SELECTED | PACKAGE_STATUS_DESELECTED
    );
    assert_eq!(last_generic(&ncsi).header.control_packet_type, 0x82);
}

#[test]
fn package_command_on_a_channel_needs_init() {
    let mut ncsi = dispatcher(1);
    assert_eq!(send(&mut ncsi, 0x00, opcode::SELECT_PACKAGE, &[0; 4]), failed(ReasonCode::InitializationRequired));
    assert!(!ncsi.state().package().selected);

    make_ready(&mut ncsi, 0);
    assert_eq!(send(&mut ncsi, 0x00, opcode::SELECT_PACKAGE, &[0; 4]), Outcome::COMPLETE);
    assert_eq!(ncsi.channel(0).unwrap().rx_control_count, 2);
}

#[test]
fn channel_flags_toggle_and_keep_other_bits() {
    let mut ncsi = dispatcher(1);
    make_ready(&mut ncsi, 0);
    ncsi.port_mut().modify(Register::ChannelInfo(0), |info| info | 0x100);

    for op in [opcode::ENABLE_CHANNEL, opcode::ENABLE_CHANNEL_NETWORK_TX] {
        assert_eq!(send(&mut ncsi, 0x00, op, &[]), Outcome::COMPLETE);
    }
    assert_eq!(send(&mut ncsi, 0x00, opcode::ENABLE_VLAN, &[0; 4]), Outcome::COMPLETE);
    let channel = ncsi.channel(0).unwrap();
    assert!(channel.ready && channel.enabled && channel.tx_passthrough_enabled && channel.vlan_enabled);

    assert_eq!(send(&mut ncsi, 0x00, opcode::DISABLE_CHANNEL, &[0; 4]), Outcome::COMPLETE);
    assert_eq!(send(&mut ncsi, 0x00, opcode::DISABLE_CHANNEL_NETWORK_TX, &[]), Outcome::COMPLETE);
    assert_eq!(send(&mut ncsi, 0x00, opcode::DISABLE_VLAN, &[]), Outcome::COMPLETE);
    let channel = ncsi.channel(0).unwrap();
    assert!(channel.ready);
    assert!(!channel.enabled && !channel.tx_passthrough_enabled && !channel.vlan_enabled);
    assert_eq!(ncsi.port().get(Register::ChannelInfo(0)), 0x100 | ChannelInfo::READY.bits());
}

#[test]
fn reset_channel_returns_it_to_power_on_state() {
    let mut ncsi = dispatcher(1);
    make_ready(&mut ncsi, 0);
    send(&mut ncsi, 0x00, opcode::ENABLE_CHANNEL, &[]);

    assert_eq!(send(&mut ncsi, 0x00, opcode::RESET_CHANNEL, &[0; 4]), Outcome::COMPLETE);
    let channel = ncsi.channel(0).unwrap();
    assert!(!channel.ready && !channel.enabled);
    assert_eq!(channel.rx_control_count, 0);

    assert_eq!(send(&mut ncsi, 0x00, opcode::ENABLE_CHANNEL, &[]), failed(ReasonCode::InitializationRequired));
}

#[test]
fn aen_enable_leaves_the_control_mask_in_the_mcid_register() {
    let mut ncsi = dispatcher(1);
    make_ready(&mut ncsi, 0);
    let payload = [0, 0, 0, 0x5A, 0x00, 0x00, 0x01, 0x07];
    assert_eq!(send(&mut ncsi, 0x00, opcode::AEN_ENABLE, &payload), Outcome::COMPLETE);
    assert_eq!(ncsi.port().writes_to(Register::ChannelMcid(0)), [0x5A, 0x0107]);
    let channel = ncsi.channel(0).unwrap();
    assert_eq!(channel.aen_control_mask, 0x0107);
    assert_eq!(channel.aen_controller_id, channel.aen_control_mask);
}

#[test]
fn set_link_stores_both_settings_words() {
    let mut ncsi = dispatcher(1);
    make_ready(&mut ncsi, 0);
    let payload = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];
    assert_eq!(send(&mut ncsi, 0x00, opcode::SET_LINK, &payload), Outcome::COMPLETE);
    let channel = ncsi.channel(0).unwrap();
    assert_eq!(channel.link_settings, 0x1234_5678);
    assert_eq!(channel.oem_link_settings, 0x9ABC_DEF0);
}

#[test]
fn get_link_status_reads_the_phy_under_its_lock() {
    let mut ncsi = dispatcher(1);
    make_ready(&mut ncsi, 0);
    let basic = mii::BasicStatus::LINK_STATUS
        | mii::BasicStatus::AUTONEG_COMPLETE
        | mii::BasicStatus::EXTENDED_STATUS
        | mii::BasicStatus::CAPABLE_100_FULL
        | mii::BasicStatus::CAPABLE_10_HALF;
    ncsi.platform_mut().phy_registers.insert((1, mii::BMSR), basic.bits());
    ncsi.platform_mut().phy_registers.insert((1, mii::ESTATUS), mii::ExtendedStatus::CAPABLE_1000T_FULL.bits());

    let frame = command(0x00, opcode::GET_LINK_STATUS, 0x10, &[]);
    assert_eq!(ncsi.handle_frame(&frame).unwrap(), Outcome::COMPLETE);

    let platform = ncsi.platform();
    assert_eq!(platform.phy_reads, [(1, mii::BMSR), (1, mii::ESTATUS)]);
    assert_eq!(platform.lock_acquisitions, 1);
    assert!(!platform.lock_held);
    assert_eq!(platform.reads_without_lock, 0);

    assert_eq!(ncsi.port().get(Register::ChannelStatus(0)), 0x926F);
    let response = LinkStatusResponseFrame::read_from_prefix(&last_frame(&ncsi)).unwrap();
    assert_eq!(response.header.control_packet_type, 0x8A);
    assert_eq!(response.header.instance_id, 0x10);
    assert_eq!(response.header.payload_length(), 16);
    assert_eq!(response.link_status.get(), 0x926F);
    assert_eq!(response.oem_link_status.get(), 0);
    assert_eq!(response.other_indications.get(), 0);
}

#[test]
fn link_status_skips_extended_status_when_absent() {
    let mut ncsi = dispatcher(1);
    make_ready(&mut ncsi, 0);
    ncsi.platform_mut().phy_registers.insert((1, mii::ESTATUS), 0xFFFF);

    send(&mut ncsi, 0x00, opcode::GET_LINK_STATUS, &[]);
    assert_eq!(ncsi.platform().phy_reads, [(1, mii::BMSR)]);
    let status = LinkStatus::from_bits_truncate(ncsi.port().get(Register::ChannelStatus(0)));
    assert_eq!(status, LinkStatus::SPEED_1000T_FULL_DUPLEX | LinkStatus::AUTONEG_ENABLED);
}

#[test]
fn link_status_bits_follow_mii_capabilities() {
    let status = LinkStatus::from_mii(
        mii::BasicStatus::CAPABLE_10_FULL | mii::BasicStatus::CAPABLE_100_HALF,
        mii::ExtendedStatus::CAPABLE_1000T_HALF,
    );
    assert!(status.contains(LinkStatus::CAPABLE_10T_FULL | LinkStatus::CAPABLE_100TX_HALF | LinkStatus::CAPABLE_1000T_HALF));
    assert!(!status.intersects(LinkStatus::LINK_UP | LinkStatus::AUTONEG_COMPLETE | LinkStatus::CAPABLE_1000T_FULL));
}

#[test]
fn set_mac_address_programs_the_port() {
    let mut ncsi = dispatcher(1);
    make_ready(&mut ncsi, 0);
    let payload = [0x00, 0x10, 0x18, 0xAA, 0xBB, 0xCC, 2, 0x01];
    assert_eq!(send(&mut ncsi, 0x00, opcode::SET_MAC_ADDRESS, &payload), Outcome::COMPLETE);
    assert_eq!(ncsi.platform().mac_addresses, [(0, 0x0010, 0x18AA_BBCC, 2, true)]);
}

#[test]
fn enable_broadcast_filtering_is_acknowledged() {
    let mut ncsi = dispatcher(1);
    make_ready(&mut ncsi, 0);
    assert_eq!(send(&mut ncsi, 0x00, opcode::ENABLE_BROADCAST_FILTERING, &[0, 0, 0, 0xF]), Outcome::COMPLETE);
    let registers: Vec<Register> = state_writes(ncsi.port()).into_iter().map(|(r, _)| r).collect();
    assert_eq!(registers, [Register::ChannelRxControlCount(0), Register::CommandsSeen]);
}

#[test]
fn version_reports_live_pci_ids() {
    let mut ncsi = dispatcher(1);
    make_ready(&mut ncsi, 0);
    ncsi.port_mut().set(Register::PciVendorDeviceId, 0x1657_14E4);
    ncsi.port_mut().set(Register::PciSubsystemId, 0x1234_5678);

    assert_eq!(send(&mut ncsi, 0x00, opcode::GET_VERSION_ID, &[]), Outcome::COMPLETE);
    let frame = last_frame(&ncsi);
    assert_eq!(frame.len(), 74);
    let response = VersionResponseFrame::read_from_prefix(&frame).unwrap();
    assert_eq!(response.header.control_packet_type, 0x95);
    assert_eq!(response.header.payload_length(), 40);
    assert_eq!(response.pci_vendor.get(), 0x14E4);
    assert_eq!(response.pci_device.get(), 0x1657);
    assert_eq!(response.pci_subsystem_vendor.get(), 0x5678);
    assert_eq!(response.pci_subsystem_device.get(), 0x1234);
    assert_eq!(&response.firmware_name, b"BCM5719 NCSI");
    assert_eq!(response.firmware_version.get(), 0x0102_01A0);
    assert_eq!(response.manufacturer_id.get(), 0x5454_3232);
    assert_eq!((response.ncsi_major, response.ncsi_minor, response.ncsi_update), (1, 2, 4));

    ncsi.port_mut().set(Register::PciVendorDeviceId, 0x1655_14E4);
    send(&mut ncsi, 0x00, opcode::GET_VERSION_ID, &[]);
    let response = VersionResponseFrame::read_from_prefix(&last_frame(&ncsi)).unwrap();
    assert_eq!(response.pci_device.get(), 0x1655);
}

#[test]
fn capabilities_report_the_channel_count() {
    let mut ncsi = dispatcher(2);
    make_ready(&mut ncsi, 1);
    assert_eq!(send(&mut ncsi, 0x01, opcode::GET_CAPABILITIES, &[]), Outcome::COMPLETE);
    let frame = last_frame(&ncsi);
    assert_eq!(frame.len(), 66);
    let response = CapabilitiesResponseFrame::read_from_prefix(&frame).unwrap();
    assert_eq!(response.header.control_packet_type, 0x96);
    assert_eq!(response.header.channel_id, 0x01);
    assert_eq!(response.header.payload_length(), 32);
    assert_eq!(response.channel_count, 2);
    assert_eq!(response.broadcast_filter_capabilities.get(), 0xF);
    assert_eq!(response.multicast_filter_capabilities.get(), 0x7);
    assert_eq!(response.vlan_mode_support, 0x7);
}

#[test]
fn frames_for_other_packages_are_ignored() {
    let mut ncsi = dispatcher(1);
    let outcome = ncsi.handle_frame(&command(0x20, opcode::SELECT_PACKAGE, 1, &[0; 4])).unwrap();
    assert_eq!(outcome, Outcome::Ignored);
    assert!(ncsi.port().accesses().is_empty());
    assert!(ncsi.port().frames().is_empty());
}

#[test]
fn truncated_frames_are_errors() {
    let mut ncsi = dispatcher(1);
    assert_eq!(ncsi.handle_frame(&[0; 12]), Err(NcsiError::Truncated { needed: 30, available: 12 }));

    let mut frame = command(BROADCAST_CHANNEL, opcode::SELECT_PACKAGE, 1, &[0; 4]);
    frame.truncate(ControlPacketHeader::LEN + 2);
    assert_eq!(ncsi.handle_frame(&frame), Err(NcsiError::Truncated { needed: 34, available: 32 }));
    assert!(!ncsi.state().package().selected);
    assert_eq!(ncsi.port().get(Register::CommandsSeen), 0);
    assert!(state_writes(ncsi.port()).is_empty());
    assert!(ncsi.port().frames().is_empty());
}

#[test]
fn truncated_command_on_a_ready_channel_leaves_its_counters_alone() {
    let mut ncsi = dispatcher(1);
    make_ready(&mut ncsi, 0);
    let frames_before = ncsi.port().frames().len();

    let mut frame = command(0x00, opcode::SET_LINK, 1, &[0x11; 8]);
    frame.truncate(ControlPacketHeader::LEN + 3);
    assert_eq!(ncsi.handle_frame(&frame), Err(NcsiError::Truncated { needed: 38, available: 33 }));

    let channel = ncsi.channel(0).unwrap();
    assert_eq!(channel.rx_control_count, 1);
    assert_eq!(channel.link_settings, 0);
    assert_eq!(ncsi.port().get(Register::CommandsSeen), 1 << opcode::CLEAR_INITIAL_STATE);
    assert_eq!(ncsi.port().frames().len(), frames_before);
}

#[test]
fn default_state_reports_the_configured_channel_count() {
    let state = ChannelPackageState::default();
    assert_eq!(state.channel_count(), ape_config::ncsi::DEFAULT_CHANNEL_COUNT);
    assert!(!state.package().selected);
    assert!(state.is_valid_channel(0));
    assert!(!state.is_valid_channel(ape_config::ncsi::DEFAULT_CHANNEL_COUNT));
}

#[test]
fn full_fifo_surfaces_a_transmit_error() {
    let port = SimulatedPort::new().with_fifo_capacity(8);
    let mut ncsi = Ncsi::with_wait(port, RecordingPlatform::default(), BoundedSpin::new(3), 1).unwrap();
    let result = ncsi.handle_frame(&command(0x00, opcode::ENABLE_CHANNEL, 1, &[]));
    assert_eq!(result, Err(NcsiError::Transmit(TxFifoError::Wait(WaitError::Timeout { polls: 3 }))));
}

#[test]
fn passthrough_services_ready_channels_only() {
    let mut ncsi = dispatcher(4);
    make_ready(&mut ncsi, 0);
    make_ready(&mut ncsi, 2);

    ncsi.handle_passthrough();
    ncsi.handle_passthrough();
    assert_eq!(ncsi.platform().passthrough, [0, 2, 0, 2]);
    let counts: Vec<u32> = (0..4).map(|ch| ncsi.channel(ch).unwrap().rx_all_count).collect();
    assert_eq!(counts, [2, 0, 2, 0]);
}

#[test]
fn init_clears_ready_and_seen_commands() {
    let mut ncsi = dispatcher(4);
    for channel in 0..4 {
        ncsi.port_mut().set(Register::ChannelInfo(channel), (ChannelInfo::READY | ChannelInfo::ENABLED).bits());
    }
    ncsi.port_mut().set(Register::CommandsSeen, 0xFFFF);
    send(&mut ncsi, BROADCAST_CHANNEL, opcode::SELECT_PACKAGE, &[0; 4]);

    ncsi.init();
    assert!(!ncsi.state().package().selected);
    assert_eq!(ncsi.port().get(Register::CommandsSeen), 0);
    for channel in 0..4 {
        let snapshot = ncsi.channel(channel).unwrap();
        assert!(!snapshot.ready);
        assert!(snapshot.enabled);
    }
    assert_eq!(ncsi.channel(4), None);
}

#[test]
fn channel_count_is_bounded() {
    assert!(matches!(
        Ncsi::with_wait(SimulatedPort::new(), RecordingPlatform::default(), BoundedSpin::new(1), 0),
        Err(NcsiError::InvalidChannelCount(0))
    ));
    assert!(matches!(
        Ncsi::new(SimulatedPort::new(), RecordingPlatform::default(), 5),
        Err(NcsiError::InvalidChannelCount(5))
    ));
    assert!(Ncsi::new(SimulatedPort::new(), RecordingPlatform::default(), 4).is_ok());
}
