//! The command handlers. Each one runs only after the dispatcher's checks passed,
//! and ends by sending exactly one response.

use ape_config::ncsi::PHY_ADDRESS;
use ape_regs::{Register, RegisterPort, WaitStrategy};
use ncsi_tx_fifo::TxFifoTransport;
use crate::{Ncsi, NcsiError, NcsiPlatform, Outcome, PhyLockGuard};
use crate::command::Handler;
use crate::frame::{
    read_payload, AenEnablePayload, ControlPacketHeader, SelectPackagePayload,
    SetLinkPayload, SetMacAddressPayload,
};
use crate::link::{mii, LinkStatus};
use crate::response::{PciIds, ReasonCode, ResponseCode};
use crate::state::{ChannelInfo, PACKAGE_STATUS_DESELECTED, PACKAGE_STATUS_SELECTED};

impl<P: RegisterPort, X: NcsiPlatform, W: WaitStrategy> Ncsi<P, X, W> {
    pub(crate) fn dispatch(&mut self, handler: Handler, header: &ControlPacketHeader, payload: &[u8]) -> Result<Outcome, NcsiError> {
        let channel = header.channel();
        match handler {
            Handler::ClearInitialState => {
                debug!("Ncsi::clear_initial_state(): channel {}", channel);
                self.set_flag(header, ChannelInfo::READY, true)
            }
            Handler::SelectPackage => self.select_package(header, payload),
            Handler::DeselectPackage => self.deselect_package(header),
            Handler::EnableChannel => self.set_flag(header, ChannelInfo::ENABLED, true),
            Handler::DisableChannel => self.set_flag(header, ChannelInfo::ENABLED, false),
            Handler::ResetChannel => {
                debug!("Ncsi::reset_channel(): channel {}", channel);
                self.state.reset_channel(&mut self.port, channel);
                self.complete(header)
            }
            Handler::EnableChannelNetworkTx => self.set_flag(header, ChannelInfo::TX_PASSTHROUGH, true),
            Handler::DisableChannelNetworkTx => self.set_flag(header, ChannelInfo::TX_PASSTHROUGH, false),
            Handler::AenEnable => self.aen_enable(header, payload),
            Handler::SetLink => self.set_link(header, payload),
            Handler::GetLinkStatus => self.get_link_status(header),
            Handler::EnableVlan => self.set_flag(header, ChannelInfo::VLAN, true),
            Handler::DisableVlan => self.set_flag(header, ChannelInfo::VLAN, false),
            Handler::SetMacAddress => self.set_mac_address(header, payload),
            Handler::EnableBroadcastFiltering => {
                debug!("Ncsi::enable_broadcast_filtering(): channel {}, acknowledged", channel);
                self.complete(header)
            }
            Handler::GetVersionId => self.get_version_id(header),
            Handler::GetCapabilities => self.get_capabilities(header),
            Handler::Unsupported => self.respond(header, ResponseCode::CommandUnsupported, ReasonCode::UnknownUnsupported),
        }
    }

    fn set_flag(&mut self, header: &ControlPacketHeader, flag: ChannelInfo, value: bool) -> Result<Outcome, NcsiError> {
        let channel = header.channel();
        debug!("Ncsi::set_flag(): channel {} {:?} = {}", channel, flag, value);
        self.state.set_channel_flags(&mut self.port, channel, flag, value);
        self.complete(header)
    }

    fn select_package(&mut self, header: &ControlPacketHeader, payload: &[u8]) -> Result<Outcome, NcsiError> {
        let request: &SelectPackagePayload = read_payload(payload)?;
        debug!("Ncsi::select_package(): hardware arbitration disabled: {}", request.hardware_arbitration_disabled());
        self.state.set_selected(true);
        self.state.raise_package_status(&mut self.port, PACKAGE_STATUS_SELECTED);
        self.complete(header)
    }

    /// The package stays selected until its response is out.
    fn deselect_package(&mut self, header: &ControlPacketHeader) -> Result<Outcome, NcsiError> {
        debug!("Ncsi::deselect_package()");
        self.state.raise_package_status(&mut self.port, PACKAGE_STATUS_DESELECTED);
        let result = self.complete(header);
        self.state.set_selected(false);
        result
    }

    /// Both the controller id and the control mask land in the same channel register,
    /// so the mask is what remains.
    fn aen_enable(&mut self, header: &ControlPacketHeader, payload: &[u8]) -> Result<Outcome, NcsiError> {
        let request: &AenEnablePayload = read_payload(payload)?;
        let channel = header.channel();
        let control = request.control.get();
        debug!("Ncsi::aen_enable(): channel {} MC id {:#04x} control {:#010x}", channel, request.mc_id, control);
        self.port.write(Register::ChannelMcid(channel), request.mc_id as u32);
        self.port.write(Register::ChannelMcid(channel), control);
        self.complete(header)
    }

    fn set_link(&mut self, header: &ControlPacketHeader, payload: &[u8]) -> Result<Outcome, NcsiError> {
        let request: &SetLinkPayload = read_payload(payload)?;
        let channel = header.channel();
        let (settings, oem_settings) = (request.link_settings.get(), request.oem_link_settings.get());
        debug!("Ncsi::set_link(): channel {} settings {:#010x} OEM {:#010x}", channel, settings, oem_settings);
        self.port.write(Register::ChannelSetting1(channel), settings);
        self.port.write(Register::ChannelSetting2(channel), oem_settings);
        self.complete(header)
    }

    fn get_link_status(&mut self, header: &ControlPacketHeader) -> Result<Outcome, NcsiError> {
        let (basic, extended) = {
            let mut phy = PhyLockGuard::acquire(&mut self.platform);
            let basic = mii::BasicStatus::from_bits_truncate(phy.read_register(PHY_ADDRESS, mii::BMSR));
            let extended = if basic.contains(mii::BasicStatus::EXTENDED_STATUS) {
                mii::ExtendedStatus::from_bits_truncate(phy.read_register(PHY_ADDRESS, mii::ESTATUS))
            } else {
                mii::ExtendedStatus::empty()
            };
            (basic, extended)
        };

        let link_status = LinkStatus::from_mii(basic, extended);
        let channel = header.channel();
        trace!("Ncsi::get_link_status(): channel {} status {:?}", channel, link_status);
        self.port.write(Register::ChannelStatus(channel), link_status.bits());

        let frame = self.templates.link_status(header.instance_id, header.channel_id, link_status.bits(), 0, 0);
        TxFifoTransport::new(&mut self.port, &mut self.wait).send(frame, frame.len())?;
        Ok(Outcome::COMPLETE)
    }

    fn set_mac_address(&mut self, header: &ControlPacketHeader, payload: &[u8]) -> Result<Outcome, NcsiError> {
        let request: &SetMacAddressPayload = read_payload(payload)?;
        let channel = header.channel();
        debug!("Ncsi::set_mac_address(): channel {} MAC {:02x?} number {} enable {} type {}",
            channel, request.mac, request.mac_number, request.enable(), request.address_type());
        self.platform.set_mac_address(channel, request.high(), request.low(), request.mac_number, request.enable());
        self.complete(header)
    }

    fn get_version_id(&mut self, header: &ControlPacketHeader) -> Result<Outcome, NcsiError> {
        let pci = PciIds::from_registers(
            self.port.read(Register::PciVendorDeviceId),
            self.port.read(Register::PciSubsystemId),
        );
        let frame = self.templates.version(header.instance_id, header.channel_id, header.control_packet_type, pci);
        TxFifoTransport::new(&mut self.port, &mut self.wait).send(frame, frame.len())?;
        Ok(Outcome::COMPLETE)
    }

    fn get_capabilities(&mut self, header: &ControlPacketHeader) -> Result<Outcome, NcsiError> {
        let frame = self.templates.capabilities(header.instance_id, header.channel_id, header.control_packet_type);
        TxFifoTransport::new(&mut self.port, &mut self.wait).send(frame, frame.len())?;
        Ok(Outcome::COMPLETE)
    }
}
