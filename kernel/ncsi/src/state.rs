//! Package and channel state.
//!
//! The package's selection flag lives in the dispatcher. Everything about a channel
//! lives in the memory shared with the host driver, so channel state is read and written
//! through the register port every time rather than cached.

use bitflags::bitflags;
use ape_config::ncsi::{DEFAULT_CHANNEL_COUNT, MAX_CHANNELS};
use ape_regs::{Register, RegisterPort};
use crate::error::NcsiError;

bitflags! {
    /// The channel info register.
    pub struct ChannelInfo: u32 {
        /// Cleared at startup and by Reset Channel; set by Clear Initial State.
        const READY          = 1 << 0;
        const ENABLED        = 1 << 1;
        const TX_PASSTHROUGH = 1 << 2;
        const VLAN           = 1 << 3;
    }
}

/// Package status bit raised when the package is selected.
pub const PACKAGE_STATUS_SELECTED: u32 = 0x800;
/// Package status bit raised when the package is deselected.
pub const PACKAGE_STATUS_DESELECTED: u32 = 0x80;

/// A snapshot of one channel, as held in shared memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Channel {
    pub ready: bool,
    pub enabled: bool,
    pub tx_passthrough_enabled: bool,
    pub vlan_enabled: bool,
    pub link_settings: u32,
    pub oem_link_settings: u32,
    /// AEN Enable writes the controller id and then the control mask to the same
    /// register, so this and `aen_control_mask` always read back the same value.
    pub aen_controller_id: u32,
    /// See `aen_controller_id`.
    pub aen_control_mask: u32,
    pub link_status: u32,
    pub rx_control_count: u32,
    pub rx_all_count: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Package {
    pub selected: bool,
}

/// The package and the channels it reports to the management controller.
#[derive(Debug)]
pub struct ChannelPackageState {
    package: Package,
    channel_count: u8,
}

const _: () = assert!(DEFAULT_CHANNEL_COUNT >= 1 && DEFAULT_CHANNEL_COUNT as usize <= MAX_CHANNELS);

impl Default for ChannelPackageState {
    /// A deselected package reporting [`DEFAULT_CHANNEL_COUNT`] channels.
    fn default() -> Self {
        ChannelPackageState { package: Package::default(), channel_count: DEFAULT_CHANNEL_COUNT }
    }
}

impl ChannelPackageState {
    /// Fails unless `1 <= channel_count <= MAX_CHANNELS`.
    pub fn new(channel_count: u8) -> Result<ChannelPackageState, NcsiError> {
        if channel_count == 0 || channel_count as usize > MAX_CHANNELS {
            return Err(NcsiError::InvalidChannelCount(channel_count));
        }
        Ok(ChannelPackageState { package: Package::default(), channel_count })
    }

    pub fn package(&self) -> Package {
        self.package
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.package.selected = selected;
    }

    pub fn channel_count(&self) -> u8 {
        self.channel_count
    }

    /// Whether `channel` is one of the channels reported to the management controller.
    pub fn is_valid_channel(&self, channel: u8) -> bool {
        channel < self.channel_count
    }

    /// Reads a snapshot of `channel`, or `None` past the last channel slot in shared memory.
    pub fn channel<P: RegisterPort>(&self, port: &mut P, channel: u8) -> Option<Channel> {
        if channel as usize >= MAX_CHANNELS {
            return None;
        }
        let info = channel_info(port, channel);
        let mcid = port.read(Register::ChannelMcid(channel));
        Some(Channel {
            ready: info.contains(ChannelInfo::READY),
            enabled: info.contains(ChannelInfo::ENABLED),
            tx_passthrough_enabled: info.contains(ChannelInfo::TX_PASSTHROUGH),
            vlan_enabled: info.contains(ChannelInfo::VLAN),
            link_settings: port.read(Register::ChannelSetting1(channel)),
            oem_link_settings: port.read(Register::ChannelSetting2(channel)),
            aen_controller_id: mcid,
            aen_control_mask: mcid,
            link_status: port.read(Register::ChannelStatus(channel)),
            rx_control_count: port.read(Register::ChannelRxControlCount(channel)),
            rx_all_count: port.read(Register::ChannelRxAllCount(channel)),
        })
    }

    pub fn is_ready<P: RegisterPort>(&self, port: &mut P, channel: u8) -> bool {
        channel_info(port, channel).contains(ChannelInfo::READY)
    }

    /// Sets or clears `flags` in `channel`'s info register, leaving its other bits alone.
    pub fn set_channel_flags<P: RegisterPort>(&self, port: &mut P, channel: u8, flags: ChannelInfo, value: bool) {
        port.modify(Register::ChannelInfo(channel), |raw| {
            let mut info = ChannelInfo::from_bits_truncate(raw);
            info.set(flags, value);
            (raw & !ChannelInfo::all().bits()) | info.bits()
        });
    }

    /// Returns `channel` to its power-on state: all info flags and the control packet count cleared.
    pub fn reset_channel<P: RegisterPort>(&self, port: &mut P, channel: u8) {
        port.write(Register::ChannelInfo(channel), 0);
        port.write(Register::ChannelRxControlCount(channel), 0);
    }

    /// Records a command that passed the dispatcher's checks: selects the package,
    /// marks `opcode` in the commands-seen mask and counts the packet on `channel` if it is valid.
    pub fn accept_command<P: RegisterPort>(&mut self, port: &mut P, channel: u8, opcode: u8) {
        if self.is_valid_channel(channel) {
            port.modify(Register::ChannelRxControlCount(channel), |count| count.wrapping_add(1));
        }
        self.package.selected = true;
        port.modify(Register::CommandsSeen, |seen| seen | 1 << opcode);
    }

    pub fn raise_package_status<P: RegisterPort>(&self, port: &mut P, bits: u32) {
        port.modify(Register::PackageStatus, |status| status | bits);
    }

    /// Counts one passthrough pump on `channel`.
    pub fn count_passthrough<P: RegisterPort>(&self, port: &mut P, channel: u8) {
        port.modify(Register::ChannelRxAllCount(channel), |count| count.wrapping_add(1));
    }

    /// Clears the ready flag of every channel slot and forgets which commands were seen.
    pub fn init<P: RegisterPort>(&mut self, port: &mut P) {
        for channel in 0..MAX_CHANNELS as u8 {
            self.set_channel_flags(port, channel, ChannelInfo::READY, false);
        }
        port.write(Register::CommandsSeen, 0);
        self.package = Package::default();
    }
}

fn channel_info<P: RegisterPort>(port: &mut P, channel: u8) -> ChannelInfo {
    ChannelInfo::from_bits_truncate(port.read(Register::ChannelInfo(channel)))
}
