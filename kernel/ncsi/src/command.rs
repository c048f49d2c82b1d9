//! The NC-SI command table.
//!
//! The opcode space is closed, so commands are described by a fixed array indexed by
//! opcode rather than by trait objects. The table is total: opcodes this firmware does
//! not implement, including everything past the end of the array, resolve to
//! [`Handler::Unsupported`].

use bitflags::bitflags;

/// Control packet types of the commands the dispatcher knows.
pub mod opcode {
    pub const CLEAR_INITIAL_STATE: u8 = 0x00;
    pub const SELECT_PACKAGE: u8 = 0x01;
    pub const DESELECT_PACKAGE: u8 = 0x02;
    pub const ENABLE_CHANNEL: u8 = 0x03;
    pub const DISABLE_CHANNEL: u8 = 0x04;
    pub const RESET_CHANNEL: u8 = 0x05;
    pub const ENABLE_CHANNEL_NETWORK_TX: u8 = 0x06;
    pub const DISABLE_CHANNEL_NETWORK_TX: u8 = 0x07;
    pub const AEN_ENABLE: u8 = 0x08;
    pub const SET_LINK: u8 = 0x09;
    pub const GET_LINK_STATUS: u8 = 0x0A;
    pub const SET_VLAN_FILTER: u8 = 0x0B;
    pub const ENABLE_VLAN: u8 = 0x0C;
    pub const DISABLE_VLAN: u8 = 0x0D;
    pub const SET_MAC_ADDRESS: u8 = 0x0E;
    pub const ENABLE_BROADCAST_FILTERING: u8 = 0x10;
    pub const DISABLE_BROADCAST_FILTERING: u8 = 0x11;
    pub const ENABLE_MULTICAST_FILTERING: u8 = 0x12;
    pub const DISABLE_MULTICAST_FILTERING: u8 = 0x13;
    pub const SET_FLOW_CONTROL: u8 = 0x14;
    pub const GET_VERSION_ID: u8 = 0x15;
    pub const GET_CAPABILITIES: u8 = 0x16;
    pub const GET_PARAMETERS: u8 = 0x17;
    pub const GET_CONTROLLER_PACKET_STATISTICS: u8 = 0x18;
    pub const GET_NCSI_STATISTICS: u8 = 0x19;
    pub const GET_NCSI_PASSTHROUGH_STATISTICS: u8 = 0x1A;
}

bitflags! {
    /// Where a command is accepted without the usual per-channel checks.
    pub struct CommandScope: u8 {
        /// Accepted when addressed to the whole package.
        const PACKAGE = 1 << 0;
        /// Accepted on a channel that still needs initialization.
        const IGNORE_INIT = 1 << 1;
    }
}

/// What the dispatcher does with a command that passed its checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handler {
    ClearInitialState,
    SelectPackage,
    DeselectPackage,
    EnableChannel,
    DisableChannel,
    ResetChannel,
    EnableChannelNetworkTx,
    DisableChannelNetworkTx,
    AenEnable,
    SetLink,
    GetLinkStatus,
    EnableVlan,
    DisableVlan,
    SetMacAddress,
    EnableBroadcastFiltering,
    GetVersionId,
    GetCapabilities,
    Unsupported,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub expected_payload_length: u16,
    pub scope: CommandScope,
    pub handler: Handler,
}

impl CommandDescriptor {
    pub fn is_supported(&self) -> bool {
        self.handler != Handler::Unsupported
    }

    pub fn applies_to_package(&self) -> bool {
        self.scope.contains(CommandScope::PACKAGE)
    }

    pub fn ignores_init(&self) -> bool {
        self.scope.contains(CommandScope::IGNORE_INIT)
    }
}

const fn channel(expected_payload_length: u16, handler: Handler) -> CommandDescriptor {
    CommandDescriptor { expected_payload_length, scope: CommandScope::empty(), handler }
}

const fn scoped(expected_payload_length: u16, scope: CommandScope, handler: Handler) -> CommandDescriptor {
    CommandDescriptor { expected_payload_length, scope, handler }
}

const UNSUPPORTED: CommandDescriptor = channel(0, Handler::Unsupported);

/// Number of opcodes covered by [`COMMANDS`].
pub const COMMAND_COUNT: usize = opcode::GET_NCSI_PASSTHROUGH_STATISTICS as usize + 1;

/// Descriptors indexed by opcode.
///
/// Stubbed opcodes keep their protocol payload length for reference,
/// but are answered as unsupported before it is checked.
pub static COMMANDS: [CommandDescriptor; COMMAND_COUNT] = [
    scoped(0, CommandScope::IGNORE_INIT, Handler::ClearInitialState), // 0x00
    scoped(4, CommandScope::PACKAGE, Handler::SelectPackage),         // 0x01
    scoped(0, CommandScope::PACKAGE, Handler::DeselectPackage),       // 0x02
    channel(0, Handler::EnableChannel),                               // 0x03
    channel(4, Handler::DisableChannel),                              // 0x04
    channel(4, Handler::ResetChannel),                                // 0x05
    channel(0, Handler::EnableChannelNetworkTx),                      // 0x06
    channel(0, Handler::DisableChannelNetworkTx),                     // 0x07
    channel(8, Handler::AenEnable),                                   // 0x08
    channel(8, Handler::SetLink),                                     // 0x09
    channel(0, Handler::GetLinkStatus),                               // 0x0A
    channel(8, Handler::Unsupported),                                 // 0x0B
    channel(4, Handler::EnableVlan),                                  // 0x0C
    channel(0, Handler::DisableVlan),                                 // 0x0D
    channel(8, Handler::SetMacAddress),                               // 0x0E
    UNSUPPORTED,                                                      // 0x0F
    channel(4, Handler::EnableBroadcastFiltering),                    // 0x10
    channel(0, Handler::Unsupported),                                 // 0x11
    channel(4, Handler::Unsupported),                                 // 0x12
    channel(0, Handler::Unsupported),                                 // 0x13
    channel(4, Handler::Unsupported),                                 // 0x14
    channel(0, Handler::GetVersionId),                                // 0x15
    channel(0, Handler::GetCapabilities),                             // 0x16
    channel(0, Handler::Unsupported),                                 // 0x17
    channel(0, Handler::Unsupported),                                 // 0x18
    channel(0, Handler::Unsupported),                                 // 0x19
    channel(0, Handler::Unsupported),                                 // 0x1A
];

/// Looks up the descriptor for `opcode`.
pub fn descriptor(opcode: u8) -> &'static CommandDescriptor {
    COMMANDS.get(opcode as usize).unwrap_or(&UNSUPPORTED)
}
