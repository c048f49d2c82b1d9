//! The NC-SI control plane of the APE management firmware.
//!
//! The management controller (BMC) configures and queries the NIC's sideband channels
//! by sending NC-SI control packets. [`Ncsi::handle_frame()`] classifies one such packet,
//! decides whether it may run, runs it against the package and channel state,
//! and answers with exactly one response through the transmit FIFO.
//!
//! A command is rejected with a failure response, rather than run, when:
//! * its opcode is not implemented (unsupported, unknown command);
//! * its payload length differs from the one the command defines;
//! * it targets a channel the package does not report (invalid parameter);
//! * it targets a channel that has not seen Clear Initial State (initialization required).
//!
//! Package commands sent to the package-wide channel id, and Clear Initial State sent
//! to any existing channel, skip the last two checks.
//!
//! Frames addressed to another package on the shared bus are ignored without a response.
//!
//! Frames are processed one at a time, to completion: the dispatcher owns its response
//! buffers and relies on that to reuse them.

#![no_std]

#[macro_use] extern crate log;

pub mod command;
pub mod error;
pub mod frame;
mod handlers;
pub mod link;
pub mod platform;
pub mod response;
pub mod state;

use ape_config::ncsi::{MAX_CHANNELS, PACKAGE_ID};
use ape_regs::{DefaultWait, RegisterPort, WaitStrategy};
use ncsi_tx_fifo::TxFifoTransport;

pub use error::NcsiError;
pub use frame::{ControlPacketHeader, BROADCAST_CHANNEL};
pub use platform::{NcsiPlatform, PhyLockGuard};
pub use response::{FrameTemplates, ReasonCode, ResponseCode};
pub use state::{Channel, ChannelPackageState, Package};

/// What [`Ncsi::handle_frame()`] did with a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The frame was for another package; nothing was sent.
    Ignored,
    /// A response with these codes was sent.
    Responded { response: ResponseCode, reason: ReasonCode },
}

impl Outcome {
    pub const COMPLETE: Outcome = Outcome::Responded {
        response: ResponseCode::CommandComplete,
        reason: ReasonCode::None,
    };
}

/// The NC-SI command dispatcher, together with the state it manages.
///
/// `P` reaches the APE registers, `X` provides PHY and network port access,
/// and `W` decides how long to wait for the transmit FIFO.
pub struct Ncsi<P, X, W = DefaultWait> {
    port: P,
    platform: X,
    wait: W,
    state: ChannelPackageState,
    templates: FrameTemplates,
}

impl<P: RegisterPort, X: NcsiPlatform> Ncsi<P, X, DefaultWait> {
    /// Creates a dispatcher for a package reporting `channel_count` channels,
    /// waiting on hardware the default way for this build.
    pub fn new(port: P, platform: X, channel_count: u8) -> Result<Ncsi<P, X, DefaultWait>, NcsiError> {
        Ncsi::with_wait(port, platform, DefaultWait::default(), channel_count)
    }
}

impl<P: RegisterPort, X: NcsiPlatform, W: WaitStrategy> Ncsi<P, X, W> {
    pub fn with_wait(port: P, platform: X, wait: W, channel_count: u8) -> Result<Ncsi<P, X, W>, NcsiError> {
        let state = ChannelPackageState::new(channel_count)?;
        Ok(Ncsi {
            port,
            platform,
            wait,
            state,
            templates: FrameTemplates::new(channel_count),
        })
    }

    /// Puts the package into its startup state: deselected, every channel awaiting
    /// Clear Initial State, no commands seen.
    pub fn init(&mut self) {
        self.state.init(&mut self.port);
        debug!("Ncsi::init(): {} of {} channels reported", self.state.channel_count(), MAX_CHANNELS);
    }

    /// Handles one NC-SI control packet, already known to carry the NC-SI EtherType.
    ///
    /// Protocol errors are answered on the wire and reported as an [`Outcome`];
    /// an `Err` means the frame was too short to read or the response could not be sent.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Result<Outcome, NcsiError> {
        let header = ControlPacketHeader::parse(frame)?;
        if header.package_id() != PACKAGE_ID {
            trace!("Ncsi::handle_frame(): ignoring frame for package {}", header.package_id());
            return Ok(Outcome::Ignored);
        }

        let opcode = header.control_packet_type;
        let channel = header.channel();
        let command = command::descriptor(opcode);

        if !command.is_supported() {
            warn!("Ncsi::handle_frame(): unsupported command {:#04x} on channel {:#04x}", opcode, channel);
            return self.respond(header, ResponseCode::CommandUnsupported, ReasonCode::UnknownUnsupported);
        }
        if header.payload_length() != command.expected_payload_length {
            warn!("Ncsi::handle_frame(): command {:#04x} has payload length {}, expected {}",
                opcode, header.payload_length(), command.expected_payload_length);
            return self.respond(header, ResponseCode::CommandFailed, ReasonCode::InvalidPayloadLength);
        }

        let valid_channel = self.state.is_valid_channel(channel);
        let package_scope = (command.applies_to_package() && channel == BROADCAST_CHANNEL)
            || (command.ignores_init() && valid_channel);
        if !package_scope {
            if !valid_channel {
                warn!("Ncsi::handle_frame(): command {:#04x} for invalid channel {:#04x}", opcode, channel);
                return self.respond(header, ResponseCode::CommandFailed, ReasonCode::InvalidParam);
            }
            if !self.state.is_ready(&mut self.port, channel) {
                warn!("Ncsi::handle_frame(): command {:#04x} for uninitialized channel {}", opcode, channel);
                return self.respond(header, ResponseCode::CommandFailed, ReasonCode::InitializationRequired);
            }
        }

        let needed = ControlPacketHeader::LEN + command.expected_payload_length as usize;
        if frame.len() < needed {
            warn!("Ncsi::handle_frame(): command {:#04x} cut short at {} of {} bytes", opcode, frame.len(), needed);
            return Err(NcsiError::Truncated { needed, available: frame.len() });
        }

        self.state.accept_command(&mut self.port, channel, opcode);
        let payload = frame.get(ControlPacketHeader::LEN..).unwrap_or(&[]);
        self.dispatch(command.handler, header, payload)
    }

    /// Services the receive side of every ready channel, counting each pump.
    pub fn handle_passthrough(&mut self) {
        for channel in 0..MAX_CHANNELS as u8 {
            if self.state.is_ready(&mut self.port, channel) {
                self.platform.passthrough_receive(channel);
                self.state.count_passthrough(&mut self.port, channel);
            }
        }
    }

    pub fn state(&self) -> &ChannelPackageState {
        &self.state
    }

    /// Reads a snapshot of `channel` from shared memory.
    pub fn channel(&mut self, channel: u8) -> Option<Channel> {
        self.state.channel(&mut self.port, channel)
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn platform(&self) -> &X {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut X {
        &mut self.platform
    }

    /// Sends a generic response to the command in `header`.
    fn respond(&mut self, header: &ControlPacketHeader, response: ResponseCode, reason: ReasonCode) -> Result<Outcome, NcsiError> {
        let frame = self.templates.generic(
            header.instance_id,
            header.channel_id,
            header.control_packet_type,
            response,
            reason,
        );
        TxFifoTransport::new(&mut self.port, &mut self.wait).send(frame, frame.len())?;
        Ok(Outcome::Responded { response, reason })
    }

    fn complete(&mut self, header: &ControlPacketHeader) -> Result<Outcome, NcsiError> {
        self.respond(header, ResponseCode::CommandComplete, ReasonCode::None)
    }
}

#[cfg(test)]
mod test;
