//! Assembles the NC-SI link status word from the PHY's MII status registers.

use bitflags::bitflags;

/// MII register numbers read for Get Link Status.
pub mod mii {
    /// Basic mode status register.
    pub const BMSR: u8 = 0x01;
    /// Extended status register, present when [`BasicStatus::EXTENDED_STATUS`] is set.
    pub const ESTATUS: u8 = 0x0F;

    bitflags::bitflags! {
        pub struct BasicStatus: u16 {
            const LINK_STATUS          = 0x0004;
            const AUTONEG_COMPLETE     = 0x0020;
            const EXTENDED_STATUS      = 0x0100;
            const CAPABLE_10_HALF      = 0x0800;
            const CAPABLE_10_FULL      = 0x1000;
            const CAPABLE_100_HALF     = 0x2000;
            const CAPABLE_100_FULL     = 0x4000;
        }
    }

    bitflags::bitflags! {
        pub struct ExtendedStatus: u16 {
            const CAPABLE_1000T_HALF   = 0x1000;
            const CAPABLE_1000T_FULL   = 0x2000;
        }
    }
}

use mii::{BasicStatus, ExtendedStatus};

bitflags! {
    /// The link status word reported by Get Link Status and kept in the channel status register.
    pub struct LinkStatus: u32 {
        const LINK_UP                 = 1 << 0;
        /// Speed and duplex field (bits 4:1) set to 1000BASE-T full duplex.
        const SPEED_1000T_FULL_DUPLEX = 0x7 << 1;
        const AUTONEG_ENABLED         = 1 << 5;
        const AUTONEG_COMPLETE        = 1 << 6;
        const CAPABLE_1000T_FULL      = 1 << 9;
        const CAPABLE_1000T_HALF      = 1 << 10;
        const CAPABLE_100TX_FULL      = 1 << 12;
        const CAPABLE_100TX_HALF      = 1 << 13;
        const CAPABLE_10T_FULL        = 1 << 14;
        const CAPABLE_10T_HALF        = 1 << 15;
    }
}

impl LinkStatus {
    /// Builds the link status word from the PHY's basic and extended status registers.
    ///
    /// The speed and duplex field always reports 1000BASE-T full duplex;
    /// the negotiated speed is not read from the PHY yet.
    pub fn from_mii(basic: BasicStatus, extended: ExtendedStatus) -> LinkStatus {
        let mut status = LinkStatus::SPEED_1000T_FULL_DUPLEX | LinkStatus::AUTONEG_ENABLED;
        status.set(LinkStatus::LINK_UP, basic.contains(BasicStatus::LINK_STATUS));
        status.set(LinkStatus::AUTONEG_COMPLETE, basic.contains(BasicStatus::AUTONEG_COMPLETE));
        status.set(LinkStatus::CAPABLE_1000T_FULL, extended.contains(ExtendedStatus::CAPABLE_1000T_FULL));
        status.set(LinkStatus::CAPABLE_1000T_HALF, extended.contains(ExtendedStatus::CAPABLE_1000T_HALF));
        status.set(LinkStatus::CAPABLE_100TX_FULL, basic.contains(BasicStatus::CAPABLE_100_FULL));
        status.set(LinkStatus::CAPABLE_100TX_HALF, basic.contains(BasicStatus::CAPABLE_100_HALF));
        status.set(LinkStatus::CAPABLE_10T_FULL, basic.contains(BasicStatus::CAPABLE_10_FULL));
        status.set(LinkStatus::CAPABLE_10T_HALF, basic.contains(BasicStatus::CAPABLE_10_HALF));
        status
    }
}
