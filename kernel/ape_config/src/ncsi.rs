/// The number of channel slots backed by shared memory.
pub const MAX_CHANNELS: usize = 4;

/// How many of those channels are reported to the management controller.
pub const DEFAULT_CHANNEL_COUNT: u8 = 1;

/// The package id this controller answers to. Frames for other packages are ignored.
pub const PACKAGE_ID: u8 = 0;

/// MII address of the PHY queried by Get Link Status.
pub const PHY_ADDRESS: u8 = 1;
