//! The services the dispatcher borrows from the rest of the firmware.

/// PHY access and network port operations provided by the surrounding firmware.
pub trait NcsiPlatform {
    /// Takes the lock that serializes PHY register access with other PHY users.
    fn acquire_phy_lock(&mut self);

    fn release_phy_lock(&mut self);

    /// Reads MII register `register` of the PHY at address `phy`.
    /// Only called while the PHY lock is held.
    fn read_phy_register(&mut self, phy: u8, register: u8) -> u16;

    /// Programs MAC filter `mac_number` of `channel`'s port.
    /// `high` holds the first two bytes of the address, `low` the last four.
    fn set_mac_address(&mut self, channel: u8, high: u16, low: u32, mac_number: u8, enable: bool);

    /// Moves pending frames received on `channel`'s port to the management controller.
    fn passthrough_receive(&mut self, channel: u8);
}

impl<X: NcsiPlatform + ?Sized> NcsiPlatform for &mut X {
    fn acquire_phy_lock(&mut self) { (**self).acquire_phy_lock() }
    fn release_phy_lock(&mut self) { (**self).release_phy_lock() }
    fn read_phy_register(&mut self, phy: u8, register: u8) -> u16 {
        (**self).read_phy_register(phy, register)
    }
    fn set_mac_address(&mut self, channel: u8, high: u16, low: u32, mac_number: u8, enable: bool) {
        (**self).set_mac_address(channel, high, low, mac_number, enable)
    }
    fn passthrough_receive(&mut self, channel: u8) { (**self).passthrough_receive(channel) }
}

/// Holds the PHY lock for as long as it lives.
pub struct PhyLockGuard<'p, X: NcsiPlatform + ?Sized> {
    platform: &'p mut X,
}

impl<'p, X: NcsiPlatform + ?Sized> PhyLockGuard<'p, X> {
    pub fn acquire(platform: &'p mut X) -> PhyLockGuard<'p, X> {
        platform.acquire_phy_lock();
        PhyLockGuard { platform }
    }

    pub fn read_register(&mut self, phy: u8, register: u8) -> u16 {
        self.platform.read_phy_register(phy, register)
    }
}

impl<'p, X: NcsiPlatform + ?Sized> Drop for PhyLockGuard<'p, X> {
    fn drop(&mut self) {
        self.platform.release_phy_lock();
    }
}
