use volatile::Volatile;
use crate::{Register, RegisterPort};

/// A [`RegisterPort`] backed by the APE's memory-mapped registers.
///
/// Register addresses come from [`Register::address()`], offset by `base`,
/// which is zero when running on the APE itself.
pub struct MmioPort {
    base: usize,
}

impl MmioPort {
    /// Creates a port over the APE register space starting at `base`.
    ///
    /// # Safety
    /// Every address produced by [`Register::address()`] plus `base` must be mapped,
    /// 4-byte aligned device memory that is valid for volatile 32-bit accesses
    /// for as long as this port exists.
    pub const unsafe fn new(base: usize) -> MmioPort {
        MmioPort { base }
    }

    fn cell(&mut self, register: Register) -> &mut Volatile<u32> {
        let address = self.base + register.address();
        // SAFETY: the caller of `new()` guaranteed that this address is valid device memory.
        unsafe { &mut *(address as *mut Volatile<u32>) }
    }
}

impl RegisterPort for MmioPort {
    fn read(&mut self, register: Register) -> u32 {
        self.cell(register).read()
    }

    fn write(&mut self, register: Register, value: u32) {
        self.cell(register).write(value)
    }
}
