//! Polling budget for hardware handshakes.
//!
//! On the bare-metal target the FIFO and buffer allocator are polled without
//! a limit, matching real hardware latency. Hosted builds (simulation, tests)
//! bound every poll loop so a wedged model turns into an error instead of a hang.

cfg_if::cfg_if! {

if #[cfg(target_os = "none")] {
    /// `None` means spin until the hardware answers.
    pub const DEFAULT_POLL_LIMIT: Option<u32> = None;
} else {
    /// The number of register polls before a hosted wait gives up.
    pub const DEFAULT_POLL_LIMIT: Option<u32> = Some(1_000_000);
}

}
