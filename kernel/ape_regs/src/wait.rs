use core::fmt;

/// The error returned by a bounded wait that ran out of polls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitError {
    Timeout { polls: u32 },
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitError::Timeout { polls } => write!(f, "hardware did not respond after {} polls", polls),
        }
    }
}

/// How a hardware handshake waits for its condition to become true.
pub trait WaitStrategy {
    /// Repeatedly evaluates `condition` until it returns `true`.
    ///
    /// `condition` is always evaluated at least once.
    fn wait_until<F: FnMut() -> bool>(&mut self, condition: F) -> Result<(), WaitError>;
}

impl<W: WaitStrategy> WaitStrategy for &mut W {
    fn wait_until<F: FnMut() -> bool>(&mut self, condition: F) -> Result<(), WaitError> {
        (**self).wait_until(condition)
    }
}

/// Spins until the condition holds, however long that takes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Spin;

impl WaitStrategy for Spin {
    fn wait_until<F: FnMut() -> bool>(&mut self, mut condition: F) -> Result<(), WaitError> {
        while !condition() {
            core::hint::spin_loop();
        }
        Ok(())
    }
}

/// Spins for at most `limit` evaluations of the condition.
#[derive(Clone, Copy, Debug)]
pub struct BoundedSpin {
    limit: u32,
}

impl BoundedSpin {
    pub const fn new(limit: u32) -> BoundedSpin {
        BoundedSpin { limit }
    }

    pub const fn limit(&self) -> u32 {
        self.limit
    }
}

impl WaitStrategy for BoundedSpin {
    fn wait_until<F: FnMut() -> bool>(&mut self, mut condition: F) -> Result<(), WaitError> {
        for _ in 0..self.limit.max(1) {
            if condition() {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        warn!("BoundedSpin::wait_until(): gave up after {} polls", self.limit);
        Err(WaitError::Timeout { polls: self.limit })
    }
}

/// The wait strategy selected by [`ape_config::wait::DEFAULT_POLL_LIMIT`].
#[derive(Clone, Copy, Debug)]
pub enum DefaultWait {
    Unbounded(Spin),
    Bounded(BoundedSpin),
}

impl Default for DefaultWait {
    fn default() -> Self {
        match ape_config::wait::DEFAULT_POLL_LIMIT {
            Some(limit) => DefaultWait::Bounded(BoundedSpin::new(limit)),
            None => DefaultWait::Unbounded(Spin),
        }
    }
}

impl WaitStrategy for DefaultWait {
    fn wait_until<F: FnMut() -> bool>(&mut self, condition: F) -> Result<(), WaitError> {
        match self {
            DefaultWait::Unbounded(spin) => spin.wait_until(condition),
            DefaultWait::Bounded(bounded) => bounded.wait_until(condition),
        }
    }
}
