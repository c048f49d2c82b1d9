use core::fmt;
use ncsi_tx_fifo::TxFifoError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NcsiError {
    /// The frame ended before a structure the dispatcher had to read.
    Truncated { needed: usize, available: usize },
    /// A response could not be handed to the transmit FIFO.
    Transmit(TxFifoError),
    /// The package was configured with zero channels or more than the shared memory holds.
    InvalidChannelCount(u8),
}

impl From<TxFifoError> for NcsiError {
    fn from(e: TxFifoError) -> Self {
        NcsiError::Transmit(e)
    }
}

impl fmt::Display for NcsiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NcsiError::Truncated { needed, available } =>
                write!(f, "NC-SI frame truncated: needed {} bytes, got {}", needed, available),
            NcsiError::Transmit(e) => write!(f, "failed to send NC-SI response: {}", e),
            NcsiError::InvalidChannelCount(count) =>
                write!(f, "invalid NC-SI channel count {}", count),
        }
    }
}
