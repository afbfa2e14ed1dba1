// The shared transaction buffer and the non-blocking byte accumulator.

use crate::board::Transport;
use crate::config::MAX_TRANSACTION_BYTES;

/// The single reusable buffer backing every command: it holds incoming
/// payload bytes while a command is being framed and doubles as the in-place
/// full-duplex transfer buffer during SPI execution. The dispatch loop owns
/// it and lends it to the active command; contents are undefined after an
/// abort.
pub struct TransactionBuffer {
    data: [u8; MAX_TRANSACTION_BYTES],
    /// Bytes accumulated so far for the current read request.
    fill: usize,
}

impl TransactionBuffer {
    pub const fn new() -> Self {
        Self {
            data: [0; MAX_TRANSACTION_BYTES],
            fill: 0,
        }
    }

    /// Start a new read phase: forget any previous accumulation.
    pub fn begin_read(&mut self) {
        self.fill = 0;
    }

    /// Pull transport bytes toward a target of `n` accumulated bytes.
    /// Copies however many are ready (at most `n - fill`), and returns true
    /// once all `n` have arrived. Never blocks; call again next poll on
    /// false. Cumulative: progress is kept across calls until `begin_read`.
    pub fn try_fill<T: Transport>(&mut self, transport: &mut T, n: usize) -> bool {
        debug_assert!(n <= MAX_TRANSACTION_BYTES);
        if self.fill < n {
            self.fill += transport.read(&mut self.data[self.fill..n]);
            debug_assert!(self.fill <= n);
        }
        self.fill >= n
    }

    /// Write `count` zero bytes starting at `start`. Used for the extra
    /// padding bytes of a SEND transaction.
    pub fn zero_fill(&mut self, start: usize, count: usize) {
        self.data[start..start + count].fill(0);
    }

    /// The first `n` bytes.
    pub fn bytes(&self, n: usize) -> &[u8] {
        &self.data[..n]
    }

    /// Mutable access to the first `n` bytes (the SPI transfer window).
    pub fn bytes_mut(&mut self, n: usize) -> &mut [u8] {
        &mut self.data[..n]
    }
}

// =============================================================================
// Tests
// =============================================================================
