// Board abstraction: the trait seams between the protocol engine and the
// hardware. A firmware build implements these against its HAL; tests use
// the mocks in `testutil`.

use embedded_hal::spi::Mode;

// =============================================================================
// Serial transport
// =============================================================================

/// A reliable, ordered byte stream to the host (typically USB CDC-ACM).
/// Reads must never block; writes are fire-and-forget sinks.
pub trait Transport {
    /// Number of received bytes ready to be read right now.
    fn available(&self) -> usize;

    /// Copy up to `buf.len()` received bytes into `buf` without blocking.
    /// Returns the number of bytes copied. Consumed bytes cannot be re-read.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Queue response bytes for transmission to the host.
    fn write(&mut self, data: &[u8]);
}

// =============================================================================
// SPI port
// =============================================================================

/// Bus clock and mode for one transaction, applied before the transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    pub frequency: u32,
    pub mode: Mode,
}

/// The SPI peripheral, excluding chip-select (that lives in `CsBank` so the
/// dispatch loop can force it released without going through a handler).
pub trait SpiPort {
    /// Apply bus clock and mode. Takes effect before the next transfer.
    fn reconfigure(&mut self, config: SpiConfig);

    /// Full-duplex transfer: clock out `words`, replacing them in place with
    /// the bytes read back. A zero-length transfer performs no transaction
    /// but lets the clock line settle to the configured idle level.
    fn transfer_in_place(&mut self, words: &mut [u8]);
}

// =============================================================================
// Chip-select bank
// =============================================================================

/// The four active-low chip-select outputs. Implementations must guarantee
/// that `select` drives exactly one line low.
pub trait CsBank {
    /// Assert (drive low) the given line. Indices ≥ 4 are ignored.
    fn select(&mut self, index: u8);

    /// Deassert (drive high) all lines.
    fn release_all(&mut self);
}

// =============================================================================
// Auxiliary pins
// =============================================================================

/// Mode of an auxiliary pin.
// NOTE: numeric values match the wire protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AuxPinMode {
    InputPullDown = 1,
    InputPullUp = 2,
    Output = 3,
}

impl AuxPinMode {
    pub fn from_wire(b: u8) -> Option<Self> {
        match b {
            1 => Some(AuxPinMode::InputPullDown),
            2 => Some(AuxPinMode::InputPullUp),
            3 => Some(AuxPinMode::Output),
            _ => None,
        }
    }
}

/// Eight general-purpose digital pins, independent of the SPI bus. The
/// logical-to-physical mapping is fixed by the board at startup.
pub trait AuxPins {
    /// Reconfigure one pin. Indices ≥ 8 are ignored.
    fn set_mode(&mut self, pin: u8, mode: AuxPinMode);

    /// Sample all pins, packed MSB-first: pin 7 → bit 7 ... pin 0 → bit 0.
    fn read_all(&mut self) -> u8;

    /// For each bit set in `mask`, drive the corresponding pin to the
    /// corresponding bit of `values`. Pins not configured as outputs are
    /// still written.
    fn write_masked(&mut self, values: u8, mask: u8);
}

// =============================================================================
// Heartbeat LED
// =============================================================================

/// The liveness indicator sink. Updates may be expensive (e.g. a neopixel),
/// so the engine only calls this when the state changes.
pub trait Led {
    fn update(&mut self, on: bool);
}
