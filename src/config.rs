// Device identity and protocol constants.

// =============================================================================
// Device identity
// =============================================================================

/// Version of the wire protocol, reported by INFO.
pub const API_VERSION: u8 = 1;

/// Firmware version, reported big-endian by INFO.
pub const FIRMWARE_VERSION: u16 = 1;

// =============================================================================
// Transaction limits
// =============================================================================

/// Capacity of the shared transaction buffer. Bounds the total number of
/// bytes (custom + extra) in a single SPI transaction.
pub const MAX_TRANSACTION_BYTES: usize = 1024;

/// All bytes of a command must arrive within this period, measured from the
/// moment the selector byte was consumed.
pub const COMMAND_TIMEOUT_MILLIS: u32 = 250;

// =============================================================================
// SPI speed encoding
// =============================================================================

/// The wire speed byte counts in units of 25 kHz.
pub const SPEED_STEP_HZ: u32 = 25_000;

/// Lowest accepted speed byte (25 kHz).
pub const SPEED_UNITS_MIN: u8 = 1;

/// Highest accepted speed byte (4 MHz).
pub const SPEED_UNITS_MAX: u8 = 160;

// =============================================================================
// Pin banks
// =============================================================================

/// Number of auxiliary digital pins.
pub const NUM_AUX_PINS: u8 = 8;

/// Number of chip-select output lines.
pub const NUM_CS_LINES: u8 = 4;

// =============================================================================
// Heartbeat
// =============================================================================

/// The heartbeat stays solid this long after the last command started.
pub const RECENT_ACTIVITY_MILLIS: u32 = 200;

/// When idle, the heartbeat pulses for ~4 ms out of every 2048 ms: it is on
/// while bits 2..=10 of the elapsed milliseconds are all zero.
pub const IDLE_BLINK_MASK: u32 = 0b111_1111_1100;
