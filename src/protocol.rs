// Wire protocol: command selectors, response framing and the SEND header.

use embedded_hal::spi::{Mode, MODE_0, MODE_1, MODE_2, MODE_3};

use crate::config::{
    API_VERSION, FIRMWARE_VERSION, MAX_TRANSACTION_BYTES, SPEED_STEP_HZ, SPEED_UNITS_MAX,
    SPEED_UNITS_MIN,
};

// =============================================================================
// Command selectors (first byte of every request)
// =============================================================================

pub const SELECTOR_ECHO: u8 = b'e';
pub const SELECTOR_INFO: u8 = b'i';
pub const SELECTOR_SEND: u8 = b's';
pub const SELECTOR_AUX_MODE: u8 = b'm';
pub const SELECTOR_AUX_READ: u8 = b'a';
pub const SELECTOR_AUX_WRITE: u8 = b'b';

// =============================================================================
// Response status bytes
// =============================================================================

pub const STATUS_OK: u8 = b'K';
pub const STATUS_ERROR: u8 = b'E';

// =============================================================================
// Error codes (second byte of an 'E' response)
// =============================================================================
//
// Codes 1..=5 and 8 are reserved for device specific faults and are not
// emitted by this engine, except 1 and 2 which AUX_MODE reuses.

/// AUX_MODE: pin index out of range.
pub const ERR_AUX_PIN_OUT_OF_RANGE: u8 = 1;
/// AUX_MODE: unknown pin mode value.
pub const ERR_AUX_MODE_OUT_OF_RANGE: u8 = 2;
/// SEND: custom byte count exceeds the buffer capacity.
pub const ERR_CUSTOM_COUNT_OUT_OF_RANGE: u8 = 9;
/// SEND: extra byte count exceeds the buffer capacity.
pub const ERR_EXTRA_COUNT_OUT_OF_RANGE: u8 = 10;
/// SEND: custom + extra together exceed the buffer capacity.
pub const ERR_TOTAL_COUNT_OUT_OF_RANGE: u8 = 11;
/// SEND: speed byte outside [1, 160].
pub const ERR_SPEED_OUT_OF_RANGE: u8 = 12;

// =============================================================================
// INFO response
// =============================================================================

/// The fixed INFO response: status, 'S' 'P' 'I' tag, count of remaining
/// bytes, API version, firmware version big-endian.
pub const INFO_RESPONSE: [u8; 8] = [
    STATUS_OK,
    b'S',
    b'P',
    b'I',
    0x03,
    API_VERSION,
    (FIRMWARE_VERSION >> 8) as u8,
    FIRMWARE_VERSION as u8,
];

// =============================================================================
// SPI mode encoding (config byte bits 2..=3)
// =============================================================================

pub fn spi_mode_from_bits(bits: u8) -> Mode {
    match bits & 0b11 {
        0 => MODE_0,
        1 => MODE_1,
        2 => MODE_2,
        _ => MODE_3,
    }
}

// =============================================================================
// SEND command header
// =============================================================================
//
// Wire layout, immediately after the 's' selector:
//   byte 0:    config — bits 0..=1 CS index, bits 2..=3 SPI mode,
//              bit 4 return-read-bytes flag, bits 5..=7 reserved (0)
//   byte 1:    speed in 25 kHz units, 1..=160
//   bytes 2,3: custom byte count, big endian
//   bytes 4,5: extra (zero filled) byte count, big endian

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SendHeader {
    pub cs_index: u8,
    pub mode: Mode,
    pub return_read_bytes: bool,
    pub speed_units: u8,
    pub custom_count: u16,
    pub extra_count: u16,
}

impl SendHeader {
    pub const WIRE_SIZE: usize = 6;

    /// Decode a raw header. Field values are taken as-is; call `validate()`
    /// before acting on them.
    pub fn parse(raw: &[u8]) -> Self {
        debug_assert!(raw.len() >= Self::WIRE_SIZE);
        let config = raw[0];
        Self {
            cs_index: config & 0b11,
            mode: spi_mode_from_bits(config >> 2),
            return_read_bytes: config & 0b1_0000 != 0,
            speed_units: raw[1],
            custom_count: u16::from_be_bytes([raw[2], raw[3]]),
            extra_count: u16::from_be_bytes([raw[4], raw[5]]),
        }
    }

    /// Check the header bounds. Returns the wire error code of the first
    /// violated rule; the precedence order is part of the protocol.
    pub fn validate(&self) -> Result<(), u8> {
        let capacity = MAX_TRANSACTION_BYTES as u32;
        if !(SPEED_UNITS_MIN..=SPEED_UNITS_MAX).contains(&self.speed_units) {
            return Err(ERR_SPEED_OUT_OF_RANGE);
        }
        if u32::from(self.custom_count) > capacity {
            return Err(ERR_CUSTOM_COUNT_OUT_OF_RANGE);
        }
        if u32::from(self.extra_count) > capacity {
            return Err(ERR_EXTRA_COUNT_OUT_OF_RANGE);
        }
        if u32::from(self.custom_count) + u32::from(self.extra_count) > capacity {
            return Err(ERR_TOTAL_COUNT_OUT_OF_RANGE);
        }
        Ok(())
    }

    /// Bus clock in Hz for this transaction.
    pub fn frequency_hz(&self) -> u32 {
        u32::from(self.speed_units) * SPEED_STEP_HZ
    }

    /// Total bytes clocked on the bus: custom payload plus zero padding.
    pub fn total_bytes(&self) -> usize {
        usize::from(self.custom_count) + usize::from(self.extra_count)
    }
}

// =============================================================================
// Tests
// =============================================================================
