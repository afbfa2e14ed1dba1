//! Command protocol engine for a USB-serial to SPI bridge.
//!
//! A host issues byte-encoded commands over a serial link; the engine frames
//! them off the stream, executes SPI transactions and auxiliary pin
//! operations, and writes byte-encoded responses. Everything is
//! single-threaded and non-blocking: the board's driver loop calls
//! [`SpiBridge::poll`] repeatedly, and every suspension is expressed as
//! "not done yet, poll me again".
//!
//! Hardware is reached only through the traits in [`board`], so the same
//! engine runs against a firmware HAL shim or against mocks in tests.

#![cfg_attr(not(test), no_std)]

// Must come first so the other modules see its macros.
mod fmt;

pub mod board;
pub mod buffer;
pub mod config;
pub mod engine;
pub mod handlers;
pub mod protocol;

#[cfg(test)]
mod testutil;

pub use board::{AuxPinMode, AuxPins, CsBank, Led, SpiConfig, SpiPort, Transport};
pub use engine::SpiBridge;
