// Command handlers: one resumable state machine per command kind.
//
// Each handler follows the same shape: `on_cmd_entered` resets per-invocation
// state, `on_cmd_loop` is called once per scheduler poll and returns true
// once the response has been fully written, `on_cmd_aborted` fires only on
// timeout and writes nothing (the dispatch loop owns the chip-select safety
// release).

use embedded_hal::spi::Mode;

use crate::board::{AuxPinMode, AuxPins, CsBank, SpiConfig, SpiPort, Transport};
use crate::buffer::TransactionBuffer;
use crate::config::NUM_AUX_PINS;
use crate::protocol::{
    SendHeader, INFO_RESPONSE, SELECTOR_AUX_MODE, SELECTOR_AUX_READ, SELECTOR_AUX_WRITE,
    SELECTOR_ECHO, SELECTOR_INFO, SELECTOR_SEND, STATUS_ERROR, STATUS_OK,
    ERR_AUX_MODE_OUT_OF_RANGE, ERR_AUX_PIN_OUT_OF_RANGE,
};

// =============================================================================
// Handler context
// =============================================================================

/// Exclusive loans the dispatch loop hands to the active command for one
/// poll: the transport, the execution units and the shared buffer.
pub struct CommandCx<'a, T, S, C, A> {
    pub transport: &'a mut T,
    pub spi: &'a mut S,
    pub cs: &'a mut C,
    pub aux: &'a mut A,
    pub buffer: &'a mut TransactionBuffer,
    /// Mode used by the previous SPI transaction; drives the clock idle
    /// settling workaround on mode change.
    pub last_spi_mode: &'a mut Mode,
}

// =============================================================================
// Command kinds
// =============================================================================

/// The active command, selected by its leading byte. Handler state is plain
/// data inside the variant; nothing survives across invocations.
pub enum Command {
    Echo,
    Info,
    Send(SendState),
    AuxMode,
    AuxRead,
    AuxWrite,
}

impl Command {
    /// Map a selector byte to a fresh handler, or None for an unrecognized
    /// byte (which the dispatch loop discards silently).
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            SELECTOR_ECHO => Some(Command::Echo),
            SELECTOR_INFO => Some(Command::Info),
            SELECTOR_SEND => Some(Command::Send(SendState::new())),
            SELECTOR_AUX_MODE => Some(Command::AuxMode),
            SELECTOR_AUX_READ => Some(Command::AuxRead),
            SELECTOR_AUX_WRITE => Some(Command::AuxWrite),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Echo => "ECHO",
            Command::Info => "INFO",
            Command::Send(_) => "SEND",
            Command::AuxMode => "AUX_MODE",
            Command::AuxRead => "AUX_READ",
            Command::AuxWrite => "AUX_WRITE",
        }
    }

    /// Reset per-invocation state. Called once when the selector byte is
    /// consumed; the first `on_cmd_loop` happens on the following poll.
    pub fn on_cmd_entered(&mut self, buffer: &mut TransactionBuffer) {
        buffer.begin_read();
        if let Command::Send(state) = self {
            *state = SendState::new();
        }
    }

    /// Advance the handler by one poll. Returns true once the response has
    /// been fully written.
    pub fn on_cmd_loop<T, S, C, A>(&mut self, cx: &mut CommandCx<'_, T, S, C, A>) -> bool
    where
        T: Transport,
        S: SpiPort,
        C: CsBank,
        A: AuxPins,
    {
        match self {
            Command::Echo => poll_echo(cx),
            Command::Info => poll_info(cx),
            Command::Send(state) => state.poll(cx),
            Command::AuxMode => poll_aux_mode(cx),
            Command::AuxRead => poll_aux_read(cx),
            Command::AuxWrite => poll_aux_write(cx),
        }
    }

    /// Timeout notification. No response is written; the host treats the
    /// silence as failure.
    pub fn on_cmd_aborted(&mut self) {
        warn!("{} aborted on timeout", self.name());
    }
}

// =============================================================================
// ECHO — read one byte, write it back verbatim
// =============================================================================

fn poll_echo<T, S, C, A>(cx: &mut CommandCx<'_, T, S, C, A>) -> bool
where
    T: Transport,
{
    if !cx.buffer.try_fill(cx.transport, 1) {
        return false;
    }
    let echoed = cx.buffer.bytes(1)[0];
    cx.transport.write(&[echoed]);
    true
}

// =============================================================================
// INFO — fixed identification response
// =============================================================================

fn poll_info<T, S, C, A>(cx: &mut CommandCx<'_, T, S, C, A>) -> bool
where
    T: Transport,
{
    cx.transport.write(&INFO_RESPONSE);
    true
}

// =============================================================================
// SEND — the SPI transaction command
// =============================================================================

/// Per-invocation SEND state: the parsed header once it has arrived. While
/// `header` is None we are still accumulating the 6 header bytes.
pub struct SendState {
    header: Option<SendHeader>,
}

impl SendState {
    fn new() -> Self {
        Self { header: None }
    }

    fn poll<T, S, C, A>(&mut self, cx: &mut CommandCx<'_, T, S, C, A>) -> bool
    where
        T: Transport,
        S: SpiPort,
        C: CsBank,
    {
        // Phase 1: accumulate and validate the header.
        let header = match self.header {
            Some(header) => header,
            None => {
                if !cx.buffer.try_fill(cx.transport, SendHeader::WIRE_SIZE) {
                    return false;
                }
                let header = SendHeader::parse(cx.buffer.bytes(SendHeader::WIRE_SIZE));
                if let Err(code) = header.validate() {
                    warn!("SEND rejected, error code {}", code);
                    cx.transport.write(&[STATUS_ERROR, code]);
                    return true;
                }
                // The payload overwrites the header bytes; start a fresh
                // accumulation for it.
                cx.buffer.begin_read();
                self.header = Some(header);
                header
            }
        };

        // Phase 2: accumulate the custom payload bytes.
        let custom = usize::from(header.custom_count);
        if !cx.buffer.try_fill(cx.transport, custom) {
            return false;
        }

        // Phase 3: execute the transaction.
        debug!(
            "SEND: cs={} speed={} custom={} extra={}",
            header.cs_index, header.speed_units, header.custom_count, header.extra_count
        );
        let total = header.total_bytes();
        cx.buffer.zero_fill(custom, usize::from(header.extra_count));

        cx.spi.reconfigure(SpiConfig {
            frequency: header.frequency_hz(),
            mode: header.mode,
        });
        if *cx.last_spi_mode != header.mode {
            // Clock idle polarity workaround: a zero-length dummy transfer
            // settles the clock line at the new idle level. Asserting CS
            // before that corrupts the first bits.
            cx.spi.transfer_in_place(&mut []);
            *cx.last_spi_mode = header.mode;
        }

        cx.cs.select(header.cs_index);
        cx.spi.transfer_in_place(cx.buffer.bytes_mut(total));
        cx.cs.release_all();

        // Phase 4: the response, with the read-back bytes if requested.
        let count = if header.return_read_bytes { total as u16 } else { 0 };
        cx.transport
            .write(&[STATUS_OK, (count >> 8) as u8, count as u8]);
        if count > 0 {
            cx.transport.write(cx.buffer.bytes(usize::from(count)));
        }
        true
    }
}

// =============================================================================
// AUX_MODE — reconfigure one auxiliary pin
// =============================================================================

fn poll_aux_mode<T, S, C, A>(cx: &mut CommandCx<'_, T, S, C, A>) -> bool
where
    T: Transport,
    A: AuxPins,
{
    if !cx.buffer.try_fill(cx.transport, 2) {
        return false;
    }
    let raw = cx.buffer.bytes(2);
    let (pin, mode) = (raw[0], raw[1]);
    if pin >= NUM_AUX_PINS {
        cx.transport.write(&[STATUS_ERROR, ERR_AUX_PIN_OUT_OF_RANGE]);
        return true;
    }
    let Some(mode) = AuxPinMode::from_wire(mode) else {
        cx.transport.write(&[STATUS_ERROR, ERR_AUX_MODE_OUT_OF_RANGE]);
        return true;
    };
    cx.aux.set_mode(pin, mode);
    cx.transport.write(&[STATUS_OK]);
    true
}

// =============================================================================
// AUX_READ — sample all auxiliary pins
// =============================================================================

fn poll_aux_read<T, S, C, A>(cx: &mut CommandCx<'_, T, S, C, A>) -> bool
where
    T: Transport,
    A: AuxPins,
{
    let bits = cx.aux.read_all();
    cx.transport.write(&[STATUS_OK, bits]);
    true
}

// =============================================================================
// AUX_WRITE — drive masked auxiliary pins
// =============================================================================

fn poll_aux_write<T, S, C, A>(cx: &mut CommandCx<'_, T, S, C, A>) -> bool
where
    T: Transport,
    A: AuxPins,
{
    if !cx.buffer.try_fill(cx.transport, 2) {
        return false;
    }
    let raw = cx.buffer.bytes(2);
    let (values, mask) = (raw[0], raw[1]);
    // TODO: decide whether writes to pins not configured as outputs should
    // be rejected; for now they are driven anyway.
    cx.aux.write_masked(values, mask);
    cx.transport.write(&[STATUS_OK]);
    true
}
