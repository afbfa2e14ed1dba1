// The dispatch loop: the top-level cooperative state machine that frames
// commands off the serial stream, drives the active handler, enforces the
// per-command timeout and keeps the heartbeat alive.

use embedded_hal::spi::MODE_0;

use crate::board::{AuxPinMode, AuxPins, CsBank, Led, SpiPort, Transport};
use crate::buffer::TransactionBuffer;
use crate::config::{
    COMMAND_TIMEOUT_MILLIS, IDLE_BLINK_MASK, NUM_AUX_PINS, RECENT_ACTIVITY_MILLIS,
};
use crate::handlers::{Command, CommandCx};

// =============================================================================
// Command timer
// =============================================================================

/// Wall-clock stamp of the start of the current command. Wrapping u32
/// milliseconds; overflows ~50 days after reset, which is accepted.
struct CommandTimer {
    start_millis: u32,
}

impl CommandTimer {
    fn new(now_millis: u32) -> Self {
        Self {
            start_millis: now_millis,
        }
    }

    fn reset(&mut self, now_millis: u32) {
        self.start_millis = now_millis;
    }

    fn elapsed_millis(&self, now_millis: u32) -> u32 {
        now_millis.wrapping_sub(self.start_millis)
    }
}

// =============================================================================
// Engine
// =============================================================================

/// The protocol engine. Owns the transaction buffer and the execution units;
/// `poll()` is invoked repeatedly by the board's driver loop and never
/// blocks.
pub struct SpiBridge<T, S, C, A, L> {
    transport: T,
    spi: S,
    cs: C,
    aux: A,
    led: L,
    buffer: TransactionBuffer,
    /// The active handler, or None when idle.
    active: Option<Command>,
    cmd_timer: CommandTimer,
    last_spi_mode: embedded_hal::spi::Mode,
    last_led_state: bool,
}

impl<T, S, C, A, L> SpiBridge<T, S, C, A, L>
where
    T: Transport,
    S: SpiPort,
    C: CsBank,
    A: AuxPins,
    L: Led,
{
    pub fn new(transport: T, spi: S, mut cs: C, mut aux: A, mut led: L, now_millis: u32) -> Self {
        cs.release_all();
        for pin in 0..NUM_AUX_PINS {
            aux.set_mode(pin, AuxPinMode::InputPullUp);
        }
        led.update(false);
        info!("spi bridge engine ready");
        Self {
            transport,
            spi,
            cs,
            aux,
            led,
            buffer: TransactionBuffer::new(),
            active: None,
            cmd_timer: CommandTimer::new(now_millis),
            last_spi_mode: MODE_0,
            last_led_state: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// One cooperative scheduling step. Drains at most one phase of the
    /// active command, or dispatches the next selector byte when idle.
    pub fn poll(&mut self, now_millis: u32) {
        let since_cmd_start = self.cmd_timer.elapsed_millis(now_millis);

        // Heartbeat: solid while a command is active or recent, otherwise a
        // brief periodic blink. Written out only on change.
        let is_active = self.active.is_some() || since_cmd_start < RECENT_ACTIVITY_MILLIS;
        let led_state = is_active || (since_cmd_start & IDLE_BLINK_MASK) == 0;
        if led_state != self.last_led_state {
            self.led.update(led_state);
            self.last_led_state = led_state;
        }

        if let Some(cmd) = self.active.as_mut() {
            if since_cmd_start > COMMAND_TIMEOUT_MILLIS {
                cmd.on_cmd_aborted();
                self.active = None;
                self.cs.release_all();
                return;
            }
            let mut cx = CommandCx {
                transport: &mut self.transport,
                spi: &mut self.spi,
                cs: &mut self.cs,
                aux: &mut self.aux,
                buffer: &mut self.buffer,
                last_spi_mode: &mut self.last_spi_mode,
            };
            if cmd.on_cmd_loop(&mut cx) {
                self.active = None;
                self.cs.release_all();
            }
            return;
        }

        // Idle. Force all chip-selects released in case a handler left one
        // asserted.
        self.cs.release_all();

        let mut selector = [0u8; 1];
        if self.transport.read(&mut selector) == 0 {
            return;
        }
        match Command::from_selector(selector[0]) {
            Some(mut cmd) => {
                debug!("{} entered", cmd.name());
                self.cmd_timer.reset(now_millis);
                cmd.on_cmd_entered(&mut self.buffer);
                self.active = Some(cmd);
                // The first on_cmd_loop runs on the next poll.
            }
            None => {
                debug!("unknown selector 0x{:02x}, discarded", selector[0]);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
