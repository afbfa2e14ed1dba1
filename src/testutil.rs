// Mock collaborators for the engine tests: a scriptable transport, a
// recording SPI port / chip-select bank sharing one event log, an aux pin
// bank and an LED sink.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use crate::board::{AuxPinMode, AuxPins, CsBank, Led, SpiConfig, SpiPort, Transport};
use crate::engine::SpiBridge;

// =============================================================================
// Shared event log
// =============================================================================

/// Hardware-side effects in the order they happened, across the SPI port and
/// the chip-select bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoardEvent {
    Select(u8),
    ReleaseAll,
    /// A full-duplex transfer of this many bytes (0 = the clock settling
    /// dummy transfer).
    Transfer(usize),
}

#[derive(Default)]
pub struct BoardLog {
    pub events: Vec<BoardEvent>,
    /// The currently asserted chip-select line, if any.
    pub cs_low: Option<u8>,
}

type SharedLog = Rc<RefCell<BoardLog>>;

// =============================================================================
// Transport mock
// =============================================================================

pub struct MockTransport {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
    /// Upper bound on bytes returned per `read` call, to model data arriving
    /// in arbitrary chunk sizes.
    pub max_chunk: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            tx: Vec::new(),
            max_chunk: usize::MAX,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }
}

impl Transport for MockTransport {
    fn available(&self) -> usize {
        self.rx.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.rx.len()).min(self.max_chunk);
        for slot in buf[..n].iter_mut() {
            *slot = self.rx.pop_front().unwrap();
        }
        n
    }

    fn write(&mut self, data: &[u8]) {
        self.tx.extend_from_slice(data);
    }
}

impl Transport for Rc<RefCell<MockTransport>> {
    fn available(&self) -> usize {
        self.borrow().available()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        self.borrow_mut().read(buf)
    }

    fn write(&mut self, data: &[u8]) {
        self.borrow_mut().write(data)
    }
}

// =============================================================================
// SPI port mock
// =============================================================================

pub struct MockSpi {
    log: SharedLog,
    pub configs: Vec<SpiConfig>,
    pub written: Vec<Vec<u8>>,
    /// Byte the "device" shifts back on MISO.
    pub fill_byte: u8,
}

impl MockSpi {
    fn new(log: SharedLog) -> Self {
        Self {
            log,
            configs: Vec::new(),
            written: Vec::new(),
            fill_byte: 0,
        }
    }
}

impl SpiPort for MockSpi {
    fn reconfigure(&mut self, config: SpiConfig) {
        self.configs.push(config);
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) {
        let log = self.log.borrow();
        // Data must only be clocked while a chip-select is asserted; the
        // zero-length settling transfer is the one exception.
        assert!(
            words.is_empty() || log.cs_low.is_some(),
            "SPI transfer without an asserted chip-select"
        );
        drop(log);
        self.log.borrow_mut().events.push(BoardEvent::Transfer(words.len()));
        self.written.push(words.to_vec());
        words.fill(self.fill_byte);
    }
}

impl SpiPort for Rc<RefCell<MockSpi>> {
    fn reconfigure(&mut self, config: SpiConfig) {
        self.borrow_mut().reconfigure(config)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) {
        self.borrow_mut().transfer_in_place(words)
    }
}

// =============================================================================
// Chip-select bank mock
// =============================================================================

pub struct MockCs {
    log: SharedLog,
}

impl CsBank for MockCs {
    fn select(&mut self, index: u8) {
        let mut log = self.log.borrow_mut();
        assert!(
            log.cs_low.is_none(),
            "second chip-select asserted while {:?} is low",
            log.cs_low
        );
        log.cs_low = Some(index);
        log.events.push(BoardEvent::Select(index));
    }

    fn release_all(&mut self) {
        let mut log = self.log.borrow_mut();
        log.cs_low = None;
        log.events.push(BoardEvent::ReleaseAll);
    }
}

impl CsBank for Rc<RefCell<MockCs>> {
    fn select(&mut self, index: u8) {
        self.borrow_mut().select(index)
    }

    fn release_all(&mut self) {
        self.borrow_mut().release_all()
    }
}

// =============================================================================
// Aux pin bank mock
// =============================================================================

pub struct MockAux {
    pub modes: [AuxPinMode; 8],
    pub levels: u8,
}

impl MockAux {
    fn new() -> Self {
        Self {
            // Overwritten by the engine's boot-time defaulting.
            modes: [AuxPinMode::Output; 8],
            levels: 0,
        }
    }
}

impl AuxPins for MockAux {
    fn set_mode(&mut self, pin: u8, mode: AuxPinMode) {
        if let Some(slot) = self.modes.get_mut(usize::from(pin)) {
            *slot = mode;
        }
    }

    fn read_all(&mut self) -> u8 {
        self.levels
    }

    fn write_masked(&mut self, values: u8, mask: u8) {
        self.levels = (self.levels & !mask) | (values & mask);
    }
}

impl AuxPins for Rc<RefCell<MockAux>> {
    fn set_mode(&mut self, pin: u8, mode: AuxPinMode) {
        self.borrow_mut().set_mode(pin, mode)
    }

    fn read_all(&mut self) -> u8 {
        self.borrow_mut().read_all()
    }

    fn write_masked(&mut self, values: u8, mask: u8) {
        self.borrow_mut().write_masked(values, mask)
    }
}

// =============================================================================
// LED mock
// =============================================================================

#[derive(Default)]
pub struct MockLed {
    pub updates: Vec<bool>,
}

impl Led for MockLed {
    fn update(&mut self, on: bool) {
        self.updates.push(on);
    }
}

impl Led for Rc<RefCell<MockLed>> {
    fn update(&mut self, on: bool) {
        self.borrow_mut().update(on)
    }
}

// =============================================================================
// Test harness
// =============================================================================

type MockBridge = SpiBridge<
    Rc<RefCell<MockTransport>>,
    Rc<RefCell<MockSpi>>,
    Rc<RefCell<MockCs>>,
    Rc<RefCell<MockAux>>,
    Rc<RefCell<MockLed>>,
>;

/// An engine wired to mocks, plus probes into their recorded state.
pub struct TestBridge {
    pub bridge: MockBridge,
    pub board: BoardProbe,
    now: u32,
}

pub struct BoardProbe {
    transport: Rc<RefCell<MockTransport>>,
    spi: Rc<RefCell<MockSpi>>,
    aux: Rc<RefCell<MockAux>>,
    led: Rc<RefCell<MockLed>>,
    log: SharedLog,
}

impl TestBridge {
    pub fn new() -> Self {
        let log: SharedLog = Rc::new(RefCell::new(BoardLog::default()));
        let transport = Rc::new(RefCell::new(MockTransport::new()));
        let spi = Rc::new(RefCell::new(MockSpi::new(log.clone())));
        let cs = Rc::new(RefCell::new(MockCs { log: log.clone() }));
        let aux = Rc::new(RefCell::new(MockAux::new()));
        let led = Rc::new(RefCell::new(MockLed::default()));

        let bridge = SpiBridge::new(
            transport.clone(),
            spi.clone(),
            cs.clone(),
            aux.clone(),
            led.clone(),
            0,
        );
        // Drop the construction-time writes so tests see only poll effects.
        led.borrow_mut().updates.clear();
        log.borrow_mut().events.clear();

        Self {
            bridge,
            board: BoardProbe {
                transport,
                spi,
                aux,
                led,
                log,
            },
            now: 0,
        }
    }

    /// Make host bytes available to the transport.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.board.transport.borrow_mut().push(bytes);
    }

    /// Poll the engine `n` times at the current wall-clock time.
    pub fn run(&mut self, n: usize) {
        for _ in 0..n {
            self.bridge.poll(self.now);
        }
    }

    /// Advance the wall clock and poll `n` times.
    pub fn run_at(&mut self, now_millis: u32, n: usize) {
        self.now = now_millis;
        self.run(n);
    }

    /// Drain everything written toward the host so far.
    pub fn take_response(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.board.transport.borrow_mut().tx)
    }
}

impl BoardProbe {
    pub fn set_max_chunk(&self, max_chunk: usize) {
        self.transport.borrow_mut().max_chunk = max_chunk;
    }

    pub fn spi_fill_byte(&self, byte: u8) {
        self.spi.borrow_mut().fill_byte = byte;
    }

    pub fn spi_written(&self) -> Vec<Vec<u8>> {
        self.spi.borrow().written.clone()
    }

    pub fn last_spi_config(&self) -> Option<SpiConfig> {
        self.spi.borrow().configs.last().copied()
    }

    pub fn events(&self) -> Vec<BoardEvent> {
        self.log.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.log.borrow_mut().events.clear();
    }

    pub fn aux_mode(&self, pin: u8) -> AuxPinMode {
        self.aux.borrow().modes[usize::from(pin)]
    }

    pub fn set_aux_levels(&self, levels: u8) {
        self.aux.borrow_mut().levels = levels;
    }

    pub fn led_updates(&self) -> Vec<bool> {
        self.led.borrow().updates.clone()
    }
}
