//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use motorola_680x0::{BusResult, Cpu680x0, CpuModel, FunctionCode, InterruptAck, M68kBus};

/// Initial supervisor stack pointer loaded from vector 0.
pub const STACK: u32 = 0x0001_0000;
/// Program start loaded from vector 1.
pub const ORIGIN: u32 = 0x0000_1000;

/// Flat 16MB memory.
///
/// Addresses are folded to 24 bits. Accesses inside `berr` end in a bus
/// error; interrupt acknowledge answers with `ack`. Word reads cost
/// `wait` extra cycles.
pub struct TestBus {
    pub data: Vec<u8>,
    pub wait: u8,
    pub berr: Option<(u32, u32)>,
    pub ack: InterruptAck,
    pub acks: Vec<u8>,
    pub resets: u32,
    pub last_fc: Option<FunctionCode>,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            data: vec![0; 0x100_0000],
            wait: 0,
            berr: None,
            ack: InterruptAck::Autovector,
            acks: Vec::new(),
            resets: 0,
            last_fc: None,
        }
    }

    fn index(addr: u32) -> usize {
        (addr & 0xFF_FFFF) as usize
    }

    fn faults(&self, addr: u32) -> bool {
        self.berr.is_some_and(|(lo, hi)| (lo..hi).contains(&(addr & 0xFF_FFFF)))
    }

    pub fn poke_word(&mut self, addr: u32, value: u16) {
        let a = Self::index(addr);
        self.data[a..a + 2].copy_from_slice(&value.to_be_bytes());
    }

    pub fn poke_long(&mut self, addr: u32, value: u32) {
        let a = Self::index(addr);
        self.data[a..a + 4].copy_from_slice(&value.to_be_bytes());
    }

    pub fn peek_word(&self, addr: u32) -> u16 {
        let a = Self::index(addr);
        u16::from_be_bytes([self.data[a], self.data[a + 1]])
    }

    pub fn peek_long(&self, addr: u32) -> u32 {
        let a = Self::index(addr);
        u32::from_be_bytes([self.data[a], self.data[a + 1], self.data[a + 2], self.data[a + 3]])
    }

    /// Place `words` at `addr`.
    pub fn load(&mut self, addr: u32, words: &[u16]) {
        for (i, &word) in words.iter().enumerate() {
            self.poke_word(addr + 2 * i as u32, word);
        }
    }
}

impl M68kBus for TestBus {
    fn read_byte(&mut self, addr: u32, fc: FunctionCode) -> BusResult {
        self.last_fc = Some(fc);
        if self.faults(addr) {
            return BusResult::error();
        }
        BusResult::new(u32::from(self.data[Self::index(addr)]))
    }

    fn read_word(&mut self, addr: u32, fc: FunctionCode) -> BusResult {
        self.last_fc = Some(fc);
        if self.faults(addr) {
            return BusResult::error();
        }
        BusResult::with_wait(u32::from(self.peek_word(addr)), self.wait)
    }

    fn write_byte(&mut self, addr: u32, value: u8, fc: FunctionCode) -> BusResult {
        self.last_fc = Some(fc);
        if self.faults(addr) {
            return BusResult::error();
        }
        self.data[Self::index(addr)] = value;
        BusResult::write_ok()
    }

    fn write_word(&mut self, addr: u32, value: u16, fc: FunctionCode) -> BusResult {
        self.last_fc = Some(fc);
        if self.faults(addr) {
            return BusResult::error();
        }
        self.poke_word(addr, value);
        BusResult::write_ok()
    }

    fn interrupt_ack(&mut self, level: u8) -> InterruptAck {
        self.acks.push(level);
        self.ack
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

/// Memory holding the reset vectors and `program` at [`ORIGIN`].
///
/// Every vector from 2 upward points at its own `STOP #$2700` handler at
/// `0x800 + 8 * vector`, so tests can tell which exception was taken
/// from the PC.
pub fn machine(program: &[u16]) -> TestBus {
    let mut bus = TestBus::new();
    bus.poke_long(0, STACK);
    bus.poke_long(4, ORIGIN);
    for vector in 2..64u8 {
        let handler = handler_for(vector);
        bus.poke_long(u32::from(vector) * 4, handler);
        bus.load(handler, &[0x4E72, 0x2700]);
    }
    bus.load(ORIGIN, program);
    bus
}

/// A reset CPU running `program` in supervisor mode.
pub fn boot(model: CpuModel, program: &[u16]) -> (Cpu680x0, TestBus) {
    let mut bus = machine(program);
    let mut cpu = Cpu680x0::new(model);
    cpu.pulse_reset(&mut bus);
    (cpu, bus)
}

/// Address of the stub handler for `vector`.
pub fn handler_for(vector: u8) -> u32 {
    0x800 + 8 * u32::from(vector)
}
