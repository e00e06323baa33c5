//! M68k bus traits with function codes, wait states and host callbacks.
//!
//! The host implements [`M68kBus`] once per machine. Every access carries
//! the function code the CPU drives on FC0-FC2 and returns a [`BusResult`]
//! with the data read, any wait cycles the host wants charged, and whether
//! the access ended in a bus error (no DTACK). Addresses handed to the bus
//! are physical: width masking and MMU translation have already happened.
//!
//! Besides memory, the trait carries the CPU's outward-facing signals:
//! interrupt acknowledge, the RESET instruction, and a few hooks some
//! drivers rely on (RTE seen, `CMPI.L #imm,Dn` seen, TAS write cycle).

/// Function code values from the FC0-FC2 pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    /// Reserved (FC=0).
    Reserved0 = 0,
    /// User data access (FC=1).
    UserData = 1,
    /// User program access (FC=2).
    UserProgram = 2,
    /// Reserved for user-defined use (FC=3).
    Reserved3 = 3,
    /// Reserved (FC=4).
    Reserved4 = 4,
    /// Supervisor data access (FC=5).
    SupervisorData = 5,
    /// Supervisor program access (FC=6).
    SupervisorProgram = 6,
    /// CPU space: interrupt acknowledge, breakpoint, coprocessor (FC=7).
    CpuSpace = 7,
}

impl FunctionCode {
    /// Build a function code from supervisor flag and program/data flag.
    #[must_use]
    pub fn from_flags(supervisor: bool, program: bool) -> Self {
        match (supervisor, program) {
            (false, false) => Self::UserData,
            (false, true) => Self::UserProgram,
            (true, false) => Self::SupervisorData,
            (true, true) => Self::SupervisorProgram,
        }
    }

    /// Decode a 3-bit value (SFC/DFC, PFLUSH operands).
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 7 {
            0 => Self::Reserved0,
            1 => Self::UserData,
            2 => Self::UserProgram,
            3 => Self::Reserved3,
            4 => Self::Reserved4,
            5 => Self::SupervisorData,
            6 => Self::SupervisorProgram,
            _ => Self::CpuSpace,
        }
    }

    /// Returns the 3-bit value for the function code.
    #[must_use]
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// FC2 is set for supervisor and CPU space cycles.
    #[must_use]
    pub fn is_supervisor(self) -> bool {
        self.bits() & 4 != 0
    }

    /// Program (instruction stream) space.
    #[must_use]
    pub fn is_program(self) -> bool {
        self.bits() & 3 == 2
    }
}

/// Result of a bus access: data read, wait cycles, and bus error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusResult {
    /// Data read from the bus, right-aligned. For writes, this is 0.
    pub data: u32,
    /// Extra wait cycles inserted by the bus (slow memory, DMA contention).
    pub wait_cycles: u8,
    /// True if this access caused a bus error (no DTACK response).
    pub bus_error: bool,
}

impl BusResult {
    /// Create a result with data and no wait cycles.
    #[must_use]
    pub const fn new(data: u32) -> Self {
        Self {
            data,
            wait_cycles: 0,
            bus_error: false,
        }
    }

    /// Create a result with data and wait cycles.
    #[must_use]
    pub const fn with_wait(data: u32, wait_cycles: u8) -> Self {
        Self {
            data,
            wait_cycles,
            bus_error: false,
        }
    }

    /// Create a write result (no data returned).
    #[must_use]
    pub const fn write_ok() -> Self {
        Self::new(0)
    }

    /// Create a bus error result (DTACK timeout).
    #[must_use]
    pub const fn error() -> Self {
        Self {
            data: 0,
            wait_cycles: 0,
            bus_error: true,
        }
    }

    /// Combine two half accesses into one (high part first).
    #[must_use]
    pub const fn join(hi: BusResult, lo: BusResult, lo_bits: u32) -> Self {
        Self {
            data: (hi.data << lo_bits) | lo.data,
            wait_cycles: hi.wait_cycles.saturating_add(lo.wait_cycles),
            bus_error: hi.bus_error || lo.bus_error,
        }
    }
}

/// Outcome of an interrupt acknowledge cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAck {
    /// A device supplied this vector number.
    Vector(u8),
    /// VPA/AVEC asserted: use vector 24 + level.
    Autovector,
    /// BERR during the acknowledge: use the spurious interrupt vector (24).
    Spurious,
}

/// Bus trait for 680x0 CPUs.
///
/// Word and long accesses handed to the bus are always even: the CPU
/// either raises an address error or splits misaligned accesses first.
pub trait M68kBus {
    /// Read a byte from the bus.
    fn read_byte(&mut self, addr: u32, fc: FunctionCode) -> BusResult;

    /// Read a word from the bus.
    fn read_word(&mut self, addr: u32, fc: FunctionCode) -> BusResult;

    /// Write a byte to the bus.
    fn write_byte(&mut self, addr: u32, value: u8, fc: FunctionCode) -> BusResult;

    /// Write a word to the bus.
    fn write_word(&mut self, addr: u32, value: u16, fc: FunctionCode) -> BusResult;

    /// Read a long. Defaults to two word cycles.
    fn read_long(&mut self, addr: u32, fc: FunctionCode) -> BusResult {
        let hi = self.read_word(addr, fc);
        if hi.bus_error {
            return hi;
        }
        let lo = self.read_word(addr.wrapping_add(2), fc);
        BusResult::join(hi, lo, 16)
    }

    /// Write a long. Defaults to two word cycles.
    fn write_long(&mut self, addr: u32, value: u32, fc: FunctionCode) -> BusResult {
        let hi = self.write_word(addr, (value >> 16) as u16, fc);
        if hi.bus_error {
            return hi;
        }
        let lo = self.write_word(addr.wrapping_add(2), value as u16, fc);
        BusResult::join(hi, lo, 0)
    }

    /// Fetch an instruction word. Hosts with a separate opcode path
    /// (decrypted ROMs and the like) override this.
    fn fetch_word(&mut self, addr: u32, fc: FunctionCode) -> BusResult {
        self.read_word(addr, fc)
    }

    /// Interrupt acknowledge cycle for `level`.
    fn interrupt_ack(&mut self, _level: u8) -> InterruptAck {
        InterruptAck::Autovector
    }

    /// The RESET instruction pulsed the reset line.
    fn reset(&mut self) {}

    /// An RTE instruction completed.
    fn rte_executed(&mut self) {}

    /// `CMPI.L #value,Dreg` executed.
    fn cmpi_long(&mut self, _value: u32, _reg: u8) {}

    /// Write cycle of TAS. Some systems (Genesis, Amiga) ignore it.
    fn tas_write(&mut self, addr: u32, value: u8, fc: FunctionCode) -> BusResult {
        self.write_byte(addr, value, fc)
    }

    /// BKPT #n executed (68010+); the CPU then takes an illegal instruction trap.
    fn breakpoint(&mut self, _vector: u8) {}

    /// Called before each instruction with its address.
    fn instruction_hook(&mut self, _pc: u32) {}
}
