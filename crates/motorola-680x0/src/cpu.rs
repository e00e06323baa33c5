//! Motorola 680x0 CPU core: instruction-level step loop.
//!
//! Each call to [`Cpu680x0::step`] runs exactly one instruction, one
//! exception entry, or one idle quantum while the CPU is stopped or
//! halted, and returns the cycles it consumed. Timing is taken from the
//! static cycle tables plus the dynamic costs the handlers add and the
//! wait states reported by the bus.
//!
//! ## Instruction boundary
//!
//! Pending events are examined in priority order before the next opcode
//! is fetched: reset, an externally signalled bus error, the NMI edge or
//! an interrupt above the mask, then the STOP state. Trace is taken at
//! the end of the traced instruction itself, so it always lands before
//! an interrupt waiting at the following boundary.

use emu_core::{Observable, Ticks, Value};

use crate::alu::Size;
use crate::bus::{FunctionCode, InterruptAck, M68kBus};
use crate::decode::{JumpTable, jump_table};
use crate::fault::{AccessFault, ExceptionKind, ExceptionRequest, Fault};
use crate::flags::{C, IMASK, M, N, S, T0, T1, V, X, Z};
use crate::fpu::Fpu;
use crate::icache::InstructionCache;
use crate::mmu::Mmu;
use crate::model::{CpuCapabilities, CpuModel};
use crate::registers::Registers;
use crate::timing::exception_cycles;

/// Cycles reported for one idle step while stopped or halted.
pub const IDLE_CYCLES: u32 = 4;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// Normal execution.
    Running,
    /// STOP executed; waiting for an interrupt or reset.
    Stopped,
    /// Double bus fault; only reset recovers.
    Halted,
}

impl State {
    pub(crate) const fn bits(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Stopped => 1,
            Self::Halted => 2,
        }
    }

    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits {
            1 => Self::Stopped,
            2 => Self::Halted,
            _ => Self::Running,
        }
    }
}

/// Whether a group 0 exception is being entered.
///
/// Set while reset fetches its vectors and while a bus/address error
/// frame is pushed. A group 0 fault in this window halts the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunMode {
    Normal,
    Group0,
}

/// Motorola 680x0 CPU.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cpu680x0 {
    // === Registers ===
    pub regs: Registers,

    // === Variant ===
    pub(crate) model: CpuModel,
    pub(crate) caps: CpuCapabilities,
    pub(crate) table: &'static JumpTable,

    // === Instruction state ===
    /// Opcode of the instruction being executed.
    pub(crate) ir: u16,
    /// Address of the instruction being executed.
    pub(crate) ppc: u32,
    /// Set by handlers that change the flow of control (T0 trace).
    pub(crate) flow_changed: bool,

    // === Execution state ===
    pub(crate) state: State,
    pub(crate) run_mode: RunMode,

    // === Lines ===
    /// One bit per asserted virtual interrupt line (bit n = level n).
    pub(crate) virq_state: u8,
    /// Highest asserted interrupt level.
    pub(crate) int_level: u8,
    /// Level 7 edge seen and not yet serviced.
    pub(crate) nmi_pending: bool,
    pub(crate) reset_pending: bool,
    pub(crate) bus_error_pending: Option<AccessFault>,

    // === Timing ===
    /// Cycles charged to the current step.
    pub(crate) cycles: u32,
    pub(crate) total_cycles: Ticks,

    // === Memory management ===
    pub(crate) mmu: Mmu,
    pub(crate) icache: InstructionCache,

    // === Coprocessor ===
    pub(crate) fpu: Fpu,
}

impl Cpu680x0 {
    /// Create a CPU of the given model. Call [`Self::pulse_reset`] before
    /// the first step to load the reset vectors.
    #[must_use]
    pub fn new(model: CpuModel) -> Self {
        let caps = model.capabilities();
        let mut regs = Registers::new();
        regs.sr &= caps.sr_mask;
        Self {
            regs,
            model,
            caps,
            table: jump_table(caps.isa),
            ir: 0,
            ppc: 0,
            flow_changed: false,
            state: State::Running,
            run_mode: RunMode::Normal,
            virq_state: 0,
            int_level: 0,
            nmi_pending: false,
            reset_pending: false,
            bus_error_pending: None,
            cycles: 0,
            total_cycles: Ticks::ZERO,
            mmu: Mmu::new(caps.mmu, caps.atc_entries),
            icache: InstructionCache::new(),
            fpu: Fpu::new(),
        }
    }

    /// Selected model.
    #[must_use]
    pub const fn model(&self) -> CpuModel {
        self.model
    }

    /// Capability set of the selected model.
    #[must_use]
    pub const fn capabilities(&self) -> &CpuCapabilities {
        &self.caps
    }

    /// Get total elapsed cycles.
    #[must_use]
    pub const fn total_cycles(&self) -> Ticks {
        self.total_cycles
    }

    /// True after a double bus fault, until reset.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.state == State::Halted
    }

    /// True between STOP and the interrupt that ends it.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state == State::Stopped
    }

    /// Address of the instruction most recently started.
    #[must_use]
    pub const fn ppc(&self) -> u32 {
        self.ppc
    }

    /// Opcode of the instruction most recently started.
    #[must_use]
    pub const fn ir(&self) -> u16 {
        self.ir
    }

    #[must_use]
    pub const fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    pub fn mmu_mut(&mut self) -> &mut Mmu {
        &mut self.mmu
    }

    #[must_use]
    pub const fn fpu(&self) -> &Fpu {
        &self.fpu
    }

    pub fn fpu_mut(&mut self) -> &mut Fpu {
        &mut self.fpu
    }

    #[must_use]
    pub const fn icache(&self) -> &InstructionCache {
        &self.icache
    }

    // === Lines ===

    /// Assert or release virtual interrupt line `level` (1-7).
    ///
    /// Several sources may share a level; the CPU sees the highest
    /// asserted line.
    pub fn set_input_line(&mut self, level: u8, asserted: bool) {
        if !(1..=7).contains(&level) {
            return;
        }
        let bit = 1u8 << level;
        if asserted {
            self.virq_state |= bit;
        } else {
            self.virq_state &= !bit;
        }
        let highest = if self.virq_state == 0 {
            0
        } else {
            7 - self.virq_state.leading_zeros() as u8
        };
        self.set_ipl(highest);
    }

    /// Drive the IPL pins directly (0 = no interrupt).
    ///
    /// A transition from below 7 to 7 latches a non-maskable edge.
    pub fn set_ipl(&mut self, level: u8) {
        let level = level & 7;
        if self.int_level < 7 && level == 7 {
            self.nmi_pending = true;
        }
        self.int_level = level;
    }

    /// Current interrupt priority level seen on the pins.
    #[must_use]
    pub const fn interrupt_level(&self) -> u8 {
        self.int_level
    }

    /// Raise a bus error at the next instruction boundary, as if an
    /// external device had asserted BERR for `address`.
    pub fn signal_bus_error(&mut self, address: u32, write: bool, fc: FunctionCode) {
        self.bus_error_pending = Some(AccessFault {
            address,
            write,
            fc,
            size: Size::Word,
            instruction: false,
        });
    }

    /// Reset at the next instruction boundary.
    pub fn request_reset(&mut self) {
        self.reset_pending = true;
    }

    /// Assert the reset line now. Returns the cycles spent.
    pub fn pulse_reset<B: M68kBus>(&mut self, bus: &mut B) -> u32 {
        self.cycles = 0;
        self.reset(bus);
        self.finish_step()
    }

    /// Reset: supervisor mode, interrupt mask 7, control registers cleared,
    /// SSP and PC loaded from vectors 0 and 1.
    fn reset<B: M68kBus>(&mut self, bus: &mut B) {
        self.state = State::Running;
        self.run_mode = RunMode::Group0;
        self.reset_pending = false;
        self.bus_error_pending = None;
        self.nmi_pending = false;
        self.regs.sr = (S | IMASK) & self.caps.sr_mask;
        self.regs.vbr = 0;
        self.regs.cacr = 0;
        self.regs.caar = 0;
        self.mmu.reset();
        self.icache.invalidate_all();
        self.fpu.reset();
        self.cycles += exception_cycles(ExceptionKind::Reset, self.caps.isa);

        let fc = FunctionCode::SupervisorProgram;
        let vectors = self
            .read_long_fc(bus, 0, fc)
            .and_then(|ssp| Ok((ssp, self.read_long_fc(bus, 4, fc)?)));
        match vectors {
            Ok((ssp, pc)) => {
                self.run_mode = RunMode::Normal;
                self.regs.isp = ssp;
                self.regs.pc = pc;
                self.ppc = pc;
                log::info!("{}: reset, ssp={ssp:#010x} pc={pc:#010x}", self.model.name());
            }
            Err(request) => {
                self.state = State::Halted;
                log::error!("{}: bus fault reading reset vectors: {request:?}", self.model.name());
            }
        }
    }

    // === Execution ===

    /// Interrupt that would be taken at the next boundary.
    fn interrupt_pending(&self) -> bool {
        self.nmi_pending || self.int_level > self.regs.interrupt_mask()
    }

    /// Nothing can happen until a line changes.
    fn is_idle(&self) -> bool {
        match self.state {
            State::Running => false,
            State::Halted => !self.reset_pending,
            State::Stopped => !self.reset_pending && self.bus_error_pending.is_none() && !self.interrupt_pending(),
        }
    }

    /// Run one instruction (or exception entry, or idle quantum).
    /// Returns the cycles consumed.
    pub fn step<B: M68kBus>(&mut self, bus: &mut B) -> u32 {
        self.cycles = 0;

        if self.reset_pending {
            self.reset(bus);
            return self.finish_step();
        }
        if self.state == State::Halted {
            self.cycles = IDLE_CYCLES;
            return self.finish_step();
        }
        if let Some(access) = self.bus_error_pending.take() {
            // Nothing was executing; the frame returns to the next instruction.
            self.ppc = self.regs.pc;
            self.state = State::Running;
            self.process_exception(bus, ExceptionRequest::bus_error(access), None);
            return self.finish_step();
        }
        if self.interrupt_pending() {
            self.take_interrupt(bus);
            return self.finish_step();
        }
        if self.state == State::Stopped {
            self.cycles = IDLE_CYCLES;
            return self.finish_step();
        }

        self.execute_instruction(bus);
        self.finish_step()
    }

    /// Run until at least `budget` cycles have been used. Returns the
    /// cycles actually used; an instruction in flight may overshoot.
    pub fn execute_run<B: M68kBus>(&mut self, bus: &mut B, budget: u32) -> u32 {
        let mut used = 0u32;
        while used < budget {
            if self.is_idle() {
                let rest = budget - used;
                self.total_cycles += rest;
                used = budget;
                break;
            }
            used = used.saturating_add(self.step(bus));
        }
        used
    }

    fn finish_step(&mut self) -> u32 {
        self.total_cycles += self.cycles;
        self.cycles
    }

    fn take_interrupt<B: M68kBus>(&mut self, bus: &mut B) {
        let level = if self.nmi_pending { 7 } else { self.int_level };
        self.nmi_pending = false;
        self.state = State::Running;
        let kind = match bus.interrupt_ack(level) {
            InterruptAck::Vector(vector) => ExceptionKind::Interrupt { level, vector },
            InterruptAck::Autovector => ExceptionKind::Interrupt {
                level,
                vector: 24 + level,
            },
            InterruptAck::Spurious => ExceptionKind::SpuriousInterrupt,
        };
        self.process_exception(bus, ExceptionRequest::new(kind), Some(level));
    }

    fn execute_instruction<B: M68kBus>(&mut self, bus: &mut B) {
        let trace = self.regs.is_trace();
        let flow_trace = self.regs.is_flow_trace();
        self.flow_changed = false;
        self.ppc = self.regs.pc;
        bus.instruction_hook(self.ppc);

        match self.run_instruction(bus) {
            Ok(()) => {
                if trace || (flow_trace && self.flow_changed) {
                    self.process_exception(bus, ExceptionRequest::new(ExceptionKind::Trace), None);
                }
            }
            Err(request) => {
                let traced = request.kind.is_group2() && trace;
                self.process_exception(bus, request, None);
                if traced && self.state == State::Running {
                    self.process_exception(bus, ExceptionRequest::new(ExceptionKind::Trace), None);
                }
            }
        }
    }

    fn run_instruction<B: M68kBus>(&mut self, bus: &mut B) -> Fault<()> {
        let opcode = self.fetch_word(bus)?;
        self.ir = opcode;
        let entry = self.table.entry(opcode);
        self.cycles += u32::from(entry.cycles);
        self.execute(bus, entry.op, opcode)
    }

    /// Translate `address` the way an access in `fc` space would, without
    /// filling the ATC, writing descriptors or raising exceptions.
    pub fn memory_translate<B: M68kBus>(&self, bus: &mut B, fc: FunctionCode, write: bool, address: u32) -> Option<u32> {
        let address = address & self.caps.address_mask();
        self.mmu.debug_translate(bus, address, fc, write)
    }

    /// FPU paths. Data registers read as the bits of their double.
    fn query_fpu(&self, path: &str) -> Option<Value> {
        if let Some(n) = path.strip_prefix("fp").and_then(|n| n.parse::<usize>().ok()) {
            return self.fpu.fp.get(n).map(|v| Value::U64(v.to_bits()));
        }
        match path {
            "fpcr" => Some(self.fpu.fpcr.into()),
            "fpsr" => Some(self.fpu.fpsr.into()),
            "fpiar" => Some(self.fpu.fpiar.into()),
            _ => None,
        }
    }
}

const M680X0_QUERY_PATHS: &[&str] = &[
    "d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7",
    "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7",
    "usp", "isp", "msp", "ssp",
    "pc", "ppc",
    "sr", "ccr",
    "flags.x", "flags.n", "flags.z", "flags.v", "flags.c",
    "flags.s", "flags.m", "flags.t", "flags.t0", "flags.t1",
    "int_mask", "int_level",
    "vbr", "sfc", "dfc", "cacr", "caar",
    "halted", "stopped", "cycles",
    "opcode", "model",
    "mmu.enabled", "mmu.tc", "mmu.mmusr", "mmu.atc_valid",
    "icache.valid",
    "fp0", "fp1", "fp2", "fp3", "fp4", "fp5", "fp6", "fp7",
    "fpcr", "fpsr", "fpiar",
];

/// Trailing entries of the path list that need an FPU.
const FPU_QUERY_PATHS: usize = 11;

impl Observable for Cpu680x0 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "d0" => Some(self.regs.d[0].into()),
            "d1" => Some(self.regs.d[1].into()),
            "d2" => Some(self.regs.d[2].into()),
            "d3" => Some(self.regs.d[3].into()),
            "d4" => Some(self.regs.d[4].into()),
            "d5" => Some(self.regs.d[5].into()),
            "d6" => Some(self.regs.d[6].into()),
            "d7" => Some(self.regs.d[7].into()),
            "a0" => Some(self.regs.a(0).into()),
            "a1" => Some(self.regs.a(1).into()),
            "a2" => Some(self.regs.a(2).into()),
            "a3" => Some(self.regs.a(3).into()),
            "a4" => Some(self.regs.a(4).into()),
            "a5" => Some(self.regs.a(5).into()),
            "a6" => Some(self.regs.a(6).into()),
            "a7" => Some(self.regs.a(7).into()),
            "usp" => Some(self.regs.usp.into()),
            "isp" => Some(self.regs.isp.into()),
            "msp" => Some(self.regs.msp.into()),
            "ssp" => Some(self.regs.ssp().into()),
            "pc" => Some(self.regs.pc.into()),
            "ppc" => Some(self.ppc.into()),
            "sr" => Some(Value::U16(self.regs.sr)),
            "ccr" => Some(self.regs.ccr().into()),
            "flags.x" => Some((self.regs.sr & X != 0).into()),
            "flags.n" => Some((self.regs.sr & N != 0).into()),
            "flags.z" => Some((self.regs.sr & Z != 0).into()),
            "flags.v" => Some((self.regs.sr & V != 0).into()),
            "flags.c" => Some((self.regs.sr & C != 0).into()),
            "flags.s" => Some((self.regs.sr & S != 0).into()),
            "flags.m" => Some((self.regs.sr & M != 0).into()),
            "flags.t" | "flags.t1" => Some((self.regs.sr & T1 != 0).into()),
            "flags.t0" => Some((self.regs.sr & T0 != 0).into()),
            "int_mask" => Some(self.regs.interrupt_mask().into()),
            "int_level" => Some(self.int_level.into()),
            "vbr" => Some(self.regs.vbr.into()),
            "sfc" => Some(self.regs.sfc.into()),
            "dfc" => Some(self.regs.dfc.into()),
            "cacr" => Some(self.regs.cacr.into()),
            "caar" => Some(self.regs.caar.into()),
            "halted" => Some(matches!(self.state, State::Halted).into()),
            "stopped" => Some(matches!(self.state, State::Stopped).into()),
            "cycles" => Some(self.total_cycles.get().into()),
            "opcode" => Some(Value::U16(self.ir)),
            "model" => Some(self.model.name().into()),
            "mmu.enabled" => Some(self.mmu.enabled().into()),
            "mmu.tc" => Some(self.mmu.tc.into()),
            "mmu.mmusr" => Some(Value::U16(self.mmu.mmusr)),
            "mmu.atc_valid" => Some((self.mmu.atc_valid_entries() as u64).into()),
            "icache.valid" => Some((self.icache.valid_entries() as u64).into()),
            _ if self.caps.fpu => self.query_fpu(path),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        if self.caps.fpu {
            M680X0_QUERY_PATHS
        } else {
            &M680X0_QUERY_PATHS[..M680X0_QUERY_PATHS.len() - FPU_QUERY_PATHS]
        }
    }
}
