//! Exception processing: stack frames, vectoring and RTE.
//!
//! Entry follows the same four steps on every part: save SR, enter
//! supervisor mode with tracing off, push the frame the variant uses for
//! this class of exception, and load PC from the vector table. Only the
//! frame layout differs between models.
//!
//! A group 0 exception raised while the frame of a previous group 0
//! exception is being pushed is a double bus fault: the CPU halts until
//! reset. Once the frame is down and the vector fetched, the handler runs
//! under normal rules.

use crate::alu::Size;
use crate::bus::{FunctionCode, M68kBus};
use crate::cpu::{Cpu680x0, RunMode, State};
use crate::fault::{AccessFault, ExceptionKind, ExceptionRequest, Fault, raise};
use crate::flags::{M, S, T0, T1};
use crate::model::FrameStyle;
use crate::timing::exception_cycles;

/// Words that follow the common 4-word head of a format `format` frame.
const fn extra_words(format: u16) -> Option<u32> {
    match format {
        0x0 | 0x1 => Some(0),
        0x2 | 0x3 => Some(2),
        0x7 => Some(26),
        0x8 => Some(25),
        0x9 => Some(6),
        0xA => Some(12),
        0xB => Some(42),
        0xC => Some(8),
        _ => None,
    }
}

/// Frame formats RTE accepts for each frame style.
const fn rte_accepts(style: FrameStyle, format: u16) -> bool {
    match style {
        FrameStyle::M68010 => matches!(format, 0x0 | 0x8),
        FrameStyle::M68020 => matches!(format, 0x0 | 0x1 | 0x2 | 0x9 | 0xA | 0xB),
        FrameStyle::Cpu32 => matches!(format, 0x0 | 0x2 | 0xC),
        FrameStyle::M68040 => matches!(format, 0x0 | 0x1 | 0x2 | 0x3 | 0x7),
        FrameStyle::M68000 | FrameStyle::ColdFire => false,
    }
}

/// Exceptions stacked with the six-word format $2 frame.
const fn uses_format_2(kind: ExceptionKind) -> bool {
    matches!(
        kind,
        ExceptionKind::Chk | ExceptionKind::Trapv | ExceptionKind::ZeroDivide | ExceptionKind::Trace
    )
}

impl Cpu680x0 {
    /// Write SR, dropping bits the part does not implement. The active
    /// stack follows S and M automatically.
    pub(crate) fn set_sr(&mut self, value: u16) {
        self.regs.sr = value & self.caps.sr_mask;
    }

    /// Take `request`. `int_level` is set for interrupts and becomes the
    /// new interrupt mask.
    ///
    /// A bus or address error while a group 1/2 frame is pushed is taken in
    /// its place. A second group 0 fault while a group 0 frame is pushed
    /// halts the CPU.
    pub(crate) fn process_exception<B: M68kBus>(&mut self, bus: &mut B, request: ExceptionRequest, int_level: Option<u8>) {
        let result = if request.kind.is_group0() {
            self.run_mode = RunMode::Group0;
            self.enter_exception(bus, request, int_level)
        } else {
            match self.enter_exception(bus, request, int_level) {
                Err(second) if second.kind.is_group0() => {
                    self.run_mode = RunMode::Group0;
                    self.enter_exception(bus, second, None)
                }
                other => other,
            }
        };

        match result {
            Ok(()) => self.run_mode = RunMode::Normal,
            Err(fault) => self.double_fault(fault),
        }
    }

    fn double_fault(&mut self, request: ExceptionRequest) {
        self.state = State::Halted;
        log::error!(
            "{}: double bus fault at pc={:#010x}: {:?}",
            self.model.name(),
            self.ppc,
            request
        );
    }

    fn enter_exception<B: M68kBus>(&mut self, bus: &mut B, request: ExceptionRequest, int_level: Option<u8>) -> Fault<()> {
        let kind = request.kind;
        let vector = kind.vector();
        self.cycles += exception_cycles(kind, self.caps.isa);
        log::debug!(
            "{}: exception {kind:?} (vector {vector}) at pc={:#010x}",
            self.model.name(),
            self.ppc
        );

        let old_sr = self.regs.sr;
        self.set_sr((old_sr | S) & !(T1 | T0));
        if let Some(level) = int_level {
            self.regs.set_interrupt_mask(level);
        }
        self.state = State::Running;

        let return_pc = self.return_pc(kind);
        self.push_frame(bus, &request, old_sr, return_pc)?;

        if int_level.is_some() && self.caps.msp && self.regs.is_master() {
            // The interrupt frame went to the master stack; leave a
            // throwaway frame on the interrupt stack.
            self.regs.sr &= !M;
            self.push_short_frame(bus, 0x1, vector, old_sr | S, return_pc)?;
        }

        let table = if self.caps.vbr { self.regs.vbr } else { 0 };
        let fc = FunctionCode::SupervisorData;
        let mut handler = self.read_long_fc(bus, table.wrapping_add(u32::from(vector) * 4), fc)?;
        if handler == 0 && matches!(kind, ExceptionKind::Interrupt { .. }) {
            let uninitialized = u32::from(ExceptionKind::UninitializedInterrupt.vector()) * 4;
            handler = self.read_long_fc(bus, table.wrapping_add(uninitialized), fc)?;
        }
        self.regs.pc = handler;
        Ok(())
    }

    /// PC saved in the frame: the faulting instruction for exceptions that
    /// re-run or report it, the next instruction otherwise.
    fn return_pc(&self, kind: ExceptionKind) -> u32 {
        match kind {
            ExceptionKind::IllegalInstruction
            | ExceptionKind::LineA
            | ExceptionKind::LineF
            | ExceptionKind::PrivilegeViolation
            | ExceptionKind::FormatError => self.ppc,
            ExceptionKind::BusError | ExceptionKind::AddressError if self.caps.frames != FrameStyle::M68000 => self.ppc,
            _ => self.regs.pc,
        }
    }

    fn push_frame<B: M68kBus>(&mut self, bus: &mut B, request: &ExceptionRequest, sr: u16, pc: u32) -> Fault<()> {
        let kind = request.kind;
        let vector = kind.vector();
        let access = request.access.unwrap_or(AccessFault {
            address: 0,
            write: false,
            fc: FunctionCode::SupervisorData,
            size: Size::Word,
            instruction: false,
        });

        match self.caps.frames {
            FrameStyle::M68000 => {
                self.push_long(bus, pc)?;
                self.push_word(bus, sr)?;
                if kind.is_group0() {
                    let mut status = (self.ir & 0xFFE0) | u16::from(access.fc.bits());
                    if !access.write {
                        status |= 0x10;
                    }
                    if !access.instruction {
                        status |= 0x08;
                    }
                    self.push_word(bus, self.ir)?;
                    self.push_long(bus, access.address)?;
                    self.push_word(bus, status)?;
                }
                Ok(())
            }
            FrameStyle::M68010 if kind.is_group0() => self.push_format_8(bus, &access, vector, sr, pc),
            FrameStyle::M68010 => self.push_short_frame(bus, 0x0, vector, sr, pc),
            FrameStyle::M68020 => match kind {
                ExceptionKind::AddressError => self.push_format_a(bus, &access, vector, sr, pc),
                ExceptionKind::BusError => self.push_format_b(bus, &access, vector, sr, pc),
                _ if uses_format_2(kind) => self.push_format_2(bus, self.ppc, vector, sr, pc),
                _ => self.push_short_frame(bus, 0x0, vector, sr, pc),
            },
            FrameStyle::Cpu32 => match kind {
                ExceptionKind::AddressError | ExceptionKind::BusError => self.push_format_c(bus, &access, vector, sr, pc),
                _ if uses_format_2(kind) => self.push_format_2(bus, self.ppc, vector, sr, pc),
                _ => self.push_short_frame(bus, 0x0, vector, sr, pc),
            },
            FrameStyle::M68040 => match kind {
                ExceptionKind::BusError => self.push_format_7(bus, &access, vector, sr, pc),
                ExceptionKind::AddressError => self.push_format_2(bus, access.address, vector, sr, pc),
                _ if uses_format_2(kind) => self.push_format_2(bus, self.ppc, vector, sr, pc),
                _ => self.push_short_frame(bus, 0x0, vector, sr, pc),
            },
            FrameStyle::ColdFire => {
                let sp = self.regs.active_sp();
                let misalignment = sp & 3;
                self.regs.set_active_sp(sp & !3);
                self.push_long(bus, pc)?;
                let format = ((4 + misalignment) << 28) | (u32::from(vector) << 18) | u32::from(sr);
                self.push_long(bus, format)
            }
        }
    }

    /// Format $0/$1: format word, PC, SR.
    fn push_short_frame<B: M68kBus>(&mut self, bus: &mut B, format: u16, vector: u8, sr: u16, pc: u32) -> Fault<()> {
        self.push_word(bus, (format << 12) | (u16::from(vector) << 2))?;
        self.push_long(bus, pc)?;
        self.push_word(bus, sr)
    }

    /// Format $2: instruction (or fault) address above the short frame.
    fn push_format_2<B: M68kBus>(&mut self, bus: &mut B, address: u32, vector: u8, sr: u16, pc: u32) -> Fault<()> {
        self.push_long(bus, address)?;
        self.push_short_frame(bus, 0x2, vector, sr, pc)
    }

    fn push_zeros<B: M68kBus>(&mut self, bus: &mut B, words: u32) -> Fault<()> {
        for _ in 0..words {
            self.push_word(bus, 0)?;
        }
        Ok(())
    }

    /// Reserve stack words the CPU does not write.
    fn skip_words(&mut self, words: u32) {
        let sp = self.regs.active_sp();
        self.regs.set_active_sp(sp.wrapping_sub(words * 2));
    }

    /// 68010 special status word.
    fn ssw_010(access: &AccessFault) -> u16 {
        let mut ssw = u16::from(access.fc.bits());
        if !access.write {
            ssw |= 0x0100;
        }
        if access.size == Size::Byte {
            ssw |= 0x0200;
        }
        ssw | if access.instruction { 0x2000 } else { 0x1000 }
    }

    /// 68020/68030 special status word.
    fn ssw_020(access: &AccessFault) -> u16 {
        let size = match access.size {
            Size::Byte => 1,
            Size::Word => 2,
            Size::Long => 0,
        };
        let mut ssw = u16::from(access.fc.bits()) | (size << 4);
        if !access.write {
            ssw |= 0x0040;
        }
        ssw | if access.instruction { 0x1000 } else { 0x0100 }
    }

    /// Format $8: 68010 bus/address error, 29 words.
    fn push_format_8<B: M68kBus>(&mut self, bus: &mut B, access: &AccessFault, vector: u8, sr: u16, pc: u32) -> Fault<()> {
        self.skip_words(16);
        // Instruction input, data input and data output buffers, each
        // followed by an unused word.
        for _ in 0..3 {
            self.push_word(bus, 0)?;
            self.skip_words(1);
        }
        self.push_long(bus, access.address)?;
        self.push_word(bus, Self::ssw_010(access))?;
        self.push_short_frame(bus, 0x8, vector, sr, pc)
    }

    /// Format $A: 68020/68030 short bus cycle fault, 16 words.
    fn push_format_a<B: M68kBus>(&mut self, bus: &mut B, access: &AccessFault, vector: u8, sr: u16, pc: u32) -> Fault<()> {
        // Internal registers and data output buffer.
        self.push_zeros(bus, 6)?;
        self.push_long(bus, access.address)?;
        // Pipe stages B and C.
        self.push_zeros(bus, 2)?;
        self.push_word(bus, Self::ssw_020(access))?;
        self.push_word(bus, 0)?;
        self.push_short_frame(bus, 0xA, vector, sr, pc)
    }

    /// Format $B: 68020/68030 long bus cycle fault, 46 words.
    fn push_format_b<B: M68kBus>(&mut self, bus: &mut B, access: &AccessFault, vector: u8, sr: u16, pc: u32) -> Fault<()> {
        self.push_zeros(bus, 36)?;
        self.push_long(bus, access.address)?;
        self.push_zeros(bus, 2)?;
        self.push_word(bus, Self::ssw_020(access))?;
        self.push_word(bus, 0)?;
        self.push_short_frame(bus, 0xB, vector, sr, pc)
    }

    /// Format $C: CPU32 bus/address error, 12 words.
    fn push_format_c<B: M68kBus>(&mut self, bus: &mut B, access: &AccessFault, vector: u8, sr: u16, pc: u32) -> Fault<()> {
        let mut ssw = u16::from(access.fc.bits());
        if !access.write {
            ssw |= 0x0040;
        }
        self.push_word(bus, ssw)?;
        // Internal transfer count.
        self.push_word(bus, 0)?;
        self.push_long(bus, self.ppc)?;
        // Data buffer.
        self.push_long(bus, 0)?;
        self.push_long(bus, access.address)?;
        self.push_short_frame(bus, 0xC, vector, sr, pc)
    }

    /// Format $7: 68040 access error, 30 words.
    fn push_format_7<B: M68kBus>(&mut self, bus: &mut B, access: &AccessFault, vector: u8, sr: u16, pc: u32) -> Fault<()> {
        // Push data 3..1, then write-back data and addresses 1..3.
        self.push_zeros(bus, 18)?;
        self.push_long(bus, access.address)?;
        // Write-back status words.
        self.push_zeros(bus, 3)?;
        let size = match access.size {
            Size::Long => 0,
            Size::Byte => 1,
            Size::Word => 2,
        };
        let mut ssw = u16::from(access.fc.bits()) | (size << 5);
        if !access.write {
            ssw |= 0x0100;
        }
        self.push_word(bus, ssw)?;
        self.push_long(bus, access.address)?;
        self.push_short_frame(bus, 0x7, vector, sr, pc)
    }

    // === RTE ===

    /// RTE: pop the frame, restore SR and PC. Frames the part does not
    /// produce raise a format error with the stack untouched.
    pub(crate) fn exec_rte<B: M68kBus>(&mut self, bus: &mut B) -> Fault<()> {
        if !self.regs.is_supervisor() {
            return raise(ExceptionKind::PrivilegeViolation);
        }

        match self.caps.frames {
            FrameStyle::M68000 => {
                let sr = self.pop_word(bus)?;
                let pc = self.pop_long(bus)?;
                self.set_sr(sr);
                self.regs.pc = pc;
            }
            FrameStyle::ColdFire => {
                let format = self.pop_long(bus)?;
                let pc = self.pop_long(bus)?;
                let sp = self.regs.active_sp();
                self.regs.set_active_sp(sp.wrapping_add((format >> 28).saturating_sub(4)));
                self.set_sr(format as u16);
                self.regs.pc = pc;
            }
            style => loop {
                let sp = self.regs.active_sp();
                let sr = self.read_word(bus, sp)?;
                let pc = self.read_long(bus, sp.wrapping_add(2))?;
                let format = self.read_word(bus, sp.wrapping_add(6))? >> 12;
                let Some(extra) = extra_words(format).filter(|_| rte_accepts(style, format)) else {
                    return raise(ExceptionKind::FormatError);
                };
                self.regs.set_active_sp(sp.wrapping_add(8 + extra * 2));
                self.set_sr(sr);
                if format == 0x1 {
                    // Throwaway frame: continue with the frame on the
                    // stack SR now selects.
                    continue;
                }
                self.regs.pc = pc;
                break;
            },
        }

        self.flow_changed = true;
        bus.rte_executed();
        Ok(())
    }
}
