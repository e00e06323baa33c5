//! Status register moves, stack frames (LINK/UNLK) and the processor
//! control instructions: MOVE USP, RESET, STOP and BKPT.

use crate::alu::Size;
use crate::bus::M68kBus;
use crate::cpu::{Cpu680x0, State};
use crate::fault::{ExceptionKind, Fault, raise};

impl Cpu680x0 {
    // ================================================================
    // SR and CCR moves
    // ================================================================

    /// MOVE SR,<ea>. Privileged from the 68010 on.
    pub(crate) fn exec_move_from_sr<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        if self.caps.isa.has_010() {
            self.require_supervisor()?;
        }
        let mode = Self::ea_mode(opcode)?;
        let operand = self.ea_operand(bus, mode, Size::Word)?;
        self.write_operand(bus, operand, Size::Word, u32::from(self.regs.sr))
    }

    /// MOVE CCR,<ea> (68010+). The upper byte reads as zero.
    pub(crate) fn exec_move_from_ccr<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let mode = Self::ea_mode(opcode)?;
        let operand = self.ea_operand(bus, mode, Size::Word)?;
        self.write_operand(bus, operand, Size::Word, u32::from(self.regs.ccr()))
    }

    pub(crate) fn exec_move_to_ccr<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let (_, value) = self.read_ea(bus, opcode, Size::Word)?;
        self.regs.set_ccr(value as u8);
        Ok(())
    }

    pub(crate) fn exec_move_to_sr<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        self.require_supervisor()?;
        let (_, value) = self.read_ea(bus, opcode, Size::Word)?;
        self.set_sr(value as u16);
        self.flow_changed = true;
        Ok(())
    }

    // ================================================================
    // LINK / UNLK
    // ================================================================

    /// LINK An,#d16 (or #d32 on the 68020).
    pub(crate) fn exec_link<B: M68kBus>(&mut self, bus: &mut B, opcode: u16, long: bool) -> Fault<()> {
        let disp = if long {
            self.fetch_long(bus)?
        } else {
            self.fetch_word(bus)? as i16 as u32
        };
        let reg = usize::from(opcode & 7);
        // LINK A7 stores the already decremented stack pointer.
        let saved = if reg == 7 {
            self.regs.active_sp().wrapping_sub(4)
        } else {
            self.regs.a(reg)
        };
        self.push_long(bus, saved)?;
        let frame = self.regs.active_sp();
        self.regs.set_a(reg, frame);
        self.regs.set_active_sp(frame.wrapping_add(disp));
        Ok(())
    }

    pub(crate) fn exec_unlk<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let reg = usize::from(opcode & 7);
        self.regs.set_active_sp(self.regs.a(reg));
        let value = self.pop_long(bus)?;
        self.regs.set_a(reg, value);
        Ok(())
    }

    // ================================================================
    // Processor control
    // ================================================================

    /// MOVE USP,An (bit 3 set) or MOVE An,USP.
    pub(crate) fn exec_move_usp(&mut self, opcode: u16) -> Fault<()> {
        self.require_supervisor()?;
        let reg = usize::from(opcode & 7);
        if opcode & 0x0008 != 0 {
            self.regs.set_a(reg, self.regs.usp);
        } else {
            self.regs.usp = self.regs.a(reg);
        }
        Ok(())
    }

    /// RESET: pulse the external reset line. The CPU itself is untouched.
    pub(crate) fn exec_reset<B: M68kBus>(&mut self, bus: &mut B) -> Fault<()> {
        self.require_supervisor()?;
        log::debug!("{}: RESET instruction at pc={:#010x}", self.model.name(), self.ppc);
        bus.reset();
        Ok(())
    }

    /// STOP #imm: load SR and wait for an interrupt.
    pub(crate) fn exec_stop<B: M68kBus>(&mut self, bus: &mut B) -> Fault<()> {
        self.require_supervisor()?;
        let sr = self.fetch_word(bus)?;
        self.set_sr(sr);
        self.state = State::Stopped;
        self.flow_changed = true;
        Ok(())
    }

    /// BKPT #n: run the breakpoint acknowledge cycle, then trap as an
    /// illegal instruction.
    pub(crate) fn exec_bkpt<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        bus.breakpoint((opcode & 7) as u8);
        raise(ExceptionKind::IllegalInstruction)
    }
}
