//! Program flow: Bcc/BRA/BSR, DBcc, Scc, TRAPcc, TRAPV, JMP, JSR, RTS,
//! RTR and RTD.

use crate::alu::Size;
use crate::bus::M68kBus;
use crate::cpu::Cpu680x0;
use crate::fault::{ExceptionKind, Fault, raise};
use crate::flags::{Status, V};

/// Condition field in bits 11-8.
const fn condition_field(opcode: u16) -> u8 {
    ((opcode >> 8) & 0xF) as u8
}

impl Cpu680x0 {
    fn jump(&mut self, target: u32) {
        self.regs.pc = target;
        self.flow_changed = true;
    }

    // ================================================================
    // Bcc / BRA / BSR
    // ================================================================
    //
    // Encoding: 0110 CCCC DDDDDDDD
    //   D = 0x00: 16-bit displacement follows
    //   D = 0xFF: 32-bit displacement follows (68020+)
    //   CCCC = 0000 BRA, 0001 BSR

    pub(crate) fn exec_bcc<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let base = self.regs.pc;
        let disp8 = opcode as u8;
        let (disp, extended) = match disp8 {
            0 => (self.fetch_word(bus)? as i16 as u32, true),
            0xFF if self.caps.isa.has_020() => (self.fetch_long(bus)?, true),
            _ => (disp8 as i8 as u32, false),
        };
        let target = base.wrapping_add(disp);
        let dynamic = self.dynamic_timing();

        match condition_field(opcode) {
            1 => {
                self.push_long(bus, self.regs.pc)?;
                self.jump(target);
                if dynamic {
                    self.cycles += 10;
                }
            }
            cc if Status::condition(self.regs.sr, cc) => {
                self.jump(target);
                if dynamic {
                    self.cycles += 2;
                }
            }
            _ => {
                if dynamic && extended {
                    self.cycles += 4;
                }
            }
        }
        Ok(())
    }

    // ================================================================
    // DBcc
    // ================================================================
    //
    // Encoding: 0101 CCCC 1100 1RRR + d16
    //   Loops while the condition is false and Dn.W has not reached -1.

    pub(crate) fn exec_dbcc<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let base = self.regs.pc;
        let disp = self.fetch_word(bus)? as i16 as u32;
        let dynamic = self.dynamic_timing();

        if Status::condition(self.regs.sr, condition_field(opcode)) {
            if dynamic {
                self.cycles += 2;
            }
            return Ok(());
        }

        let reg = usize::from(opcode & 7);
        let counter = (self.regs.d[reg] as u16).wrapping_sub(1);
        self.write_data_reg(reg, Size::Word, u32::from(counter));
        if counter == 0xFFFF {
            if dynamic {
                self.cycles += 4;
            }
        } else {
            self.jump(base.wrapping_add(disp));
        }
        Ok(())
    }

    /// Scc: set a byte to all ones or all zeros.
    pub(crate) fn exec_scc<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let set = Status::condition(self.regs.sr, condition_field(opcode));
        let mode = Self::ea_mode(opcode)?;
        let operand = self.ea_operand(bus, mode, Size::Byte)?;
        if set && self.dynamic_timing() && mode.is_register() {
            self.cycles += 2;
        }
        self.write_operand(bus, operand, Size::Byte, if set { 0xFF } else { 0 })
    }

    /// TRAPcc with no operand, #imm.W or #imm.L. The operand is only
    /// there for the handler to read.
    pub(crate) fn exec_trapcc<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        match opcode & 7 {
            2 => {
                self.fetch_word(bus)?;
            }
            3 => {
                self.fetch_long(bus)?;
            }
            _ => {}
        }
        if Status::condition(self.regs.sr, condition_field(opcode)) {
            return raise(ExceptionKind::Trapv);
        }
        Ok(())
    }

    pub(crate) fn exec_trapv(&mut self) -> Fault<()> {
        if self.regs.sr & V != 0 {
            return raise(ExceptionKind::Trapv);
        }
        Ok(())
    }

    // ================================================================
    // JMP / JSR / returns
    // ================================================================

    pub(crate) fn exec_jmp<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let mode = Self::ea_mode(opcode)?;
        let target = self.ea_address(bus, mode)?;
        self.jump(target);
        Ok(())
    }

    pub(crate) fn exec_jsr<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let mode = Self::ea_mode(opcode)?;
        let target = self.ea_address(bus, mode)?;
        self.push_long(bus, self.regs.pc)?;
        self.jump(target);
        Ok(())
    }

    pub(crate) fn exec_rts<B: M68kBus>(&mut self, bus: &mut B) -> Fault<()> {
        let target = self.pop_long(bus)?;
        self.jump(target);
        Ok(())
    }

    /// RTR: restore CCR, then return.
    pub(crate) fn exec_rtr<B: M68kBus>(&mut self, bus: &mut B) -> Fault<()> {
        let ccr = self.pop_word(bus)?;
        let target = self.pop_long(bus)?;
        self.regs.set_ccr(ccr as u8);
        self.jump(target);
        Ok(())
    }

    /// RTD #d16: return and deallocate parameters.
    pub(crate) fn exec_rtd<B: M68kBus>(&mut self, bus: &mut B) -> Fault<()> {
        let disp = self.fetch_word(bus)? as i16 as u32;
        let target = self.pop_long(bus)?;
        let sp = self.regs.active_sp().wrapping_add(disp);
        self.regs.set_active_sp(sp);
        self.jump(target);
        Ok(())
    }
}
