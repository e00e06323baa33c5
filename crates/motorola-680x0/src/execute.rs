//! Instruction dispatch and the data movement group.
//!
//! [`Cpu680x0::execute`] maps a jump table class onto its handler. Each
//! handler fetches its own extension words, resolves its operands, does
//! the work and updates flags. Anything that can fault returns early with
//! `?`; the exception is taken at the step boundary.

use crate::addressing::AddrMode;
use crate::alu::{AluResult, Size};
use crate::bus::M68kBus;
use crate::cpu::Cpu680x0;
use crate::decode::Op;
use crate::ea::Operand;
use crate::fault::{ExceptionKind, Fault, raise};
use crate::flags::{C, N, Status, V, X, Z};

impl Cpu680x0 {
    /// Run the handler for `op`.
    #[allow(clippy::too_many_lines)]
    pub(crate) fn execute<B: M68kBus>(&mut self, bus: &mut B, op: Op, opcode: u16) -> Fault<()> {
        match op {
            Op::Illegal => raise(ExceptionKind::IllegalInstruction),
            Op::LineA => raise(ExceptionKind::LineA),
            Op::LineF => self.exec_line_f(bus, opcode),

            Op::OriCcr | Op::AndiCcr | Op::EoriCcr => self.exec_imm_to_ccr(bus, opcode),
            Op::OriSr | Op::AndiSr | Op::EoriSr => self.exec_imm_to_sr(bus, opcode),
            Op::AluImm => self.exec_alu_imm(bus, opcode),
            Op::BitDynamic => self.exec_bit(bus, opcode, false),
            Op::BitStatic => self.exec_bit(bus, opcode, true),
            Op::Movep => self.exec_movep(bus, opcode),
            Op::Moves => self.exec_moves(bus, opcode),
            Op::Cmp2Chk2 => self.exec_cmp2_chk2(bus, opcode),
            Op::Cas => self.exec_cas(bus, opcode),
            Op::Cas2 => self.exec_cas2(bus, opcode),

            Op::Move => self.exec_move(bus, opcode),
            Op::Movea => self.exec_movea(bus, opcode),

            Op::Negx => self.exec_negx(bus, opcode),
            Op::Clr => self.exec_clr(bus, opcode),
            Op::Neg => self.exec_neg(bus, opcode),
            Op::Not => self.exec_not(bus, opcode),
            Op::MoveFromSr => self.exec_move_from_sr(bus, opcode),
            Op::MoveFromCcr => self.exec_move_from_ccr(bus, opcode),
            Op::MoveToCcr => self.exec_move_to_ccr(bus, opcode),
            Op::MoveToSr => self.exec_move_to_sr(bus, opcode),
            Op::Nbcd => self.exec_nbcd(bus, opcode),
            Op::Swap => {
                self.exec_swap(opcode);
                Ok(())
            }
            Op::Pea => self.exec_pea(bus, opcode),
            Op::Bkpt => self.exec_bkpt(bus, opcode),
            Op::Ext | Op::Extb => {
                self.exec_ext(opcode);
                Ok(())
            }
            Op::Movem => self.exec_movem(bus, opcode),
            Op::Tst => self.exec_tst(bus, opcode),
            Op::Tas => self.exec_tas(bus, opcode),
            Op::MulL => self.exec_mul_long(bus, opcode),
            Op::DivL => self.exec_div_long(bus, opcode),
            Op::Trap => raise(ExceptionKind::Trap((opcode & 0xF) as u8)),
            Op::Link => self.exec_link(bus, opcode, false),
            Op::LinkLong => self.exec_link(bus, opcode, true),
            Op::Unlk => self.exec_unlk(bus, opcode),
            Op::MoveUsp => self.exec_move_usp(opcode),
            Op::Reset => self.exec_reset(bus),
            Op::Nop => Ok(()),
            Op::Stop => self.exec_stop(bus),
            Op::Rte => self.exec_rte(bus),
            Op::Rtd => self.exec_rtd(bus),
            Op::Rts => self.exec_rts(bus),
            Op::Trapv => self.exec_trapv(),
            Op::Rtr => self.exec_rtr(bus),
            Op::Movec => self.exec_movec(bus, opcode),
            Op::Jsr => self.exec_jsr(bus, opcode),
            Op::Jmp => self.exec_jmp(bus, opcode),
            Op::Chk => self.exec_chk(bus, opcode),
            Op::Lea => self.exec_lea(bus, opcode),

            Op::AddqSubq => self.exec_addq_subq(bus, opcode),
            Op::Scc => self.exec_scc(bus, opcode),
            Op::Dbcc => self.exec_dbcc(bus, opcode),
            Op::Trapcc => self.exec_trapcc(bus, opcode),
            Op::Bcc => self.exec_bcc(bus, opcode),
            Op::Moveq => {
                self.exec_moveq(opcode);
                Ok(())
            }

            Op::Or => self.exec_logic(bus, opcode, LogicOp::Or),
            Op::And => self.exec_logic(bus, opcode, LogicOp::And),
            Op::Eor => self.exec_logic(bus, opcode, LogicOp::Eor),
            Op::DivW => self.exec_div_word(bus, opcode),
            Op::MulW => self.exec_mul_word(bus, opcode),
            Op::Abcd => self.exec_bcd(bus, opcode, true),
            Op::Sbcd => self.exec_bcd(bus, opcode, false),
            Op::Pack => self.exec_pack(bus, opcode),
            Op::Unpk => self.exec_unpk(bus, opcode),
            Op::AddSub => self.exec_add_sub(bus, opcode),
            Op::AddaSuba => self.exec_adda_suba(bus, opcode),
            Op::AddxSubx => self.exec_addx_subx(bus, opcode),
            Op::Cmp => self.exec_cmp(bus, opcode),
            Op::Cmpa => self.exec_cmpa(bus, opcode),
            Op::Cmpm => self.exec_cmpm(bus, opcode),
            Op::Exg => {
                self.exec_exg(opcode);
                Ok(())
            }

            Op::ShiftReg => {
                self.exec_shift_reg(opcode);
                Ok(())
            }
            Op::ShiftMem => self.exec_shift_mem(bus, opcode),
            Op::Bitfield => self.exec_bitfield(bus, opcode),

            Op::Pmmu => self.exec_pmmu(bus, opcode),
            Op::Pflush040 => self.exec_pflush_040(opcode),
            Op::Ptest040 => self.exec_ptest_040(bus, opcode),
            Op::CacheOp040 => self.exec_cache_040(opcode),
            Op::Move16 => self.exec_move16(bus, opcode),
        }
    }

    // ================================================================
    // Shared helpers
    // ================================================================

    /// Privileged instructions trap in user mode.
    pub(crate) fn require_supervisor(&self) -> Fault<()> {
        if self.regs.is_supervisor() {
            Ok(())
        } else {
            raise(ExceptionKind::PrivilegeViolation)
        }
    }

    /// Size field in bits 7-6.
    pub(crate) fn size_field(opcode: u16) -> Fault<Size> {
        Size::from_bits(opcode >> 6).map_or_else(|| raise(ExceptionKind::IllegalInstruction), Ok)
    }

    /// N and Z from the result, V and C cleared. X untouched.
    pub(crate) fn set_flags_move(&mut self, value: u32, size: Size) {
        let sr = Status::update_nz(self.regs.sr, value & size.mask(), size.msb());
        self.regs.sr = Status::clear_vc(sr);
    }

    /// N, Z, V, C from an ALU result; X follows C when `extend` is set.
    pub(crate) fn set_flags_arith(&mut self, result: AluResult, size: Size, extend: bool) {
        let mut sr = Status::update_nz(self.regs.sr, result.value, size.msb());
        sr = Status::set_if(sr, V, result.overflow);
        sr = Status::set_if(sr, C, result.carry);
        if extend {
            sr = Status::set_if(sr, X, result.carry);
        }
        self.regs.sr = sr;
    }

    /// ADDX/SUBX/NEGX flags: Z is only ever cleared.
    pub(crate) fn set_flags_extend(&mut self, result: AluResult, size: Size) {
        let zero = self.regs.sr & Z != 0 && result.value == 0;
        let mut sr = Status::set_if(self.regs.sr, N, result.value & size.msb() != 0);
        sr = Status::set_if(sr, Z, zero);
        sr = Status::set_if(sr, V, result.overflow);
        sr = Status::set_if(sr, C, result.carry);
        self.regs.sr = Status::set_if(sr, X, result.carry);
    }

    // ================================================================
    // MOVE / MOVEA / MOVEQ
    // ================================================================
    //
    // Encoding: 00SS DDD MMM sss SSS
    //   SS = size (01=byte, 11=word, 10=long)
    //   DDD/MMM = destination register/mode (reversed from standard)

    fn move_size(opcode: u16) -> Fault<Size> {
        Size::from_move_bits(opcode >> 12).map_or_else(|| raise(ExceptionKind::IllegalInstruction), Ok)
    }

    fn exec_move<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = Self::move_size(opcode)?;
        let (_, value) = self.read_ea(bus, opcode, size)?;
        let Some(dest) = AddrMode::from_move_dest(opcode) else {
            return raise(ExceptionKind::IllegalInstruction);
        };
        let operand = self.ea_operand(bus, dest, size)?;
        // Flags are set before the destination write cycle.
        self.set_flags_move(value, size);
        self.write_operand(bus, operand, size, value)
    }

    fn exec_movea<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = Self::move_size(opcode)?;
        let (_, value) = self.read_ea(bus, opcode, size)?;
        let reg = usize::from((opcode >> 9) & 7);
        self.regs.set_a(reg, size.sign_extend(value));
        Ok(())
    }

    /// MOVEQ: sign-extend 8-bit immediate to 32 bits, write to Dn, set flags.
    fn exec_moveq(&mut self, opcode: u16) {
        let reg = usize::from((opcode >> 9) & 7);
        let data = opcode as u8 as i8 as u32;
        self.regs.d[reg] = data;
        self.set_flags_move(data, Size::Long);
    }

    // ================================================================
    // LEA / PEA
    // ================================================================

    fn exec_lea<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let mode = Self::ea_mode(opcode)?;
        let address = self.ea_address(bus, mode)?;
        self.regs.set_a(usize::from((opcode >> 9) & 7), address);
        Ok(())
    }

    fn exec_pea<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let mode = Self::ea_mode(opcode)?;
        let address = self.ea_address(bus, mode)?;
        self.push_long(bus, address)
    }

    // ================================================================
    // MOVEM
    // ================================================================
    //
    // Encoding: 0100 1D00 1S MMMRRR + register mask
    //   D = direction (1 = memory to registers), S = size (1 = long)
    //   Mask bit 0 is D0, except for -(An) where bit 0 is A7.

    fn exec_movem<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = if opcode & 0x0040 != 0 { Size::Long } else { Size::Word };
        let to_registers = opcode & 0x0400 != 0;
        let mask = self.fetch_word(bus)?;
        let mode = Self::ea_mode(opcode)?;
        let count = mask.count_ones();

        if to_registers {
            let (mut address, fc, post_reg) = match mode {
                AddrMode::AddrIndPostInc(r) => (self.regs.a(usize::from(r)), self.data_fc(), Some(usize::from(r))),
                _ => match self.ea_operand(bus, mode, Size::Long)? {
                    Operand::Memory { address, fc } => (address, fc, None),
                    _ => return raise(ExceptionKind::IllegalInstruction),
                },
            };
            for i in 0..16 {
                if mask & (1 << i) != 0 {
                    let value = self.read_fc(bus, address, size, fc)?;
                    self.regs.set_da(i, size.sign_extend(value));
                    address = address.wrapping_add(size.bytes());
                }
            }
            if let Some(reg) = post_reg {
                self.regs.set_a(reg, address);
            }
        } else if let AddrMode::AddrIndPreDec(r) = mode {
            let reg = usize::from(r);
            let initial = self.regs.a(reg);
            let mut address = initial;
            for i in 0..16 {
                if mask & (1 << i) != 0 {
                    address = address.wrapping_sub(size.bytes());
                    let index = 15 - i;
                    // The 68020 and later store the decremented value of
                    // the addressing register.
                    let value = if index == reg + 8 && self.caps.isa.has_020() {
                        initial.wrapping_sub(size.bytes())
                    } else {
                        self.regs.da(index)
                    };
                    self.write(bus, address, size, value)?;
                }
            }
            self.regs.set_a(reg, address);
        } else {
            let mut address = self.ea_address(bus, mode)?;
            for i in 0..16 {
                if mask & (1 << i) != 0 {
                    let value = self.regs.da(i);
                    self.write(bus, address, size, value)?;
                    address = address.wrapping_add(size.bytes());
                }
            }
        }

        let per_register = match (self.dynamic_timing(), size) {
            (true, Size::Long) => 8,
            (true, _) => 4,
            (false, _) => 2,
        };
        self.cycles += per_register * count;
        Ok(())
    }

    // ================================================================
    // MOVEP
    // ================================================================
    //
    // Encoding: 0000 DDD 1OO 001 AAA + d16
    //   OO = 00 word to Dn, 01 long to Dn, 10 word to memory, 11 long to memory
    //   Bytes go to every other address.

    fn exec_movep<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let dreg = usize::from((opcode >> 9) & 7);
        let areg = usize::from(opcode & 7);
        let disp = self.fetch_word(bus)? as i16 as u32;
        let address = self.regs.a(areg).wrapping_add(disp);
        let opmode = (opcode >> 6) & 3;
        let bytes: u32 = if opmode & 1 != 0 { 4 } else { 2 };

        if opmode & 2 == 0 {
            let mut value = 0u32;
            for i in 0..bytes {
                value = (value << 8) | u32::from(self.read_byte(bus, address.wrapping_add(i * 2))?);
            }
            let size = if bytes == 4 { Size::Long } else { Size::Word };
            self.write_data_reg(dreg, size, value);
        } else {
            let value = self.regs.d[dreg];
            for i in 0..bytes {
                let shift = (bytes - 1 - i) * 8;
                self.write_byte(bus, address.wrapping_add(i * 2), (value >> shift) as u8)?;
            }
        }
        Ok(())
    }
}

/// Two-operand logic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicOp {
    Or,
    And,
    Eor,
}

impl LogicOp {
    pub(crate) const fn apply(self, a: u32, b: u32) -> u32 {
        match self {
            Self::Or => a | b,
            Self::And => a & b,
            Self::Eor => a ^ b,
        }
    }
}
