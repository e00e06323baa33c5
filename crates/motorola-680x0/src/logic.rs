//! Logic instructions: AND, OR, EOR, NOT, CLR, TST, TAS, EXG, SWAP, EXT,
//! and the immediate forms that target CCR and SR.

use crate::alu::Size;
use crate::bus::M68kBus;
use crate::cpu::Cpu680x0;
use crate::ea::Operand;
use crate::execute::LogicOp;
use crate::fault::{ExceptionKind, Fault, raise};

/// Logic operation selected by bits 11-9 of an immediate-to-CCR/SR opcode.
fn imm_logic_op(opcode: u16) -> Fault<LogicOp> {
    match (opcode >> 9) & 7 {
        0 => Ok(LogicOp::Or),
        1 => Ok(LogicOp::And),
        5 => Ok(LogicOp::Eor),
        _ => raise(ExceptionKind::IllegalInstruction),
    }
}

impl Cpu680x0 {
    // ================================================================
    // AND / OR / EOR
    // ================================================================
    //
    // Encoding: TTTT RRR OOO MMMRRR
    //   OOO = 0SS: <ea> op Dn -> Dn, 1SS: Dn op <ea> -> <ea>
    //   EOR only has the second form.

    pub(crate) fn exec_logic<B: M68kBus>(&mut self, bus: &mut B, opcode: u16, op: LogicOp) -> Fault<()> {
        let size = Self::size_field(opcode)?;
        let reg = usize::from((opcode >> 9) & 7);

        if opcode & 0x0100 == 0 {
            let (_, src) = self.read_ea(bus, opcode, size)?;
            let result = op.apply(self.regs.d[reg], src) & size.mask();
            self.write_data_reg(reg, size, result);
            self.set_flags_move(result, size);
            return Ok(());
        }

        let mode = Self::ea_mode(opcode)?;
        let operand = self.ea_operand(bus, mode, size)?;
        let dst = self.read_operand(bus, operand, size)?;
        let result = op.apply(dst, self.regs.d[reg]) & size.mask();
        self.set_flags_move(result, size);
        self.write_operand(bus, operand, size, result)
    }

    /// ORI/ANDI/EORI #imm,CCR.
    pub(crate) fn exec_imm_to_ccr<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let op = imm_logic_op(opcode)?;
        let imm = self.fetch_word(bus)? & 0xFF;
        let ccr = op.apply(u32::from(self.regs.ccr()), u32::from(imm));
        self.regs.set_ccr(ccr as u8);
        Ok(())
    }

    /// ORI/ANDI/EORI #imm,SR (privileged).
    pub(crate) fn exec_imm_to_sr<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        self.require_supervisor()?;
        let op = imm_logic_op(opcode)?;
        let imm = self.fetch_word(bus)?;
        let sr = op.apply(u32::from(self.regs.sr), u32::from(imm));
        self.set_sr(sr as u16);
        self.flow_changed = true;
        Ok(())
    }

    // ================================================================
    // Single-operand group
    // ================================================================

    pub(crate) fn exec_not<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = Self::size_field(opcode)?;
        let (operand, value) = self.read_ea(bus, opcode, size)?;
        let result = !value & size.mask();
        self.set_flags_move(result, size);
        self.write_operand(bus, operand, size, result)
    }

    pub(crate) fn exec_clr<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = Self::size_field(opcode)?;
        let mode = Self::ea_mode(opcode)?;
        let operand = self.ea_operand(bus, mode, size)?;
        self.set_flags_move(0, size);
        self.write_operand(bus, operand, size, 0)
    }

    pub(crate) fn exec_tst<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = Self::size_field(opcode)?;
        let (_, value) = self.read_ea(bus, opcode, size)?;
        self.set_flags_move(value, size);
        Ok(())
    }

    /// TAS: test and set bit 7 with an indivisible read-modify-write.
    pub(crate) fn exec_tas<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let (operand, value) = self.read_ea(bus, opcode, Size::Byte)?;
        self.set_flags_move(value, Size::Byte);
        let result = (value | 0x80) as u8;
        match operand {
            Operand::Memory { address, .. } => self.write_tas(bus, address, result),
            _ => self.write_operand(bus, operand, Size::Byte, u32::from(result)),
        }
    }

    pub(crate) fn exec_swap(&mut self, opcode: u16) {
        let reg = usize::from(opcode & 7);
        let value = self.regs.d[reg].rotate_left(16);
        self.regs.d[reg] = value;
        self.set_flags_move(value, Size::Long);
    }

    /// EXT.W, EXT.L and EXTB.L.
    pub(crate) fn exec_ext(&mut self, opcode: u16) {
        let reg = usize::from(opcode & 7);
        let value = self.regs.d[reg];
        let (size, result) = match (opcode >> 6) & 7 {
            2 => (Size::Word, Size::Byte.sign_extend(value) & 0xFFFF),
            3 => (Size::Long, Size::Word.sign_extend(value)),
            _ => (Size::Long, Size::Byte.sign_extend(value)),
        };
        self.write_data_reg(reg, size, result);
        self.set_flags_move(result, size);
    }

    /// EXG: Dx/Dy, Ax/Ay or Dx/Ay.
    pub(crate) fn exec_exg(&mut self, opcode: u16) {
        let rx = usize::from((opcode >> 9) & 7);
        let ry = usize::from(opcode & 7);
        match (opcode >> 3) & 0x1F {
            0x08 => self.regs.d.swap(rx, ry),
            0x09 => {
                let x = self.regs.a(rx);
                self.regs.set_a(rx, self.regs.a(ry));
                self.regs.set_a(ry, x);
            }
            _ => {
                let x = self.regs.d[rx];
                self.regs.d[rx] = self.regs.a(ry);
                self.regs.set_a(ry, x);
            }
        }
    }
}
