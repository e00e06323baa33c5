//! Integer arithmetic: ADD/SUB and their variants, compares, negation,
//! multiply and divide, BCD, bounds checks and compare-and-swap.

use crate::addressing::AddrMode;
use crate::alu::{self, AluResult, Size};
use crate::bus::M68kBus;
use crate::cpu::Cpu680x0;
use crate::ea::Operand;
use crate::execute::LogicOp;
use crate::fault::{ExceptionKind, Fault, raise};
use crate::flags::{C, N, Status, V, X, Z};
use crate::timing::{bcd_add, bcd_sub};

/// ADD when the opcode's top nibble is 0xD, SUB when it is 0x9.
const fn is_add(opcode: u16) -> bool {
    opcode >> 12 == 0xD
}

fn add_or_sub(add: bool, dst: u32, src: u32, extend: bool, size: Size) -> AluResult {
    if add {
        alu::add(dst, src, extend, size)
    } else {
        alu::sub(dst, src, extend, size)
    }
}

impl Cpu680x0 {
    // ================================================================
    // Immediate ALU: ORI, ANDI, SUBI, ADDI, EORI, CMPI
    // ================================================================
    //
    // Encoding: 0000 KKK0 SS MMMRRR + immediate
    //   KKK = 0 ORI, 1 ANDI, 2 SUBI, 3 ADDI, 5 EORI, 6 CMPI

    pub(crate) fn exec_alu_imm<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = Self::size_field(opcode)?;
        let kind = (opcode >> 9) & 7;
        let imm = self.fetch_immediate(bus, size)?;
        let (operand, dst) = self.read_ea(bus, opcode, size)?;

        match kind {
            0 | 1 | 5 => {
                let op = match kind {
                    0 => LogicOp::Or,
                    1 => LogicOp::And,
                    _ => LogicOp::Eor,
                };
                let result = op.apply(dst, imm) & size.mask();
                self.set_flags_move(result, size);
                self.write_operand(bus, operand, size, result)
            }
            2 | 3 => {
                let result = add_or_sub(kind == 3, dst, imm, false, size);
                self.set_flags_arith(result, size, true);
                self.write_operand(bus, operand, size, result.value)
            }
            6 => {
                let result = alu::sub(dst, imm, false, size);
                self.set_flags_arith(result, size, false);
                if let (Operand::DataReg(reg), Size::Long) = (operand, size) {
                    bus.cmpi_long(imm, reg as u8);
                }
                Ok(())
            }
            _ => raise(ExceptionKind::IllegalInstruction),
        }
    }

    // ================================================================
    // ADD / SUB
    // ================================================================
    //
    // Encoding: 1101 RRR OOO MMMRRR (ADD), 1001 ... (SUB)
    //   OOO = 0SS: Dn op <ea> -> Dn, 1SS: <ea> op Dn -> <ea>

    pub(crate) fn exec_add_sub<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let add = is_add(opcode);
        let size = Self::size_field(opcode)?;
        let reg = usize::from((opcode >> 9) & 7);

        if opcode & 0x0100 == 0 {
            let (_, src) = self.read_ea(bus, opcode, size)?;
            let result = add_or_sub(add, self.regs.d[reg], src, false, size);
            self.write_data_reg(reg, size, result.value);
            self.set_flags_arith(result, size, true);
            return Ok(());
        }

        let (operand, dst) = self.read_ea(bus, opcode, size)?;
        let result = add_or_sub(add, dst, self.regs.d[reg], false, size);
        self.set_flags_arith(result, size, true);
        self.write_operand(bus, operand, size, result.value)
    }

    /// ADDA/SUBA: the source is sign-extended and no flags change.
    pub(crate) fn exec_adda_suba<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = if opcode & 0x0100 != 0 { Size::Long } else { Size::Word };
        let (_, src) = self.read_ea(bus, opcode, size)?;
        let src = size.sign_extend(src);
        let reg = usize::from((opcode >> 9) & 7);
        let an = self.regs.a(reg);
        let value = if is_add(opcode) { an.wrapping_add(src) } else { an.wrapping_sub(src) };
        self.regs.set_a(reg, value);
        Ok(())
    }

    /// ADDX/SUBX: Dy,Dx or -(Ay),-(Ax).
    pub(crate) fn exec_addx_subx<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = Self::size_field(opcode)?;
        let rx = (opcode >> 9) as u8 & 7;
        let ry = opcode as u8 & 7;
        let extend = self.regs.sr & X != 0;
        let add = is_add(opcode);

        if opcode & 0x0008 == 0 {
            let (dst, src) = (self.regs.d[usize::from(rx)], self.regs.d[usize::from(ry)]);
            let result = add_or_sub(add, dst, src, extend, size);
            self.write_data_reg(usize::from(rx), size, result.value);
            self.set_flags_extend(result, size);
            return Ok(());
        }

        let src_op = self.ea_operand(bus, AddrMode::AddrIndPreDec(ry), size)?;
        let src = self.read_operand(bus, src_op, size)?;
        let dst_op = self.ea_operand(bus, AddrMode::AddrIndPreDec(rx), size)?;
        let dst = self.read_operand(bus, dst_op, size)?;
        let result = add_or_sub(add, dst, src, extend, size);
        self.set_flags_extend(result, size);
        self.write_operand(bus, dst_op, size, result.value)
    }

    /// ADDQ/SUBQ: #1-8 to any alterable operand. Address registers take
    /// the whole long and keep the flags.
    pub(crate) fn exec_addq_subq<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let data = match (opcode >> 9) & 7 {
            0 => 8,
            n => u32::from(n),
        };
        let subtract = opcode & 0x0100 != 0;
        let mode = Self::ea_mode(opcode)?;

        if let AddrMode::AddrReg(r) = mode {
            let reg = usize::from(r);
            let an = self.regs.a(reg);
            let value = if subtract { an.wrapping_sub(data) } else { an.wrapping_add(data) };
            self.regs.set_a(reg, value);
            return Ok(());
        }

        let size = Self::size_field(opcode)?;
        let operand = self.ea_operand(bus, mode, size)?;
        let dst = self.read_operand(bus, operand, size)?;
        let result = add_or_sub(!subtract, dst, data, false, size);
        self.set_flags_arith(result, size, true);
        self.write_operand(bus, operand, size, result.value)
    }

    // ================================================================
    // Compares
    // ================================================================

    pub(crate) fn exec_cmp<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = Self::size_field(opcode)?;
        let (_, src) = self.read_ea(bus, opcode, size)?;
        let reg = usize::from((opcode >> 9) & 7);
        let result = alu::sub(self.regs.d[reg], src, false, size);
        self.set_flags_arith(result, size, false);
        Ok(())
    }

    pub(crate) fn exec_cmpa<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = if opcode & 0x0100 != 0 { Size::Long } else { Size::Word };
        let (_, src) = self.read_ea(bus, opcode, size)?;
        let reg = usize::from((opcode >> 9) & 7);
        let result = alu::sub(self.regs.a(reg), size.sign_extend(src), false, Size::Long);
        self.set_flags_arith(result, Size::Long, false);
        Ok(())
    }

    /// CMPM (Ay)+,(Ax)+.
    pub(crate) fn exec_cmpm<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = Self::size_field(opcode)?;
        let src_op = self.ea_operand(bus, AddrMode::AddrIndPostInc(opcode as u8 & 7), size)?;
        let src = self.read_operand(bus, src_op, size)?;
        let dst_op = self.ea_operand(bus, AddrMode::AddrIndPostInc((opcode >> 9) as u8 & 7), size)?;
        let dst = self.read_operand(bus, dst_op, size)?;
        let result = alu::sub(dst, src, false, size);
        self.set_flags_arith(result, size, false);
        Ok(())
    }

    // ================================================================
    // NEG / NEGX
    // ================================================================

    pub(crate) fn exec_neg<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = Self::size_field(opcode)?;
        let (operand, value) = self.read_ea(bus, opcode, size)?;
        let result = alu::sub(0, value, false, size);
        self.set_flags_arith(result, size, true);
        self.write_operand(bus, operand, size, result.value)
    }

    pub(crate) fn exec_negx<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = Self::size_field(opcode)?;
        let (operand, value) = self.read_ea(bus, opcode, size)?;
        let result = alu::sub(0, value, self.regs.sr & X != 0, size);
        self.set_flags_extend(result, size);
        self.write_operand(bus, operand, size, result.value)
    }

    // ================================================================
    // Multiply and divide
    // ================================================================

    /// MULU.W/MULS.W <ea>,Dn: 16x16 -> 32.
    pub(crate) fn exec_mul_word<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let signed = opcode & 0x0100 != 0;
        let (_, src) = self.read_ea(bus, opcode, Size::Word)?;
        let reg = usize::from((opcode >> 9) & 7);
        let dst = self.regs.d[reg] & 0xFFFF;

        let result = if signed {
            (i32::from(src as u16 as i16) * i32::from(dst as u16 as i16)) as u32
        } else {
            src * dst
        };
        self.regs.d[reg] = result;
        self.set_flags_move(result, Size::Long);

        if self.dynamic_timing() {
            let bits = if signed { alu::transitions(src as u16) } else { alu::ones(src as u16) };
            self.cycles += 2 * bits;
        }
        Ok(())
    }

    /// DIVU.W/DIVS.W <ea>,Dn: 32/16 -> 16r:16q.
    pub(crate) fn exec_div_word<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let signed = opcode & 0x0100 != 0;
        let (_, src) = self.read_ea(bus, opcode, Size::Word)?;
        let reg = usize::from((opcode >> 9) & 7);
        let dividend = self.regs.d[reg];

        if src == 0 {
            self.regs.sr &= !C;
            return raise(ExceptionKind::ZeroDivide);
        }

        let outcome = if signed {
            let divisor = src as u16 as i16;
            if self.dynamic_timing() {
                self.cycles += Self::divs_cycles(dividend as i32, divisor);
            }
            let (dividend, divisor) = (i64::from(dividend as i32), i64::from(divisor));
            let quotient = dividend / divisor;
            i16::try_from(quotient)
                .ok()
                .map(|q| (q as u16, (dividend % divisor) as u16))
        } else {
            if self.dynamic_timing() {
                self.cycles += Self::divu_cycles(dividend, src as u16);
            }
            u16::try_from(dividend / src)
                .ok()
                .map(|q| (q, (dividend % src) as u16))
        };

        match outcome {
            Some((quotient, remainder)) => {
                self.regs.d[reg] = (u32::from(remainder) << 16) | u32::from(quotient);
                self.set_flags_move(u32::from(quotient), Size::Word);
            }
            None => {
                // Overflow leaves the register untouched.
                let sr = self.regs.sr | V | N;
                self.regs.sr = sr & !(Z | C);
            }
        }
        Ok(())
    }

    /// MULU.L/MULS.L <ea>,Dl or <ea>,Dh:Dl.
    pub(crate) fn exec_mul_long<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let ext = self.fetch_word(bus)?;
        let (_, src) = self.read_ea(bus, opcode, Size::Long)?;
        let dl = usize::from((ext >> 12) & 7);
        let dh = usize::from(ext & 7);
        let signed = ext & 0x0800 != 0;
        let quad = ext & 0x0400 != 0;

        let product = if signed {
            (i64::from(src as i32) * i64::from(self.regs.d[dl] as i32)) as u64
        } else {
            u64::from(src) * u64::from(self.regs.d[dl])
        };
        let low = product as u32;
        let high = (product >> 32) as u32;

        let mut sr = Status::clear_vc(self.regs.sr);
        if quad {
            self.regs.d[dh] = high;
            self.regs.d[dl] = low;
            sr = Status::set_if(sr, N, high & 0x8000_0000 != 0);
            sr = Status::set_if(sr, Z, product == 0);
        } else {
            self.regs.d[dl] = low;
            let overflow = if signed {
                i32::try_from(product as i64).is_err()
            } else {
                high != 0
            };
            sr = Status::update_nz(sr, low, Size::Long.msb());
            sr = Status::set_if(sr, V, overflow);
        }
        self.regs.sr = sr;
        Ok(())
    }

    /// DIVU.L/DIVS.L <ea>,Dq, <ea>,Dr:Dq (64/32) and DIVUL/DIVSL (32/32
    /// with remainder).
    pub(crate) fn exec_div_long<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let ext = self.fetch_word(bus)?;
        let (_, divisor) = self.read_ea(bus, opcode, Size::Long)?;
        let dq = usize::from((ext >> 12) & 7);
        let dr = usize::from(ext & 7);
        let signed = ext & 0x0800 != 0;
        let quad = ext & 0x0400 != 0;

        if divisor == 0 {
            self.regs.sr &= !C;
            return raise(ExceptionKind::ZeroDivide);
        }

        let low = self.regs.d[dq];
        let outcome = if signed {
            let dividend = if quad {
                ((u64::from(self.regs.d[dr]) << 32) | u64::from(low)) as i64
            } else {
                i64::from(low as i32)
            };
            let divisor = i64::from(divisor as i32);
            dividend
                .checked_div(divisor)
                .and_then(|q| i32::try_from(q).ok())
                .map(|q| (q as u32, (dividend % divisor) as u32))
        } else {
            let dividend = if quad {
                (u64::from(self.regs.d[dr]) << 32) | u64::from(low)
            } else {
                u64::from(low)
            };
            let divisor = u64::from(divisor);
            u32::try_from(dividend / divisor)
                .ok()
                .map(|q| (q, (dividend % divisor) as u32))
        };

        match outcome {
            Some((quotient, remainder)) => {
                // With Dr == Dq only the quotient survives.
                self.regs.d[dr] = remainder;
                self.regs.d[dq] = quotient;
                self.set_flags_move(quotient, Size::Long);
            }
            None => {
                let sr = self.regs.sr | V | N;
                self.regs.sr = sr & !(Z | C);
            }
        }
        Ok(())
    }

    // ================================================================
    // BCD: ABCD, SBCD, NBCD, PACK, UNPK
    // ================================================================

    /// Flags after a BCD operation: Z only ever cleared, X follows C.
    fn set_flags_bcd(&mut self, result: u8, carry: bool, overflow: bool) {
        let mut sr = self.regs.sr;
        if result != 0 {
            sr &= !Z;
        }
        sr = Status::set_if(sr, N, result & 0x80 != 0);
        sr = Status::set_if(sr, V, overflow);
        sr = Status::set_if(sr, C, carry);
        self.regs.sr = Status::set_if(sr, X, carry);
    }

    /// ABCD/SBCD: Dy,Dx or -(Ay),-(Ax).
    pub(crate) fn exec_bcd<B: M68kBus>(&mut self, bus: &mut B, opcode: u16, add: bool) -> Fault<()> {
        let rx = (opcode >> 9) as u8 & 7;
        let ry = opcode as u8 & 7;
        let extend = self.regs.sr & X != 0;
        let op = if add { bcd_add } else { bcd_sub };

        if opcode & 0x0008 == 0 {
            let (dst, src) = (self.regs.d[usize::from(rx)] as u8, self.regs.d[usize::from(ry)] as u8);
            let (result, carry, overflow) = op(dst, src, extend);
            self.write_data_reg(usize::from(rx), Size::Byte, u32::from(result));
            self.set_flags_bcd(result, carry, overflow);
            return Ok(());
        }

        let src_op = self.ea_operand(bus, AddrMode::AddrIndPreDec(ry), Size::Byte)?;
        let src = self.read_operand(bus, src_op, Size::Byte)? as u8;
        let dst_op = self.ea_operand(bus, AddrMode::AddrIndPreDec(rx), Size::Byte)?;
        let dst = self.read_operand(bus, dst_op, Size::Byte)? as u8;
        let (result, carry, overflow) = op(dst, src, extend);
        self.set_flags_bcd(result, carry, overflow);
        self.write_operand(bus, dst_op, Size::Byte, u32::from(result))
    }

    pub(crate) fn exec_nbcd<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let (operand, value) = self.read_ea(bus, opcode, Size::Byte)?;
        let (result, carry, overflow) = bcd_sub(0, value as u8, self.regs.sr & X != 0);
        self.set_flags_bcd(result, carry, overflow);
        self.write_operand(bus, operand, Size::Byte, u32::from(result))
    }

    /// PACK: two unpacked digits plus an adjustment to one packed byte.
    pub(crate) fn exec_pack<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let adjust = u32::from(self.fetch_word(bus)?);
        let rx = (opcode >> 9) as u8 & 7;
        let ry = opcode as u8 & 7;

        if opcode & 0x0008 == 0 {
            let value = (self.regs.d[usize::from(ry)] & 0xFFFF).wrapping_add(adjust);
            let packed = ((value >> 4) & 0xF0) | (value & 0x0F);
            self.write_data_reg(usize::from(rx), Size::Byte, packed);
            return Ok(());
        }

        let lo_op = self.ea_operand(bus, AddrMode::AddrIndPreDec(ry), Size::Byte)?;
        let lo = self.read_operand(bus, lo_op, Size::Byte)?;
        let hi_op = self.ea_operand(bus, AddrMode::AddrIndPreDec(ry), Size::Byte)?;
        let hi = self.read_operand(bus, hi_op, Size::Byte)?;
        let value = ((hi << 8) | lo).wrapping_add(adjust);
        let packed = ((value >> 4) & 0xF0) | (value & 0x0F);
        let dst_op = self.ea_operand(bus, AddrMode::AddrIndPreDec(rx), Size::Byte)?;
        self.write_operand(bus, dst_op, Size::Byte, packed)
    }

    /// UNPK: one packed byte to two digits plus an adjustment.
    pub(crate) fn exec_unpk<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let adjust = u32::from(self.fetch_word(bus)?);
        let rx = (opcode >> 9) as u8 & 7;
        let ry = opcode as u8 & 7;
        let unpack = |byte: u32| ((((byte << 4) & 0x0F00) | (byte & 0x0F)).wrapping_add(adjust)) & 0xFFFF;

        if opcode & 0x0008 == 0 {
            let value = unpack(self.regs.d[usize::from(ry)] & 0xFF);
            self.write_data_reg(usize::from(rx), Size::Word, value);
            return Ok(());
        }

        let src_op = self.ea_operand(bus, AddrMode::AddrIndPreDec(ry), Size::Byte)?;
        let value = unpack(self.read_operand(bus, src_op, Size::Byte)?);
        let lo_op = self.ea_operand(bus, AddrMode::AddrIndPreDec(rx), Size::Byte)?;
        self.write_operand(bus, lo_op, Size::Byte, value & 0xFF)?;
        let hi_op = self.ea_operand(bus, AddrMode::AddrIndPreDec(rx), Size::Byte)?;
        self.write_operand(bus, hi_op, Size::Byte, value >> 8)
    }

    // ================================================================
    // Bounds checks: CHK, CHK2, CMP2
    // ================================================================

    /// CHK.W/CHK.L <ea>,Dn: trap unless 0 <= Dn <= bound.
    pub(crate) fn exec_chk<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = if (opcode >> 7) & 3 == 3 { Size::Word } else { Size::Long };
        let (_, bound) = self.read_ea(bus, opcode, size)?;
        let reg = usize::from((opcode >> 9) & 7);
        let value = size.sign_extend(self.regs.d[reg]) as i32;
        let bound = size.sign_extend(bound) as i32;

        let mut sr = Status::clear_vc(self.regs.sr);
        sr = Status::set_if(sr, Z, value == 0);
        if value < 0 {
            self.regs.sr = sr | N;
            return raise(ExceptionKind::Chk);
        }
        if value > bound {
            self.regs.sr = sr & !N;
            return raise(ExceptionKind::Chk);
        }
        self.regs.sr = sr;
        Ok(())
    }

    /// CMP2/CHK2 <ea>,Rn: compare against a lower/upper bound pair in
    /// memory. A lower bound with its sign bit set selects a signed
    /// comparison. Address registers compare all 32 bits against
    /// sign-extended bounds.
    pub(crate) fn exec_cmp2_chk2<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        // Size in bits 10-9.
        let size = Size::from_bits(opcode >> 9).map_or_else(|| raise(ExceptionKind::IllegalInstruction), Ok)?;
        let ext = self.fetch_word(bus)?;
        let mode = Self::ea_mode(opcode)?;
        let address = self.ea_address(bus, mode)?;
        let lower = self.read(bus, address, size)?;
        let upper = self.read(bus, address.wrapping_add(size.bytes()), size)?;

        let address_reg = ext & 0x8000 != 0;
        let reg_value = self.regs.da(usize::from(ext >> 12) & 15);
        let signed = lower & size.msb() != 0;

        let (lower, upper, value) = if address_reg {
            (
                i64::from(size.sign_extend(lower) as i32),
                i64::from(size.sign_extend(upper) as i32),
                i64::from(reg_value as i32),
            )
        } else if signed {
            (
                i64::from(size.sign_extend(lower) as i32),
                i64::from(size.sign_extend(upper) as i32),
                i64::from(size.sign_extend(reg_value) as i32),
            )
        } else {
            (i64::from(lower), i64::from(upper), i64::from(reg_value & size.mask()))
        };

        let out_of_bounds = value < lower || value > upper;
        let mut sr = Status::set_if(self.regs.sr, Z, value == lower || value == upper);
        sr = Status::set_if(sr, C, out_of_bounds);
        self.regs.sr = sr;

        if out_of_bounds && ext & 0x0800 != 0 {
            return raise(ExceptionKind::Chk);
        }
        Ok(())
    }

    // ================================================================
    // CAS / CAS2
    // ================================================================

    /// CAS Dc,Du,<ea>.
    pub(crate) fn exec_cas<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        // Bits 10-9: 01 byte, 10 word, 11 long.
        let size = match (opcode >> 9) & 3 {
            1 => Size::Byte,
            2 => Size::Word,
            3 => Size::Long,
            _ => return raise(ExceptionKind::IllegalInstruction),
        };
        let ext = self.fetch_word(bus)?;
        let dc = usize::from(ext & 7);
        let du = usize::from((ext >> 6) & 7);
        let (operand, dst) = self.read_ea(bus, opcode, size)?;

        let result = alu::sub(dst, self.regs.d[dc], false, size);
        self.set_flags_arith(result, size, false);
        if result.value == 0 {
            self.write_operand(bus, operand, size, self.regs.d[du])
        } else {
            self.write_data_reg(dc, size, dst);
            Ok(())
        }
    }

    /// CAS2 Dc1:Dc2,Du1:Du2,(Rn1):(Rn2).
    pub(crate) fn exec_cas2<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let size = if opcode & 0x0200 != 0 { Size::Long } else { Size::Word };
        let ext1 = self.fetch_word(bus)?;
        let ext2 = self.fetch_word(bus)?;
        let fields = |ext: u16| {
            (
                usize::from(ext >> 12) & 15,
                usize::from((ext >> 6) & 7),
                usize::from(ext & 7),
            )
        };
        let (rn1, du1, dc1) = fields(ext1);
        let (rn2, du2, dc2) = fields(ext2);
        let (addr1, addr2) = (self.regs.da(rn1), self.regs.da(rn2));

        let mem1 = self.read(bus, addr1, size)?;
        let mem2 = self.read(bus, addr2, size)?;

        let mut result = alu::sub(mem1, self.regs.d[dc1], false, size);
        if result.value == 0 {
            result = alu::sub(mem2, self.regs.d[dc2], false, size);
        }
        self.set_flags_arith(result, size, false);

        if self.regs.sr & Z != 0 {
            self.write(bus, addr1, size, self.regs.d[du1])?;
            self.write(bus, addr2, size, self.regs.d[du2])
        } else {
            self.write_data_reg(dc1, size, mem1);
            self.write_data_reg(dc2, size, mem2);
            Ok(())
        }
    }
}
