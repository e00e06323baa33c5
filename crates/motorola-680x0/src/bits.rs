//! Single-bit operations (BTST, BCHG, BCLR, BSET) and the 68020 bit
//! field instructions.

use crate::addressing::AddrMode;
use crate::alu::Size;
use crate::bus::M68kBus;
use crate::cpu::Cpu680x0;
use crate::fault::Fault;
use crate::flags::{N, Status, Z};

/// Bit field operation in bits 10-8 of the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitfieldOp {
    Tst,
    Extu,
    Chg,
    Exts,
    Clr,
    Ffo,
    Set,
    Ins,
}

impl BitfieldOp {
    #[must_use]
    pub const fn from_opcode(opcode: u16) -> Self {
        match (opcode >> 8) & 7 {
            0 => Self::Tst,
            1 => Self::Extu,
            2 => Self::Chg,
            3 => Self::Exts,
            4 => Self::Clr,
            5 => Self::Ffo,
            6 => Self::Set,
            _ => Self::Ins,
        }
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Tst => "bftst",
            Self::Extu => "bfextu",
            Self::Chg => "bfchg",
            Self::Exts => "bfexts",
            Self::Clr => "bfclr",
            Self::Ffo => "bfffo",
            Self::Set => "bfset",
            Self::Ins => "bfins",
        }
    }

    /// Operations that write a data register rather than the field.
    #[must_use]
    pub const fn has_register_result(self) -> bool {
        matches!(self, Self::Extu | Self::Exts | Self::Ffo)
    }
}

/// New field value for the modifying operations; `None` leaves the field.
const fn modified_field(op: BitfieldOp, field: u32, ones: u32, insert: u32) -> Option<u32> {
    match op {
        BitfieldOp::Chg => Some(!field & ones),
        BitfieldOp::Clr => Some(0),
        BitfieldOp::Set => Some(ones),
        BitfieldOp::Ins => Some(insert & ones),
        _ => None,
    }
}

impl Cpu680x0 {
    // ================================================================
    // BTST / BCHG / BCLR / BSET
    // ================================================================
    //
    // Encoding: 0000 RRR1 TT MMMRRR (dynamic, bit number in Dn)
    //           0000 1000 TT MMMRRR + #bit (static)
    //   TT = 00 TST, 01 CHG, 10 CLR, 11 SET
    //   Data registers use bit mod 32, memory bytes bit mod 8.

    pub(crate) fn exec_bit<B: M68kBus>(&mut self, bus: &mut B, opcode: u16, immediate: bool) -> Fault<()> {
        let bit = if immediate {
            u32::from(self.fetch_word(bus)? & 0xFF)
        } else {
            self.regs.d[usize::from((opcode >> 9) & 7)]
        };
        let kind = (opcode >> 6) & 3;
        let mode = Self::ea_mode(opcode)?;
        let size = if matches!(mode, AddrMode::DataReg(_)) { Size::Long } else { Size::Byte };
        let mask = 1u32 << (bit & (size.bits() - 1));

        let operand = self.ea_operand(bus, mode, size)?;
        let value = self.read_operand(bus, operand, size)?;
        self.regs.sr = Status::set_if(self.regs.sr, Z, value & mask == 0);

        let result = match kind {
            1 => value ^ mask,
            2 => value & !mask,
            3 => value | mask,
            _ => return Ok(()),
        };
        self.write_operand(bus, operand, size, result)
    }

    // ================================================================
    // Bit fields
    // ================================================================
    //
    // Encoding: 1110 1OOO 11 MMMRRR + extension
    //   Extension: 0 RRR Do OOOOO Dw WWWWW
    //   Offset counts from the most significant bit of the base byte (or
    //   register); width 0 means 32.

    pub(crate) fn exec_bitfield<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let op = BitfieldOp::from_opcode(opcode);
        let ext = self.fetch_word(bus)?;
        let reg = usize::from((ext >> 12) & 7);

        let offset = if ext & 0x0800 != 0 {
            self.regs.d[usize::from((ext >> 6) & 7)] as i32
        } else {
            i32::from((ext >> 6) & 31)
        };
        let width = if ext & 0x0020 != 0 {
            self.regs.d[usize::from(ext & 7)] & 31
        } else {
            u32::from(ext & 31)
        };
        let width = if width == 0 { 32 } else { width };
        let ones = if width == 32 { u32::MAX } else { (1 << width) - 1 };
        let insert = self.regs.d[reg];

        let mode = Self::ea_mode(opcode)?;
        let field = if let AddrMode::DataReg(r) = mode {
            let r = usize::from(r);
            let shift = 32 - width;
            let rotated = self.regs.d[r].rotate_left(offset as u32 & 31);
            let field = (u64::from(rotated) >> shift) as u32 & ones;
            if let Some(new) = modified_field(op, field, ones, insert) {
                let top = ones << shift;
                let updated = (rotated & !top) | ((new << shift) & top);
                self.regs.d[r] = updated.rotate_right(offset as u32 & 31);
            }
            field
        } else {
            let base = self.ea_address(bus, mode)?;
            let address = base.wrapping_add(offset.div_euclid(8) as u32);
            let bit_offset = offset.rem_euclid(8) as u32;
            let bytes = (bit_offset + width).div_ceil(8);

            let mut window = 0u64;
            for i in 0..bytes {
                window = (window << 8) | u64::from(self.read_byte(bus, address.wrapping_add(i))?);
            }
            let shift = bytes * 8 - bit_offset - width;
            let field = (window >> shift) as u32 & ones;

            if let Some(new) = modified_field(op, field, ones, insert) {
                let top = u64::from(ones) << shift;
                window = (window & !top) | ((u64::from(new) << shift) & top);
                for i in 0..bytes {
                    let byte = (window >> ((bytes - 1 - i) * 8)) as u8;
                    self.write_byte(bus, address.wrapping_add(i), byte)?;
                }
            }
            field
        };

        // BFINS reports on the inserted value, the others on the old field.
        let flag_value = if op == BitfieldOp::Ins { insert & ones } else { field };
        let mut sr = Status::clear_vc(self.regs.sr);
        sr = Status::set_if(sr, N, flag_value >> (width - 1) & 1 != 0);
        sr = Status::set_if(sr, Z, flag_value == 0);
        self.regs.sr = sr;

        match op {
            BitfieldOp::Extu => self.regs.d[reg] = field,
            BitfieldOp::Exts => {
                let shift = 32 - width;
                self.regs.d[reg] = ((field << shift) as i32 >> shift) as u32;
            }
            BitfieldOp::Ffo => {
                let leading = if field == 0 { width } else { field.leading_zeros() - (32 - width) };
                self.regs.d[reg] = (offset as u32).wrapping_add(leading);
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_selects_operation() {
        assert_eq!(BitfieldOp::from_opcode(0xE8C0), BitfieldOp::Tst);
        assert_eq!(BitfieldOp::from_opcode(0xE9C0), BitfieldOp::Extu);
        assert_eq!(BitfieldOp::from_opcode(0xEDC0), BitfieldOp::Ffo);
        assert_eq!(BitfieldOp::from_opcode(0xEFC0), BitfieldOp::Ins);
        assert!(BitfieldOp::Exts.has_register_result());
        assert!(!BitfieldOp::Set.has_register_result());
    }

    #[test]
    fn modifying_operations() {
        assert_eq!(modified_field(BitfieldOp::Chg, 0b1010, 0xF, 0), Some(0b0101));
        assert_eq!(modified_field(BitfieldOp::Ins, 0, 0xF, 0x1234), Some(0x4));
        assert_eq!(modified_field(BitfieldOp::Extu, 0, 0xF, 0), None);
    }
}
