//! Shifts and rotates: ASx, LSx, ROXx, ROx on registers and memory words.

use crate::alu::Size;
use crate::bus::M68kBus;
use crate::cpu::Cpu680x0;
use crate::fault::Fault;
use crate::flags::{C, Status, V, X};

/// Shift family in bits 4-3 (register form) or 10-9 (memory form).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftKind {
    Arithmetic,
    Logical,
    RotateExtend,
    Rotate,
}

impl ShiftKind {
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        match bits & 3 {
            0 => Self::Arithmetic,
            1 => Self::Logical,
            2 => Self::RotateExtend,
            _ => Self::Rotate,
        }
    }

    /// Mnemonic stem; the direction letter follows.
    #[must_use]
    pub const fn stem(self) -> &'static str {
        match self {
            Self::Arithmetic => "as",
            Self::Logical => "ls",
            Self::RotateExtend => "rox",
            Self::Rotate => "ro",
        }
    }
}

/// Outcome of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftResult {
    pub value: u32,
    pub carry: bool,
    pub overflow: bool,
    /// New X flag; `None` leaves X alone.
    pub extend: Option<bool>,
}

/// Shift `value` by `count` one bit at a time, which keeps the carry and
/// overflow rules identical for every count including those past the
/// operand width.
#[must_use]
pub fn shift(kind: ShiftKind, left: bool, value: u32, count: u32, size: Size, extend: bool) -> ShiftResult {
    let mask = size.mask();
    let msb = size.msb();
    let mut v = value & mask;
    let mut x = extend;
    let mut carry = false;
    let mut overflow = false;

    for _ in 0..count {
        let out = if left { v & msb != 0 } else { v & 1 != 0 };
        let next = match (kind, left) {
            (ShiftKind::Arithmetic, true) | (ShiftKind::Logical, true) => (v << 1) & mask,
            (ShiftKind::Arithmetic, false) => (v >> 1) | (v & msb),
            (ShiftKind::Logical, false) => v >> 1,
            (ShiftKind::Rotate, true) => ((v << 1) | u32::from(out)) & mask,
            (ShiftKind::Rotate, false) => (v >> 1) | if out { msb } else { 0 },
            (ShiftKind::RotateExtend, true) => ((v << 1) | u32::from(x)) & mask,
            (ShiftKind::RotateExtend, false) => (v >> 1) | if x { msb } else { 0 },
        };
        if kind == ShiftKind::Arithmetic && left && (next ^ v) & msb != 0 {
            overflow = true;
        }
        carry = out;
        if kind != ShiftKind::Rotate {
            x = out;
        }
        v = next;
    }

    let extend = match kind {
        ShiftKind::Rotate => None,
        ShiftKind::RotateExtend => {
            // A zero count copies X into C.
            carry = x;
            Some(x)
        }
        _ if count == 0 => None,
        _ => Some(carry),
    };

    ShiftResult {
        value: v,
        carry,
        overflow,
        extend,
    }
}

impl Cpu680x0 {
    fn apply_shift_flags(&mut self, result: ShiftResult, size: Size) {
        let mut sr = Status::update_nz(self.regs.sr, result.value, size.msb());
        sr = Status::set_if(sr, V, result.overflow);
        sr = Status::set_if(sr, C, result.carry);
        if let Some(extend) = result.extend {
            sr = Status::set_if(sr, X, extend);
        }
        self.regs.sr = sr;
    }

    // ================================================================
    // Register shifts
    // ================================================================
    //
    // Encoding: 1110 CCC D SS I TT RRR
    //   CCC = count (0 means 8) or count register when I = 1
    //   D = direction (1 = left), TT = shift kind

    pub(crate) fn exec_shift_reg(&mut self, opcode: u16) {
        let Some(size) = Size::from_bits(opcode >> 6) else {
            return;
        };
        let reg = usize::from(opcode & 7);
        let field = (opcode >> 9) & 7;
        let count = if opcode & 0x0020 != 0 {
            self.regs.d[usize::from(field)] & 63
        } else if field == 0 {
            8
        } else {
            u32::from(field)
        };
        let kind = ShiftKind::from_bits(opcode >> 3);
        let left = opcode & 0x0100 != 0;

        let result = shift(kind, left, self.regs.d[reg], count, size, self.regs.sr & X != 0);
        self.write_data_reg(reg, size, result.value);
        self.apply_shift_flags(result, size);

        if self.dynamic_timing() {
            self.cycles += 2 * count;
        }
    }

    /// Memory shifts move a single word by one bit.
    pub(crate) fn exec_shift_mem<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let kind = ShiftKind::from_bits(opcode >> 9);
        let left = opcode & 0x0100 != 0;
        let (operand, value) = self.read_ea(bus, opcode, Size::Word)?;
        let result = shift(kind, left, value, 1, Size::Word, self.regs.sr & X != 0);
        self.apply_shift_flags(result, Size::Word);
        self.write_operand(bus, operand, Size::Word, result.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asl_sets_overflow_when_the_sign_changes() {
        let r = shift(ShiftKind::Arithmetic, true, 0x40, 1, Size::Byte, false);
        assert_eq!(r.value, 0x80);
        assert!(r.overflow);
        assert!(!r.carry);
        let r = shift(ShiftKind::Arithmetic, true, 0xC0, 1, Size::Byte, false);
        assert!(!r.overflow);
        assert!(r.carry);
        assert_eq!(r.extend, Some(true));
    }

    #[test]
    fn asr_keeps_the_sign() {
        let r = shift(ShiftKind::Arithmetic, false, 0x8000, 15, Size::Word, false);
        assert_eq!(r.value, 0xFFFF);
        let r = shift(ShiftKind::Arithmetic, false, 0x8000_0000, 40, Size::Long, false);
        assert_eq!(r.value, 0xFFFF_FFFF);
        assert!(r.carry);
    }

    #[test]
    fn logical_shift_past_the_width_clears() {
        let r = shift(ShiftKind::Logical, true, 0x01, 8, Size::Byte, false);
        assert_eq!(r.value, 0);
        assert!(r.carry);
        let r = shift(ShiftKind::Logical, true, 0x01, 9, Size::Byte, false);
        assert!(!r.carry);
    }

    #[test]
    fn zero_count_clears_carry_and_keeps_x() {
        let r = shift(ShiftKind::Logical, false, 0x81, 0, Size::Byte, true);
        assert_eq!(r.value, 0x81);
        assert!(!r.carry);
        assert_eq!(r.extend, None);
        let r = shift(ShiftKind::RotateExtend, false, 0x81, 0, Size::Byte, true);
        assert!(r.carry);
    }

    #[test]
    fn rotates_wrap_and_leave_x_alone() {
        let r = shift(ShiftKind::Rotate, true, 0x8001, 1, Size::Word, false);
        assert_eq!(r.value, 0x0003);
        assert!(r.carry);
        assert_eq!(r.extend, None);
        let r = shift(ShiftKind::Rotate, false, 0x1234_5678, 32, Size::Long, false);
        assert_eq!(r.value, 0x1234_5678);
    }

    #[test]
    fn roxl_rotates_through_x() {
        let r = shift(ShiftKind::RotateExtend, true, 0x80, 1, Size::Byte, true);
        assert_eq!(r.value, 0x01);
        assert_eq!(r.extend, Some(true));
        assert!(r.carry);
        // Nine bits make a full rotation of a byte.
        let r = shift(ShiftKind::RotateExtend, true, 0x5A, 9, Size::Byte, false);
        assert_eq!(r.value, 0x5A);
    }
}
