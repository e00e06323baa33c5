//! Cycle tables, dynamic timing helpers and BCD arithmetic.
//!
//! The 68000/68010 column follows the Motorola user's manual tables
//! (instruction time = base + effective address time). The 68020 column is
//! the cache-case estimate from the 68020 manual and the 68040 column halves
//! it; neither is cycle exact. Dynamic costs (shift counts, multiply bit
//! patterns, divide iterations, taken branches, MOVEM register counts) are
//! added by the handlers at run time.

use crate::addressing::AddrMode;
use crate::alu::Size;
use crate::cpu::Cpu680x0;
use crate::decode::Op;
use crate::fault::ExceptionKind;
use crate::model::IsaLevel;

/// 68000 effective address calculation time.
#[must_use]
pub fn ea_time_68000(mode: AddrMode, size: Size) -> u16 {
    let long = size == Size::Long;
    let (word, long_time) = match mode {
        AddrMode::DataReg(_) | AddrMode::AddrReg(_) => (0, 0),
        AddrMode::AddrInd(_) | AddrMode::AddrIndPostInc(_) => (4, 8),
        AddrMode::AddrIndPreDec(_) => (6, 10),
        AddrMode::AddrIndDisp(_) | AddrMode::AbsShort | AddrMode::PcDisp => (8, 12),
        AddrMode::AddrIndIndex(_) | AddrMode::PcIndex => (10, 14),
        AddrMode::AbsLong => (12, 16),
        AddrMode::Immediate => (4, 8),
    };
    if long { long_time } else { word }
}

/// 68000 MOVE destination time: predecrement costs no more than (An).
fn move_dest_68000(mode: AddrMode, size: Size) -> u16 {
    match mode {
        AddrMode::AddrIndPreDec(_) => ea_time_68000(AddrMode::AddrInd(0), size),
        _ => ea_time_68000(mode, size),
    }
}

/// 68020 cache-case effective address time.
#[must_use]
pub fn ea_time_68020(mode: AddrMode, size: Size) -> u16 {
    match mode {
        AddrMode::DataReg(_) | AddrMode::AddrReg(_) => 0,
        AddrMode::AddrInd(_) | AddrMode::AddrIndPreDec(_) | AddrMode::AddrIndDisp(_) => 3,
        AddrMode::AbsShort | AddrMode::PcDisp => 3,
        AddrMode::AddrIndPostInc(_) | AddrMode::AddrIndIndex(_) | AddrMode::AbsLong | AddrMode::PcIndex => 4,
        AddrMode::Immediate => {
            if size == Size::Long { 4 } else { 2 }
        }
    }
}

/// Per-mode cost for control-addressing instructions, in the order
/// (An), d16(An), d8(An,Xn), abs.W, abs.L, d16(PC), d8(PC,Xn).
fn control_time(mode: Option<AddrMode>, table: [u16; 7]) -> u16 {
    match mode {
        Some(AddrMode::AddrInd(_)) => table[0],
        Some(AddrMode::AddrIndDisp(_)) => table[1],
        Some(AddrMode::AddrIndIndex(_)) => table[2],
        Some(AddrMode::AbsShort) => table[3],
        Some(AddrMode::AbsLong) => table[4],
        Some(AddrMode::PcDisp) => table[5],
        Some(AddrMode::PcIndex) => table[6],
        _ => 0,
    }
}

/// Static cost of `opcode` classified as `op` on `level`.
#[must_use]
pub fn base_cycles(op: Op, opcode: u16, level: IsaLevel) -> u16 {
    match level {
        IsaLevel::M68000 | IsaLevel::M68010 => cycles_68000(op, opcode),
        IsaLevel::M68020 | IsaLevel::M68030 | IsaLevel::Cpu32 => cycles_68020(op, opcode),
        IsaLevel::M68040 | IsaLevel::ColdFire => cycles_68020(op, opcode).div_ceil(2).max(1),
    }
}

#[allow(clippy::too_many_lines)]
fn cycles_68000(op: Op, opcode: u16) -> u16 {
    let ea = AddrMode::from_ea_field(opcode);
    let ea_t = |size: Size| ea.map_or(0, |mode| ea_time_68000(mode, size));
    let is_reg = ea.is_some_and(|mode| mode.is_register());
    let size = Size::from_bits(opcode >> 6).unwrap_or(Size::Word);
    let long = size == Size::Long;
    // Register and immediate sources cost two extra cycles on long ALU ops.
    let long_reg_extra = if long && ea.is_some_and(|mode| mode.is_register() || mode == AddrMode::Immediate) {
        2
    } else {
        0
    };

    match op {
        Op::Illegal | Op::LineA | Op::LineF => 0,
        Op::OriCcr | Op::OriSr | Op::AndiCcr | Op::AndiSr | Op::EoriCcr | Op::EoriSr => 20,
        Op::AluImm => {
            let cmpi = (opcode >> 9) & 7 == 6;
            match (is_reg, long, cmpi) {
                (true, false, _) => 8,
                (true, true, true) => 14,
                (true, true, false) => 16,
                (false, false, _) => (if cmpi { 8 } else { 12 }) + ea_t(size),
                (false, true, true) => 12 + ea_t(size),
                (false, true, false) => 20 + ea_t(size),
            }
        }
        Op::BitDynamic | Op::BitStatic => {
            let kind = (opcode >> 6) & 3;
            let immediate = op == Op::BitStatic;
            if is_reg {
                let base = match kind {
                    0 => 6,
                    2 => 10,
                    _ => 8,
                };
                base + if immediate { 4 } else { 0 }
            } else {
                let base = if kind == 0 { 4 } else { 8 };
                base + if immediate { 4 } else { 0 } + ea_t(Size::Byte)
            }
        }
        Op::Movep => {
            if opcode & 0x0040 != 0 { 24 } else { 16 }
        }
        Op::Moves => 8 + ea_t(size),
        Op::Move | Op::Movea => {
            let size = Size::from_move_bits(opcode >> 12).unwrap_or(Size::Word);
            let dest = AddrMode::from_move_dest(opcode).map_or(0, |mode| move_dest_68000(mode, size));
            4 + ea_t(size) + dest
        }
        Op::Negx | Op::Clr | Op::Neg | Op::Not => {
            if is_reg {
                if long { 6 } else { 4 }
            } else {
                (if long { 12 } else { 8 }) + ea_t(size)
            }
        }
        Op::MoveFromSr | Op::MoveFromCcr => {
            if is_reg { 6 } else { 8 + ea_t(Size::Word) }
        }
        Op::MoveToCcr | Op::MoveToSr => 12 + ea_t(Size::Word),
        Op::Nbcd => {
            if is_reg { 6 } else { 8 + ea_t(Size::Byte) }
        }
        Op::Swap | Op::Ext | Op::Extb | Op::Moveq | Op::Nop | Op::Stop | Op::MoveUsp => 4,
        Op::Trap | Op::Trapv | Op::Trapcc | Op::Bkpt => 4,
        Op::Pea => control_time(ea, [12, 16, 20, 16, 20, 16, 20]),
        Op::Lea => control_time(ea, [4, 8, 12, 8, 12, 8, 12]),
        Op::Jmp => control_time(ea, [8, 10, 14, 10, 12, 10, 14]),
        Op::Jsr => control_time(ea, [16, 18, 22, 18, 20, 18, 22]),
        Op::Movem => match ea {
            Some(AddrMode::AddrIndPostInc(_)) => 12,
            Some(AddrMode::AddrIndPreDec(_)) => 8,
            _ if opcode & 0x0400 != 0 => control_time(ea, [12, 16, 18, 16, 20, 16, 18]),
            _ => control_time(ea, [8, 12, 14, 12, 16, 0, 0]),
        },
        Op::Tst => 4 + ea_t(size),
        Op::Tas => {
            if is_reg { 4 } else { 10 + ea_t(Size::Byte) }
        }
        Op::Link | Op::LinkLong => 16,
        Op::Unlk => 12,
        Op::Reset => 132,
        Op::Rte | Op::Rtr => 20,
        Op::Rtd | Op::Rts => 16,
        Op::Movec => 12,
        Op::Chk => 10 + ea_t(Size::Word),
        Op::AddqSubq => match ea {
            Some(AddrMode::AddrReg(_)) => 8,
            _ if is_reg => {
                if long { 8 } else { 4 }
            }
            _ => (if long { 12 } else { 8 }) + ea_t(size),
        },
        Op::Scc => {
            if is_reg { 4 } else { 8 + ea_t(Size::Byte) }
        }
        Op::Dbcc => 10,
        Op::Bcc => 8,
        Op::Or | Op::And | Op::AddSub => {
            if opcode & 0x0100 != 0 {
                (if long { 12 } else { 8 }) + ea_t(size)
            } else if long {
                6 + ea_t(size) + long_reg_extra
            } else {
                4 + ea_t(size)
            }
        }
        Op::AddaSuba => {
            if opcode & 0x0100 != 0 {
                let extra = if ea.is_some_and(|mode| mode.is_register() || mode == AddrMode::Immediate) {
                    2
                } else {
                    0
                };
                6 + ea_t(Size::Long) + extra
            } else {
                8 + ea_t(Size::Word)
            }
        }
        Op::Cmp => (if long { 6 } else { 4 }) + ea_t(size),
        Op::Cmpa => {
            let size = if opcode & 0x0100 != 0 { Size::Long } else { Size::Word };
            6 + ea_t(size)
        }
        Op::Eor => {
            if is_reg {
                if long { 8 } else { 4 }
            } else {
                (if long { 12 } else { 8 }) + ea_t(size)
            }
        }
        Op::Cmpm => {
            if long { 20 } else { 12 }
        }
        Op::AddxSubx => match (opcode & 0x0008 != 0, long) {
            (false, false) => 4,
            (false, true) => 8,
            (true, false) => 18,
            (true, true) => 30,
        },
        Op::Abcd | Op::Sbcd => {
            if opcode & 0x0008 != 0 { 18 } else { 6 }
        }
        Op::MulW => 38 + ea_t(Size::Word),
        Op::DivW => ea_t(Size::Word),
        Op::Exg => 6,
        Op::ShiftReg => {
            if long { 8 } else { 6 }
        }
        Op::ShiftMem => 8 + ea_t(Size::Word),
        // 68020+ only; never present in the 68000/68010 tables.
        _ => 4,
    }
}

#[allow(clippy::too_many_lines)]
fn cycles_68020(op: Op, opcode: u16) -> u16 {
    let ea = AddrMode::from_ea_field(opcode);
    let ea_t = |size: Size| ea.map_or(0, |mode| ea_time_68020(mode, size));
    let is_reg = ea.is_some_and(|mode| mode.is_register());
    let size = Size::from_bits(opcode >> 6).unwrap_or(Size::Word);

    match op {
        Op::Illegal | Op::LineA | Op::LineF => 0,
        Op::OriCcr | Op::AndiCcr | Op::EoriCcr => 12,
        Op::OriSr | Op::AndiSr | Op::EoriSr => 12,
        Op::AluImm => {
            let imm = if size == Size::Long { 4 } else { 2 };
            if is_reg { 2 + imm } else { 4 + imm + ea_t(size) }
        }
        Op::BitDynamic | Op::BitStatic => {
            if is_reg { 4 } else { 6 + ea_t(Size::Byte) }
        }
        Op::Movep => 14,
        Op::Moves => 10 + ea_t(size),
        Op::Move | Op::Movea => {
            let size = Size::from_move_bits(opcode >> 12).unwrap_or(Size::Word);
            let dest = AddrMode::from_move_dest(opcode).map_or(0, |mode| ea_time_68020(mode, size));
            2 + ea_t(size) + dest
        }
        Op::Negx | Op::Clr | Op::Neg | Op::Not | Op::Scc => {
            if is_reg { 2 } else { 4 + ea_t(size) }
        }
        Op::MoveFromSr | Op::MoveFromCcr => {
            if is_reg { 4 } else { 6 + ea_t(Size::Word) }
        }
        Op::MoveToCcr | Op::MoveToSr => 8 + ea_t(Size::Word),
        Op::Nbcd => {
            if is_reg { 6 } else { 8 + ea_t(Size::Byte) }
        }
        Op::Swap | Op::Ext | Op::Extb | Op::Exg | Op::Moveq | Op::Nop => 2,
        Op::MoveUsp => 4,
        Op::Trap | Op::Trapv | Op::Trapcc | Op::Bkpt => 4,
        Op::Pea => 5 + ea_t(Size::Long),
        Op::Lea => 2 + ea_t(Size::Long),
        Op::Jmp => 4 + ea_t(Size::Long),
        Op::Jsr => 7 + ea_t(Size::Long),
        Op::Movem => 8 + ea_t(Size::Long),
        Op::Tst | Op::Cmp | Op::Cmpa => 2 + ea_t(size),
        Op::Tas => {
            if is_reg { 4 } else { 12 + ea_t(Size::Byte) }
        }
        Op::Link => 5,
        Op::LinkLong => 6,
        Op::Unlk => 6,
        Op::Reset => 518,
        Op::Stop => 8,
        Op::Rte => 20,
        Op::Rtr => 14,
        Op::Rtd | Op::Rts => 10,
        Op::Movec => 6,
        Op::Chk => 8 + ea_t(Size::Word),
        Op::Cmp2Chk2 => 16 + ea_t(size),
        Op::Cas => 16 + ea_t(size),
        Op::Cas2 => 24,
        Op::AddqSubq | Op::Or | Op::And | Op::AddSub | Op::AddaSuba | Op::Eor => {
            if is_reg { 2 } else { 4 + ea_t(size) }
        }
        Op::Dbcc => 6,
        Op::Bcc => 4,
        Op::Cmpm => 8,
        Op::AddxSubx => {
            if opcode & 0x0008 != 0 { 10 } else { 2 }
        }
        Op::Abcd | Op::Sbcd => {
            if opcode & 0x0008 != 0 { 14 } else { 4 }
        }
        Op::Pack | Op::Unpk => {
            if opcode & 0x0008 != 0 { 13 } else { 6 }
        }
        Op::MulW => 27 + ea_t(Size::Word),
        Op::MulL => 43 + ea_t(Size::Long),
        Op::DivW => 44 + ea_t(Size::Word),
        Op::DivL => 78 + ea_t(Size::Long),
        Op::ShiftReg => 4,
        Op::ShiftMem => 5 + ea_t(Size::Word),
        Op::Bitfield => 10 + ea_t(Size::Long),
        Op::Pmmu | Op::Pflush040 | Op::Ptest040 => 20,
        Op::CacheOp040 => 16,
        Op::Move16 => 18,
    }
}

/// Cycles spent entering an exception, on top of the instruction.
#[must_use]
pub fn exception_cycles(kind: ExceptionKind, level: IsaLevel) -> u32 {
    let m68000 = match kind {
        ExceptionKind::Reset => 40,
        ExceptionKind::BusError | ExceptionKind::AddressError => 50,
        ExceptionKind::ZeroDivide => 38,
        ExceptionKind::Chk => 40,
        ExceptionKind::Interrupt { .. } | ExceptionKind::SpuriousInterrupt | ExceptionKind::UninitializedInterrupt => 44,
        _ => 34,
    };
    match level {
        IsaLevel::M68000 => m68000,
        IsaLevel::M68010 => match kind {
            ExceptionKind::BusError | ExceptionKind::AddressError => 126,
            _ => m68000 + 4,
        },
        IsaLevel::M68020 | IsaLevel::M68030 | IsaLevel::Cpu32 => match kind {
            ExceptionKind::Reset | ExceptionKind::BusError | ExceptionKind::AddressError => 50,
            ExceptionKind::Interrupt { .. } | ExceptionKind::SpuriousInterrupt | ExceptionKind::UninitializedInterrupt => 26,
            ExceptionKind::ZeroDivide | ExceptionKind::Chk => 38,
            _ => 20,
        },
        IsaLevel::M68040 | IsaLevel::ColdFire => match kind {
            ExceptionKind::Reset | ExceptionKind::BusError | ExceptionKind::AddressError => 25,
            _ => 16,
        },
    }
}

/// BCD addition `dst + src + extend`; returns (result, carry, overflow).
#[must_use]
pub fn bcd_add(dst: u8, src: u8, extend: bool) -> (u8, bool, bool) {
    let (dst, src) = (u32::from(dst), u32::from(src));
    let mut res = (dst & 0x0F) + (src & 0x0F) + u32::from(extend);
    let correction = if res > 9 { 6 } else { 0 };
    res += (dst & 0xF0) + (src & 0xF0);
    let uncorrected = res;
    res += correction;
    let carry = res > 0x9F;
    if carry {
        res -= 0xA0;
    }
    let overflow = !uncorrected & res & 0x80 != 0;
    (res as u8, carry, overflow)
}

/// BCD subtraction `dst - src - extend`; returns (result, borrow, overflow).
#[must_use]
pub fn bcd_sub(dst: u8, src: u8, extend: bool) -> (u8, bool, bool) {
    let (dst, src) = (u32::from(dst), u32::from(src));
    let mut res = (dst & 0x0F).wrapping_sub(src & 0x0F).wrapping_sub(u32::from(extend));
    let correction = if res > 0x0F { 6 } else { 0 };
    res = res.wrapping_add(dst & 0xF0).wrapping_sub(src & 0xF0);
    let uncorrected = res;
    let borrow = if res > 0xFF {
        res = res.wrapping_add(0xA0);
        true
    } else {
        res < correction
    };
    res = res.wrapping_sub(correction) & 0xFF;
    let overflow = uncorrected & !res & 0x80 != 0;
    (res as u8, borrow, overflow)
}

impl Cpu680x0 {
    /// The 68000 and 68010 charge per-bit and per-iteration costs; later
    /// parts have a barrel shifter and fixed-latency multiply/divide.
    #[must_use]
    pub(crate) fn dynamic_timing(&self) -> bool {
        matches!(self.caps.isa, IsaLevel::M68000 | IsaLevel::M68010)
    }

    /// DIVU cycle count (Jorge Cwik's restoring-division model).
    #[must_use]
    pub(crate) fn divu_cycles(dividend: u32, divisor: u16) -> u32 {
        if dividend >> 16 >= u32::from(divisor) {
            return 10;
        }
        let mut mcycles: u32 = 38;
        let shifted_divisor = u32::from(divisor) << 16;
        let mut remainder = dividend;
        for _ in 0..15 {
            let carry = remainder & 0x8000_0000 != 0;
            remainder <<= 1;
            if carry {
                remainder = remainder.wrapping_sub(shifted_divisor);
            } else {
                mcycles += 2;
                if remainder >= shifted_divisor {
                    remainder = remainder.wrapping_sub(shifted_divisor);
                    mcycles -= 1;
                }
            }
        }
        mcycles * 2
    }

    /// DIVS cycle count (Jorge Cwik's model).
    #[must_use]
    pub(crate) fn divs_cycles(dividend: i32, divisor: i16) -> u32 {
        let mut mcycles: u32 = if dividend < 0 { 7 } else { 6 };
        let abs_dividend = dividend.unsigned_abs();
        let abs_divisor = u32::from(divisor.unsigned_abs());
        if abs_dividend >> 16 >= abs_divisor {
            return (mcycles + 2) * 2;
        }
        let mut quotient = abs_dividend / abs_divisor;
        mcycles += 55;
        if divisor >= 0 {
            if dividend >= 0 {
                mcycles -= 1;
            } else {
                mcycles += 1;
            }
        }
        for _ in 0..15 {
            if quotient & 0x8000 == 0 {
                mcycles += 1;
            }
            quotient <<= 1;
        }
        mcycles * 2
    }
}
