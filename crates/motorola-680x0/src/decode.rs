//! Opcode classification and the per-level jump tables.
//!
//! Every one of the 65,536 opcodes of every ISA level resolves to an
//! [`Entry`]: the handler class that executes it and its static cycle
//! cost (base time plus the addressing-mode surcharge encoded in the
//! opcode). Invalid encodings classify as illegal, line-A or line-F.
//! Tables are built once per level on first use and shared by all CPUs.

use std::fmt;
use std::sync::OnceLock;

use crate::addressing::{AddrMode, EaClass};
use crate::model::IsaLevel;
use crate::timing;

/// Handler class. Handlers decode their own register and size fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Illegal,
    LineA,
    LineF,

    // Line 0: immediates, bit operations, MOVEP, MOVES, CAS, CHK2
    OriCcr,
    OriSr,
    AndiCcr,
    AndiSr,
    EoriCcr,
    EoriSr,
    /// ORI, ANDI, SUBI, ADDI, EORI, CMPI.
    AluImm,
    BitDynamic,
    BitStatic,
    Movep,
    Moves,
    Cmp2Chk2,
    Cas,
    Cas2,

    // Lines 1-3
    Move,
    Movea,

    // Line 4
    Negx,
    Clr,
    Neg,
    Not,
    MoveFromSr,
    MoveFromCcr,
    MoveToCcr,
    MoveToSr,
    Nbcd,
    Swap,
    Pea,
    Bkpt,
    Ext,
    Extb,
    Movem,
    Tst,
    Tas,
    MulL,
    DivL,
    Trap,
    Link,
    LinkLong,
    Unlk,
    MoveUsp,
    Reset,
    Nop,
    Stop,
    Rte,
    Rtd,
    Rts,
    Trapv,
    Rtr,
    Movec,
    Jsr,
    Jmp,
    Chk,
    Lea,

    // Line 5
    AddqSubq,
    Scc,
    Dbcc,
    Trapcc,

    // Lines 6-7
    Bcc,
    Moveq,

    // Line 8
    Or,
    DivW,
    Sbcd,
    Pack,
    Unpk,

    // Lines 9 and D
    AddSub,
    AddaSuba,
    AddxSubx,

    // Line B
    Cmp,
    Cmpa,
    Eor,
    Cmpm,

    // Line C
    And,
    MulW,
    Abcd,
    Exg,

    // Line E
    ShiftReg,
    ShiftMem,
    Bitfield,

    // Line F
    Pmmu,
    Pflush040,
    Ptest040,
    CacheOp040,
    Move16,
}

/// One jump table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub op: Op,
    /// Static cycle cost; handlers add the dynamic part.
    pub cycles: u16,
}

/// Dispatch table for one ISA level.
pub struct JumpTable {
    level: IsaLevel,
    entries: Box<[Entry]>,
}

impl fmt::Debug for JumpTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JumpTable").field("level", &self.level).finish_non_exhaustive()
    }
}

impl JumpTable {
    fn build(level: IsaLevel) -> Self {
        let entries = (0..=u16::MAX)
            .map(|opcode| {
                let op = classify(opcode, level);
                Entry {
                    op,
                    cycles: timing::base_cycles(op, opcode, level),
                }
            })
            .collect();
        log::debug!("built {level:?} jump table");
        Self { level, entries }
    }

    #[must_use]
    pub fn level(&self) -> IsaLevel {
        self.level
    }

    #[inline]
    #[must_use]
    pub fn entry(&self, opcode: u16) -> Entry {
        self.entries[usize::from(opcode)]
    }
}

/// Shared jump table for `level`, built on first use.
#[must_use]
pub fn jump_table(level: IsaLevel) -> &'static JumpTable {
    static TABLES: [OnceLock<JumpTable>; 7] = [const { OnceLock::new() }; 7];
    TABLES[level.index()].get_or_init(|| JumpTable::build(level))
}

fn ea_ok(opcode: u16, class: EaClass) -> bool {
    class.accepts_field(opcode)
}

fn ea_mode(opcode: u16) -> u16 {
    (opcode >> 3) & 7
}

/// Data class without An for byte operations.
fn source_class(size_bits: u16) -> EaClass {
    if size_bits == 0 { EaClass::Data } else { EaClass::All }
}

fn or_illegal(valid: bool, op: Op) -> Op {
    if valid { op } else { Op::Illegal }
}

/// Classify `opcode` for `level`.
#[must_use]
pub fn classify(opcode: u16, level: IsaLevel) -> Op {
    match opcode >> 12 {
        0x0 => line0(opcode, level),
        0x1..=0x3 => line_move(opcode),
        0x4 => line4(opcode, level),
        0x5 => line5(opcode, level),
        0x6 => Op::Bcc,
        0x7 => or_illegal(opcode & 0x0100 == 0, Op::Moveq),
        0x8 => line8(opcode, level),
        0x9 | 0xD => line_add_sub(opcode),
        0xA => Op::LineA,
        0xB => line_b(opcode),
        0xC => line_c(opcode),
        0xE => line_e(opcode, level),
        _ => line_f(opcode, level),
    }
}

fn line0(opcode: u16, level: IsaLevel) -> Op {
    match opcode {
        0x003C => return Op::OriCcr,
        0x007C => return Op::OriSr,
        0x023C => return Op::AndiCcr,
        0x027C => return Op::AndiSr,
        0x0A3C => return Op::EoriCcr,
        0x0A7C => return Op::EoriSr,
        0x0CFC | 0x0EFC => return or_illegal(level.has_020(), Op::Cas2),
        _ => {}
    }

    if opcode & 0x0100 != 0 {
        if ea_mode(opcode) == 1 {
            return Op::Movep;
        }
        // BTST reads any data operand; the others modify it.
        let class = if (opcode >> 6) & 3 == 0 { EaClass::Data } else { EaClass::DataAlterable };
        return or_illegal(ea_ok(opcode, class), Op::BitDynamic);
    }

    let kind = (opcode >> 9) & 7;
    let size_bits = (opcode >> 6) & 3;

    if kind == 4 {
        let valid = if size_bits == 0 {
            ea_ok(opcode, EaClass::Data) && AddrMode::from_ea_field(opcode) != Some(AddrMode::Immediate)
        } else {
            ea_ok(opcode, EaClass::DataAlterable)
        };
        return or_illegal(valid, Op::BitStatic);
    }

    if size_bits == 3 {
        return match kind {
            0..=2 => or_illegal(level.has_020() && ea_ok(opcode, EaClass::Control), Op::Cmp2Chk2),
            5..=7 => or_illegal(level.has_020() && ea_ok(opcode, EaClass::MemoryAlterable), Op::Cas),
            _ => Op::Illegal,
        };
    }

    match kind {
        7 => or_illegal(level.has_010() && ea_ok(opcode, EaClass::MemoryAlterable), Op::Moves),
        6 => {
            // CMPI gained PC-relative operands on the 68020.
            let valid = if level.has_020() {
                ea_ok(opcode, EaClass::Data) && AddrMode::from_ea_field(opcode) != Some(AddrMode::Immediate)
            } else {
                ea_ok(opcode, EaClass::DataAlterable)
            };
            or_illegal(valid, Op::AluImm)
        }
        _ => or_illegal(ea_ok(opcode, EaClass::DataAlterable), Op::AluImm),
    }
}

fn line_move(opcode: u16) -> Op {
    let size_bits = (opcode >> 12) & 3;
    let class = if size_bits == 1 { EaClass::Data } else { EaClass::All };
    if !ea_ok(opcode, class) {
        return Op::Illegal;
    }
    match AddrMode::from_move_dest(opcode) {
        Some(AddrMode::AddrReg(_)) => or_illegal(size_bits != 1, Op::Movea),
        Some(dest) if dest.is_data_alterable() => Op::Move,
        _ => Op::Illegal,
    }
}

fn line4(opcode: u16, level: IsaLevel) -> Op {
    match opcode {
        0x4AFC => return Op::Illegal,
        0x4E70 => return Op::Reset,
        0x4E71 => return Op::Nop,
        0x4E72 => return Op::Stop,
        0x4E73 => return Op::Rte,
        0x4E74 => return or_illegal(level.has_010(), Op::Rtd),
        0x4E75 => return Op::Rts,
        0x4E76 => return Op::Trapv,
        0x4E77 => return Op::Rtr,
        0x4E7A | 0x4E7B => return or_illegal(level.has_010(), Op::Movec),
        _ => {}
    }
    match opcode & 0xFFF0 {
        0x4E40 => return Op::Trap,
        0x4E60 => return Op::MoveUsp,
        _ => {}
    }
    match opcode & 0xFFF8 {
        0x4E50 => return Op::Link,
        0x4E58 => return Op::Unlk,
        0x4808 => return or_illegal(level.has_020(), Op::LinkLong),
        0x4840 => return Op::Swap,
        0x4848 => return or_illegal(level.has_010(), Op::Bkpt),
        0x4880 | 0x48C0 => return Op::Ext,
        0x49C0 => return or_illegal(level.has_020(), Op::Extb),
        _ => {}
    }

    if opcode & 0x0100 != 0 {
        return match (opcode >> 6) & 7 {
            7 => or_illegal(ea_ok(opcode, EaClass::Control), Op::Lea),
            6 => or_illegal(ea_ok(opcode, EaClass::Data), Op::Chk),
            4 => or_illegal(level.has_020() && ea_ok(opcode, EaClass::Data), Op::Chk),
            _ => Op::Illegal,
        };
    }

    let mode = AddrMode::from_ea_field(opcode);
    match opcode & 0xFFC0 {
        0x40C0 => return or_illegal(ea_ok(opcode, EaClass::DataAlterable), Op::MoveFromSr),
        0x42C0 => return or_illegal(level.has_010() && ea_ok(opcode, EaClass::DataAlterable), Op::MoveFromCcr),
        0x44C0 => return or_illegal(ea_ok(opcode, EaClass::Data), Op::MoveToCcr),
        0x46C0 => return or_illegal(ea_ok(opcode, EaClass::Data), Op::MoveToSr),
        0x4800 => return or_illegal(ea_ok(opcode, EaClass::DataAlterable), Op::Nbcd),
        0x4840 => return or_illegal(ea_ok(opcode, EaClass::Control), Op::Pea),
        0x4880 | 0x48C0 => {
            let valid = ea_ok(opcode, EaClass::ControlAlterable) || matches!(mode, Some(AddrMode::AddrIndPreDec(_)));
            return or_illegal(valid, Op::Movem);
        }
        0x4C80 | 0x4CC0 => {
            let valid = ea_ok(opcode, EaClass::Control) || matches!(mode, Some(AddrMode::AddrIndPostInc(_)));
            return or_illegal(valid, Op::Movem);
        }
        0x4AC0 => return or_illegal(ea_ok(opcode, EaClass::DataAlterable), Op::Tas),
        0x4C00 => return or_illegal(level.has_020() && ea_ok(opcode, EaClass::Data), Op::MulL),
        0x4C40 => return or_illegal(level.has_020() && ea_ok(opcode, EaClass::Data), Op::DivL),
        0x4E80 => return or_illegal(ea_ok(opcode, EaClass::Control), Op::Jsr),
        0x4EC0 => return or_illegal(ea_ok(opcode, EaClass::Control), Op::Jmp),
        _ => {}
    }

    let size_bits = (opcode >> 6) & 3;
    if size_bits == 3 {
        return Op::Illegal;
    }
    match opcode & 0xFF00 {
        0x4000 => or_illegal(ea_ok(opcode, EaClass::DataAlterable), Op::Negx),
        0x4200 => or_illegal(ea_ok(opcode, EaClass::DataAlterable), Op::Clr),
        0x4400 => or_illegal(ea_ok(opcode, EaClass::DataAlterable), Op::Neg),
        0x4600 => or_illegal(ea_ok(opcode, EaClass::DataAlterable), Op::Not),
        0x4A00 => {
            // The 68020 accepts every mode for TST (An only for word/long).
            let valid = if level.has_020() {
                ea_ok(opcode, source_class(size_bits))
            } else {
                ea_ok(opcode, EaClass::DataAlterable)
            };
            or_illegal(valid, Op::Tst)
        }
        _ => Op::Illegal,
    }
}

fn line5(opcode: u16, level: IsaLevel) -> Op {
    let size_bits = (opcode >> 6) & 3;
    if size_bits == 3 {
        if ea_mode(opcode) == 1 {
            return Op::Dbcc;
        }
        if matches!(opcode & 0x3F, 0x3A..=0x3C) {
            return or_illegal(level.has_020(), Op::Trapcc);
        }
        return or_illegal(ea_ok(opcode, EaClass::DataAlterable), Op::Scc);
    }
    let valid = if size_bits == 0 {
        ea_ok(opcode, EaClass::DataAlterable)
    } else {
        ea_ok(opcode, EaClass::Alterable)
    };
    or_illegal(valid, Op::AddqSubq)
}

fn line8(opcode: u16, level: IsaLevel) -> Op {
    let opmode = (opcode >> 6) & 7;
    let register_form = ea_mode(opcode) <= 1;
    match opmode {
        3 | 7 => or_illegal(ea_ok(opcode, EaClass::Data), Op::DivW),
        4 if register_form => Op::Sbcd,
        5 if register_form => or_illegal(level.has_020(), Op::Pack),
        6 if register_form => or_illegal(level.has_020(), Op::Unpk),
        0..=2 => or_illegal(ea_ok(opcode, EaClass::Data), Op::Or),
        _ => or_illegal(ea_ok(opcode, EaClass::MemoryAlterable), Op::Or),
    }
}

fn line_add_sub(opcode: u16) -> Op {
    let opmode = (opcode >> 6) & 7;
    match opmode {
        3 | 7 => or_illegal(ea_ok(opcode, EaClass::All), Op::AddaSuba),
        4..=6 if ea_mode(opcode) <= 1 => Op::AddxSubx,
        0..=2 => or_illegal(ea_ok(opcode, source_class(opmode)), Op::AddSub),
        _ => or_illegal(ea_ok(opcode, EaClass::MemoryAlterable), Op::AddSub),
    }
}

fn line_b(opcode: u16) -> Op {
    let opmode = (opcode >> 6) & 7;
    match opmode {
        3 | 7 => or_illegal(ea_ok(opcode, EaClass::All), Op::Cmpa),
        4..=6 if ea_mode(opcode) == 1 => Op::Cmpm,
        0..=2 => or_illegal(ea_ok(opcode, source_class(opmode)), Op::Cmp),
        _ => or_illegal(ea_ok(opcode, EaClass::DataAlterable), Op::Eor),
    }
}

fn line_c(opcode: u16) -> Op {
    let opmode = (opcode >> 6) & 7;
    let mode = ea_mode(opcode);
    match opmode {
        3 | 7 => or_illegal(ea_ok(opcode, EaClass::Data), Op::MulW),
        4 if mode <= 1 => Op::Abcd,
        5 if mode <= 1 => Op::Exg,
        6 if mode == 1 => Op::Exg,
        6 if mode == 0 => Op::Illegal,
        0..=2 => or_illegal(ea_ok(opcode, EaClass::Data), Op::And),
        _ => or_illegal(ea_ok(opcode, EaClass::MemoryAlterable), Op::And),
    }
}

fn line_e(opcode: u16, level: IsaLevel) -> Op {
    if (opcode >> 6) & 3 != 3 {
        return Op::ShiftReg;
    }
    if opcode & 0x0800 == 0 {
        return or_illegal(ea_ok(opcode, EaClass::MemoryAlterable), Op::ShiftMem);
    }
    if !level.has_bitfields() {
        return Op::Illegal;
    }
    // BFTST, BFEXTU, BFEXTS and BFFFO only read their operand.
    let read_only = matches!((opcode >> 8) & 7, 0 | 1 | 3 | 5);
    let class = if read_only { EaClass::Control } else { EaClass::ControlAlterable };
    let valid = ea_mode(opcode) == 0 || ea_ok(opcode, class);
    or_illegal(valid, Op::Bitfield)
}

fn line_f(opcode: u16, level: IsaLevel) -> Op {
    match level {
        IsaLevel::M68020 | IsaLevel::M68030 if opcode & 0xFFC0 == 0xF000 => Op::Pmmu,
        IsaLevel::M68040 => match opcode {
            0xF500..=0xF51F => Op::Pflush040,
            0xF548..=0xF54F | 0xF568..=0xF56F => Op::Ptest040,
            0xF400..=0xF4FF if (opcode >> 6) & 3 != 0 && (opcode >> 3) & 3 != 0 => Op::CacheOp040,
            0xF600..=0xF61F | 0xF620..=0xF627 => Op::Move16,
            _ => Op::LineF,
        },
        _ => Op::LineF,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_opcodes_classify_on_every_level() {
        for level in IsaLevel::ALL {
            assert_eq!(classify(0x4E71, level), Op::Nop);
            assert_eq!(classify(0x7005, level), Op::Moveq);
            assert_eq!(classify(0xD041, level), Op::AddSub);
            assert_eq!(classify(0x2210, level), Op::Move);
            assert_eq!(classify(0x4E75, level), Op::Rts);
            assert_eq!(classify(0xA000, level), Op::LineA);
        }
    }

    #[test]
    fn later_instructions_are_illegal_on_the_68000() {
        assert_eq!(classify(0x4E7A, IsaLevel::M68000), Op::Illegal);
        assert_eq!(classify(0x4E7A, IsaLevel::M68010), Op::Movec);
        assert_eq!(classify(0x49C0, IsaLevel::M68000), Op::Illegal);
        assert_eq!(classify(0x49C0, IsaLevel::M68020), Op::Extb);
        assert_eq!(classify(0xE8C0, IsaLevel::M68000), Op::Illegal);
        assert_eq!(classify(0xE8C0, IsaLevel::M68020), Op::Bitfield);
        assert_eq!(classify(0xE8C0, IsaLevel::Cpu32), Op::Illegal);
    }

    #[test]
    fn invalid_addressing_modes_are_rejected() {
        // MOVE.B to An.
        assert_eq!(classify(0x1040, IsaLevel::M68000), Op::Illegal);
        // LEA Dn.
        assert_eq!(classify(0x41C0, IsaLevel::M68000), Op::Illegal);
        // CLR to PC-relative.
        assert_eq!(classify(0x427A, IsaLevel::M68000), Op::Illegal);
        // ADD.B An,Dn.
        assert_eq!(classify(0xD008, IsaLevel::M68000), Op::Illegal);
        // ADD.W An,Dn is fine.
        assert_eq!(classify(0xD048, IsaLevel::M68000), Op::AddSub);
    }

    #[test]
    fn line_f_depends_on_the_mmu_family() {
        assert_eq!(classify(0xF000, IsaLevel::M68000), Op::LineF);
        assert_eq!(classify(0xF000, IsaLevel::M68030), Op::Pmmu);
        assert_eq!(classify(0xF518, IsaLevel::M68040), Op::Pflush040);
        assert_eq!(classify(0xF620, IsaLevel::M68040), Op::Move16);
        assert_eq!(classify(0xF200, IsaLevel::M68040), Op::LineF);
    }

    #[test]
    fn tables_are_shared_per_level() {
        let a = jump_table(IsaLevel::M68000);
        let b = jump_table(IsaLevel::M68000);
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.entry(0x4E71).cycles, 4);
        assert_eq!(a.level(), IsaLevel::M68000);
    }
}
