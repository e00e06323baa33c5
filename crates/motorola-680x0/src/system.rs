//! Supervisor system instructions: MOVEC, MOVES, the 68030/68851 PMMU
//! group, and the 68040 PFLUSH, PTEST, CINV/CPUSH and MOVE16.

use crate::addressing::AddrMode;
use crate::alu::Size;
use crate::bus::{FunctionCode, M68kBus};
use crate::cpu::Cpu680x0;
use crate::ea::Operand;
use crate::fault::{ExceptionKind, Fault, raise};
use crate::model::{IsaLevel, MmuKind};
use crate::mmu::{Mmu, tc};

/// MOVEC control register codes.
pub mod control {
    pub const SFC: u16 = 0x000;
    pub const DFC: u16 = 0x001;
    pub const CACR: u16 = 0x002;
    pub const TC: u16 = 0x003;
    pub const ITT0: u16 = 0x004;
    pub const ITT1: u16 = 0x005;
    pub const DTT0: u16 = 0x006;
    pub const DTT1: u16 = 0x007;
    pub const USP: u16 = 0x800;
    pub const VBR: u16 = 0x801;
    pub const CAAR: u16 = 0x802;
    pub const MSP: u16 = 0x803;
    pub const ISP: u16 = 0x804;
    pub const MMUSR: u16 = 0x805;
    pub const URP: u16 = 0x806;
    pub const SRP: u16 = 0x807;

    /// Assembler name of a control register.
    #[must_use]
    pub const fn name(code: u16) -> Option<&'static str> {
        Some(match code {
            SFC => "sfc",
            DFC => "dfc",
            CACR => "cacr",
            TC => "tc",
            ITT0 => "itt0",
            ITT1 => "itt1",
            DTT0 => "dtt0",
            DTT1 => "dtt1",
            USP => "usp",
            VBR => "vbr",
            CAAR => "caar",
            MSP => "msp",
            ISP => "isp",
            MMUSR => "mmusr",
            URP => "urp",
            SRP => "srp",
            _ => return None,
        })
    }
}

/// PMMU register selected by a PMOVE extension word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PmmuReg {
    Tc,
    Srp,
    Crp,
    Tt0,
    Tt1,
    Mmusr,
}

impl Cpu680x0 {
    // ================================================================
    // MOVEC
    // ================================================================
    //
    // Encoding: 0100 1110 0111 101D + extension
    //   D = 1: general register to control register
    //   Extension: A RRR CCCCCCCCCCCC

    /// Whether this part implements control register `code`.
    fn has_control_register(&self, code: u16) -> bool {
        let caps = &self.caps;
        match code {
            control::SFC | control::DFC | control::USP | control::VBR => caps.movec,
            control::CACR => caps.cacr,
            control::CAAR => caps.cacr && matches!(caps.isa, IsaLevel::M68020 | IsaLevel::M68030),
            control::MSP | control::ISP => caps.msp,
            control::TC
            | control::ITT0
            | control::ITT1
            | control::DTT0
            | control::DTT1
            | control::MMUSR
            | control::URP
            | control::SRP => caps.isa == IsaLevel::M68040,
            _ => false,
        }
    }

    pub(crate) fn exec_movec<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        self.require_supervisor()?;
        let ext = self.fetch_word(bus)?;
        let reg = usize::from(ext >> 12);
        let code = ext & 0x0FFF;

        if !self.has_control_register(code) {
            log::warn!(
                "{}: MOVEC with unsupported control register {code:#05x} at pc={:#010x}",
                self.model.name(),
                self.ppc
            );
            return raise(ExceptionKind::IllegalInstruction);
        }

        if opcode & 1 == 0 {
            let value = self.read_control(code);
            self.regs.set_da(reg, value);
        } else {
            let value = self.regs.da(reg);
            self.write_control(code, value);
        }
        Ok(())
    }

    fn read_control(&self, code: u16) -> u32 {
        let mmu = &self.mmu;
        match code {
            control::SFC => u32::from(self.regs.sfc),
            control::DFC => u32::from(self.regs.dfc),
            control::CACR => self.regs.cacr,
            control::TC => mmu.tc,
            control::ITT0 => mmu.itt0,
            control::ITT1 => mmu.itt1,
            control::DTT0 => mmu.dtt0,
            control::DTT1 => mmu.dtt1,
            control::USP => self.regs.usp,
            control::VBR => self.regs.vbr,
            control::CAAR => self.regs.caar,
            control::MSP => self.regs.msp,
            control::ISP => self.regs.isp,
            control::MMUSR => mmu.mmusr_040,
            control::URP => mmu.urp,
            control::SRP => mmu.srp_aptr,
            _ => 0,
        }
    }

    fn write_control(&mut self, code: u16, value: u32) {
        match code {
            control::SFC => self.regs.sfc = (value & 7) as u8,
            control::DFC => self.regs.dfc = (value & 7) as u8,
            control::CACR => self.write_cacr(value),
            control::TC => self.mmu.set_tc(value & (tc::E_040 | tc::P_040), false),
            control::ITT0 => self.mmu.itt0 = value,
            control::ITT1 => self.mmu.itt1 = value,
            control::DTT0 => self.mmu.dtt0 = value,
            control::DTT1 => self.mmu.dtt1 = value,
            control::USP => self.regs.usp = value,
            control::VBR => self.regs.vbr = value,
            control::CAAR => self.regs.caar = value,
            control::MSP => self.regs.msp = value,
            control::ISP => self.regs.isp = value,
            control::MMUSR => self.mmu.mmusr_040 = value,
            control::URP => self.mmu.urp = value & !0x1FF,
            control::SRP => self.mmu.srp_aptr = value & !0x1FF,
            _ => {}
        }
    }

    // ================================================================
    // MOVES
    // ================================================================
    //
    // Encoding: 0000 1110 SS MMMRRR + extension
    //   Extension: A RRR D 000 0000 0000 (D = 1: register to memory)
    //   Reads use SFC, writes use DFC.

    pub(crate) fn exec_moves<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        self.require_supervisor()?;
        let size = Self::size_field(opcode)?;
        let ext = self.fetch_word(bus)?;
        let reg = usize::from(ext >> 12);
        let mode = Self::ea_mode(opcode)?;
        let Operand::Memory { address, .. } = self.ea_operand(bus, mode, size)? else {
            return raise(ExceptionKind::IllegalInstruction);
        };

        if ext & 0x0800 != 0 {
            let fc = FunctionCode::from_bits(self.regs.dfc);
            self.write_fc(bus, address, size, self.regs.da(reg), fc)
        } else {
            let fc = FunctionCode::from_bits(self.regs.sfc);
            let value = self.read_fc(bus, address, size, fc)?;
            if reg >= 8 {
                self.regs.set_da(reg, size.sign_extend(value));
            } else {
                self.write_data_reg(reg, size, value);
            }
            Ok(())
        }
    }

    // ================================================================
    // 68030 / 68851 PMMU
    // ================================================================
    //
    // Encoding: 1111 0000 00 MMMRRR + extension
    //   Extension bits 15-13:
    //     000 PMOVE TT0/TT1      001 PLOAD/PFLUSH
    //     010 PMOVE TC/SRP/CRP   011 PMOVE MMUSR
    //     100 PTEST

    /// Function code named by the FC field of a PMMU extension word.
    fn pmmu_fc(&self, field: u16) -> FunctionCode {
        let bits = match field & 0x1F {
            0 => self.regs.sfc,
            1 => self.regs.dfc,
            f if f & 0x18 == 0x08 => (self.regs.d[usize::from(f & 7)] & 7) as u8,
            f => (f & 7) as u8,
        };
        FunctionCode::from_bits(bits)
    }

    pub(crate) fn exec_pmmu<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        if !matches!(self.caps.mmu, MmuKind::Pmmu030 | MmuKind::Pmmu68851) {
            return raise(ExceptionKind::LineF);
        }
        self.require_supervisor()?;
        let ext = self.fetch_word(bus)?;
        let mode = Self::ea_mode(opcode)?;

        match ext >> 13 {
            0 => {
                let reg = if (ext >> 10) & 7 == 3 { PmmuReg::Tt1 } else { PmmuReg::Tt0 };
                self.pmove(bus, mode, reg, ext)
            }
            1 => self.pload_pflush(bus, mode, ext),
            2 => {
                let reg = match (ext >> 10) & 7 {
                    0 => PmmuReg::Tc,
                    2 => PmmuReg::Srp,
                    3 => PmmuReg::Crp,
                    _ => return raise(ExceptionKind::LineF),
                };
                self.pmove(bus, mode, reg, ext)
            }
            3 => self.pmove(bus, mode, PmmuReg::Mmusr, ext),
            4 => {
                let level = ((ext >> 10) & 7) as u8;
                let write = ext & 0x0200 == 0;
                let fc = self.pmmu_fc(ext);
                let logical = self.ea_address(bus, mode)?;
                let (_, descriptor) = self.mmu.ptest_030(bus, logical, fc, write, level);
                if ext & 0x0100 != 0 {
                    self.regs.set_a(usize::from((ext >> 5) & 7), descriptor);
                }
                Ok(())
            }
            _ => raise(ExceptionKind::LineF),
        }
    }

    /// PMOVE between memory and a PMMU register. Bit 9 set moves the
    /// register out; bit 8 (FD) suppresses the ATC flush.
    fn pmove<B: M68kBus>(&mut self, bus: &mut B, mode: AddrMode, reg: PmmuReg, ext: u16) -> Fault<()> {
        let to_memory = ext & 0x0200 != 0;
        let flush_disable = ext & 0x0100 != 0;

        if matches!(reg, PmmuReg::Srp | PmmuReg::Crp) {
            let address = self.ea_address(bus, mode)?;
            if to_memory {
                let (limit, aptr) = match reg {
                    PmmuReg::Srp => (self.mmu.srp_limit, self.mmu.srp_aptr),
                    _ => (self.mmu.crp_limit, self.mmu.crp_aptr),
                };
                self.write_long(bus, address, limit)?;
                return self.write_long(bus, address.wrapping_add(4), aptr);
            }
            let limit = self.read_long(bus, address)?;
            let aptr = self.read_long(bus, address.wrapping_add(4))?;
            if reg == PmmuReg::Srp {
                self.mmu.srp_limit = limit;
                self.mmu.srp_aptr = aptr;
            } else {
                self.mmu.crp_limit = limit;
                self.mmu.crp_aptr = aptr;
            }
            if !flush_disable {
                self.mmu.flush_all();
            }
            return Ok(());
        }

        let size = if reg == PmmuReg::Mmusr { Size::Word } else { Size::Long };
        let operand = self.ea_operand(bus, mode, size)?;
        if to_memory {
            let value = match reg {
                PmmuReg::Tc => self.mmu.tc,
                PmmuReg::Tt0 => self.mmu.tt0,
                PmmuReg::Tt1 => self.mmu.tt1,
                _ => u32::from(self.mmu.mmusr),
            };
            return self.write_operand(bus, operand, size, value);
        }

        let value = self.read_operand(bus, operand, size)?;
        match reg {
            PmmuReg::Tc => {
                if !Mmu::tc_is_valid(value) {
                    log::warn!("{}: rejected TC value {value:#010x}", self.model.name());
                    self.mmu.set_tc(value & !tc::E, flush_disable);
                    return raise(ExceptionKind::MmuConfiguration);
                }
                self.mmu.set_tc(value, flush_disable);
            }
            PmmuReg::Tt0 => self.mmu.tt0 = value,
            PmmuReg::Tt1 => self.mmu.tt1 = value,
            _ => self.mmu.mmusr = value as u16,
        }
        Ok(())
    }

    /// PLOAD (mode 000) and the PFLUSH variants (modes 001, 100, 110).
    fn pload_pflush<B: M68kBus>(&mut self, bus: &mut B, mode: AddrMode, ext: u16) -> Fault<()> {
        let fc = self.pmmu_fc(ext);
        let mask = ((ext >> 5) & 7) as u8;
        match (ext >> 10) & 7 {
            0 => {
                let write = ext & 0x0200 == 0;
                let logical = self.ea_address(bus, mode)?;
                self.mmu.load(bus, logical, fc, write);
            }
            1 => self.mmu.flush_all(),
            4 | 5 => self.mmu.flush_fc(fc.bits(), mask),
            6 | 7 => {
                let logical = self.ea_address(bus, mode)?;
                self.mmu.flush_page(fc.bits(), mask, logical);
            }
            _ => return raise(ExceptionKind::LineF),
        }
        Ok(())
    }

    // ================================================================
    // 68040 MMU and cache instructions
    // ================================================================

    /// PFLUSHN (An), PFLUSH (An), PFLUSHAN, PFLUSHA. DFC picks the user or
    /// supervisor entries.
    pub(crate) fn exec_pflush_040(&mut self, opcode: u16) -> Fault<()> {
        self.require_supervisor()?;
        let supervisor = self.regs.dfc & 4 != 0;
        let address = self.regs.a(usize::from(opcode & 7));
        match (opcode >> 3) & 3 {
            0 => self.mmu.flush_040(Some(address), supervisor, false),
            1 => self.mmu.flush_040(Some(address), supervisor, true),
            2 => self.mmu.flush_040(None, supervisor, false),
            _ => self.mmu.flush_all(),
        }
        Ok(())
    }

    /// PTESTW (An) / PTESTR (An) using DFC.
    pub(crate) fn exec_ptest_040<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        self.require_supervisor()?;
        let write = opcode & 0x0020 == 0;
        let address = self.regs.a(usize::from(opcode & 7));
        let fc = FunctionCode::from_bits(self.regs.dfc);
        self.mmu.ptest_040(bus, address, fc, write);
        Ok(())
    }

    /// CINV/CPUSH. Only the instruction cache is modelled; data cache
    /// requests are accepted and ignored.
    pub(crate) fn exec_cache_040(&mut self, opcode: u16) -> Fault<()> {
        self.require_supervisor()?;
        let caches = (opcode >> 6) & 3;
        if caches & 2 == 0 {
            return Ok(());
        }
        let address = self.regs.a(usize::from(opcode & 7));
        match (opcode >> 3) & 3 {
            1 => self.icache.invalidate_entry(address),
            2 => self.icache.invalidate_page(address),
            _ => self.icache.invalidate_all(),
        }
        Ok(())
    }

    /// MOVE16: copy one aligned 16-byte line.
    pub(crate) fn exec_move16<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let reg = usize::from(opcode & 7);
        let (src, dst) = if opcode & 0x0020 != 0 {
            // (Ax)+,(Ay)+ with Ay in the extension word.
            let ext = self.fetch_word(bus)?;
            let ay = usize::from((ext >> 12) & 7);
            let (src, dst) = (self.regs.a(reg), self.regs.a(ay));
            self.regs.set_a(reg, src.wrapping_add(16));
            self.regs.set_a(ay, dst.wrapping_add(16));
            (src, dst)
        } else {
            let absolute = self.fetch_long(bus)?;
            let an = self.regs.a(reg);
            let post_increment = (opcode >> 3) & 3 < 2;
            if post_increment {
                self.regs.set_a(reg, an.wrapping_add(16));
            }
            if (opcode >> 3) & 1 == 0 { (an, absolute) } else { (absolute, an) }
        };

        let (src, dst) = (src & !15, dst & !15);
        for i in 0..4 {
            let value = self.read_long(bus, src.wrapping_add(i * 4))?;
            self.write_long(bus, dst.wrapping_add(i * 4), value)?;
        }
        Ok(())
    }
}
