//! Effective address resolution.
//!
//! Resolving an operand fetches its extension words and applies the
//! (An)+ / -(An) register update immediately, before any data access.
//! A fault on the following access therefore leaves the register
//! modified, as the hardware does.

use crate::addressing::AddrMode;
use crate::alu::Size;
use crate::bus::{FunctionCode, M68kBus};
use crate::cpu::Cpu680x0;
use crate::fault::{ExceptionKind, Fault, raise};

/// A resolved operand location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operand {
    DataReg(usize),
    AddrReg(usize),
    Memory { address: u32, fc: FunctionCode },
    Immediate(u32),
}

impl Operand {
    /// Memory address, for operands that have one.
    pub(crate) const fn address(self) -> Option<u32> {
        match self {
            Self::Memory { address, .. } => Some(address),
            _ => None,
        }
    }
}

/// Address register step for (An)+ and -(An). Byte accesses through A7
/// keep the stack word aligned.
const fn step_for(reg: u8, size: Size) -> u32 {
    match size {
        Size::Byte if reg == 7 => 2,
        _ => size.bytes(),
    }
}

impl Cpu680x0 {
    /// Addressing mode in the low six bits of the opcode.
    pub(crate) fn ea_mode(opcode: u16) -> Fault<AddrMode> {
        AddrMode::from_ea_field(opcode).map_or_else(|| raise(ExceptionKind::IllegalInstruction), Ok)
    }

    /// Resolve `mode` for an operand of `size`.
    pub(crate) fn ea_operand<B: M68kBus>(&mut self, bus: &mut B, mode: AddrMode, size: Size) -> Fault<Operand> {
        let data = self.data_fc();
        let operand = match mode {
            AddrMode::DataReg(r) => Operand::DataReg(usize::from(r)),
            AddrMode::AddrReg(r) => Operand::AddrReg(usize::from(r)),
            AddrMode::AddrInd(r) => Operand::Memory {
                address: self.regs.a(usize::from(r)),
                fc: data,
            },
            AddrMode::AddrIndPostInc(r) => {
                let reg = usize::from(r);
                let address = self.regs.a(reg);
                self.regs.set_a(reg, address.wrapping_add(step_for(r, size)));
                Operand::Memory { address, fc: data }
            }
            AddrMode::AddrIndPreDec(r) => {
                let reg = usize::from(r);
                let address = self.regs.a(reg).wrapping_sub(step_for(r, size));
                self.regs.set_a(reg, address);
                Operand::Memory { address, fc: data }
            }
            AddrMode::AddrIndDisp(r) => {
                let disp = self.fetch_word(bus)? as i16;
                Operand::Memory {
                    address: self.regs.a(usize::from(r)).wrapping_add(disp as u32),
                    fc: data,
                }
            }
            AddrMode::AddrIndIndex(r) => {
                let base = self.regs.a(usize::from(r));
                Operand::Memory {
                    address: self.indexed_address(bus, base)?,
                    fc: data,
                }
            }
            AddrMode::AbsShort => Operand::Memory {
                address: self.fetch_word(bus)? as i16 as u32,
                fc: data,
            },
            AddrMode::AbsLong => Operand::Memory {
                address: self.fetch_long(bus)?,
                fc: data,
            },
            AddrMode::PcDisp => {
                let base = self.regs.pc;
                let disp = self.fetch_word(bus)? as i16;
                Operand::Memory {
                    address: base.wrapping_add(disp as u32),
                    fc: self.program_fc(),
                }
            }
            AddrMode::PcIndex => {
                let base = self.regs.pc;
                Operand::Memory {
                    address: self.indexed_address(bus, base)?,
                    fc: self.program_fc(),
                }
            }
            AddrMode::Immediate => Operand::Immediate(self.fetch_immediate(bus, size)?),
        };
        Ok(operand)
    }

    /// Resolve a control addressing mode to its address.
    pub(crate) fn ea_address<B: M68kBus>(&mut self, bus: &mut B, mode: AddrMode) -> Fault<u32> {
        match self.ea_operand(bus, mode, Size::Long)?.address() {
            Some(address) => Ok(address),
            None => raise(ExceptionKind::IllegalInstruction),
        }
    }

    /// Value of the index register named by an extension word, sized and
    /// scaled.
    fn index_value(&self, ext: u16) -> u32 {
        let mut value = self.regs.da(usize::from(ext >> 12));
        if ext & 0x0800 == 0 {
            value = Size::Word.sign_extend(value);
        }
        // The 68000 and 68010 ignore the scale field.
        if self.caps.isa.has_020() {
            value <<= (ext >> 9) & 3;
        }
        value
    }

    /// Decode a brief or full-format index extension word against `base`.
    fn indexed_address<B: M68kBus>(&mut self, bus: &mut B, base: u32) -> Fault<u32> {
        let ext = self.fetch_word(bus)?;
        let index = self.index_value(ext);

        if ext & 0x0100 == 0 || !self.caps.isa.has_full_extension() {
            let disp = ext as u8 as i8 as u32;
            return Ok(base.wrapping_add(disp).wrapping_add(index));
        }

        let base = if ext & 0x0080 != 0 { 0 } else { base };
        let index = if ext & 0x0040 != 0 { 0 } else { index };
        let base_disp = match (ext >> 4) & 3 {
            2 => self.fetch_word(bus)? as i16 as u32,
            3 => self.fetch_long(bus)?,
            _ => 0,
        };
        let indirect = ext & 7;
        if indirect == 0 {
            return Ok(base.wrapping_add(base_disp).wrapping_add(index));
        }
        let outer_disp = match indirect & 3 {
            2 => self.fetch_word(bus)? as i16 as u32,
            3 => self.fetch_long(bus)?,
            _ => 0,
        };
        if indirect & 4 == 0 {
            // Pre-indexed.
            let pointer = self.read_long(bus, base.wrapping_add(base_disp).wrapping_add(index))?;
            Ok(pointer.wrapping_add(outer_disp))
        } else {
            // Post-indexed.
            let pointer = self.read_long(bus, base.wrapping_add(base_disp))?;
            Ok(pointer.wrapping_add(index).wrapping_add(outer_disp))
        }
    }

    // === Operand access ===

    /// Read a resolved operand.
    pub(crate) fn read_operand<B: M68kBus>(&mut self, bus: &mut B, operand: Operand, size: Size) -> Fault<u32> {
        match operand {
            Operand::DataReg(r) => Ok(self.regs.d[r] & size.mask()),
            Operand::AddrReg(r) => Ok(self.regs.a(r) & size.mask()),
            Operand::Memory { address, fc } => self.read_fc(bus, address, size, fc),
            Operand::Immediate(value) => Ok(value & size.mask()),
        }
    }

    /// Write a resolved operand. Data registers keep their upper bits;
    /// address registers always take the full long.
    pub(crate) fn write_operand<B: M68kBus>(&mut self, bus: &mut B, operand: Operand, size: Size, value: u32) -> Fault<()> {
        match operand {
            Operand::DataReg(r) => {
                self.write_data_reg(r, size, value);
                Ok(())
            }
            Operand::AddrReg(r) => {
                self.regs.set_a(r, value);
                Ok(())
            }
            Operand::Memory { address, fc } => self.write_fc(bus, address, size, value, fc),
            Operand::Immediate(_) => raise(ExceptionKind::IllegalInstruction),
        }
    }

    /// Resolve and read the operand in the opcode's low six bits.
    pub(crate) fn read_ea<B: M68kBus>(&mut self, bus: &mut B, opcode: u16, size: Size) -> Fault<(Operand, u32)> {
        let mode = Self::ea_mode(opcode)?;
        let operand = self.ea_operand(bus, mode, size)?;
        let value = self.read_operand(bus, operand, size)?;
        Ok((operand, value))
    }

    /// Write the low `size` bits of a data register.
    pub(crate) fn write_data_reg(&mut self, reg: usize, size: Size, value: u32) {
        let mask = size.mask();
        self.regs.d[reg] = (self.regs.d[reg] & !mask) | (value & mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusResult;
    use crate::model::CpuModel;

    struct Ram(Vec<u8>);

    impl M68kBus for Ram {
        fn read_byte(&mut self, addr: u32, _fc: FunctionCode) -> BusResult {
            BusResult::new(u32::from(self.0[addr as usize & 0xFFFF]))
        }
        fn read_word(&mut self, addr: u32, _fc: FunctionCode) -> BusResult {
            let a = addr as usize & 0xFFFF;
            BusResult::new(u32::from(u16::from_be_bytes([self.0[a], self.0[a + 1]])))
        }
        fn write_byte(&mut self, addr: u32, value: u8, _fc: FunctionCode) -> BusResult {
            self.0[addr as usize & 0xFFFF] = value;
            BusResult::write_ok()
        }
        fn write_word(&mut self, addr: u32, value: u16, _fc: FunctionCode) -> BusResult {
            let a = addr as usize & 0xFFFF;
            self.0[a..a + 2].copy_from_slice(&value.to_be_bytes());
            BusResult::write_ok()
        }
    }

    fn with_stream(model: CpuModel, words: &[u16]) -> (Cpu680x0, Ram) {
        let mut ram = Ram(vec![0; 0x10000]);
        for (i, word) in words.iter().enumerate() {
            ram.0[0x1000 + i * 2..0x1002 + i * 2].copy_from_slice(&word.to_be_bytes());
        }
        let mut cpu = Cpu680x0::new(model);
        cpu.regs.pc = 0x1000;
        (cpu, ram)
    }

    #[test]
    fn byte_postincrement_on_a7_keeps_alignment() {
        let (mut cpu, mut ram) = with_stream(CpuModel::M68000, &[]);
        cpu.regs.isp = 0x2000;
        cpu.regs.a[0] = 0x3000;
        cpu.ea_operand(&mut ram, AddrMode::AddrIndPostInc(7), Size::Byte).unwrap();
        cpu.ea_operand(&mut ram, AddrMode::AddrIndPostInc(0), Size::Byte).unwrap();
        assert_eq!(cpu.regs.isp, 0x2002);
        assert_eq!(cpu.regs.a[0], 0x3001);
    }

    #[test]
    fn brief_index_scale_needs_a_68020() {
        // d8(A0,D1.W*4) with d8 = 2.
        let ext = 0x1402;
        for (model, expected) in [(CpuModel::M68000, 0x2000 + 2 + 3), (CpuModel::M68020, 0x2000 + 2 + 12)] {
            let (mut cpu, mut ram) = with_stream(model, &[ext]);
            cpu.regs.a[0] = 0x2000;
            cpu.regs.d[1] = 3;
            let operand = cpu.ea_operand(&mut ram, AddrMode::AddrIndIndex(0), Size::Word).unwrap();
            assert_eq!(operand.address(), Some(expected));
        }
    }

    #[test]
    fn full_format_memory_indirect_post_indexed() {
        // ([bd.W,A0],D1.L,od.W): BS=0 IS=0 BD=word, I/IS=post-indexed word od.
        let ext = 0x1800 | 0x0100 | 0x0020 | 0x0006;
        let (mut cpu, mut ram) = with_stream(CpuModel::M68020, &[ext, 0x0010, 0x0004]);
        cpu.regs.a[0] = 0x2000;
        cpu.regs.d[1] = 0x100;
        ram.0[0x2010..0x2014].copy_from_slice(&0x0000_4000u32.to_be_bytes());
        let operand = cpu.ea_operand(&mut ram, AddrMode::AddrIndIndex(0), Size::Long).unwrap();
        assert_eq!(operand.address(), Some(0x4000 + 0x100 + 4));
        assert_eq!(cpu.regs.pc, 0x1006);
    }

    #[test]
    fn pc_relative_operands_use_program_space() {
        let (mut cpu, mut ram) = with_stream(CpuModel::M68000, &[0x0010]);
        let operand = cpu.ea_operand(&mut ram, AddrMode::PcDisp, Size::Word).unwrap();
        assert_eq!(
            operand,
            Operand::Memory {
                address: 0x1010,
                fc: FunctionCode::SupervisorProgram
            }
        );
    }
}
