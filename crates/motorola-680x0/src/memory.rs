//! CPU-side memory layer.
//!
//! Every access goes through the same checks, in order: alignment, address
//! width, MMU/HMMU translation, then the bus. Each step can end the
//! instruction with a bus or address error. Wait states the bus reports
//! are charged to the current instruction.
//!
//! The 68020 and later split misaligned data operands into byte and word
//! cycles; earlier parts (and every part, for instruction fetches) raise
//! an address error instead.

use crate::alu::Size;
use crate::bus::{FunctionCode, M68kBus};
use crate::cpu::Cpu680x0;
use crate::fault::{AccessFault, ExceptionRequest, Fault};
use crate::icache::cacr;
use crate::model::IsaLevel;

impl Cpu680x0 {
    /// Function code for data accesses in the current mode.
    #[must_use]
    pub(crate) fn data_fc(&self) -> FunctionCode {
        FunctionCode::from_flags(self.regs.is_supervisor(), false)
    }

    /// Function code for program accesses in the current mode.
    #[must_use]
    pub(crate) fn program_fc(&self) -> FunctionCode {
        FunctionCode::from_flags(self.regs.is_supervisor(), true)
    }

    // === Physical cycles ===

    /// One aligned read cycle at a logical address.
    fn bus_read<B: M68kBus>(
        &mut self,
        bus: &mut B,
        address: u32,
        size: Size,
        fc: FunctionCode,
        instruction: bool,
    ) -> Fault<u32> {
        let access = AccessFault {
            address,
            write: false,
            fc,
            size,
            instruction,
        };
        let physical = self.translate(bus, address, fc, false, access)?;
        let result = match size {
            Size::Byte => bus.read_byte(physical, fc),
            Size::Word if instruction => bus.fetch_word(physical, fc),
            Size::Word => bus.read_word(physical, fc),
            Size::Long => bus.read_long(physical, fc),
        };
        self.cycles += u32::from(result.wait_cycles);
        if result.bus_error {
            return Err(ExceptionRequest::bus_error(access));
        }
        Ok(result.data & size.mask())
    }

    /// One aligned write cycle at a logical address.
    fn bus_write<B: M68kBus>(&mut self, bus: &mut B, address: u32, size: Size, value: u32, fc: FunctionCode) -> Fault<()> {
        let access = AccessFault {
            address,
            write: true,
            fc,
            size,
            instruction: false,
        };
        let physical = self.translate(bus, address, fc, true, access)?;
        let result = match size {
            Size::Byte => bus.write_byte(physical, value as u8, fc),
            Size::Word => bus.write_word(physical, value as u16, fc),
            Size::Long => bus.write_long(physical, value, fc),
        };
        self.cycles += u32::from(result.wait_cycles);
        if result.bus_error {
            return Err(ExceptionRequest::bus_error(access));
        }
        if self.caps.icache {
            let masked = address & self.caps.address_mask();
            self.icache.invalidate_address(masked);
            if size == Size::Long {
                self.icache.invalidate_address(masked.wrapping_add(2));
            }
        }
        Ok(())
    }

    /// Width mask then MMU. Translation faults surface as bus errors.
    fn translate<B: M68kBus>(
        &mut self,
        bus: &mut B,
        address: u32,
        fc: FunctionCode,
        write: bool,
        access: AccessFault,
    ) -> Fault<u32> {
        let masked = address & self.caps.address_mask();
        self.mmu
            .translate(bus, masked, fc, write)
            .map_err(|_| ExceptionRequest::bus_error(access))
    }

    // === Operand accesses ===

    /// Read an operand in an explicit address space.
    pub(crate) fn read_fc<B: M68kBus>(&mut self, bus: &mut B, address: u32, size: Size, fc: FunctionCode) -> Fault<u32> {
        if size == Size::Byte || address & 1 == 0 {
            return self.bus_read(bus, address, size, fc, false);
        }
        if !self.caps.misaligned_data {
            return Err(ExceptionRequest::address_error(AccessFault {
                address,
                write: false,
                fc,
                size,
                instruction: false,
            }));
        }
        match size {
            Size::Word => {
                let hi = self.bus_read(bus, address, Size::Byte, fc, false)?;
                let lo = self.bus_read(bus, address.wrapping_add(1), Size::Byte, fc, false)?;
                Ok((hi << 8) | lo)
            }
            _ => {
                let hi = self.bus_read(bus, address, Size::Byte, fc, false)?;
                let mid = self.bus_read(bus, address.wrapping_add(1), Size::Word, fc, false)?;
                let lo = self.bus_read(bus, address.wrapping_add(3), Size::Byte, fc, false)?;
                Ok((hi << 24) | (mid << 8) | lo)
            }
        }
    }

    /// Write an operand in an explicit address space.
    pub(crate) fn write_fc<B: M68kBus>(
        &mut self,
        bus: &mut B,
        address: u32,
        size: Size,
        value: u32,
        fc: FunctionCode,
    ) -> Fault<()> {
        if size == Size::Byte || address & 1 == 0 {
            return self.bus_write(bus, address, size, value, fc);
        }
        if !self.caps.misaligned_data {
            return Err(ExceptionRequest::address_error(AccessFault {
                address,
                write: true,
                fc,
                size,
                instruction: false,
            }));
        }
        match size {
            Size::Word => {
                self.bus_write(bus, address, Size::Byte, value >> 8, fc)?;
                self.bus_write(bus, address.wrapping_add(1), Size::Byte, value, fc)
            }
            _ => {
                self.bus_write(bus, address, Size::Byte, value >> 24, fc)?;
                self.bus_write(bus, address.wrapping_add(1), Size::Word, value >> 8, fc)?;
                self.bus_write(bus, address.wrapping_add(3), Size::Byte, value, fc)
            }
        }
    }

    /// Read an operand from data space.
    pub(crate) fn read<B: M68kBus>(&mut self, bus: &mut B, address: u32, size: Size) -> Fault<u32> {
        let fc = self.data_fc();
        self.read_fc(bus, address, size, fc)
    }

    /// Write an operand to data space.
    pub(crate) fn write<B: M68kBus>(&mut self, bus: &mut B, address: u32, size: Size, value: u32) -> Fault<()> {
        let fc = self.data_fc();
        self.write_fc(bus, address, size, value, fc)
    }

    pub(crate) fn read_byte<B: M68kBus>(&mut self, bus: &mut B, address: u32) -> Fault<u8> {
        Ok(self.read(bus, address, Size::Byte)? as u8)
    }

    pub(crate) fn read_word<B: M68kBus>(&mut self, bus: &mut B, address: u32) -> Fault<u16> {
        Ok(self.read(bus, address, Size::Word)? as u16)
    }

    pub(crate) fn read_long<B: M68kBus>(&mut self, bus: &mut B, address: u32) -> Fault<u32> {
        self.read(bus, address, Size::Long)
    }

    pub(crate) fn write_byte<B: M68kBus>(&mut self, bus: &mut B, address: u32, value: u8) -> Fault<()> {
        self.write(bus, address, Size::Byte, u32::from(value))
    }

    pub(crate) fn write_word<B: M68kBus>(&mut self, bus: &mut B, address: u32, value: u16) -> Fault<()> {
        self.write(bus, address, Size::Word, u32::from(value))
    }

    pub(crate) fn write_long<B: M68kBus>(&mut self, bus: &mut B, address: u32, value: u32) -> Fault<()> {
        self.write(bus, address, Size::Long, value)
    }

    /// Long read in an explicit space (vector fetches, reset).
    pub(crate) fn read_long_fc<B: M68kBus>(&mut self, bus: &mut B, address: u32, fc: FunctionCode) -> Fault<u32> {
        self.read_fc(bus, address, Size::Long, fc)
    }

    /// The write half of TAS, routed through the host override.
    pub(crate) fn write_tas<B: M68kBus>(&mut self, bus: &mut B, address: u32, value: u8) -> Fault<()> {
        let fc = self.data_fc();
        let access = AccessFault {
            address,
            write: true,
            fc,
            size: Size::Byte,
            instruction: false,
        };
        let physical = self.translate(bus, address, fc, true, access)?;
        let result = bus.tas_write(physical, value, fc);
        self.cycles += u32::from(result.wait_cycles);
        if result.bus_error {
            return Err(ExceptionRequest::bus_error(access));
        }
        Ok(())
    }

    // === Stack ===

    pub(crate) fn push_word<B: M68kBus>(&mut self, bus: &mut B, value: u16) -> Fault<()> {
        let sp = self.regs.push_word();
        self.write_word(bus, sp, value)
    }

    pub(crate) fn push_long<B: M68kBus>(&mut self, bus: &mut B, value: u32) -> Fault<()> {
        let sp = self.regs.push_long();
        self.write_long(bus, sp, value)
    }

    pub(crate) fn pop_word<B: M68kBus>(&mut self, bus: &mut B) -> Fault<u16> {
        let sp = self.regs.pop_word();
        self.read_word(bus, sp)
    }

    pub(crate) fn pop_long<B: M68kBus>(&mut self, bus: &mut B) -> Fault<u32> {
        let sp = self.regs.pop_long();
        self.read_long(bus, sp)
    }

    // === Instruction stream ===

    /// The instruction cache is fitted and switched on in CACR.
    #[must_use]
    pub(crate) fn icache_enabled(&self) -> bool {
        if !self.caps.icache {
            return false;
        }
        match self.caps.isa {
            IsaLevel::M68040 | IsaLevel::ColdFire => self.regs.cacr & cacr::IE_040 != 0,
            _ => self.regs.cacr & cacr::EI != 0,
        }
    }

    /// Fetch the word at PC and advance PC.
    pub(crate) fn fetch_word<B: M68kBus>(&mut self, bus: &mut B) -> Fault<u16> {
        let pc = self.regs.pc;
        let fc = self.program_fc();
        if pc & 1 != 0 {
            return Err(ExceptionRequest::address_error(AccessFault {
                address: pc,
                write: false,
                fc,
                size: Size::Word,
                instruction: true,
            }));
        }

        let word = if self.icache_enabled() {
            let address = pc & self.caps.address_mask();
            let supervisor = fc.is_supervisor();
            if let Some(word) = self.icache.lookup(address, supervisor) {
                word
            } else {
                let word = self.bus_read(bus, pc, Size::Word, fc, true)? as u16;
                self.cycles += self.caps.icache_miss_penalty;
                if self.regs.cacr & cacr::FI == 0 {
                    self.icache.fill(address, supervisor, word);
                }
                word
            }
        } else {
            self.bus_read(bus, pc, Size::Word, fc, true)? as u16
        };

        self.regs.pc = pc.wrapping_add(2);
        Ok(word)
    }

    /// Fetch a long from the instruction stream.
    pub(crate) fn fetch_long<B: M68kBus>(&mut self, bus: &mut B) -> Fault<u32> {
        let hi = self.fetch_word(bus)?;
        let lo = self.fetch_word(bus)?;
        Ok((u32::from(hi) << 16) | u32::from(lo))
    }

    /// Fetch an immediate operand of `size`. Byte immediates occupy the
    /// low half of a word.
    pub(crate) fn fetch_immediate<B: M68kBus>(&mut self, bus: &mut B, size: Size) -> Fault<u32> {
        match size {
            Size::Byte => Ok(u32::from(self.fetch_word(bus)?) & 0xFF),
            Size::Word => Ok(u32::from(self.fetch_word(bus)?)),
            Size::Long => self.fetch_long(bus),
        }
    }

    // === Cache control ===

    /// Write CACR. The clear bits act immediately and read back as zero.
    pub(crate) fn write_cacr(&mut self, value: u32) {
        let stored = match self.caps.isa {
            IsaLevel::M68020 => 0x0000_0003,
            IsaLevel::M68030 => 0x0000_3313,
            IsaLevel::M68040 | IsaLevel::ColdFire => 0x8000_8000,
            _ => 0,
        };
        if matches!(self.caps.isa, IsaLevel::M68020 | IsaLevel::M68030) {
            if value & cacr::CI != 0 {
                self.icache.invalidate_all();
                log::trace!("icache: cleared by CACR");
            }
            if value & cacr::CEI != 0 {
                self.icache.invalidate_entry(self.regs.caar);
            }
        }
        self.regs.cacr = value & stored;
    }
}
