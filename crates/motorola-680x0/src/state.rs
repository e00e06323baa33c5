//! Save-state fields of the CPU.
//!
//! Architectural registers, line state, the MMU register file and the
//! FPU register file are persisted by name. FP data registers are saved
//! as the bits of their double. The ATC and the instruction cache are not: they are
//! flushed after a restore and refill from memory.

use emu_core::{FieldWidth, StateError, Stateful, Ticks};

use crate::cpu::{Cpu680x0, RunMode, State};
use crate::hmmu::HmmuMode;
use crate::model::MmuKind;

const REGISTER_FIELDS: &[(&str, FieldWidth)] = &[
    ("d0", FieldWidth::U32),
    ("d1", FieldWidth::U32),
    ("d2", FieldWidth::U32),
    ("d3", FieldWidth::U32),
    ("d4", FieldWidth::U32),
    ("d5", FieldWidth::U32),
    ("d6", FieldWidth::U32),
    ("d7", FieldWidth::U32),
    ("a0", FieldWidth::U32),
    ("a1", FieldWidth::U32),
    ("a2", FieldWidth::U32),
    ("a3", FieldWidth::U32),
    ("a4", FieldWidth::U32),
    ("a5", FieldWidth::U32),
    ("a6", FieldWidth::U32),
    ("usp", FieldWidth::U32),
    ("isp", FieldWidth::U32),
    ("msp", FieldWidth::U32),
    ("pc", FieldWidth::U32),
    ("ppc", FieldWidth::U32),
    ("sr", FieldWidth::U16),
    ("vbr", FieldWidth::U32),
    ("sfc", FieldWidth::U8),
    ("dfc", FieldWidth::U8),
    ("cacr", FieldWidth::U32),
    ("caar", FieldWidth::U32),
    ("ir", FieldWidth::U16),
    ("run_state", FieldWidth::U8),
    ("run_mode", FieldWidth::Bool),
    ("virq_state", FieldWidth::U8),
    ("int_level", FieldWidth::U8),
    ("nmi_pending", FieldWidth::Bool),
    ("reset_pending", FieldWidth::Bool),
    ("cycles", FieldWidth::U64),
];

const PMMU_FIELDS: &[(&str, FieldWidth)] = &[
    ("mmu.tc", FieldWidth::U32),
    ("mmu.crp_limit", FieldWidth::U32),
    ("mmu.crp_aptr", FieldWidth::U32),
    ("mmu.srp_limit", FieldWidth::U32),
    ("mmu.srp_aptr", FieldWidth::U32),
    ("mmu.tt0", FieldWidth::U32),
    ("mmu.tt1", FieldWidth::U32),
    ("mmu.mmusr", FieldWidth::U16),
];

const MMU040_FIELDS: &[(&str, FieldWidth)] = &[
    ("mmu.tc", FieldWidth::U32),
    ("mmu.urp", FieldWidth::U32),
    ("mmu.srp_aptr", FieldWidth::U32),
    ("mmu.itt0", FieldWidth::U32),
    ("mmu.itt1", FieldWidth::U32),
    ("mmu.dtt0", FieldWidth::U32),
    ("mmu.dtt1", FieldWidth::U32),
    ("mmu.mmusr_040", FieldWidth::U32),
];

const HMMU_FIELDS: &[(&str, FieldWidth)] = &[("mmu.hmmu", FieldWidth::U8)];

const FPU_FIELDS: &[(&str, FieldWidth)] = &[
    ("fp0", FieldWidth::U64),
    ("fp1", FieldWidth::U64),
    ("fp2", FieldWidth::U64),
    ("fp3", FieldWidth::U64),
    ("fp4", FieldWidth::U64),
    ("fp5", FieldWidth::U64),
    ("fp6", FieldWidth::U64),
    ("fp7", FieldWidth::U64),
    ("fpcr", FieldWidth::U32),
    ("fpsr", FieldWidth::U32),
    ("fpiar", FieldWidth::U32),
    ("fpu_null", FieldWidth::Bool),
];

impl Cpu680x0 {
    /// MMU fields for the fitted MMU.
    fn mmu_fields(&self) -> &'static [(&'static str, FieldWidth)] {
        match self.caps.mmu {
            MmuKind::None => &[],
            MmuKind::Pmmu68851 | MmuKind::Pmmu030 => PMMU_FIELDS,
            MmuKind::Mmu040 => MMU040_FIELDS,
            MmuKind::Hmmu => HMMU_FIELDS,
        }
    }

    fn fpu_fields(&self) -> &'static [(&'static str, FieldWidth)] {
        if self.caps.fpu { FPU_FIELDS } else { &[] }
    }

    fn fields(&self) -> impl Iterator<Item = &'static (&'static str, FieldWidth)> {
        REGISTER_FIELDS.iter().chain(self.mmu_fields()).chain(self.fpu_fields())
    }

    fn has_field(&self, name: &str) -> bool {
        self.fields().any(|(n, _)| *n == name)
    }
}

fn register_index(name: &str, prefix: char, count: usize) -> Option<usize> {
    let digit = name.strip_prefix(prefix)?;
    let index: usize = digit.parse().ok()?;
    (digit.len() == 1 && index < count).then_some(index)
}

fn fp_index(name: &str) -> Option<usize> {
    register_index(name.strip_prefix('f')?, 'p', 8)
}

impl Stateful for Cpu680x0 {
    fn state_fields(&self) -> Vec<(String, FieldWidth)> {
        self.fields().map(|&(name, width)| (name.to_string(), width)).collect()
    }

    fn save_field(&self, name: &str) -> Option<u64> {
        if !self.has_field(name) {
            return None;
        }
        if let Some(n) = register_index(name, 'd', 8) {
            return Some(u64::from(self.regs.d[n]));
        }
        if let Some(n) = register_index(name, 'a', 7) {
            return Some(u64::from(self.regs.a[n]));
        }
        if let Some(n) = fp_index(name) {
            return Some(self.fpu.fp[n].to_bits());
        }
        let value = match name {
            "usp" => u64::from(self.regs.usp),
            "isp" => u64::from(self.regs.isp),
            "msp" => u64::from(self.regs.msp),
            "pc" => u64::from(self.regs.pc),
            "ppc" => u64::from(self.ppc),
            "sr" => u64::from(self.regs.sr),
            "vbr" => u64::from(self.regs.vbr),
            "sfc" => u64::from(self.regs.sfc),
            "dfc" => u64::from(self.regs.dfc),
            "cacr" => u64::from(self.regs.cacr),
            "caar" => u64::from(self.regs.caar),
            "ir" => u64::from(self.ir),
            "run_state" => u64::from(self.state.bits()),
            "run_mode" => u64::from(self.run_mode == RunMode::Group0),
            "virq_state" => u64::from(self.virq_state),
            "int_level" => u64::from(self.int_level),
            "nmi_pending" => u64::from(self.nmi_pending),
            "reset_pending" => u64::from(self.reset_pending),
            "cycles" => self.total_cycles.get(),
            "mmu.tc" => u64::from(self.mmu.tc),
            "mmu.crp_limit" => u64::from(self.mmu.crp_limit),
            "mmu.crp_aptr" => u64::from(self.mmu.crp_aptr),
            "mmu.srp_limit" => u64::from(self.mmu.srp_limit),
            "mmu.srp_aptr" => u64::from(self.mmu.srp_aptr),
            "mmu.urp" => u64::from(self.mmu.urp),
            "mmu.tt0" => u64::from(self.mmu.tt0),
            "mmu.tt1" => u64::from(self.mmu.tt1),
            "mmu.itt0" => u64::from(self.mmu.itt0),
            "mmu.itt1" => u64::from(self.mmu.itt1),
            "mmu.dtt0" => u64::from(self.mmu.dtt0),
            "mmu.dtt1" => u64::from(self.mmu.dtt1),
            "mmu.mmusr" => u64::from(self.mmu.mmusr),
            "mmu.mmusr_040" => u64::from(self.mmu.mmusr_040),
            "mmu.hmmu" => u64::from(self.mmu.hmmu.bits()),
            "fpcr" => u64::from(self.fpu.fpcr),
            "fpsr" => u64::from(self.fpu.fpsr),
            "fpiar" => u64::from(self.fpu.fpiar),
            "fpu_null" => u64::from(self.fpu.null),
            _ => return None,
        };
        Some(value)
    }

    fn load_field(&mut self, name: &str, value: u64) -> Result<(), StateError> {
        if !self.has_field(name) {
            return Err(StateError::UnknownField(name.to_string()));
        }
        // The registry has already range-checked the value against the
        // field width.
        let long = value as u32;
        if let Some(n) = register_index(name, 'd', 8) {
            self.regs.d[n] = long;
            return Ok(());
        }
        if let Some(n) = register_index(name, 'a', 7) {
            self.regs.a[n] = long;
            return Ok(());
        }
        if let Some(n) = fp_index(name) {
            self.fpu.fp[n] = f64::from_bits(value);
            return Ok(());
        }
        match name {
            "usp" => self.regs.usp = long,
            "isp" => self.regs.isp = long,
            "msp" => self.regs.msp = long,
            "pc" => self.regs.pc = long,
            "ppc" => self.ppc = long,
            "sr" => self.regs.sr = value as u16 & self.caps.sr_mask,
            "vbr" => self.regs.vbr = long,
            "sfc" => self.regs.sfc = value as u8 & 7,
            "dfc" => self.regs.dfc = value as u8 & 7,
            "cacr" => self.regs.cacr = long,
            "caar" => self.regs.caar = long,
            "ir" => self.ir = value as u16,
            "run_state" => self.state = State::from_bits(value as u8),
            "run_mode" => self.run_mode = if value != 0 { RunMode::Group0 } else { RunMode::Normal },
            "virq_state" => self.virq_state = value as u8 & 0xFE,
            "int_level" => self.int_level = value as u8 & 7,
            "nmi_pending" => self.nmi_pending = value != 0,
            "reset_pending" => self.reset_pending = value != 0,
            "cycles" => self.total_cycles = Ticks::new(value),
            "mmu.tc" => self.mmu.tc = long,
            "mmu.crp_limit" => self.mmu.crp_limit = long,
            "mmu.crp_aptr" => self.mmu.crp_aptr = long,
            "mmu.srp_limit" => self.mmu.srp_limit = long,
            "mmu.srp_aptr" => self.mmu.srp_aptr = long,
            "mmu.urp" => self.mmu.urp = long,
            "mmu.tt0" => self.mmu.tt0 = long,
            "mmu.tt1" => self.mmu.tt1 = long,
            "mmu.itt0" => self.mmu.itt0 = long,
            "mmu.itt1" => self.mmu.itt1 = long,
            "mmu.dtt0" => self.mmu.dtt0 = long,
            "mmu.dtt1" => self.mmu.dtt1 = long,
            "mmu.mmusr" => self.mmu.mmusr = value as u16,
            "mmu.mmusr_040" => self.mmu.mmusr_040 = long,
            "mmu.hmmu" => self.mmu.hmmu = HmmuMode::from_bits(value as u8),
            "fpcr" => self.fpu.set_fpcr(long),
            "fpsr" => self.fpu.set_fpsr(long),
            "fpiar" => self.fpu.fpiar = long,
            "fpu_null" => self.fpu.null = value != 0,
            _ => return Err(StateError::UnknownField(name.to_string())),
        }
        Ok(())
    }

    fn post_load(&mut self) {
        self.bus_error_pending = None;
        self.mmu.flush_all();
        self.icache.invalidate_all();
        log::debug!(
            "{}: state restored, pc={:#010x} sr={:#06x}",
            self.model.name(),
            self.regs.pc,
            self.regs.sr
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CpuModel;

    #[test]
    fn field_set_follows_the_mmu() {
        let names = |model| {
            Cpu680x0::new(model)
                .state_fields()
                .into_iter()
                .map(|(name, _)| name)
                .collect::<Vec<_>>()
        };
        let plain = names(CpuModel::M68000);
        assert!(plain.contains(&"d7".to_string()));
        assert!(!plain.iter().any(|n| n.starts_with("mmu.")));

        assert!(names(CpuModel::M68030).contains(&"mmu.crp_aptr".to_string()));
        assert!(names(CpuModel::M68040).contains(&"mmu.urp".to_string()));
        assert!(!names(CpuModel::M68040).contains(&"mmu.tt0".to_string()));
        assert_eq!(
            names(CpuModel::M68020Hmmu).iter().filter(|n| n.starts_with("mmu.")).count(),
            1
        );
    }

    #[test]
    fn fields_load_and_save_symmetrically() {
        let mut cpu = Cpu680x0::new(CpuModel::M68030);
        cpu.load_field("d3", 0x1234_5678).unwrap();
        cpu.load_field("a6", 0x00C0_FFEE).unwrap();
        cpu.load_field("mmu.tc", 0x80F0_8880).unwrap();
        cpu.load_field("run_state", 1).unwrap();
        assert_eq!(cpu.regs.d[3], 0x1234_5678);
        assert_eq!(cpu.save_field("a6"), Some(0x00C0_FFEE));
        assert_eq!(cpu.save_field("mmu.tc"), Some(0x80F0_8880));
        assert!(cpu.is_stopped());
    }

    #[test]
    fn unknown_and_foreign_fields_are_rejected() {
        let mut cpu = Cpu680x0::new(CpuModel::M68000);
        assert_eq!(cpu.save_field("d8"), None);
        assert_eq!(cpu.save_field("a7"), None);
        assert_eq!(cpu.save_field("mmu.tc"), None);
        assert!(matches!(cpu.load_field("mmu.tc", 0), Err(StateError::UnknownField(_))));
    }

    #[test]
    fn fpu_fields_follow_the_capability() {
        let has_fpcr = |cpu: &Cpu680x0| cpu.state_fields().iter().any(|(name, _)| name == "fpcr");
        assert!(!has_fpcr(&Cpu680x0::new(CpuModel::M68020)));
        assert!(!has_fpcr(&Cpu680x0::new(CpuModel::M68LC040)));

        let mut cpu = Cpu680x0::new(CpuModel::M68020Fpu);
        assert!(has_fpcr(&cpu));
        cpu.load_field("fp5", (-1.25f64).to_bits()).unwrap();
        cpu.load_field("fpcr", 0xFFFF_FFFF).unwrap();
        assert_eq!(cpu.fpu().fp[5], -1.25);
        assert_eq!(cpu.save_field("fpcr"), Some(0xFFF0));
        assert_eq!(cpu.save_field("fp5"), Some((-1.25f64).to_bits()));
        assert_eq!(cpu.save_field("fp8"), None);
    }

    #[test]
    fn sr_is_masked_on_load() {
        let mut cpu = Cpu680x0::new(CpuModel::M68000);
        cpu.load_field("sr", 0xFFFF).unwrap();
        assert_eq!(cpu.regs.sr, 0xA71F);
    }
}
