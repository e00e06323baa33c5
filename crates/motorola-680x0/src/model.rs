//! CPU model and capability definitions for the Motorola 68k family.
//!
//! Every behavioural difference between family members is data: the
//! dispatch loop, memory layer and exception controller consult the
//! [`CpuCapabilities`] of the selected [`CpuModel`] instead of branching on
//! the model itself.

use serde::{Deserialize, Serialize};

/// Selected Motorola 68k CPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuModel {
    /// Motorola MC68000.
    M68000,
    /// MC68008, 48-pin DIP (20-bit address bus).
    M68008,
    /// MC68008, 52-pin PLCC (22-bit address bus).
    M68008Plcc,
    /// Motorola MC68010.
    M68010,
    /// MC68EC020: 68020 without the upper address byte.
    M68EC020,
    /// Motorola MC68020.
    M68020,
    /// MC68020 paired with a 68881/68882 coprocessor.
    M68020Fpu,
    /// MC68020 paired with a 68851 PMMU.
    M68020Pmmu,
    /// MC68020 behind Apple's fixed-mapping HMMU.
    M68020Hmmu,
    /// MC68EC030: no paged MMU.
    M68EC030,
    /// Motorola MC68030.
    M68030,
    /// MC68EC040: no MMU, no FPU.
    M68EC040,
    /// MC68LC040: MMU, no FPU.
    M68LC040,
    /// Motorola MC68040.
    M68040,
    /// Philips SCC68070.
    Scc68070,
    /// Freescale CPU32 core (683xx).
    Cpu32,
    /// ColdFire ISA A core.
    ColdFire,
}

/// Instruction-set level; selects the jump table and cycle table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsaLevel {
    M68000,
    M68010,
    M68020,
    M68030,
    M68040,
    Cpu32,
    ColdFire,
}

impl IsaLevel {
    /// All levels, in table order.
    pub const ALL: [IsaLevel; 7] = [
        IsaLevel::M68000,
        IsaLevel::M68010,
        IsaLevel::M68020,
        IsaLevel::M68030,
        IsaLevel::M68040,
        IsaLevel::Cpu32,
        IsaLevel::ColdFire,
    ];

    /// 68010 additions (MOVEC, MOVES, RTD, VBR) are present.
    #[must_use]
    pub const fn has_010(self) -> bool {
        !matches!(self, IsaLevel::M68000)
    }

    /// 68020 integer additions (long branches, MULL/DIVL, scaled index...).
    #[must_use]
    pub const fn has_020(self) -> bool {
        !matches!(self, IsaLevel::M68000 | IsaLevel::M68010)
    }

    /// Bit-field instructions. CPU32 drops them.
    #[must_use]
    pub const fn has_bitfields(self) -> bool {
        matches!(
            self,
            IsaLevel::M68020 | IsaLevel::M68030 | IsaLevel::M68040 | IsaLevel::ColdFire
        )
    }

    /// Full-format index extension words (memory indirect, suppressed
    /// base/index). CPU32 only decodes the brief format.
    #[must_use]
    pub const fn has_full_extension(self) -> bool {
        self.has_bitfields()
    }

    /// Index into per-level tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Memory management hardware fitted to the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmuKind {
    /// No translation at all.
    None,
    /// External 68851 on a 68020.
    Pmmu68851,
    /// On-chip 68030 PMMU.
    Pmmu030,
    /// On-chip 68040 MMU.
    Mmu040,
    /// Apple HMMU fixed translation.
    Hmmu,
}

/// Shape of the exception stack frames the CPU builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStyle {
    /// 3-word short frame, 7-word group 0 frame.
    M68000,
    /// Format $0 / $8.
    M68010,
    /// Format $0 / $1 / $2 / $A / $B.
    M68020,
    /// Format $0 / $2 / $C.
    Cpu32,
    /// Format $0 / $2 / $7.
    M68040,
    /// Two-longword ColdFire frame.
    ColdFire,
}

/// Capability set for a specific CPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCapabilities {
    /// Instruction-set level.
    pub isa: IsaLevel,
    /// Width of the external address bus.
    pub address_bits: u8,
    /// Width of the external data bus.
    pub data_bits: u8,
    /// Misaligned word/long data accesses are split instead of faulting.
    pub misaligned_data: bool,
    /// `MOVEC` instruction family is available.
    pub movec: bool,
    /// Vector Base Register (`VBR`) is present.
    pub vbr: bool,
    /// Cache control register (`CACR`) is present.
    pub cacr: bool,
    /// Separate master stack pointer selected by SR.M.
    pub msp: bool,
    /// On-chip instruction cache (128 words).
    pub icache: bool,
    /// Extra cycles charged when an opcode fetch misses the cache.
    pub icache_miss_penalty: u32,
    /// Memory management hardware.
    pub mmu: MmuKind,
    /// Number of address translation cache entries.
    pub atc_entries: usize,
    /// Floating-point unit present.
    pub fpu: bool,
    /// Exception frame layout.
    pub frames: FrameStyle,
    /// Bits of SR that exist on this part.
    pub sr_mask: u16,
}

impl CpuCapabilities {
    /// Mask applied to every logical address.
    #[must_use]
    pub const fn address_mask(&self) -> u32 {
        if self.address_bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.address_bits) - 1
        }
    }
}

const BASE_68000: CpuCapabilities = CpuCapabilities {
    isa: IsaLevel::M68000,
    address_bits: 24,
    data_bits: 16,
    misaligned_data: false,
    movec: false,
    vbr: false,
    cacr: false,
    msp: false,
    icache: false,
    icache_miss_penalty: 0,
    mmu: MmuKind::None,
    atc_entries: 0,
    fpu: false,
    frames: FrameStyle::M68000,
    sr_mask: 0xA71F,
};

const BASE_68020: CpuCapabilities = CpuCapabilities {
    isa: IsaLevel::M68020,
    address_bits: 32,
    data_bits: 32,
    misaligned_data: true,
    movec: true,
    vbr: true,
    cacr: true,
    msp: true,
    icache: true,
    icache_miss_penalty: 2,
    mmu: MmuKind::None,
    atc_entries: 0,
    fpu: false,
    frames: FrameStyle::M68020,
    sr_mask: 0xF71F,
};

const BASE_68040: CpuCapabilities = CpuCapabilities {
    isa: IsaLevel::M68040,
    mmu: MmuKind::Mmu040,
    atc_entries: 64,
    fpu: true,
    frames: FrameStyle::M68040,
    ..BASE_68020
};

impl CpuModel {
    /// Every model the core can be configured as.
    pub const ALL: [CpuModel; 17] = [
        CpuModel::M68000,
        CpuModel::M68008,
        CpuModel::M68008Plcc,
        CpuModel::M68010,
        CpuModel::M68EC020,
        CpuModel::M68020,
        CpuModel::M68020Fpu,
        CpuModel::M68020Pmmu,
        CpuModel::M68020Hmmu,
        CpuModel::M68EC030,
        CpuModel::M68030,
        CpuModel::M68EC040,
        CpuModel::M68LC040,
        CpuModel::M68040,
        CpuModel::Scc68070,
        CpuModel::Cpu32,
        CpuModel::ColdFire,
    ];

    /// Static capability set for this CPU model.
    #[must_use]
    pub const fn capabilities(self) -> CpuCapabilities {
        match self {
            Self::M68000 => BASE_68000,
            Self::M68008 => CpuCapabilities {
                address_bits: 20,
                data_bits: 8,
                ..BASE_68000
            },
            Self::M68008Plcc => CpuCapabilities {
                address_bits: 22,
                data_bits: 8,
                ..BASE_68000
            },
            Self::M68010 => CpuCapabilities {
                isa: IsaLevel::M68010,
                movec: true,
                vbr: true,
                frames: FrameStyle::M68010,
                ..BASE_68000
            },
            Self::M68EC020 => CpuCapabilities {
                address_bits: 24,
                ..BASE_68020
            },
            Self::M68020 => BASE_68020,
            Self::M68020Fpu => CpuCapabilities {
                fpu: true,
                ..BASE_68020
            },
            Self::M68020Pmmu => CpuCapabilities {
                fpu: true,
                mmu: MmuKind::Pmmu68851,
                atc_entries: 64,
                ..BASE_68020
            },
            Self::M68020Hmmu => CpuCapabilities {
                fpu: true,
                mmu: MmuKind::Hmmu,
                ..BASE_68020
            },
            Self::M68EC030 => CpuCapabilities {
                isa: IsaLevel::M68030,
                ..BASE_68020
            },
            Self::M68030 => CpuCapabilities {
                isa: IsaLevel::M68030,
                fpu: true,
                mmu: MmuKind::Pmmu030,
                atc_entries: 22,
                ..BASE_68020
            },
            Self::M68EC040 => CpuCapabilities {
                mmu: MmuKind::None,
                atc_entries: 0,
                fpu: false,
                ..BASE_68040
            },
            Self::M68LC040 => CpuCapabilities {
                fpu: false,
                ..BASE_68040
            },
            Self::M68040 => BASE_68040,
            Self::Scc68070 => CpuCapabilities {
                address_bits: 32,
                frames: FrameStyle::M68010,
                ..BASE_68000
            },
            Self::Cpu32 => CpuCapabilities {
                isa: IsaLevel::Cpu32,
                address_bits: 32,
                data_bits: 16,
                misaligned_data: false,
                msp: false,
                icache: false,
                icache_miss_penalty: 0,
                cacr: false,
                frames: FrameStyle::Cpu32,
                sr_mask: 0xE71F,
                ..BASE_68020
            },
            Self::ColdFire => CpuCapabilities {
                isa: IsaLevel::ColdFire,
                msp: false,
                mmu: MmuKind::None,
                atc_entries: 0,
                fpu: false,
                frames: FrameStyle::ColdFire,
                sr_mask: 0xA71F,
                ..BASE_68040
            },
        }
    }

    /// Short lowercase name, as used in configuration files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::M68000 => "m68000",
            Self::M68008 => "m68008",
            Self::M68008Plcc => "m68008plcc",
            Self::M68010 => "m68010",
            Self::M68EC020 => "m68ec020",
            Self::M68020 => "m68020",
            Self::M68020Fpu => "m68020fpu",
            Self::M68020Pmmu => "m68020pmmu",
            Self::M68020Hmmu => "m68020hmmu",
            Self::M68EC030 => "m68ec030",
            Self::M68030 => "m68030",
            Self::M68EC040 => "m68ec040",
            Self::M68LC040 => "m68lc040",
            Self::M68040 => "m68040",
            Self::Scc68070 => "scc68070",
            Self::Cpu32 => "cpu32",
            Self::ColdFire => "coldfire",
        }
    }
}
