//! Addressing mode definitions for the 68000 family.
//!
//! The twelve basic modes are shared by the whole family. On the 68020 and
//! later, the two indexed modes also accept the full-format extension word
//! (scaled index, suppressed base or index, memory indirection); that is
//! resolved when the extension word is read, not here.

/// Addressing mode for 680x0 instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// Data register direct: Dn
    DataReg(u8),
    /// Address register direct: An
    AddrReg(u8),
    /// Address register indirect: (An)
    AddrInd(u8),
    /// Address register indirect with postincrement: (An)+
    AddrIndPostInc(u8),
    /// Address register indirect with predecrement: -(An)
    AddrIndPreDec(u8),
    /// Address register indirect with displacement: d16(An)
    AddrIndDisp(u8),
    /// Address register indirect with index: d8(An,Xn)
    AddrIndIndex(u8),
    /// Absolute short: (xxx).W
    AbsShort,
    /// Absolute long: (xxx).L
    AbsLong,
    /// Program counter with displacement: d16(PC)
    PcDisp,
    /// Program counter with index: d8(PC,Xn)
    PcIndex,
    /// Immediate: #<data>
    Immediate,
}

impl AddrMode {
    /// Decode addressing mode from mode/register fields.
    #[must_use]
    pub fn decode(mode: u8, reg: u8) -> Option<Self> {
        match mode & 0x07 {
            0 => Some(Self::DataReg(reg & 0x07)),
            1 => Some(Self::AddrReg(reg & 0x07)),
            2 => Some(Self::AddrInd(reg & 0x07)),
            3 => Some(Self::AddrIndPostInc(reg & 0x07)),
            4 => Some(Self::AddrIndPreDec(reg & 0x07)),
            5 => Some(Self::AddrIndDisp(reg & 0x07)),
            6 => Some(Self::AddrIndIndex(reg & 0x07)),
            _ => match reg & 0x07 {
                0 => Some(Self::AbsShort),
                1 => Some(Self::AbsLong),
                2 => Some(Self::PcDisp),
                3 => Some(Self::PcIndex),
                4 => Some(Self::Immediate),
                _ => None,
            },
        }
    }

    /// Decode the low six bits of an opcode (mode in 5-3, register in 2-0).
    #[must_use]
    pub fn from_ea_field(opcode: u16) -> Option<Self> {
        Self::decode(((opcode >> 3) & 7) as u8, (opcode & 7) as u8)
    }

    /// Decode the MOVE destination field (register in 11-9, mode in 8-6).
    #[must_use]
    pub fn from_move_dest(opcode: u16) -> Option<Self> {
        Self::decode(((opcode >> 6) & 7) as u8, ((opcode >> 9) & 7) as u8)
    }

    /// Register direct (Dn or An).
    #[must_use]
    pub fn is_register(&self) -> bool {
        matches!(self, Self::DataReg(_) | Self::AddrReg(_))
    }

    /// Data addressing: everything except An.
    #[must_use]
    pub fn is_data(&self) -> bool {
        !matches!(self, Self::AddrReg(_))
    }

    /// Memory addressing: everything except Dn and An.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        !self.is_register()
    }

    /// Control addressing: memory modes without implicit size.
    #[must_use]
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Self::AddrInd(_)
                | Self::AddrIndDisp(_)
                | Self::AddrIndIndex(_)
                | Self::AbsShort
                | Self::AbsLong
                | Self::PcDisp
                | Self::PcIndex
        )
    }

    /// Alterable: neither PC-relative nor immediate.
    #[must_use]
    pub fn is_alterable(&self) -> bool {
        !matches!(self, Self::PcDisp | Self::PcIndex | Self::Immediate)
    }

    /// Check if this mode is a data alterable destination.
    #[must_use]
    pub fn is_data_alterable(&self) -> bool {
        self.is_data() && self.is_alterable()
    }

    /// Check if this mode is memory alterable.
    #[must_use]
    pub fn is_memory_alterable(&self) -> bool {
        self.is_memory() && self.is_alterable()
    }

    /// Control alterable: destination of MOVEM register-to-memory, bit fields.
    #[must_use]
    pub fn is_control_alterable(&self) -> bool {
        self.is_control() && self.is_alterable()
    }
}

/// Addressing category an instruction accepts for its EA operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EaClass {
    All,
    Data,
    Memory,
    Control,
    Alterable,
    DataAlterable,
    MemoryAlterable,
    ControlAlterable,
}

impl EaClass {
    /// Whether `mode` belongs to this category.
    #[must_use]
    pub fn accepts(self, mode: AddrMode) -> bool {
        match self {
            Self::All => true,
            Self::Data => mode.is_data(),
            Self::Memory => mode.is_memory(),
            Self::Control => mode.is_control(),
            Self::Alterable => mode.is_alterable(),
            Self::DataAlterable => mode.is_data_alterable(),
            Self::MemoryAlterable => mode.is_memory_alterable(),
            Self::ControlAlterable => mode.is_control_alterable(),
        }
    }

    /// Whether the low six bits of `opcode` name a mode in this category.
    #[must_use]
    pub fn accepts_field(self, opcode: u16) -> bool {
        AddrMode::from_ea_field(opcode).is_some_and(|mode| self.accepts(mode))
    }
}
