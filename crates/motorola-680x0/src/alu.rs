//! Operand sizes and the integer ALU.
//!
//! The ALU functions are pure: they take operands already masked to the
//! operation size and return the result plus carry/overflow. Flag
//! placement into SR is done by the instruction handlers, which know which
//! flags an instruction is documented to touch.

/// Operation size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Byte,
    Word,
    Long,
}

impl Size {
    /// Decode the common 2-bit size field (00=byte, 01=word, 10=long).
    #[must_use]
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits & 3 {
            0 => Some(Self::Byte),
            1 => Some(Self::Word),
            2 => Some(Self::Long),
            _ => None,
        }
    }

    /// Decode the MOVE size field (01=byte, 11=word, 10=long).
    #[must_use]
    pub fn from_move_bits(bits: u16) -> Option<Self> {
        match bits & 3 {
            1 => Some(Self::Byte),
            3 => Some(Self::Word),
            2 => Some(Self::Long),
            _ => None,
        }
    }

    /// Number of bytes.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Long => 4,
        }
    }

    /// Number of bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.bytes() * 8
    }

    /// Value mask.
    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Word => 0xFFFF,
            Self::Long => 0xFFFF_FFFF,
        }
    }

    /// Sign bit.
    #[must_use]
    pub const fn msb(self) -> u32 {
        match self {
            Self::Byte => 0x80,
            Self::Word => 0x8000,
            Self::Long => 0x8000_0000,
        }
    }

    /// Sign-extend a value of this size to 32 bits.
    #[must_use]
    pub const fn sign_extend(self, value: u32) -> u32 {
        match self {
            Self::Byte => value as u8 as i8 as i32 as u32,
            Self::Word => value as u16 as i16 as i32 as u32,
            Self::Long => value,
        }
    }

    /// Assembler suffix.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Byte => ".b",
            Self::Word => ".w",
            Self::Long => ".l",
        }
    }
}

/// Result of an arithmetic ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u32,
    pub carry: bool,
    pub overflow: bool,
}

/// `dst + src + extend` at the given size.
#[must_use]
pub fn add(dst: u32, src: u32, extend: bool, size: Size) -> AluResult {
    let mask = size.mask();
    let msb = size.msb();
    let (dst, src) = (dst & mask, src & mask);
    let wide = u64::from(dst) + u64::from(src) + u64::from(extend);
    let value = (wide as u32) & mask;
    AluResult {
        value,
        carry: wide > u64::from(mask),
        overflow: (!(dst ^ src) & (dst ^ value) & msb) != 0,
    }
}

/// `dst - src - extend` at the given size.
#[must_use]
pub fn sub(dst: u32, src: u32, extend: bool, size: Size) -> AluResult {
    let mask = size.mask();
    let msb = size.msb();
    let (dst, src) = (dst & mask, src & mask);
    let value = dst.wrapping_sub(src).wrapping_sub(u32::from(extend)) & mask;
    AluResult {
        value,
        carry: u64::from(src) + u64::from(extend) > u64::from(dst),
        overflow: ((dst ^ src) & (dst ^ value) & msb) != 0,
    }
}

/// Count of ones, used by MULU timing.
#[must_use]
pub fn ones(value: u16) -> u32 {
    value.count_ones()
}

/// Number of 01/10 transitions in `value << 1`, used by MULS timing.
#[must_use]
pub fn transitions(value: u16) -> u32 {
    let shifted = u32::from(value) << 1;
    ((shifted ^ (shifted >> 1)) & 0xFFFF).count_ones()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sets_carry_and_overflow_at_each_width() {
        let r = add(0x7F, 0x01, false, Size::Byte);
        assert_eq!(r, AluResult { value: 0x80, carry: false, overflow: true });
        let r = add(0xFFFF, 0x0001, false, Size::Word);
        assert_eq!(r, AluResult { value: 0, carry: true, overflow: false });
        let r = add(0x8000_0000, 0x8000_0000, false, Size::Long);
        assert_eq!(r, AluResult { value: 0, carry: true, overflow: true });
        let r = add(0xFE, 0x01, true, Size::Byte);
        assert_eq!(r.value, 0x00);
        assert!(r.carry);
    }

    #[test]
    fn sub_borrows_and_overflows() {
        let r = sub(0x00, 0x01, false, Size::Byte);
        assert_eq!(r, AluResult { value: 0xFF, carry: true, overflow: false });
        let r = sub(0x8000, 0x0001, false, Size::Word);
        assert_eq!(r, AluResult { value: 0x7FFF, carry: false, overflow: true });
        let r = sub(0, 0, true, Size::Long);
        assert_eq!(r.value, 0xFFFF_FFFF);
        assert!(r.carry);
    }

    #[test]
    fn sign_extension() {
        assert_eq!(Size::Byte.sign_extend(0x80), 0xFFFF_FF80);
        assert_eq!(Size::Word.sign_extend(0x7FFF), 0x7FFF);
    }

    #[test]
    fn muls_transition_count() {
        assert_eq!(transitions(0x0000), 0);
        assert_eq!(transitions(0xFFFF), 1);
        assert_eq!(transitions(0x5555), 16);
    }
}
