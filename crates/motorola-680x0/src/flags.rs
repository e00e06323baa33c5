//! Motorola 680x0 status register flags.
//!
//! The status register is 16 bits:
//! - Bits 0-4: Condition code register (CCR)
//!   - C (bit 0): Carry
//!   - V (bit 1): Overflow
//!   - Z (bit 2): Zero
//!   - N (bit 3): Negative
//!   - X (bit 4): Extend (copy of C for multi-precision arithmetic)
//! - Bits 8-10: Interrupt mask (I0, I1, I2)
//! - Bit 12: Master/interrupt state (M, 68020+)
//! - Bit 13: Supervisor mode (S)
//! - Bit 14: Trace on change of flow (T0, 68020+)
//! - Bit 15: Trace every instruction (T1)
//!
//! Which of these bits exist depends on the part; see `CpuCapabilities::sr_mask`.

/// Carry flag.
pub const C: u16 = 0x0001;
/// Overflow flag.
pub const V: u16 = 0x0002;
/// Zero flag.
pub const Z: u16 = 0x0004;
/// Negative flag.
pub const N: u16 = 0x0008;
/// Extend flag.
pub const X: u16 = 0x0010;

/// Interrupt mask bit 0.
pub const I0: u16 = 0x0100;
/// Interrupt mask bit 1.
pub const I1: u16 = 0x0200;
/// Interrupt mask bit 2.
pub const I2: u16 = 0x0400;
/// All three interrupt mask bits.
pub const IMASK: u16 = I0 | I1 | I2;

/// Master stack select (68020/030/040).
pub const M: u16 = 0x1000;
/// Supervisor mode flag.
pub const S: u16 = 0x2000;
/// Trace on change of flow (68020+).
pub const T0: u16 = 0x4000;
/// Trace every instruction.
pub const T1: u16 = 0x8000;
/// Historical name of T1 on the 68000.
pub const T: u16 = T1;

/// Mask for condition codes only (bits 0-4).
pub const CCR_MASK: u16 = 0x001F;
/// Mask for the system byte (bits 8-15).
pub const SYSTEM_MASK: u16 = 0xFF00;

/// Status register helper functions.
pub struct Status;

impl Status {
    /// Update N and Z flags based on a byte value.
    #[must_use]
    pub fn update_nz_byte(sr: u16, value: u8) -> u16 {
        Self::update_nz(sr, u32::from(value), 0x80)
    }

    /// Update N and Z flags based on a word value.
    #[must_use]
    pub fn update_nz_word(sr: u16, value: u16) -> u16 {
        Self::update_nz(sr, u32::from(value), 0x8000)
    }

    /// Update N and Z flags based on a long value.
    #[must_use]
    pub fn update_nz_long(sr: u16, value: u32) -> u16 {
        Self::update_nz(sr, value, 0x8000_0000)
    }

    /// Update N and Z from a value already masked to its operand size.
    #[must_use]
    pub fn update_nz(sr: u16, value: u32, msb: u32) -> u16 {
        let mut result = sr & !(N | Z);
        if value == 0 {
            result |= Z;
        }
        if value & msb != 0 {
            result |= N;
        }
        result
    }

    /// Clear V and C flags (used by MOVE, AND, OR, EOR, etc).
    #[must_use]
    pub fn clear_vc(sr: u16) -> u16 {
        sr & !(V | C)
    }

    /// Set a flag if condition is true, clear if false.
    #[must_use]
    pub fn set_if(sr: u16, flag: u16, condition: bool) -> u16 {
        if condition {
            sr | flag
        } else {
            sr & !flag
        }
    }

    /// Evaluate a condition code (0-15).
    #[must_use]
    pub fn condition(sr: u16, cc: u8) -> bool {
        let c = sr & C != 0;
        let v = sr & V != 0;
        let z = sr & Z != 0;
        let n = sr & N != 0;
        match cc & 0x0F {
            0x0 => true,        // T
            0x1 => false,       // F
            0x2 => !c && !z,    // HI
            0x3 => c || z,      // LS
            0x4 => !c,          // CC/HS
            0x5 => c,           // CS/LO
            0x6 => !z,          // NE
            0x7 => z,           // EQ
            0x8 => !v,          // VC
            0x9 => v,           // VS
            0xA => !n,          // PL
            0xB => n,           // MI
            0xC => n == v,      // GE
            0xD => n != v,      // LT
            0xE => !z && n == v, // GT
            _ => z || n != v,   // LE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nz_follows_operand_width() {
        assert_eq!(Status::update_nz_byte(0, 0x80), N);
        assert_eq!(Status::update_nz_word(N, 0), Z);
        assert_eq!(Status::update_nz_long(Z | C, 0x8000_0000), N | C);
    }

    #[test]
    fn signed_conditions() {
        // N set, V clear: less than.
        assert!(Status::condition(N, 0xD));
        assert!(!Status::condition(N, 0xC));
        // N and V set: greater or equal.
        assert!(Status::condition(N | V, 0xC));
        assert!(Status::condition(Z, 0xF));
        assert!(!Status::condition(Z, 0xE));
        assert!(Status::condition(0, 0x2));
        assert!(Status::condition(C, 0x3));
    }
}
