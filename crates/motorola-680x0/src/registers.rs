//! Motorola 680x0 CPU registers.
//!
//! - D0-D7: 8 data registers (32-bit)
//! - A0-A7: 8 address registers (32-bit, A7 is the active stack pointer)
//! - USP: user stack pointer (A7 when S=0)
//! - ISP: interrupt stack pointer (A7 when S=1, M=0; the 68000's SSP)
//! - MSP: master stack pointer (A7 when S=1, M=1; 68020/030/040 only)
//! - PC: program counter
//! - SR: status register
//! - VBR, SFC, DFC, CACR, CAAR: control registers reached through MOVEC

use crate::flags::{IMASK, M, S, T0, T1};

/// 680x0 CPU register set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// Data registers D0-D7.
    pub d: [u32; 8],
    /// Address registers A0-A6 (A7 is handled via the stack pointers).
    pub a: [u32; 7],
    /// User stack pointer.
    pub usp: u32,
    /// Interrupt (supervisor) stack pointer.
    pub isp: u32,
    /// Master stack pointer.
    pub msp: u32,
    /// Program counter.
    pub pc: u32,
    /// Status register.
    pub sr: u16,
    /// Vector base register.
    pub vbr: u32,
    /// Source function code for MOVES.
    pub sfc: u8,
    /// Destination function code for MOVES.
    pub dfc: u8,
    /// Cache control register.
    pub cacr: u32,
    /// Cache address register.
    pub caar: u32,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Create registers in reset state.
    ///
    /// After reset: supervisor mode, interrupt mask level 7.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            d: [0; 8],
            a: [0; 7],
            usp: 0,
            isp: 0,
            msp: 0,
            pc: 0,
            sr: 0x2700,
            vbr: 0,
            sfc: 0,
            dfc: 0,
            cacr: 0,
            caar: 0,
        }
    }

    /// Get address register by index (0-7).
    /// A7 returns the active stack pointer.
    #[must_use]
    pub fn a(&self, n: usize) -> u32 {
        debug_assert!(n < 8);
        if n < 7 { self.a[n] } else { self.active_sp() }
    }

    /// Set address register by index (0-7).
    /// A7 sets the active stack pointer.
    pub fn set_a(&mut self, n: usize, value: u32) {
        debug_assert!(n < 8);
        if n < 7 {
            self.a[n] = value;
        } else {
            self.set_active_sp(value);
        }
    }

    /// Register by 4-bit index as used in extension words: 0-7 Dn, 8-15 An.
    #[must_use]
    pub fn da(&self, n: usize) -> u32 {
        if n < 8 { self.d[n] } else { self.a(n - 8) }
    }

    /// Set a register by 4-bit index.
    pub fn set_da(&mut self, n: usize, value: u32) {
        if n < 8 {
            self.d[n] = value;
        } else {
            self.set_a(n - 8, value);
        }
    }

    /// Get the active stack pointer (USP, ISP or MSP).
    #[must_use]
    pub const fn active_sp(&self) -> u32 {
        if !self.is_supervisor() {
            self.usp
        } else if self.is_master() {
            self.msp
        } else {
            self.isp
        }
    }

    /// Set the active stack pointer.
    pub fn set_active_sp(&mut self, value: u32) {
        if !self.is_supervisor() {
            self.usp = value;
        } else if self.is_master() {
            self.msp = value;
        } else {
            self.isp = value;
        }
    }

    /// Supervisor stack pointer that A7 would select with S=1.
    #[must_use]
    pub const fn ssp(&self) -> u32 {
        if self.is_master() { self.msp } else { self.isp }
    }

    /// Check if in supervisor mode.
    #[must_use]
    pub const fn is_supervisor(&self) -> bool {
        self.sr & S != 0
    }

    /// Check if the master stack is selected.
    #[must_use]
    pub const fn is_master(&self) -> bool {
        self.sr & M != 0
    }

    /// Get the interrupt mask level (0-7).
    #[must_use]
    pub const fn interrupt_mask(&self) -> u8 {
        ((self.sr & IMASK) >> 8) as u8
    }

    /// Set the interrupt mask level (0-7).
    pub fn set_interrupt_mask(&mut self, level: u8) {
        self.sr = (self.sr & !IMASK) | (u16::from(level & 0x07) << 8);
    }

    /// Check if trace-every-instruction is enabled.
    #[must_use]
    pub const fn is_trace(&self) -> bool {
        self.sr & T1 != 0
    }

    /// Check if trace-on-flow-change is enabled.
    #[must_use]
    pub const fn is_flow_trace(&self) -> bool {
        self.sr & T0 != 0
    }

    /// Get the condition code register (low byte of SR).
    #[must_use]
    pub const fn ccr(&self) -> u8 {
        (self.sr & 0xFF) as u8
    }

    /// Set the condition code register (low byte of SR).
    pub fn set_ccr(&mut self, value: u8) {
        self.sr = (self.sr & 0xFF00) | u16::from(value & 0x1F);
    }

    /// Push a word slot onto the active stack, returning the address to write.
    pub fn push_word(&mut self) -> u32 {
        let sp = self.active_sp().wrapping_sub(2);
        self.set_active_sp(sp);
        sp
    }

    /// Push a long slot onto the active stack, returning the address to write.
    pub fn push_long(&mut self) -> u32 {
        let sp = self.active_sp().wrapping_sub(4);
        self.set_active_sp(sp);
        sp
    }

    /// Pop a word slot, returning the address it was read from.
    pub fn pop_word(&mut self) -> u32 {
        let sp = self.active_sp();
        self.set_active_sp(sp.wrapping_add(2));
        sp
    }

    /// Pop a long slot, returning the address it was read from.
    pub fn pop_long(&mut self) -> u32 {
        let sp = self.active_sp();
        self.set_active_sp(sp.wrapping_add(4));
        sp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a7_follows_s_and_m() {
        let mut regs = Registers::new();
        regs.usp = 0x100;
        regs.isp = 0x200;
        regs.msp = 0x300;
        assert_eq!(regs.a(7), 0x200);
        regs.sr |= M;
        assert_eq!(regs.a(7), 0x300);
        regs.sr &= !S;
        assert_eq!(regs.a(7), 0x100);
        regs.set_a(7, 0x180);
        assert_eq!(regs.usp, 0x180);
        assert_eq!(regs.msp, 0x300);
    }

    #[test]
    fn push_and_pop_return_slot_addresses() {
        let mut regs = Registers::new();
        regs.isp = 0x1000;
        assert_eq!(regs.push_long(), 0x0FFC);
        assert_eq!(regs.push_word(), 0x0FFA);
        assert_eq!(regs.pop_word(), 0x0FFA);
        assert_eq!(regs.pop_long(), 0x0FFC);
        assert_eq!(regs.isp, 0x1000);
    }

    #[test]
    fn combined_index_reaches_both_banks() {
        let mut regs = Registers::new();
        regs.set_da(3, 7);
        regs.set_da(11, 9);
        assert_eq!(regs.d[3], 7);
        assert_eq!(regs.a[3], 9);
        assert_eq!(regs.da(11), 9);
    }
}
