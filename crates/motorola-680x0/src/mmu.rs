//! Paged memory management: 68851, 68030 and 68040 MMUs.
//!
//! Translation order for a logical access:
//! 1. CPU space (FC=7) and a disabled MMU pass through untranslated.
//! 2. Transparent translation registers (TT0/TT1 on the 030, ITT/DTT on
//!    the 040) map matching accesses one-to-one.
//! 3. The address translation cache (ATC) is searched by page and FC.
//! 4. On a miss the translation tables are walked, U/M bits are written
//!    back, and the result is inserted into the ATC (round-robin).
//!
//! The 68851 and 68030 share one table format (TC-configured index
//! widths, short and long descriptors, early termination); the 68040 has a
//! fixed three-level format. The Apple HMMU shares the entry point but
//! has no tables at all.

use crate::bus::{FunctionCode, M68kBus};
use crate::hmmu::{self, HmmuMode};
use crate::model::MmuKind;

/// 68030/68851 translation control bits.
pub mod tc {
    /// Enable.
    pub const E: u32 = 0x8000_0000;
    /// Supervisor root pointer enable.
    pub const SRE: u32 = 0x0200_0000;
    /// Function code lookup.
    pub const FCL: u32 = 0x0100_0000;
    /// 68040 enable.
    pub const E_040: u32 = 0x8000;
    /// 68040 8K page select.
    pub const P_040: u32 = 0x4000;
}

/// 68030 MMUSR bits.
pub mod mmusr {
    pub const B: u16 = 0x8000;
    pub const L: u16 = 0x4000;
    pub const S: u16 = 0x2000;
    pub const W: u16 = 0x0800;
    pub const I: u16 = 0x0400;
    pub const M: u16 = 0x0200;
    pub const T: u16 = 0x0040;
    pub const N: u16 = 0x0007;
}

/// 68040 MMUSR bits (low half; the high bits hold the physical page).
pub mod mmusr040 {
    pub const B: u32 = 0x0800;
    pub const G: u32 = 0x0400;
    pub const S: u32 = 0x0080;
    pub const M: u32 = 0x0010;
    pub const W: u32 = 0x0004;
    pub const T: u32 = 0x0002;
    pub const R: u32 = 0x0001;
}

/// Descriptor bits shared by both table formats.
const DESC_WP: u32 = 0x04;
const DESC_U: u32 = 0x08;
const DESC_M: u32 = 0x10;
const DESC_CI: u32 = 0x40;
const DESC_S_LONG: u32 = 0x100;
const DESC_S_040: u32 = 0x80;
const DESC_G_040: u32 = 0x400;

/// A failed translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmuFault {
    pub address: u32,
    pub fc: FunctionCode,
    pub write: bool,
    /// MMUSR image describing the failure.
    pub status: u32,
}

/// One address translation cache entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtcEntry {
    pub valid: bool,
    pub fc: u8,
    pub logical_page: u32,
    pub physical_page: u32,
    pub write_protected: bool,
    pub supervisor_only: bool,
    pub cache_inhibit: bool,
    pub modified: bool,
    pub global: bool,
}

/// Outcome of a table walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Walk {
    /// Physical address, when the walk reached a valid page.
    pub physical: Option<u32>,
    /// Page descriptor attributes.
    pub write_protected: bool,
    pub supervisor_only: bool,
    pub cache_inhibit: bool,
    pub modified: bool,
    pub global: bool,
    /// Levels visited.
    pub levels: u8,
    /// Invalid descriptor hit.
    pub invalid: bool,
    /// Bus error while reading a descriptor.
    pub bus_error: bool,
    /// Address of the last descriptor read.
    pub descriptor: u32,
}

impl Walk {
    const fn empty() -> Self {
        Self {
            physical: None,
            write_protected: false,
            supervisor_only: false,
            cache_inhibit: false,
            modified: false,
            global: false,
            levels: 0,
            invalid: false,
            bus_error: false,
            descriptor: 0,
        }
    }
}

/// The MMU register file and ATC.
#[derive(Debug, Clone)]
pub struct Mmu {
    kind: MmuKind,
    /// Translation control.
    pub tc: u32,
    /// CPU root pointer: upper long (limit, DT) and table address.
    pub crp_limit: u32,
    pub crp_aptr: u32,
    /// Supervisor root pointer (68040: the whole SRP lives in `srp_aptr`).
    pub srp_limit: u32,
    pub srp_aptr: u32,
    /// 68040 user root pointer.
    pub urp: u32,
    /// 68030 transparent translation registers.
    pub tt0: u32,
    pub tt1: u32,
    /// 68040 instruction/data transparent translation registers.
    pub itt0: u32,
    pub itt1: u32,
    pub dtt0: u32,
    pub dtt1: u32,
    /// 68030/68851 status register.
    pub mmusr: u16,
    /// 68040 status register.
    pub mmusr_040: u32,
    /// Apple HMMU layout.
    pub hmmu: HmmuMode,
    atc: Vec<AtcEntry>,
    atc_next: usize,
}

impl Mmu {
    #[must_use]
    pub fn new(kind: MmuKind, atc_entries: usize) -> Self {
        Self {
            kind,
            tc: 0,
            crp_limit: 0,
            crp_aptr: 0,
            srp_limit: 0,
            srp_aptr: 0,
            urp: 0,
            tt0: 0,
            tt1: 0,
            itt0: 0,
            itt1: 0,
            dtt0: 0,
            dtt1: 0,
            mmusr: 0,
            mmusr_040: 0,
            hmmu: HmmuMode::Disabled,
            atc: vec![AtcEntry::default(); atc_entries],
            atc_next: 0,
        }
    }

    #[must_use]
    pub fn kind(&self) -> MmuKind {
        self.kind
    }

    /// Paged translation is switched on.
    #[must_use]
    pub fn enabled(&self) -> bool {
        match self.kind {
            MmuKind::Pmmu68851 | MmuKind::Pmmu030 => self.tc & tc::E != 0,
            MmuKind::Mmu040 => self.tc & tc::E_040 != 0,
            MmuKind::Hmmu => self.hmmu != HmmuMode::Disabled,
            MmuKind::None => false,
        }
    }

    /// Return every register to its power-up value. The HMMU layout is
    /// board wiring and survives reset.
    pub fn reset(&mut self) {
        let hmmu = self.hmmu;
        *self = Self::new(self.kind, self.atc.len());
        self.hmmu = hmmu;
    }

    /// Page size in bits.
    fn page_shift(&self) -> u32 {
        match self.kind {
            MmuKind::Mmu040 => {
                if self.tc & tc::P_040 != 0 { 13 } else { 12 }
            }
            _ => ((self.tc >> 20) & 0xF).max(8),
        }
    }

    /// Write TC. The ATC is flushed unless `flush_disable` is set.
    pub fn set_tc(&mut self, value: u32, flush_disable: bool) {
        self.tc = value;
        if !flush_disable || !self.enabled() {
            self.flush_all();
        }
        log::debug!("mmu: tc={value:#010x} enabled={}", self.enabled());
    }

    /// The 030/851 TC field widths must add up to 32 bits.
    #[must_use]
    pub fn tc_is_valid(value: u32) -> bool {
        if value & tc::E == 0 {
            return true;
        }
        let ps = (value >> 20) & 0xF;
        let is = (value >> 16) & 0xF;
        let mut sum = ps + is;
        for shift in [12, 8, 4, 0] {
            let ti = (value >> shift) & 0xF;
            if ti == 0 {
                break;
            }
            sum += ti;
        }
        ps >= 8 && sum == 32
    }

    // === ATC ===

    /// Invalidate every ATC entry.
    pub fn flush_all(&mut self) {
        for entry in &mut self.atc {
            entry.valid = false;
        }
        log::trace!("mmu: atc flushed");
    }

    /// Invalidate entries whose FC matches `fc` under `mask`.
    pub fn flush_fc(&mut self, fc: u8, mask: u8) {
        for entry in &mut self.atc {
            if (entry.fc ^ fc) & mask & 7 == 0 {
                entry.valid = false;
            }
        }
    }

    /// Invalidate entries for `address` whose FC matches under `mask`.
    pub fn flush_page(&mut self, fc: u8, mask: u8, address: u32) {
        let page = address >> self.page_shift();
        let shift = self.page_shift();
        for entry in &mut self.atc {
            if entry.logical_page >> shift == page && (entry.fc ^ fc) & mask & 7 == 0 {
                entry.valid = false;
            }
        }
    }

    /// 68040 PFLUSH: `global` also drops entries marked global.
    pub fn flush_040(&mut self, address: Option<u32>, supervisor: bool, global: bool) {
        let shift = self.page_shift();
        for entry in &mut self.atc {
            let fc_match = (entry.fc & 4 != 0) == supervisor;
            let page_match = address.is_none_or(|a| entry.logical_page >> shift == a >> shift);
            if fc_match && page_match && (global || !entry.global) {
                entry.valid = false;
            }
        }
    }

    /// Number of valid ATC entries.
    #[must_use]
    pub fn atc_valid_entries(&self) -> usize {
        self.atc.iter().filter(|e| e.valid).count()
    }

    fn atc_find(&self, page: u32, fc: u8) -> Option<usize> {
        self.atc
            .iter()
            .position(|e| e.valid && e.logical_page == page && e.fc == fc)
    }

    fn atc_insert(&mut self, entry: AtcEntry) {
        if self.atc.is_empty() {
            return;
        }
        let slot = match self.atc_find(entry.logical_page, entry.fc) {
            Some(slot) => slot,
            None => {
                let slot = self.atc_next;
                self.atc_next = (self.atc_next + 1) % self.atc.len();
                slot
            }
        };
        log::trace!(
            "mmu: atc[{slot}] {:#010x} -> {:#010x} fc={}",
            entry.logical_page,
            entry.physical_page,
            entry.fc
        );
        self.atc[slot] = entry;
    }

    // === Translation ===

    /// Translate a logical address for an access.
    pub fn translate<B: M68kBus>(
        &mut self,
        bus: &mut B,
        logical: u32,
        fc: FunctionCode,
        write: bool,
    ) -> Result<u32, MmuFault> {
        if fc == FunctionCode::CpuSpace {
            return Ok(logical);
        }
        match self.kind {
            MmuKind::None => Ok(logical),
            MmuKind::Hmmu => Ok(hmmu::translate(self.hmmu, logical)),
            MmuKind::Pmmu030 if self.tt_030_match(logical, fc, write) => Ok(logical),
            MmuKind::Mmu040 => {
                if let Some(write_protected) = self.tt_040_match(logical, fc) {
                    if write && write_protected {
                        return Err(self.fault_040(logical, fc, write, mmusr040::W | mmusr040::T));
                    }
                    return Ok(logical);
                }
                if !self.enabled() {
                    return Ok(logical);
                }
                self.translate_paged(bus, logical, fc, write)
            }
            _ if !self.enabled() => Ok(logical),
            _ => self.translate_paged(bus, logical, fc, write),
        }
    }

    fn translate_paged<B: M68kBus>(
        &mut self,
        bus: &mut B,
        logical: u32,
        fc: FunctionCode,
        write: bool,
    ) -> Result<u32, MmuFault> {
        let shift = self.page_shift();
        let offset_mask = (1u32 << shift) - 1;
        let page = logical & !offset_mask;
        let supervisor = fc.is_supervisor();

        if let Some(slot) = self.atc_find(page, fc.bits()) {
            let entry = self.atc[slot];
            if entry.supervisor_only && !supervisor {
                return Err(self.walk_fault(logical, fc, write, None));
            }
            if write && entry.write_protected {
                return Err(self.walk_fault(logical, fc, write, None));
            }
            if !write || entry.modified {
                return Ok(entry.physical_page | (logical & offset_mask));
            }
            // First write to a clean page: walk again to set M.
        }

        let walk = self.walk(bus, logical, fc, write, true, 7);
        let Some(physical) = walk.physical else {
            return Err(self.walk_fault(logical, fc, write, Some(walk)));
        };
        if (walk.supervisor_only && !supervisor) || (write && walk.write_protected) {
            return Err(self.walk_fault(logical, fc, write, Some(walk)));
        }
        self.atc_insert(AtcEntry {
            valid: true,
            fc: fc.bits(),
            logical_page: page,
            physical_page: physical & !offset_mask,
            write_protected: walk.write_protected,
            supervisor_only: walk.supervisor_only,
            cache_inhibit: walk.cache_inhibit,
            modified: walk.modified,
            global: walk.global,
        });
        Ok(physical)
    }

    fn walk_fault(&mut self, logical: u32, fc: FunctionCode, write: bool, walk: Option<Walk>) -> MmuFault {
        let walk = walk.unwrap_or_else(|| {
            let page = logical & !((1u32 << self.page_shift()) - 1);
            let entry = self.atc_find(page, fc.bits()).map(|slot| self.atc[slot]);
            Walk {
                write_protected: entry.is_some_and(|e| e.write_protected),
                supervisor_only: entry.is_some_and(|e| e.supervisor_only),
                modified: entry.is_some_and(|e| e.modified),
                ..Walk::empty()
            }
        });
        if self.kind == MmuKind::Mmu040 {
            let mut status = 0;
            if walk.bus_error {
                status |= mmusr040::B;
            }
            if walk.write_protected {
                status |= mmusr040::W;
            }
            if walk.supervisor_only {
                status |= mmusr040::S;
            }
            return self.fault_040(logical, fc, write, status);
        }
        let status = self.status_030(&walk, fc);
        self.mmusr = status;
        log::debug!("mmu: fault at {logical:#010x} fc={} write={write} mmusr={status:#06x}", fc.bits());
        MmuFault {
            address: logical,
            fc,
            write,
            status: u32::from(status),
        }
    }

    fn fault_040(&mut self, logical: u32, fc: FunctionCode, write: bool, status: u32) -> MmuFault {
        self.mmusr_040 = status;
        log::debug!("mmu: fault at {logical:#010x} fc={} write={write} mmusr={status:#010x}", fc.bits());
        MmuFault {
            address: logical,
            fc,
            write,
            status,
        }
    }

    fn status_030(&self, walk: &Walk, fc: FunctionCode) -> u16 {
        let mut status = u16::from(walk.levels.min(7)) & mmusr::N;
        if walk.bus_error {
            status |= mmusr::B;
        }
        if walk.invalid || walk.bus_error {
            status |= mmusr::I;
        }
        if walk.write_protected {
            status |= mmusr::W;
        }
        if walk.supervisor_only && !fc.is_supervisor() {
            status |= mmusr::S;
        }
        if walk.modified {
            status |= mmusr::M;
        }
        status
    }

    /// Walk the tables for `logical` without touching the ATC.
    ///
    /// With `commit` set, used/modified bits are written back to memory.
    /// `max_levels` bounds the search (PTEST level operand).
    pub fn walk<B: M68kBus>(
        &self,
        bus: &mut B,
        logical: u32,
        fc: FunctionCode,
        write: bool,
        commit: bool,
        max_levels: u8,
    ) -> Walk {
        match self.kind {
            MmuKind::Mmu040 => self.walk_040(bus, logical, fc, write, commit),
            MmuKind::Pmmu68851 | MmuKind::Pmmu030 => self.walk_030(bus, logical, fc, write, commit, max_levels),
            _ => Walk {
                physical: Some(logical),
                ..Walk::empty()
            },
        }
    }

    fn walk_030<B: M68kBus>(
        &self,
        bus: &mut B,
        logical: u32,
        fc: FunctionCode,
        write: bool,
        commit: bool,
        max_levels: u8,
    ) -> Walk {
        let mut walk = Walk::empty();
        let is = (self.tc >> 16) & 0xF;
        let index_widths = [(self.tc >> 12) & 0xF, (self.tc >> 8) & 0xF, (self.tc >> 4) & 0xF, self.tc & 0xF];

        let (root_hi, root_lo) = if self.tc & tc::SRE != 0 && fc.is_supervisor() {
            (self.srp_limit, self.srp_aptr)
        } else {
            (self.crp_limit, self.crp_aptr)
        };
        let mut dt = root_hi & 3;
        let mut table = root_lo & !0xF;
        let mut page_base = root_lo;
        let mut consumed = is;

        // (index, address bits consumed) per level; FCL adds an FC level.
        let mut steps: Vec<(u32, u32)> = Vec::with_capacity(5);
        if self.tc & tc::FCL != 0 {
            steps.push((u32::from(fc.bits()), 0));
        }
        let mut bit = is;
        for width in index_widths {
            if width == 0 || bit + width > 32 {
                break;
            }
            let index = logical.checked_shl(bit).unwrap_or(0) >> (32 - width);
            steps.push((index, width));
            bit += width;
        }

        for (index, width) in steps {
            match dt {
                0 => {
                    walk.invalid = true;
                    return walk;
                }
                1 => break,
                _ => {}
            }
            if walk.levels >= max_levels {
                return walk;
            }
            let long = dt == 3;
            let address = table.wrapping_add(index * if long { 8 } else { 4 });
            let Some((hi, lo)) = Self::read_descriptor(bus, address, long) else {
                walk.bus_error = true;
                return walk;
            };
            walk.levels += 1;
            walk.descriptor = address;
            consumed += width;
            walk.write_protected |= hi & DESC_WP != 0;
            if long {
                walk.supervisor_only |= hi & DESC_S_LONG != 0;
            }
            dt = hi & 3;
            let pointer = if long { lo } else { hi };
            table = pointer & !0xF;
            page_base = pointer & !0xFF;

            let mut updated = hi | DESC_U;
            if dt == 1 {
                walk.cache_inhibit = hi & DESC_CI != 0;
                walk.modified = hi & DESC_M != 0;
                if write && !walk.write_protected {
                    updated |= DESC_M;
                    walk.modified = true;
                }
            }
            if commit && updated != hi && !Self::write_descriptor(bus, address, updated) {
                walk.bus_error = true;
                return walk;
            }
        }

        // A table descriptor left at the bottom is an indirect pointer.
        if dt == 2 || dt == 3 {
            let Some((hi, lo)) = Self::read_descriptor(bus, table, dt == 3) else {
                walk.bus_error = true;
                return walk;
            };
            walk.levels += 1;
            walk.descriptor = table;
            dt = hi & 3;
            walk.write_protected |= hi & DESC_WP != 0;
            walk.cache_inhibit = hi & DESC_CI != 0;
            walk.modified = hi & DESC_M != 0;
            page_base = if dt == 3 { lo } else { hi } & !0xFF;
            if dt != 1 {
                walk.invalid = true;
                return walk;
            }
        }
        if dt == 0 {
            walk.invalid = true;
            return walk;
        }

        let remaining = 32u32.saturating_sub(consumed);
        let offset_mask = if remaining >= 32 { u32::MAX } else { (1u32 << remaining) - 1 };
        walk.physical = Some((page_base & !offset_mask) | (logical & offset_mask));
        walk
    }

    fn walk_040<B: M68kBus>(&self, bus: &mut B, logical: u32, fc: FunctionCode, write: bool, commit: bool) -> Walk {
        let mut walk = Walk::empty();
        let eight_k = self.tc & tc::P_040 != 0;
        let root = if fc.is_supervisor() { self.srp_aptr } else { self.urp };

        let root_index = logical >> 25;
        let pointer_index = (logical >> 18) & 0x7F;
        let (page_index, table_mask, page_mask) = if eight_k {
            ((logical >> 13) & 0x1F, !0x7Fu32, !0x1FFFu32)
        } else {
            ((logical >> 12) & 0x3F, !0xFFu32, !0xFFFu32)
        };

        // Root level yields a pointer table (128 entries), pointer level a
        // page table (64 or 32 entries).
        let mut table = root & !0x1FF;
        for (index, next_mask) in [(root_index, !0x1FFu32), (pointer_index, table_mask)] {
            let address = table.wrapping_add(index * 4);
            let Some((desc, _)) = Self::read_descriptor(bus, address, false) else {
                walk.bus_error = true;
                return walk;
            };
            walk.levels += 1;
            walk.descriptor = address;
            if desc & 2 == 0 {
                walk.invalid = true;
                return walk;
            }
            walk.write_protected |= desc & DESC_WP != 0;
            if commit && desc & DESC_U == 0 && !Self::write_descriptor(bus, address, desc | DESC_U) {
                walk.bus_error = true;
                return walk;
            }
            table = desc & next_mask;
        }

        let mut page_address = table.wrapping_add(page_index * 4);
        let Some((mut desc, _)) = Self::read_descriptor(bus, page_address, false) else {
            walk.bus_error = true;
            return walk;
        };
        walk.levels += 1;
        if desc & 3 == 2 {
            page_address = desc & !3;
            let Some((indirect, _)) = Self::read_descriptor(bus, page_address, false) else {
                walk.bus_error = true;
                return walk;
            };
            desc = indirect;
        }
        walk.descriptor = page_address;
        if desc & 3 == 0 || desc & 3 == 2 {
            walk.invalid = true;
            return walk;
        }
        walk.write_protected |= desc & DESC_WP != 0;
        walk.supervisor_only = desc & DESC_S_040 != 0;
        walk.cache_inhibit = (desc >> 5) & 3 >= 2;
        walk.global = desc & DESC_G_040 != 0;
        walk.modified = desc & DESC_M != 0;

        let mut updated = desc | DESC_U;
        if write && !walk.write_protected {
            updated |= DESC_M;
            walk.modified = true;
        }
        if commit && updated != desc && !Self::write_descriptor(bus, page_address, updated) {
            walk.bus_error = true;
            return walk;
        }
        walk.physical = Some((desc & page_mask) | (logical & !page_mask));
        walk
    }

    fn read_descriptor<B: M68kBus>(bus: &mut B, address: u32, long: bool) -> Option<(u32, u32)> {
        let hi = bus.read_long(address, FunctionCode::SupervisorData);
        if hi.bus_error {
            return None;
        }
        if !long {
            return Some((hi.data, 0));
        }
        let lo = bus.read_long(address.wrapping_add(4), FunctionCode::SupervisorData);
        if lo.bus_error {
            return None;
        }
        Some((hi.data, lo.data))
    }

    /// U/M write-back. False when the bus refused the write.
    fn write_descriptor<B: M68kBus>(bus: &mut B, address: u32, value: u32) -> bool {
        !bus.write_long(address, value, FunctionCode::SupervisorData).bus_error
    }

    // === Transparent translation ===

    fn tt_030_match(&self, logical: u32, fc: FunctionCode, write: bool) -> bool {
        [self.tt0, self.tt1].into_iter().any(|tt| {
            if tt & 0x8000 == 0 {
                return false;
            }
            let base = tt >> 24;
            let mask = (tt >> 16) & 0xFF;
            if ((logical >> 24) ^ base) & !mask & 0xFF != 0 {
                return false;
            }
            let fc_base = (tt >> 4) & 7;
            let fc_mask = tt & 7;
            if (u32::from(fc.bits()) ^ fc_base) & !fc_mask & 7 != 0 {
                return false;
            }
            // RWM clear: R/W must match (R/W set selects reads).
            tt & 0x100 != 0 || (tt & 0x200 != 0) != write
        })
    }

    /// Matching 68040 TT register's write-protect bit, if one matches.
    fn tt_040_match(&self, logical: u32, fc: FunctionCode) -> Option<bool> {
        let registers = if fc.is_program() {
            [self.itt0, self.itt1]
        } else {
            [self.dtt0, self.dtt1]
        };
        registers.into_iter().find_map(|tt| {
            if tt & 0x8000 == 0 {
                return None;
            }
            let base = tt >> 24;
            let mask = (tt >> 16) & 0xFF;
            if ((logical >> 24) ^ base) & !mask & 0xFF != 0 {
                return None;
            }
            let privilege_ok = match (tt >> 13) & 3 {
                0 => !fc.is_supervisor(),
                1 => fc.is_supervisor(),
                _ => true,
            };
            privilege_ok.then_some(tt & 0x4 != 0)
        })
    }

    // === Instructions ===

    /// PLOAD: walk and fill the ATC without performing an access.
    pub fn load<B: M68kBus>(&mut self, bus: &mut B, logical: u32, fc: FunctionCode, write: bool) {
        if self.kind == MmuKind::None || !self.enabled() {
            return;
        }
        let _ = self.translate_paged(bus, logical, fc, write);
    }

    /// PTEST on the 68030/68851. Returns the MMUSR value and the address of
    /// the last descriptor fetched.
    pub fn ptest_030<B: M68kBus>(
        &mut self,
        bus: &mut B,
        logical: u32,
        fc: FunctionCode,
        write: bool,
        level: u8,
    ) -> (u16, u32) {
        if self.kind == MmuKind::Pmmu030 && self.tt_030_match(logical, fc, write) {
            self.mmusr = mmusr::T;
            return (self.mmusr, 0);
        }
        if level == 0 {
            let shift = self.page_shift();
            let page = logical & !((1u32 << shift) - 1);
            let status = match self.atc_find(page, fc.bits()) {
                Some(slot) => {
                    let entry = self.atc[slot];
                    let mut status = 0;
                    if entry.write_protected {
                        status |= mmusr::W;
                    }
                    if entry.modified {
                        status |= mmusr::M;
                    }
                    if entry.supervisor_only && !fc.is_supervisor() {
                        status |= mmusr::S;
                    }
                    status
                }
                None => mmusr::I,
            };
            self.mmusr = status;
            return (status, 0);
        }
        let walk = self.walk(bus, logical, fc, write, false, level);
        let mut status = self.status_030(&walk, fc);
        if walk.physical.is_none() && walk.levels < level && !walk.bus_error {
            status |= mmusr::I;
        }
        self.mmusr = status;
        (status, walk.descriptor)
    }

    /// PTEST on the 68040. Loads the ATC and sets MMUSR.
    pub fn ptest_040<B: M68kBus>(&mut self, bus: &mut B, logical: u32, fc: FunctionCode, write: bool) -> u32 {
        if self.tt_040_match(logical, fc).is_some() {
            self.mmusr_040 = mmusr040::T | mmusr040::R | (logical & !0xFFF);
            return self.mmusr_040;
        }
        let walk = self.walk_040(bus, logical, fc, write, true);
        let mut status = 0;
        if let Some(physical) = walk.physical {
            status |= (physical & !0xFFF) | mmusr040::R;
            if walk.supervisor_only {
                status |= mmusr040::S;
            }
            if walk.write_protected {
                status |= mmusr040::W;
            }
            if walk.modified {
                status |= mmusr040::M;
            }
            if walk.global {
                status |= mmusr040::G;
            }
            let shift = self.page_shift();
            let offset_mask = (1u32 << shift) - 1;
            self.atc_insert(AtcEntry {
                valid: true,
                fc: fc.bits(),
                logical_page: logical & !offset_mask,
                physical_page: physical & !offset_mask,
                write_protected: walk.write_protected,
                supervisor_only: walk.supervisor_only,
                cache_inhibit: walk.cache_inhibit,
                modified: walk.modified,
                global: walk.global,
            });
        } else if walk.bus_error {
            status |= mmusr040::B;
        }
        self.mmusr_040 = status;
        status
    }

    /// Translate for a debugger: no ATC changes, no table writes, no faults.
    pub fn debug_translate<B: M68kBus>(&self, bus: &mut B, logical: u32, fc: FunctionCode, write: bool) -> Option<u32> {
        match self.kind {
            MmuKind::None => Some(logical),
            MmuKind::Hmmu => Some(hmmu::translate(self.hmmu, logical)),
            _ if fc == FunctionCode::CpuSpace => Some(logical),
            MmuKind::Pmmu030 if self.tt_030_match(logical, fc, write) => Some(logical),
            MmuKind::Mmu040 if self.tt_040_match(logical, fc).is_some() => Some(logical),
            _ if !self.enabled() => Some(logical),
            _ => {
                let shift = self.page_shift();
                let offset_mask = (1u32 << shift) - 1;
                if let Some(slot) = self.atc_find(logical & !offset_mask, fc.bits()) {
                    return Some(self.atc[slot].physical_page | (logical & offset_mask));
                }
                self.walk(bus, logical, fc, write, false, 7).physical
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusResult;

    struct Ram {
        mem: Vec<u8>,
        word_reads: usize,
        writes_fail: bool,
    }

    impl Ram {
        fn new() -> Self {
            Self {
                mem: vec![0; 0x1_0000],
                word_reads: 0,
                writes_fail: false,
            }
        }

        fn poke_long(&mut self, addr: u32, value: u32) {
            let a = addr as usize;
            self.mem[a..a + 4].copy_from_slice(&value.to_be_bytes());
        }

        fn peek_long(&self, addr: u32) -> u32 {
            let a = addr as usize;
            u32::from_be_bytes([self.mem[a], self.mem[a + 1], self.mem[a + 2], self.mem[a + 3]])
        }
    }

    impl M68kBus for Ram {
        fn read_byte(&mut self, addr: u32, _fc: FunctionCode) -> BusResult {
            BusResult::new(u32::from(self.mem[addr as usize & 0xFFFF]))
        }

        fn read_word(&mut self, addr: u32, _fc: FunctionCode) -> BusResult {
            self.word_reads += 1;
            let a = addr as usize & 0xFFFF;
            BusResult::new(u32::from(u16::from_be_bytes([self.mem[a], self.mem[a + 1]])))
        }

        fn write_byte(&mut self, addr: u32, value: u8, _fc: FunctionCode) -> BusResult {
            if self.writes_fail {
                return BusResult::error();
            }
            self.mem[addr as usize & 0xFFFF] = value;
            BusResult::write_ok()
        }

        fn write_word(&mut self, addr: u32, value: u16, _fc: FunctionCode) -> BusResult {
            if self.writes_fail {
                return BusResult::error();
            }
            let a = addr as usize & 0xFFFF;
            self.mem[a..a + 2].copy_from_slice(&value.to_be_bytes());
            BusResult::write_ok()
        }
    }

    /// Two 10-bit levels, 4K pages, one mapping 0x0040_1000 -> 0x0080_0000.
    fn mmu_030(ram: &mut Ram) -> Mmu {
        let mut mmu = Mmu::new(MmuKind::Pmmu030, 22);
        mmu.crp_limit = 2;
        mmu.crp_aptr = 0x1000;
        ram.poke_long(0x1004, 0x2000 | 2);
        ram.poke_long(0x2004, 0x0080_0000 | 1);
        mmu.set_tc(0x80C0_AA00, false);
        mmu
    }

    #[test]
    fn tc_validation_requires_32_bits() {
        assert!(Mmu::tc_is_valid(0x80C0_AA00));
        assert!(!Mmu::tc_is_valid(0x80C0_A900));
        assert!(Mmu::tc_is_valid(0));
    }

    #[test]
    fn walk_030_maps_page_and_sets_used() {
        let mut ram = Ram::new();
        let mut mmu = mmu_030(&mut ram);
        let physical = mmu.translate(&mut ram, 0x0040_1234, FunctionCode::UserData, false);
        assert_eq!(physical, Ok(0x0080_0234));
        assert_ne!(ram.peek_long(0x1004) & DESC_U, 0);
        assert_ne!(ram.peek_long(0x2004) & DESC_U, 0);
        assert_eq!(ram.peek_long(0x2004) & DESC_M, 0);
        assert_eq!(mmu.atc_valid_entries(), 1);
    }

    #[test]
    fn atc_hit_skips_walk_until_flushed() {
        let mut ram = Ram::new();
        let mut mmu = mmu_030(&mut ram);
        mmu.translate(&mut ram, 0x0040_1000, FunctionCode::UserData, false).unwrap();
        let after_walk = ram.word_reads;
        mmu.translate(&mut ram, 0x0040_1FFE, FunctionCode::UserData, false).unwrap();
        assert_eq!(ram.word_reads, after_walk);

        mmu.flush_fc(1, 7);
        mmu.translate(&mut ram, 0x0040_1000, FunctionCode::UserData, false).unwrap();
        assert!(ram.word_reads > after_walk);
    }

    #[test]
    fn first_write_sets_modified() {
        let mut ram = Ram::new();
        let mut mmu = mmu_030(&mut ram);
        mmu.translate(&mut ram, 0x0040_1000, FunctionCode::UserData, false).unwrap();
        mmu.translate(&mut ram, 0x0040_1000, FunctionCode::UserData, true).unwrap();
        assert_ne!(ram.peek_long(0x2004) & DESC_M, 0);
        assert_eq!(mmu.atc_valid_entries(), 1);
    }

    #[test]
    fn write_protected_page_faults() {
        let mut ram = Ram::new();
        let mut mmu = mmu_030(&mut ram);
        ram.poke_long(0x2004, 0x0080_0000 | DESC_WP | 1);
        let fault = mmu
            .translate(&mut ram, 0x0040_1000, FunctionCode::UserData, true)
            .unwrap_err();
        assert_eq!(fault.address, 0x0040_1000);
        assert_ne!(mmu.mmusr & mmusr::W, 0);
    }

    #[test]
    fn invalid_root_faults_with_invalid_status() {
        let mut ram = Ram::new();
        let mut mmu = mmu_030(&mut ram);
        mmu.crp_limit = 0;
        assert!(mmu.translate(&mut ram, 0x1234, FunctionCode::UserData, false).is_err());
        assert_ne!(mmu.mmusr & mmusr::I, 0);
    }

    #[test]
    fn transparent_translation_bypasses_tables() {
        let mut ram = Ram::new();
        let mut mmu = mmu_030(&mut ram);
        mmu.crp_limit = 0;
        mmu.tt0 = 0x00FF_8107;
        assert_eq!(mmu.translate(&mut ram, 0x00AB_CDEF, FunctionCode::SupervisorData, true), Ok(0x00AB_CDEF));
        assert_eq!(mmu.atc_valid_entries(), 0);
    }

    #[test]
    fn cpu_space_is_never_translated() {
        let mut ram = Ram::new();
        let mut mmu = mmu_030(&mut ram);
        mmu.crp_limit = 0;
        assert_eq!(mmu.translate(&mut ram, 0xFFFF_FFF4, FunctionCode::CpuSpace, false), Ok(0xFFFF_FFF4));
    }

    #[test]
    fn ptest_reports_levels_without_loading_atc() {
        let mut ram = Ram::new();
        let mut mmu = mmu_030(&mut ram);
        let (status, descriptor) = mmu.ptest_030(&mut ram, 0x0040_1000, FunctionCode::UserData, false, 7);
        assert_eq!(status & mmusr::N, 2);
        assert_eq!(descriptor, 0x2004);
        assert_eq!(mmu.atc_valid_entries(), 0);
        // PTEST leaves the tables alone.
        assert_eq!(ram.peek_long(0x2004) & DESC_U, 0);
    }

    #[test]
    fn walk_040_three_levels() {
        let mut ram = Ram::new();
        let mut mmu = Mmu::new(MmuKind::Mmu040, 64);
        mmu.urp = 0x4000;
        ram.poke_long(0x4004, 0x5000 | 3);
        ram.poke_long(0x5004, 0x6000 | 3);
        ram.poke_long(0x600C, 0x0012_3000 | 1);
        mmu.set_tc(tc::E_040, false);

        let physical = mmu.translate(&mut ram, 0x0204_3123, FunctionCode::UserData, true);
        assert_eq!(physical, Ok(0x0012_3123));
        assert_ne!(ram.peek_long(0x600C) & DESC_M, 0);

        // Supervisor accesses use SRP, which is empty.
        assert!(mmu.translate(&mut ram, 0x0204_3123, FunctionCode::SupervisorData, false).is_err());
    }

    #[test]
    fn pflush_040_keeps_global_entries() {
        let mut ram = Ram::new();
        let mut mmu = Mmu::new(MmuKind::Mmu040, 64);
        mmu.urp = 0x4000;
        ram.poke_long(0x4004, 0x5000 | 3);
        ram.poke_long(0x5004, 0x6000 | 3);
        ram.poke_long(0x600C, 0x0012_3000 | DESC_G_040 | 1);
        mmu.set_tc(tc::E_040, false);
        mmu.translate(&mut ram, 0x0204_3000, FunctionCode::UserData, false).unwrap();

        mmu.flush_040(None, false, false);
        assert_eq!(mmu.atc_valid_entries(), 1);
        mmu.flush_040(None, false, true);
        assert_eq!(mmu.atc_valid_entries(), 0);
    }

    #[test]
    fn failed_used_bit_writeback_is_a_bus_error() {
        let mut ram = Ram::new();
        let mut mmu = mmu_030(&mut ram);
        ram.writes_fail = true;
        assert!(mmu.translate(&mut ram, 0x0040_1000, FunctionCode::UserData, false).is_err());
        assert_ne!(mmu.mmusr & mmusr::B, 0);
        assert_eq!(mmu.atc_valid_entries(), 0);
    }

    #[test]
    fn failed_040_writeback_is_a_bus_error() {
        let mut ram = Ram::new();
        let mut mmu = Mmu::new(MmuKind::Mmu040, 64);
        mmu.urp = 0x4000;
        ram.poke_long(0x4004, 0x5000 | 3);
        ram.poke_long(0x5004, 0x6000 | 3);
        ram.poke_long(0x600C, 0x0012_3000 | 1);
        mmu.set_tc(tc::E_040, false);
        ram.writes_fail = true;

        assert!(mmu.translate(&mut ram, 0x0204_3123, FunctionCode::UserData, false).is_err());
        assert_ne!(mmu.mmusr_040 & mmusr040::B, 0);
    }
}
