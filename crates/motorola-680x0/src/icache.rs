//! On-chip instruction cache (68020/030/040).
//!
//! 128 direct-mapped one-word entries indexed by `(address >> 1) & 0x7F`.
//! Each entry is tagged with the full word address and with the FC2 bit
//! (supervisor/user) of the fetch that filled it.

/// Number of cache entries.
pub const ICACHE_ENTRIES: usize = 128;

/// CACR bits on 68020/68030.
pub mod cacr {
    /// Enable instruction cache.
    pub const EI: u32 = 0x0001;
    /// Freeze instruction cache.
    pub const FI: u32 = 0x0002;
    /// Clear entry addressed by CAAR.
    pub const CEI: u32 = 0x0004;
    /// Clear instruction cache.
    pub const CI: u32 = 0x0008;
    /// Enable instruction cache on the 68040.
    pub const IE_040: u32 = 0x0000_8000;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Line {
    tag: u32,
    supervisor: bool,
    data: u16,
    valid: bool,
}

/// The instruction cache proper; enable and freeze policy lives in the CPU.
#[derive(Debug, Clone)]
pub struct InstructionCache {
    lines: [Line; ICACHE_ENTRIES],
}

impl Default for InstructionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: [Line::default(); ICACHE_ENTRIES],
        }
    }

    /// Entry index for an address.
    #[must_use]
    pub const fn index(address: u32) -> usize {
        ((address >> 1) & 0x7F) as usize
    }

    /// Cached word for `address`, if present.
    #[must_use]
    pub fn lookup(&self, address: u32, supervisor: bool) -> Option<u16> {
        let line = &self.lines[Self::index(address)];
        (line.valid && line.tag == address & !1 && line.supervisor == supervisor).then_some(line.data)
    }

    /// Store a fetched word.
    pub fn fill(&mut self, address: u32, supervisor: bool, data: u16) {
        self.lines[Self::index(address)] = Line {
            tag: address & !1,
            supervisor,
            data,
            valid: true,
        };
    }

    /// Drop the entry caching `address`, whatever its FC. Used when a data
    /// write hits an address the cache holds.
    pub fn invalidate_address(&mut self, address: u32) {
        let line = &mut self.lines[Self::index(address)];
        if line.valid && line.tag == address & !1 {
            line.valid = false;
            log::trace!("icache: write to {address:#010x} invalidated entry");
        }
    }

    /// Drop whatever the entry selected by `address` holds (CACR.CEI).
    pub fn invalidate_entry(&mut self, address: u32) {
        self.lines[Self::index(address)].valid = false;
    }

    /// Drop every entry mapping into the 4K page holding `address` (CINVP).
    pub fn invalidate_page(&mut self, address: u32) {
        let page = address & !0xFFF;
        for line in &mut self.lines {
            if line.valid && line.tag & !0xFFF == page {
                line.valid = false;
            }
        }
    }

    /// Drop every entry (CACR.CI, CINVA, reset, state restore).
    pub fn invalidate_all(&mut self) {
        for line in &mut self.lines {
            line.valid = false;
        }
    }

    /// Number of valid entries.
    #[must_use]
    pub fn valid_entries(&self) -> usize {
        self.lines.iter().filter(|line| line.valid).count()
    }
}
