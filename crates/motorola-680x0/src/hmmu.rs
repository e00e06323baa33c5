//! Apple HMMU: fixed 24-bit to 32-bit address translation.
//!
//! Macintosh II and LC boards run a 68020 in 24-bit mode behind a small
//! mapping chip. There are no tables: the 16MB logical space is cut into
//! RAM, ROM, slot and I/O windows at fixed boundaries.

use serde::{Deserialize, Serialize};

/// HMMU translation layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HmmuMode {
    /// No translation (32-bit mode).
    #[default]
    Disabled,
    /// Macintosh II layout.
    MacII,
    /// Macintosh LC layout.
    MacLc,
}

impl HmmuMode {
    /// Numeric encoding used in save states.
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::MacII => 1,
            Self::MacLc => 2,
        }
    }

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits {
            1 => Self::MacII,
            2 => Self::MacLc,
            _ => Self::Disabled,
        }
    }
}

/// Translate a logical address under `mode`.
///
/// The top byte of a logical address is ignored, as a 24-bit part would
/// never drive it; RAM is the folded address itself.
#[must_use]
pub fn translate(mode: HmmuMode, address: u32) -> u32 {
    let low = address & 0x00FF_FFFF;
    match mode {
        HmmuMode::Disabled => address,
        HmmuMode::MacII => match low {
            0x80_0000..=0x8F_FFFF => low | 0x4000_0000,
            0x90_0000..=0xEF_FFFF => slot_space(low),
            0xF0_0000..=0xFF_FFFF => low | 0x5000_0000,
            _ => low,
        },
        HmmuMode::MacLc => match low {
            0xA0_0000..=0xDF_FFFF => low | 0x4000_0000,
            0xE0_0000..=0xEF_FFFF => slot_space(low),
            0xF0_0000..=0xFF_FFFF => low | 0x5000_0000,
            _ => low,
        },
    }
}

/// 24-bit slot window $s0_0000 to the 32-bit slot space $Fs00_0000.
const fn slot_space(low: u32) -> u32 {
    0xF000_0000 | ((low & 0xF0_0000) << 4) | (low & 0x0F_FFFF)
}
