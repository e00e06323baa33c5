//! CPU device configuration.
//!
//! A [`CpuConfig`] names the model plus the few board-level options that
//! are not implied by it: the input clock, whether a floating-point
//! coprocessor is fitted, and the HMMU layout on Apple boards. Hosts can
//! build one in code or deserialize it from their machine description:
//!
//! ```toml
//! model = "m68020hmmu"
//! clock_hz = 15_667_200
//! fpu = true
//! hmmu = "macii"
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hmmu::HmmuMode;
use crate::model::{CpuModel, MmuKind};

/// Invalid model/option combinations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("clock frequency must be non-zero")]
    ZeroClock,
    #[error("{0} has no floating-point coprocessor")]
    NoFpu(&'static str),
    #[error("{model} has no HMMU; cannot select the {mode:?} layout")]
    NoHmmu { model: &'static str, mode: HmmuMode },
}

/// Full CPU configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CpuConfig {
    pub model: CpuModel,
    /// Input clock in Hz.
    pub clock_hz: u64,
    /// Floating-point coprocessor fitted. Without one, FPU opcodes take
    /// the line 1111 trap. Absent from a config file means not fitted.
    #[serde(default)]
    pub fpu: bool,
    /// HMMU layout; only meaningful on [`CpuModel::M68020Hmmu`].
    #[serde(default)]
    pub hmmu: HmmuMode,
}

/// Clock a model usually ships at.
const fn typical_clock_hz(model: CpuModel) -> u64 {
    match model {
        CpuModel::M68000 | CpuModel::M68008 | CpuModel::M68008Plcc => 8_000_000,
        CpuModel::M68010 => 10_000_000,
        CpuModel::Scc68070 => 15_000_000,
        CpuModel::M68EC020
        | CpuModel::M68020
        | CpuModel::M68020Fpu
        | CpuModel::M68020Pmmu
        | CpuModel::M68020Hmmu => 16_000_000,
        CpuModel::Cpu32 => 16_777_216,
        CpuModel::M68EC030 | CpuModel::M68030 | CpuModel::M68EC040 | CpuModel::M68LC040 | CpuModel::M68040 => {
            25_000_000
        }
        CpuModel::ColdFire => 40_000_000,
    }
}

impl CpuConfig {
    /// Preset for `model` at its usual clock, with the FPU fitted when the
    /// part carries one.
    #[must_use]
    pub const fn new(model: CpuModel) -> Self {
        Self {
            model,
            clock_hz: typical_clock_hz(model),
            fpu: model.capabilities().fpu,
            hmmu: HmmuMode::Disabled,
        }
    }

    #[must_use]
    pub const fn with_clock(mut self, clock_hz: u64) -> Self {
        self.clock_hz = clock_hz;
        self
    }

    #[must_use]
    pub const fn with_fpu(mut self, fpu: bool) -> Self {
        self.fpu = fpu;
        self
    }

    #[must_use]
    pub const fn with_hmmu(mut self, hmmu: HmmuMode) -> Self {
        self.hmmu = hmmu;
        self
    }

    /// Check the options against what the model can carry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let caps = self.model.capabilities();
        if self.clock_hz == 0 {
            return Err(ConfigError::ZeroClock);
        }
        if self.fpu && !caps.fpu {
            return Err(ConfigError::NoFpu(self.model.name()));
        }
        if self.hmmu != HmmuMode::Disabled && caps.mmu != MmuKind::Hmmu {
            return Err(ConfigError::NoHmmu {
                model: self.model.name(),
                mode: self.hmmu,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate_for_every_model() {
        for model in CpuModel::ALL {
            let config = CpuConfig::new(model);
            assert_eq!(config.validate(), Ok(()), "{}", model.name());
            assert_eq!(config.fpu, model.capabilities().fpu);
        }
    }

    #[test]
    fn rejects_options_the_model_lacks() {
        assert_eq!(
            CpuConfig::new(CpuModel::M68000).with_clock(0).validate(),
            Err(ConfigError::ZeroClock)
        );
        assert_eq!(
            CpuConfig::new(CpuModel::M68EC040).with_fpu(true).validate(),
            Err(ConfigError::NoFpu("m68ec040"))
        );
        assert!(matches!(
            CpuConfig::new(CpuModel::M68030).with_hmmu(HmmuMode::MacII).validate(),
            Err(ConfigError::NoHmmu { model: "m68030", .. })
        ));
        assert_eq!(
            CpuConfig::new(CpuModel::M68020Hmmu).with_hmmu(HmmuMode::MacLc).validate(),
            Ok(())
        );
    }

    #[test]
    fn deserializes_from_json_with_defaults() {
        let config: CpuConfig = serde_json::from_str(r#"{"model":"m68010","clock_hz":12000000}"#).unwrap();
        assert_eq!(config.model, CpuModel::M68010);
        assert_eq!(config.clock_hz, 12_000_000);
        assert!(!config.fpu);
        assert_eq!(config.hmmu, HmmuMode::Disabled);

        let config: CpuConfig =
            serde_json::from_str(r#"{"model":"m68020hmmu","clock_hz":15667200,"fpu":true,"hmmu":"macii"}"#).unwrap();
        assert_eq!(config.hmmu, HmmuMode::MacII);
        assert!(config.validate().is_ok());

        assert!(serde_json::from_str::<CpuConfig>(r#"{"model":"m68000","clock_hz":1,"turbo":true}"#).is_err());
    }
}
