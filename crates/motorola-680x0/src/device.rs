//! The CPU as a schedulable device.
//!
//! [`CpuDevice`] ties a [`Cpu680x0`] to its configuration, its input
//! clock and its tag in the machine's save-state registry. The host
//! scheduler drives it with time slices or raw cycle budgets.

use std::time::Duration;

use emu_core::{MasterClock, Snapshot, StateError, StateRegistry, Ticks};
use thiserror::Error;

use crate::bus::M68kBus;
use crate::config::{ConfigError, CpuConfig};
use crate::cpu::Cpu680x0;

/// Failures while building or snapshotting a device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("invalid CPU configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("save state: {0}")]
    State(#[from] StateError),
}

/// A configured CPU registered with the machine.
#[derive(Debug, Clone)]
pub struct CpuDevice {
    tag: String,
    config: CpuConfig,
    clock: MasterClock,
    cpu: Cpu680x0,
}

impl CpuDevice {
    /// Validate `config`, build the CPU and register its state fields
    /// under `tag`. The host freezes the registry once every device is in.
    pub fn new(tag: &str, config: CpuConfig, registry: &mut StateRegistry) -> Result<Self, DeviceError> {
        config.validate()?;
        let mut cpu = Cpu680x0::new(config.model);
        cpu.mmu_mut().hmmu = config.hmmu;
        // A board may leave the socket empty.
        cpu.caps.fpu = config.fpu;
        registry.register_device(tag, &cpu)?;
        log::debug!(
            "{tag}: {} at {} Hz, fpu={}, hmmu={:?}",
            config.model.name(),
            config.clock_hz,
            config.fpu,
            config.hmmu
        );
        Ok(Self {
            tag: tag.to_string(),
            config,
            clock: MasterClock::new(config.clock_hz),
            cpu,
        })
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub const fn config(&self) -> &CpuConfig {
        &self.config
    }

    #[must_use]
    pub const fn clock(&self) -> MasterClock {
        self.clock
    }

    #[must_use]
    pub const fn cpu(&self) -> &Cpu680x0 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu680x0 {
        &mut self.cpu
    }

    /// Assert reset and load the vectors.
    pub fn reset<B: M68kBus>(&mut self, bus: &mut B) -> u32 {
        self.cpu.pulse_reset(bus)
    }

    /// Run one instruction.
    pub fn step<B: M68kBus>(&mut self, bus: &mut B) -> u32 {
        self.cpu.step(bus)
    }

    /// Run for a cycle budget. Returns the cycles used.
    pub fn execute_run<B: M68kBus>(&mut self, bus: &mut B, budget: u32) -> u32 {
        self.cpu.execute_run(bus, budget)
    }

    /// Run for a slice of emulated time. Returns the cycles used, which
    /// may overshoot the slice by the tail of the last instruction.
    pub fn run_for<B: M68kBus>(&mut self, bus: &mut B, slice: Duration) -> Ticks {
        let budget = self.clock.cycles_in(slice).get();
        let mut used = 0u64;
        while used < budget {
            let chunk = u32::try_from(budget - used).unwrap_or(u32::MAX);
            let ran = self.cpu.execute_run(bus, chunk);
            if ran == 0 {
                break;
            }
            used += u64::from(ran);
        }
        Ticks::new(used)
    }

    /// Emulated time elapsed since power-on.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.clock.duration_of(self.cpu.total_cycles())
    }

    /// Capture the CPU's registered fields.
    pub fn save(&self, registry: &StateRegistry) -> Result<Snapshot, DeviceError> {
        Ok(registry.save(&self.tag, &self.cpu)?)
    }

    /// Restore from a snapshot taken with the same field set.
    pub fn restore(&mut self, registry: &StateRegistry, snapshot: &Snapshot) -> Result<(), DeviceError> {
        registry.restore(&self.tag, &mut self.cpu, snapshot)?;
        Ok(())
    }
}
