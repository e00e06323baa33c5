//! Motorola 680x0 family interpreter core.
//!
//! One engine covers the 68000, 68008, 68010, 68020 (plain, FPU, PMMU and
//! HMMU boards), 68EC020, 68EC030, 68030, the 68040 family, the SCC68070,
//! CPU32 and ColdFire. Model differences are data ([`CpuCapabilities`])
//! rather than separate code paths.
//!
//! The host supplies memory through [`M68kBus`], drives the interrupt
//! lines, and calls [`Cpu680x0::step`] or [`Cpu680x0::execute_run`] (or
//! the [`CpuDevice`] wrappers) from its scheduler. Guest-visible faults
//! never leave the crate as errors: they are vectored into the guest like
//! the hardware does.

pub mod addressing;
pub mod alu;
mod arith;
pub mod bits;
mod branches;
pub mod bus;
pub mod config;
pub mod cpu;
pub mod decode;
pub mod device;
pub mod disasm;
mod ea;
mod exceptions;
mod execute;
pub mod fault;
pub mod flags;
pub mod fpu;
pub mod hmmu;
pub mod icache;
mod logic;
mod memory;
mod misc;
pub mod mmu;
pub mod model;
pub mod registers;
pub mod shifts;
mod state;
mod system;
pub mod timing;

pub use addressing::AddrMode;
pub use alu::Size;
pub use bus::{BusResult, FunctionCode, InterruptAck, M68kBus};
pub use config::{ConfigError, CpuConfig};
pub use cpu::{Cpu680x0, IDLE_CYCLES};
pub use device::{CpuDevice, DeviceError};
pub use disasm::disassemble;
pub use fault::{AccessFault, ExceptionKind, ExceptionRequest, Fault};
pub use flags::{C, N, Status, V, X, Z};
pub use fpu::Fpu;
pub use hmmu::HmmuMode;
pub use mmu::{Mmu, MmuFault};
pub use model::{CpuCapabilities, CpuModel, IsaLevel, MmuKind};
pub use registers::Registers;
pub use system::control;
