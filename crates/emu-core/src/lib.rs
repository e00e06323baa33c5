//! Core types shared by the interpreter and its host.
//!
//! Everything is counted in clock ticks of the CPU input clock. State that
//! must survive a save/restore goes through the [`StateRegistry`], and every
//! component can be inspected through [`Observable`] without side effects.

mod clock;
mod observable;
mod snapshot;
mod ticks;

pub use clock::MasterClock;
pub use observable::{Observable, Value};
pub use snapshot::{FieldWidth, Snapshot, StateError, StateField, StateRegistry, Stateful};
pub use ticks::Ticks;
