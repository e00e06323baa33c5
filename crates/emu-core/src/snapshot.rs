//! Save-state registry.
//!
//! Devices declare the named fields that make up their persistent state
//! while they are being constructed. Once the machine is assembled the
//! registry is frozen; from then on the field set is fixed and snapshots
//! can be taken and restored by name. Storage of the resulting
//! [`Snapshot`] is up to the host (it is a plain serde value).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage width of a registered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldWidth {
    Bool,
    U8,
    U16,
    U32,
    U64,
}

impl FieldWidth {
    /// Largest value a field of this width can hold.
    #[must_use]
    pub const fn max(self) -> u64 {
        match self {
            Self::Bool => 1,
            Self::U8 => 0xFF,
            Self::U16 => 0xFFFF,
            Self::U32 => 0xFFFF_FFFF,
            Self::U64 => u64::MAX,
        }
    }
}

/// A registered field: `owner.name` plus its width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateField {
    pub owner: String,
    pub name: String,
    pub width: FieldWidth,
}

impl StateField {
    /// Fully qualified key used inside snapshots.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }
}

/// Failures while registering, saving or restoring state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("state registry is frozen; cannot register `{0}`")]
    Frozen(String),
    #[error("state field `{0}` is registered twice")]
    Duplicate(String),
    #[error("device does not know state field `{0}`")]
    UnknownField(String),
    #[error("snapshot has no value for `{0}`")]
    MissingField(String),
    #[error("value {value:#x} does not fit state field `{key}`")]
    OutOfRange { key: String, value: u64 },
}

/// A device whose state can be saved field by field.
///
/// Field names are local to the device; the registry prefixes them with the
/// device tag.
pub trait Stateful {
    /// Fields this device persists, with their widths.
    fn state_fields(&self) -> Vec<(String, FieldWidth)>;

    /// Current value of a field.
    fn save_field(&self, name: &str) -> Option<u64>;

    /// Overwrite a field from a snapshot.
    fn load_field(&mut self, name: &str, value: u64) -> Result<(), StateError>;

    /// Called once after every field has been loaded.
    fn post_load(&mut self) {}
}

/// The set of named fields making up a machine's state.
#[derive(Debug, Default)]
pub struct StateRegistry {
    fields: Vec<StateField>,
    frozen: bool,
}

impl StateRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one field.
    pub fn register(&mut self, owner: &str, name: &str, width: FieldWidth) -> Result<(), StateError> {
        let field = StateField {
            owner: owner.to_string(),
            name: name.to_string(),
            width,
        };
        if self.frozen {
            return Err(StateError::Frozen(field.key()));
        }
        if self.fields.iter().any(|f| f.owner == owner && f.name == name) {
            return Err(StateError::Duplicate(field.key()));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Declare every field a device reports.
    pub fn register_device<S: Stateful>(&mut self, owner: &str, device: &S) -> Result<(), StateError> {
        for (name, width) in device.state_fields() {
            self.register(owner, &name, width)?;
        }
        Ok(())
    }

    /// Fix the field set. Further registration fails.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Registered fields, in registration order.
    #[must_use]
    pub fn fields(&self) -> &[StateField] {
        &self.fields
    }

    /// Capture the registered fields of `device`.
    pub fn save<S: Stateful>(&self, owner: &str, device: &S) -> Result<Snapshot, StateError> {
        let mut snapshot = Snapshot::default();
        for field in self.fields.iter().filter(|f| f.owner == owner) {
            let value = device
                .save_field(&field.name)
                .ok_or_else(|| StateError::UnknownField(field.key()))?;
            snapshot.values.insert(field.key(), value);
        }
        Ok(snapshot)
    }

    /// Load the registered fields of `device` from `snapshot`.
    pub fn restore<S: Stateful>(&self, owner: &str, device: &mut S, snapshot: &Snapshot) -> Result<(), StateError> {
        for field in self.fields.iter().filter(|f| f.owner == owner) {
            let key = field.key();
            let value = *snapshot
                .values
                .get(&key)
                .ok_or_else(|| StateError::MissingField(key.clone()))?;
            if value > field.width.max() {
                return Err(StateError::OutOfRange { key, value });
            }
            device.load_field(&field.name, value)?;
        }
        device.post_load();
        Ok(())
    }
}

/// Values of every registered field at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    values: BTreeMap<String, u64>,
}

impl Snapshot {
    /// Value stored for a fully qualified key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<u64> {
        self.values.get(key).copied()
    }

    /// Number of stored fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge another device's fields into this snapshot.
    pub fn merge(&mut self, other: Snapshot) {
        self.values.extend(other.values);
    }
}
