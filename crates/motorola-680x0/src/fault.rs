//! Exception requests raised while executing an instruction.
//!
//! Every memory access and instruction handler returns [`Fault<T>`]. An
//! `Err` aborts the rest of the instruction and is handed to the exception
//! controller at the step boundary; nothing unwinds.

use crate::alu::Size;
use crate::bus::FunctionCode;

/// Details of the access that raised a bus or address error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFault {
    /// Logical address of the faulting access.
    pub address: u32,
    /// True for a write cycle.
    pub write: bool,
    /// Function code driven during the access.
    pub fc: FunctionCode,
    /// Operand size of the access.
    pub size: Size,
    /// True when fetching the instruction stream.
    pub instruction: bool,
}

/// Cause of an exception, in vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    Reset,
    BusError,
    AddressError,
    IllegalInstruction,
    ZeroDivide,
    /// CHK and CHK2.
    Chk,
    /// TRAPV and TRAPcc.
    Trapv,
    PrivilegeViolation,
    Trace,
    LineA,
    LineF,
    FormatError,
    UninitializedInterrupt,
    SpuriousInterrupt,
    /// PMMU rejected a TC value.
    MmuConfiguration,
    /// Interrupt at `level`, taken through `vector`.
    Interrupt { level: u8, vector: u8 },
    /// TRAP #n.
    Trap(u8),
}

impl ExceptionKind {
    /// Vector number.
    #[must_use]
    pub const fn vector(self) -> u8 {
        match self {
            Self::Reset => 0,
            Self::BusError => 2,
            Self::AddressError => 3,
            Self::IllegalInstruction => 4,
            Self::ZeroDivide => 5,
            Self::Chk => 6,
            Self::Trapv => 7,
            Self::PrivilegeViolation => 8,
            Self::Trace => 9,
            Self::LineA => 10,
            Self::LineF => 11,
            Self::FormatError => 14,
            Self::UninitializedInterrupt => 15,
            Self::SpuriousInterrupt => 24,
            Self::MmuConfiguration => 56,
            Self::Interrupt { vector, .. } => vector,
            Self::Trap(n) => 32 + (n & 15),
        }
    }

    /// Group 0: reset, bus error, address error.
    #[must_use]
    pub const fn is_group0(self) -> bool {
        matches!(self, Self::Reset | Self::BusError | Self::AddressError)
    }

    /// Group 2: exceptions raised by the normal completion of an
    /// instruction. Trace still applies to these.
    #[must_use]
    pub const fn is_group2(self) -> bool {
        matches!(self, Self::Trap(_) | Self::Trapv | Self::Chk | Self::ZeroDivide)
    }
}

/// A pending exception and, for group 0, the access that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionRequest {
    pub kind: ExceptionKind,
    pub access: Option<AccessFault>,
}

impl ExceptionRequest {
    #[must_use]
    pub const fn new(kind: ExceptionKind) -> Self {
        Self { kind, access: None }
    }

    /// Bus error for `access`.
    #[must_use]
    pub const fn bus_error(access: AccessFault) -> Self {
        Self {
            kind: ExceptionKind::BusError,
            access: Some(access),
        }
    }

    /// Address error for `access`.
    #[must_use]
    pub const fn address_error(access: AccessFault) -> Self {
        Self {
            kind: ExceptionKind::AddressError,
            access: Some(access),
        }
    }
}

/// Result of anything that can raise an exception.
pub type Fault<T> = Result<T, ExceptionRequest>;

/// Shorthand for raising an exception without an access record.
pub(crate) fn raise<T>(kind: ExceptionKind) -> Fault<T> {
    Err(ExceptionRequest::new(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_follow_the_table() {
        assert_eq!(ExceptionKind::Trap(15).vector(), 47);
        assert_eq!(ExceptionKind::Interrupt { level: 3, vector: 27 }.vector(), 27);
        assert_eq!(ExceptionKind::FormatError.vector(), 14);
        assert!(ExceptionKind::AddressError.is_group0());
        assert!(ExceptionKind::ZeroDivide.is_group2());
        assert!(!ExceptionKind::Trace.is_group2());
    }
}
