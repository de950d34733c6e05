//! Arena identifiers for IR nodes
//!
//! Every mutable IR node (block, continuation, instruction, cleanup action)
//! lives in exactly one arena slot owned by the [`Program`](super::Program).
//! Everything else refers to it through one of these lightweight ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to define ID types with consistent behavior
macro_rules! define_id_type {
    (
        $(#[$meta:meta])*
        $name:ident, $prefix:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Create a new ID from a raw u32 value
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw u32 value of this ID
            pub const fn as_raw(self) -> u32 {
                self.0
            }

            /// Arena slot for this ID
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Check if this ID is valid (not the sentinel value)
            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }

            /// Get an invalid/null sentinel value
            pub const fn invalid() -> Self {
                Self(u32::MAX)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}{}", $prefix, self.0)
                } else {
                    write!(f, "{}<invalid>", $prefix)
                }
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self::from_raw(raw)
            }
        }
    };
}

define_id_type! {
    /// Unique identifier for functions within a program
    FunctionId, "fn"
}

define_id_type! {
    /// Unique identifier for blocks (main and nested)
    BlockId, "bb"
}

define_id_type! {
    /// Unique identifier for continuations
    ContinuationId, "cont"
}

define_id_type! {
    /// Unique identifier for instructions, including cleanup actions' instructions
    InstructionId, "inst"
}

define_id_type! {
    /// Unique identifier for cleanup actions
    CleanupId, "cleanup"
}

/// Any mutable node in the IR tree, used for identity bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Block(BlockId),
    Continuation(ContinuationId),
    Instruction(InstructionId),
    Cleanup(CleanupId),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Block(id) => write!(f, "{}", id),
            NodeId::Continuation(id) => write!(f, "{}", id),
            NodeId::Instruction(id) => write!(f, "{}", id),
            NodeId::Cleanup(id) => write!(f, "{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(BlockId::from_raw(3).to_string(), "bb3");
        assert_eq!(FunctionId::from_raw(0).to_string(), "fn0");
        assert_eq!(InstructionId::invalid().to_string(), "inst<invalid>");
        assert_eq!(NodeId::Cleanup(CleanupId(7)).to_string(), "cleanup7");
    }

    #[test]
    fn test_default_is_invalid() {
        assert!(!ContinuationId::default().is_valid());
        assert!(ContinuationId::from_raw(0).is_valid());
        assert_eq!(BlockId::from(5).index(), 5);
    }
}
