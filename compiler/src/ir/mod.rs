//! Intermediate Representation (IR) for the flow compiler
//!
//! Lowering produces a [`Program`]: a tree of functions, blocks,
//! continuations, instructions and cleanup actions. Every mutable node is
//! allocated once in an arena owned by the program and referenced by a
//! typed id, so the tree can be rewritten in place by optimization passes
//! and checked by the [`validation`] module between them.

pub mod ids;
pub mod types;
pub mod variables;
pub mod exec;
pub mod instructions;
pub mod continuations;
pub mod blocks;
pub mod functions;
pub mod program;
pub mod builder;
pub mod dump;
pub mod scope;
pub mod fixup;
pub mod passes;
pub mod validation;

pub use ids::*;
pub use types::*;
pub use variables::*;
pub use exec::*;
pub use instructions::*;
pub use continuations::*;
pub use blocks::*;
pub use functions::*;
pub use program::*;
pub use builder::*;
pub use fixup::{FixupMode, FixupVariables};
pub use passes::{PassManager, ProgramPass};
pub use validation::{
    CleanupPolicy, ValidationError, ValidationErrorKind, ValidationResult, Validator,
    ValidatorConfig,
};

/// IR format version, reported by `flowc info`
pub const IR_VERSION: u32 = 1;
