//! Validation errors
//!
//! Every error here signals a compiler defect, never a mistake in the
//! user's program. Messages carry the function name and a dump of the
//! offending construct so a failure can be reproduced from the log alone.

use crate::ir::{BlockId, BlockParent, ContinuationId, NodeId};
use std::fmt;
use thiserror::Error;

pub type ValidationResult<T> = Result<T, ValidationError>;

/// First violation found while validating a program
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error(transparent)]
    Initialization(#[from] InitializationError),
    #[error(transparent)]
    ExecContext(#[from] ExecContextError),
    #[error(transparent)]
    CleanupOwnership(#[from] CleanupOwnershipError),
}

/// Error class, without the details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    Structural,
    Scope,
    Capability,
    Initialization,
    ExecContext,
    CleanupOwnership,
}

impl ValidationError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            ValidationError::Structural(_) => ValidationErrorKind::Structural,
            ValidationError::Scope(_) => ValidationErrorKind::Scope,
            ValidationError::Capability(_) => ValidationErrorKind::Capability,
            ValidationError::Initialization(_) => ValidationErrorKind::Initialization,
            ValidationError::ExecContext(_) => ValidationErrorKind::ExecContext,
            ValidationError::CleanupOwnership(_) => ValidationErrorKind::CleanupOwnership,
        }
    }
}

impl ValidationErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ValidationErrorKind::Structural => "StructuralError",
            ValidationErrorKind::Scope => "ScopeError",
            ValidationErrorKind::Capability => "CapabilityError",
            ValidationErrorKind::Initialization => "InitializationError",
            ValidationErrorKind::ExecContext => "ExecContextError",
            ValidationErrorKind::CleanupOwnership => "CleanupOwnershipError",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The IR is not a well-linked tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("duplicate construct {node} in functions {function} {previous}:\n{dump}")]
    DuplicateNode {
        node: NodeId,
        function: String,
        previous: String,
        dump: String,
    },

    #[error("{node} referenced from function {function} does not exist")]
    MissingNode { function: String, node: NodeId },

    #[error("main block {block} of function {function} is a {kind} block")]
    BadMainBlockKind {
        function: String,
        block: BlockId,
        kind: String,
    },

    #[error("bad parent for block {block} in function {function}: is {found} but should be {expected}")]
    BadBlockParent {
        function: String,
        block: BlockId,
        expected: BlockParent,
        found: BlockParent,
    },

    #[error("bad parent for continuation {cont} in function {function}: is {found} but should be {expected}\n{dump}")]
    BadContinuationParent {
        function: String,
        cont: ContinuationId,
        expected: BlockId,
        found: BlockId,
        dump: String,
    },

    #[error("main block {block} used as a branch of {cont} in function {function}")]
    MainBlockInContinuation {
        function: String,
        block: BlockId,
        cont: ContinuationId,
    },

    #[error("nested block {cont} present in function {function}")]
    NestedBlockForbidden {
        function: String,
        cont: ContinuationId,
    },
}

/// Declarations and references disagree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("duplicate global {name}")]
    DuplicateGlobal { name: String },

    #[error("missing global {var} in function {function}")]
    MissingGlobal { function: String, var: String },

    #[error("duplicate variable name {var} in function {function}, already declared as {existing}")]
    DuplicateDeclaration {
        function: String,
        var: String,
        existing: String,
    },

    #[error("declaration {var} in function {function} conflicts with {existing}")]
    DeclarationMismatch {
        function: String,
        var: String,
        existing: String,
    },

    #[error("{var} not among declared vars in scope of function {function}: {context}")]
    UnresolvedReference {
        function: String,
        var: String,
        context: String,
    },

    #[error("reference {var} in function {function} does not match declaration {declared}: {context}")]
    ReferenceMismatch {
        function: String,
        var: String,
        declared: String,
        context: String,
    },

    #[error("variable name not marked as used {var} in function {function}")]
    NameNotMarkedUsed { function: String, var: String },

    #[error("passed vars of {cont} in function {function} are {recorded} but should be {expected}")]
    StalePassedVars {
        function: String,
        cont: ContinuationId,
        recorded: String,
        expected: String,
    },
}

/// A variable is referenced across a task boundary it cannot cross
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("{var} was unavailable in scope of function {function} after crossing {cont}: {context}")]
    Unavailable {
        function: String,
        var: String,
        cont: ContinuationId,
        context: String,
    },

    #[error("{var} cannot be passed into the task spawned by {cont} in function {function}")]
    NotPassable {
        function: String,
        var: String,
        cont: ContinuationId,
    },
}

/// Single-assignment discipline of aliases and locals is broken
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitializationError {
    #[error("{var} read before initialization in function {function}: {context}")]
    ReadBeforeInit {
        function: String,
        var: String,
        context: String,
    },

    #[error("{var} initialized twice in function {function}: {context}")]
    DoubleInit {
        function: String,
        var: String,
        context: String,
    },

    #[error("{var} initialized as an alias but has non-alias storage in function {function}: {context}")]
    NotAnAlias {
        function: String,
        var: String,
        context: String,
    },

    #[error("{var} required by {cont} in function {function} is not initialized")]
    RequiredNotInitialized {
        function: String,
        var: String,
        cont: ContinuationId,
    },

    #[error("{var} declared in {block} of function {function} maps to uninitialized {mapping}")]
    MappingNotInitialized {
        function: String,
        var: String,
        mapping: String,
        block: BlockId,
    },
}

/// An instruction sits where its execution target cannot run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecContextError {
    #[error("{inst} in function {function} has execution mode {target} but is in context {context}")]
    IllegalTarget {
        function: String,
        inst: String,
        target: String,
        context: String,
    },
}

/// A cleanup action is attached to the wrong scope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleanupOwnershipError {
    #[error("cleanup action for var {var} not defined in block {block} of function {function}, valid variables are {valid}")]
    NotOwned {
        function: String,
        var: String,
        block: BlockId,
        valid: String,
    },

    #[error("didn't expect to see reference counting operations yet in function {function}: {cleanup}")]
    UnexpectedRefcountOp { function: String, cleanup: String },
}
