//! IR Blocks
//!
//! A block is a scope unit: it declares variables, holds an ordered list of
//! statements, may end with trailing continuations, and carries cleanup
//! actions run when the scope exits.

use super::{CleanupId, ContinuationId, FunctionId, InstructionId, Var};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a block in its function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    /// Root block of a function
    MainBlock,
    /// Child block of a continuation
    NestedBlock,
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::MainBlock => write!(f, "MAIN_BLOCK"),
            BlockType::NestedBlock => write!(f, "NESTED_BLOCK"),
        }
    }
}

/// Back-link from a block to its single owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockParent {
    Function(FunctionId),
    Continuation(ContinuationId),
}

impl fmt::Display for BlockParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockParent::Function(id) => write!(f, "function {}", id),
            BlockParent::Continuation(id) => write!(f, "continuation {}", id),
        }
    }
}

/// Statement in a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statement {
    Instruction(InstructionId),
    /// Inline continuation, executed in statement order
    Conditional(ContinuationId),
}

/// Scope-exit action bound to a variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupAction {
    pub var: Var,
    pub action: InstructionId,
}

/// IR block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockType,

    pub parent: BlockParent,

    /// Variables declared in this block
    #[serde(default)]
    pub variables: Vec<Var>,

    #[serde(default)]
    pub statements: Vec<Statement>,

    /// Continuations that run after the statements
    #[serde(default)]
    pub continuations: Vec<ContinuationId>,

    #[serde(default)]
    pub cleanups: Vec<CleanupId>,
}

impl Block {
    pub fn main(function: FunctionId) -> Self {
        Self::with_parent(BlockType::MainBlock, BlockParent::Function(function))
    }

    pub fn nested(parent: ContinuationId) -> Self {
        Self::with_parent(BlockType::NestedBlock, BlockParent::Continuation(parent))
    }

    fn with_parent(kind: BlockType, parent: BlockParent) -> Self {
        Self {
            kind,
            parent,
            variables: Vec::new(),
            statements: Vec::new(),
            continuations: Vec::new(),
            cleanups: Vec::new(),
        }
    }

    pub fn parent_function(&self) -> Option<FunctionId> {
        match self.parent {
            BlockParent::Function(id) => Some(id),
            BlockParent::Continuation(_) => None,
        }
    }

    pub fn parent_continuation(&self) -> Option<ContinuationId> {
        match self.parent {
            BlockParent::Continuation(id) => Some(id),
            BlockParent::Function(_) => None,
        }
    }

    /// Instructions among the statements, in order
    pub fn instructions(&self) -> impl Iterator<Item = InstructionId> + '_ {
        self.statements.iter().filter_map(|stmt| match stmt {
            Statement::Instruction(id) => Some(*id),
            Statement::Conditional(_) => None,
        })
    }

    /// Inline conditionals followed by trailing continuations, in traversal order
    pub fn all_continuations(&self) -> impl Iterator<Item = ContinuationId> + '_ {
        self.statements
            .iter()
            .filter_map(|stmt| match stmt {
                Statement::Conditional(id) => Some(*id),
                Statement::Instruction(_) => None,
            })
            .chain(self.continuations.iter().copied())
    }

    pub fn declares(&self, var: &Var) -> bool {
        self.variables.contains(var)
    }
}
