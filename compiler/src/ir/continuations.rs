//! IR Continuations
//!
//! A continuation is a control or concurrency construct (branch, loop, wait,
//! nested scope) that owns one or more child blocks. Continuations either
//! appear inline as conditional statements of a block, or trail the block.

use super::{BlockId, ExecContext, ExecTarget, Var};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of iterations a foreach loop splits into per task
pub const DEFAULT_SPLIT_DEGREE: u32 = 16;

/// Default number of iterations handled by a leaf task of a split loop
pub const DEFAULT_LEAF_DEGREE: u32 = 64;

/// Settings of a foreach or range loop, taken from its annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeachSettings {
    pub unroll: u32,
    /// `None` when splitting is disabled
    pub split_degree: Option<u32>,
    pub leaf_degree: u32,
    /// Iterations run as separate tasks
    pub spawns_tasks: bool,
    /// Annotations as written in source
    #[serde(default)]
    pub annotations: Vec<String>,
}

impl Default for ForeachSettings {
    fn default() -> Self {
        Self {
            unroll: 1,
            split_degree: Some(DEFAULT_SPLIT_DEGREE),
            leaf_degree: DEFAULT_LEAF_DEGREE,
            spawns_tasks: false,
            annotations: Vec::new(),
        }
    }
}

impl ForeachSettings {
    pub fn is_sync_loop(&self) -> bool {
        !self.spawns_tasks
    }
}

/// Kind of continuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContinuationType {
    IfStatement,
    SwitchStatement,
    ForeachLoop(ForeachSettings),
    RangeLoop(ForeachSettings),
    /// Iterative loop whose iterations are chained through loop variables
    Loop,
    NestedBlock,
    /// Waits for variables to close, then runs its block per `target`
    WaitStatement { target: ExecTarget },
}

impl ContinuationType {
    /// How enclosing variables reach the child blocks
    pub fn variable_passing(&self) -> VarPassing {
        match self {
            ContinuationType::ForeachLoop(settings) | ContinuationType::RangeLoop(settings) => {
                if settings.is_sync_loop() {
                    VarPassing::Local
                } else {
                    VarPassing::Remote
                }
            }
            ContinuationType::WaitStatement { target } => {
                if target.is_async() {
                    VarPassing::Remote
                } else {
                    VarPassing::Local
                }
            }
            ContinuationType::IfStatement
            | ContinuationType::SwitchStatement
            | ContinuationType::Loop
            | ContinuationType::NestedBlock => VarPassing::Local,
        }
    }

    /// Execution context of child blocks given the parent's context
    pub fn child_context(&self, cx: &ExecContext) -> ExecContext {
        match self {
            ContinuationType::WaitStatement { target } => {
                target.target_context().cloned().unwrap_or_else(|| cx.clone())
            }
            _ => cx.clone(),
        }
    }
}

impl fmt::Display for ContinuationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContinuationType::IfStatement => write!(f, "if"),
            ContinuationType::SwitchStatement => write!(f, "switch"),
            ContinuationType::ForeachLoop(_) => write!(f, "foreach"),
            ContinuationType::RangeLoop(_) => write!(f, "range_loop"),
            ContinuationType::Loop => write!(f, "loop"),
            ContinuationType::NestedBlock => write!(f, "nested_block"),
            ContinuationType::WaitStatement { target } => write!(f, "wait @{}", target),
        }
    }
}

/// Whether child blocks run in the parent's task or in spawned tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarPassing {
    /// Same task, same memory
    Local,
    /// Spawned tasks that only see what is passed to them
    Remote,
}

impl VarPassing {
    pub fn is_local(self) -> bool {
        self == VarPassing::Local
    }
}

/// Whether a construct variable is a fresh declaration or a redefinition
/// of an enclosing one (e.g. loop variables in the iteration block)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContVarDefType {
    NewDef,
    Redef,
}

/// Variable introduced into child scopes by a continuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructVar {
    pub var: Var,
    pub def: ContVarDefType,
}

/// IR continuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Continuation {
    pub kind: ContinuationType,

    /// Block this continuation was found in
    pub parent: BlockId,

    /// Child blocks, in order
    pub blocks: Vec<BlockId>,

    /// Variables read from the enclosing scope
    #[serde(default)]
    pub required_vars: Vec<Var>,

    /// Variables introduced into child scopes
    #[serde(default)]
    pub construct_defined: Vec<ConstructVar>,

    /// Variables shipped into spawned tasks, maintained by the fixup pass
    #[serde(default)]
    pub passed_vars: Vec<Var>,
}

impl Continuation {
    pub fn new(kind: ContinuationType, parent: BlockId) -> Self {
        Self {
            kind,
            parent,
            blocks: Vec::new(),
            required_vars: Vec::new(),
            construct_defined: Vec::new(),
            passed_vars: Vec::new(),
        }
    }

    pub fn variable_passing(&self) -> VarPassing {
        self.kind.variable_passing()
    }

    pub fn child_context(&self, cx: &ExecContext) -> ExecContext {
        self.kind.child_context(cx)
    }

    /// All construct-defined variables
    pub fn construct_defined_vars(&self) -> impl Iterator<Item = &Var> {
        self.construct_defined.iter().map(|cv| &cv.var)
    }

    /// Construct-defined variables that are fresh declarations
    pub fn new_defs(&self) -> impl Iterator<Item = &Var> {
        self.construct_defined
            .iter()
            .filter(|cv| cv.def == ContVarDefType::NewDef)
            .map(|cv| &cv.var)
    }

    /// Every variable reference this continuation itself holds
    pub fn referenced_vars(&self) -> impl Iterator<Item = &Var> {
        self.required_vars.iter().chain(self.passed_vars.iter())
    }
}
