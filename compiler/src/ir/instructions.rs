//! IR Instructions
//!
//! Defines the instruction set for the intermediate representation.
//! Instructions read input arguments, write output variables, and declare
//! the execution target they are legal in.

use super::{Arg, ExecContext, ExecTarget, Var};
use serde::{Deserialize, Serialize};
use std::fmt;

/// In-place update applied to an updateable scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateMode {
    Min,
    Incr,
    Scale,
}

impl UpdateMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "min" => Some(UpdateMode::Min),
            "incr" => Some(UpdateMode::Incr),
            "scale" => Some(UpdateMode::Scale),
            _ => None,
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateMode::Min => "min",
            UpdateMode::Incr => "incr",
            UpdateMode::Scale => "scale",
        };
        write!(f, "{}", name)
    }
}

/// Operation performed by an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // === Data Operations ===
    /// Store a value into a shared datum
    StoreScalar,
    /// Copy a shared datum's value into a local
    LoadScalar,
    /// Bind an alias to a referenced datum
    CopyRef,
    /// Bind an alias to an array member
    ArrayLookup,
    /// Insert into an array
    ArrayInsert,
    /// Apply an in-place update to an updateable scalar
    UpdateScalar(UpdateMode),

    // === Calls ===
    /// Call a foreign leaf function as a worker task
    CallForeign,
    /// Call a foreign leaf function in the current process
    CallLocal,
    /// Call a composite function as a control task
    CallControl,
    /// Asynchronous builtin operation
    AsyncOp,

    // === Reference Counting ===
    IncrRefcount,
    DecrRefcount,
    IncrWriters,
    DecrWriters,

    /// No-op carrying a comment into generated code
    Comment,
}

impl Opcode {
    /// Reference counting operations, inserted late in the pipeline
    pub fn is_refcount_op(self) -> bool {
        matches!(
            self,
            Opcode::IncrRefcount | Opcode::DecrRefcount | Opcode::IncrWriters | Opcode::DecrWriters
        )
    }

    /// Execution target an instruction with this opcode gets unless
    /// lowering chose a more specific one
    pub fn default_target(self) -> ExecTarget {
        match self {
            Opcode::CallForeign => ExecTarget::dispatched(ExecContext::default_worker()),
            Opcode::CallControl => ExecTarget::dispatched(ExecContext::control()),
            Opcode::AsyncOp => ExecTarget::async_any(),
            Opcode::UpdateScalar(_) => ExecTarget::sync(ExecContext::control()),
            _ => ExecTarget::sync_any(),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::StoreScalar => write!(f, "store_scalar"),
            Opcode::LoadScalar => write!(f, "load_scalar"),
            Opcode::CopyRef => write!(f, "copy_ref"),
            Opcode::ArrayLookup => write!(f, "array_lookup"),
            Opcode::ArrayInsert => write!(f, "array_insert"),
            Opcode::UpdateScalar(mode) => write!(f, "update_{}", mode),
            Opcode::CallForeign => write!(f, "call_foreign"),
            Opcode::CallLocal => write!(f, "call_local"),
            Opcode::CallControl => write!(f, "call_control"),
            Opcode::AsyncOp => write!(f, "async_op"),
            Opcode::IncrRefcount => write!(f, "incr_refcount"),
            Opcode::DecrRefcount => write!(f, "decr_refcount"),
            Opcode::IncrWriters => write!(f, "incr_writers"),
            Opcode::DecrWriters => write!(f, "decr_writers"),
            Opcode::Comment => write!(f, "comment"),
        }
    }
}

/// IR instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: Opcode,

    /// Ordered input arguments
    pub inputs: Vec<Arg>,

    /// Ordered output variables
    pub outputs: Vec<Var>,

    /// Where this instruction may run
    pub exec_target: ExecTarget,

    /// Outputs that this instruction binds for the first time; all must be aliases
    #[serde(default)]
    pub initialized_aliases: Vec<Var>,
}

impl Instruction {
    pub fn new(op: Opcode, inputs: Vec<Arg>, outputs: Vec<Var>) -> Self {
        Self {
            op,
            inputs,
            outputs,
            exec_target: op.default_target(),
            initialized_aliases: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: ExecTarget) -> Self {
        self.exec_target = target;
        self
    }

    /// Mark an output alias as initialized by this instruction
    pub fn initializing(mut self, alias: Var) -> Self {
        self.initialized_aliases.push(alias);
        self
    }

    /// Variables read by this instruction
    pub fn input_vars(&self) -> impl Iterator<Item = &Var> {
        self.inputs.iter().filter_map(Arg::as_var)
    }

    /// Outputs excluding initialized aliases, in order
    pub fn regular_outputs(&self) -> impl Iterator<Item = &Var> {
        self.outputs
            .iter()
            .filter(move |out| !self.initialized_aliases.contains(out))
    }

    /// Every variable this instruction mentions
    pub fn referenced_vars(&self) -> impl Iterator<Item = &Var> {
        self.input_vars().chain(self.outputs.iter())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        let outs: Vec<String> = self.outputs.iter().map(|v| v.name.clone()).collect();
        let ins: Vec<String> = self.inputs.iter().map(|a| a.to_string()).collect();
        write!(f, " [{}] [{}] @{}", outs.join(" "), ins.join(" "), self.exec_target)
    }
}
