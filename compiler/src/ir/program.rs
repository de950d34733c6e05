//! IR Programs
//!
//! The program is the top-level compilation unit. It owns the global
//! constants, the functions, and the arenas every mutable IR node is
//! allocated in.

use super::{
    Block, BlockId, CleanupAction, CleanupId, Continuation, ContinuationId, Function, FunctionId,
    Instruction, InstructionId, Var,
};
use serde::{Deserialize, Serialize};

/// IR program
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Global constants, visible identically in every function
    #[serde(default)]
    pub globals: Vec<Var>,

    /// Functions, indexed by `FunctionId`
    #[serde(default)]
    pub functions: Vec<Function>,

    #[serde(default)]
    pub blocks: Vec<Block>,

    #[serde(default)]
    pub continuations: Vec<Continuation>,

    #[serde(default)]
    pub instructions: Vec<Instruction>,

    #[serde(default)]
    pub cleanups: Vec<CleanupAction>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    // === Allocation ===

    pub fn alloc_block(&mut self, block: Block) -> BlockId {
        self.blocks.push(block);
        BlockId::from_raw((self.blocks.len() - 1) as u32)
    }

    pub fn alloc_continuation(&mut self, cont: Continuation) -> ContinuationId {
        self.continuations.push(cont);
        ContinuationId::from_raw((self.continuations.len() - 1) as u32)
    }

    pub fn alloc_instruction(&mut self, inst: Instruction) -> InstructionId {
        self.instructions.push(inst);
        InstructionId::from_raw((self.instructions.len() - 1) as u32)
    }

    pub fn alloc_cleanup(&mut self, cleanup: CleanupAction) -> CleanupId {
        self.cleanups.push(cleanup);
        CleanupId::from_raw((self.cleanups.len() - 1) as u32)
    }

    /// Id the next function added will get
    pub fn next_function_id(&self) -> FunctionId {
        FunctionId::from_raw(self.functions.len() as u32)
    }

    pub fn add_function(&mut self, function: Function) -> FunctionId {
        let id = function.id;
        self.functions.push(function);
        id
    }

    // === Lookup ===

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id.index())
    }

    pub fn continuation(&self, id: ContinuationId) -> Option<&Continuation> {
        self.continuations.get(id.index())
    }

    pub fn continuation_mut(&mut self, id: ContinuationId) -> Option<&mut Continuation> {
        self.continuations.get_mut(id.index())
    }

    pub fn instruction(&self, id: InstructionId) -> Option<&Instruction> {
        self.instructions.get(id.index())
    }

    pub fn instruction_mut(&mut self, id: InstructionId) -> Option<&mut Instruction> {
        self.instructions.get_mut(id.index())
    }

    pub fn cleanup(&self, id: CleanupId) -> Option<&CleanupAction> {
        self.cleanups.get(id.index())
    }

    /// Functions are found by id. Loaded programs need not keep ids
    /// positional, so the arena slot is only a first guess.
    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        match self.functions.get(id.index()) {
            Some(function) if function.id == id => Some(function),
            _ => self.functions.iter().find(|f| f.id == id),
        }
    }

    pub fn function_mut(&mut self, id: FunctionId) -> Option<&mut Function> {
        let index = match self.functions.get(id.index()) {
            Some(function) if function.id == id => id.index(),
            _ => self.functions.iter().position(|f| f.id == id)?,
        };
        self.functions.get_mut(index)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&Var> {
        self.globals.iter().find(|g| g.name == name)
    }

    /// Load a program saved with `to_json`
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Total number of arena-allocated nodes
    pub fn node_count(&self) -> usize {
        self.blocks.len() + self.continuations.len() + self.instructions.len() + self.cleanups.len()
    }
}
