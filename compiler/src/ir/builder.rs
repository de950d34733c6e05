//! IR Builder
//!
//! This module provides a builder interface for constructing IR trees.
//! The builder allocates every node into the program arenas exactly once
//! and keeps the parent links consistent with tree position. It also
//! records variable names in the owning function's used-name set.

use tracing::debug;

use super::{
    Block, BlockId, CleanupAction, CleanupId, ConstructVar, ContVarDefType, Continuation,
    ContinuationId, ContinuationType, Function, FunctionId, Instruction, InstructionId, Program,
    Statement, Var,
};

/// Builder for constructing IR programs
pub struct ProgramBuilder {
    /// The program being built
    pub program: Program,

    /// Current function being built
    pub(crate) current_function: Option<FunctionId>,

    /// Block new statements are appended to
    pub(crate) current_block: Option<BlockId>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            program: Program::new(),
            current_function: None,
            current_block: None,
        }
    }

    /// Finish building and hand out the program
    pub fn finish(self) -> Program {
        self.program
    }

    /// Add a program-wide global constant
    pub fn add_global(&mut self, var: Var) -> Var {
        self.program.globals.push(var.clone());
        var
    }

    // === Function Building ===

    /// Start building a new function; its main block becomes current
    pub fn start_function(&mut self, name: impl Into<String>) -> FunctionId {
        let id = self.program.next_function_id();
        let main = self.program.alloc_block(Block::main(id));
        let function = Function::new(id, name, main);
        debug!("start function {} ({})", function.name, id);
        self.program.add_function(function);
        self.current_function = Some(id);
        self.current_block = Some(main);
        id
    }

    /// Finish building the current function
    pub fn finish_function(&mut self) {
        self.current_function = None;
        self.current_block = None;
    }

    pub fn current_function(&self) -> Option<&Function> {
        self.current_function.and_then(|id| self.program.function(id))
    }

    pub fn current_function_mut(&mut self) -> Option<&mut Function> {
        self.current_function
            .and_then(move |id| self.program.function_mut(id))
    }

    /// Main block of the current function
    pub fn main_block(&self) -> Option<BlockId> {
        self.current_function().map(|f| f.main_block)
    }

    pub fn add_input(&mut self, var: Var) -> Option<Var> {
        let function = self.current_function_mut()?;
        function.mark_var_name_used(&var.name);
        function.inputs.push(var.clone());
        Some(var)
    }

    pub fn add_output(&mut self, var: Var) -> Option<Var> {
        let function = self.current_function_mut()?;
        function.mark_var_name_used(&var.name);
        function.outputs.push(var.clone());
        Some(var)
    }

    // === Block Building ===

    /// Switch to building in a different block
    pub fn switch_to_block(&mut self, block: BlockId) {
        self.current_block = Some(block);
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.current_block
    }

    fn current_block_mut(&mut self) -> Option<&mut Block> {
        let id = self.current_block?;
        self.program.block_mut(id)
    }

    /// Declare a variable in the current block
    pub fn declare(&mut self, var: Var) -> Option<Var> {
        self.current_block_mut()?.variables.push(var.clone());
        self.mark_used(&var);
        Some(var)
    }

    fn mark_used(&mut self, var: &Var) {
        if var.is_global() {
            return;
        }
        if let Some(function) = self.current_function_mut() {
            function.mark_var_name_used(&var.name);
        }
    }

    // === Statement Building ===

    /// Append an instruction to the current block
    pub fn build(&mut self, inst: Instruction) -> Option<InstructionId> {
        self.current_block?;
        let id = self.program.alloc_instruction(inst);
        self.current_block_mut()?
            .statements
            .push(Statement::Instruction(id));
        Some(id)
    }

    /// Append an inline conditional to the current block
    pub fn build_conditional(&mut self, kind: ContinuationType) -> Option<ContinuationId> {
        let parent = self.current_block?;
        let id = self.program.alloc_continuation(Continuation::new(kind, parent));
        self.current_block_mut()?
            .statements
            .push(Statement::Conditional(id));
        Some(id)
    }

    /// Add a trailing continuation to the current block
    pub fn build_continuation(&mut self, kind: ContinuationType) -> Option<ContinuationId> {
        let parent = self.current_block?;
        let id = self.program.alloc_continuation(Continuation::new(kind, parent));
        self.current_block_mut()?.continuations.push(id);
        Some(id)
    }

    /// Add a child block to a continuation. Does not switch to it.
    pub fn add_branch(&mut self, cont: ContinuationId) -> Option<BlockId> {
        self.program.continuation(cont)?;
        let block = self.program.alloc_block(Block::nested(cont));
        self.program.continuation_mut(cont)?.blocks.push(block);
        Some(block)
    }

    /// Record a variable the continuation reads from the enclosing scope
    pub fn require_var(&mut self, cont: ContinuationId, var: &Var) -> Option<()> {
        self.program
            .continuation_mut(cont)?
            .required_vars
            .push(var.clone());
        Some(())
    }

    /// Introduce a variable into a continuation's child scopes
    pub fn define_construct_var(
        &mut self,
        cont: ContinuationId,
        var: Var,
        def: ContVarDefType,
    ) -> Option<Var> {
        self.program
            .continuation_mut(cont)?
            .construct_defined
            .push(ConstructVar {
                var: var.clone(),
                def,
            });
        self.mark_used(&var);
        Some(var)
    }

    /// Attach a cleanup action to the current block
    pub fn build_cleanup(&mut self, var: &Var, action: Instruction) -> Option<CleanupId> {
        self.current_block?;
        let action = self.program.alloc_instruction(action);
        let id = self.program.alloc_cleanup(CleanupAction {
            var: var.clone(),
            action,
        });
        self.current_block_mut()?.cleanups.push(id);
        Some(id)
    }
}
