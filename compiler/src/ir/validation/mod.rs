//! IR Validation
//!
//! Sanity checks run on IR between passes:
//! - the IR is a tree with consistent parent links
//! - variable names are unique within each function, and every reference
//!   matches its declaration
//! - variables do not cross task boundaries they cannot cross
//! - aliases and locals are initialized exactly once before use
//! - instructions only appear where their execution target can run
//! - cleanups sit in the block that owns their variable
//!
//! The first violation aborts validation of the whole program.

mod cleanups;
mod declarations;
mod errors;
mod exec_context;
mod init;
mod structure;

pub use errors::*;

use fxhash::FxHashSet;
use log::{debug, trace};

use super::fixup::FixupVariables;
use super::passes::ProgramPass;
use super::{
    dump, Block, BlockId, CleanupAction, CleanupId, Continuation, ContinuationId, Function,
    Instruction, InstructionId, NodeId, Program,
};

/// What to do with a cleanup attached to a block that doesn't own its variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// Abort validation
    Fatal,
    /// Log a warning and carry on
    Warn,
    /// Don't look
    Skip,
}

/// Which checks a validator runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    pub check_var_passing: bool,
    pub cleanup_policy: CleanupPolicy,
    /// Reference counting cleanups are only expected after refcount insertion
    pub reject_refcount_cleanups: bool,
    pub no_nested_blocks: bool,
    pub check_exec_context: bool,
    /// Recompute continuation passed-variable lists before the semantic checks
    pub run_fixup: bool,
}

impl ValidatorConfig {
    /// Profile for IR before reference counting is inserted
    pub fn standard() -> Self {
        Self {
            check_var_passing: true,
            cleanup_policy: CleanupPolicy::Fatal,
            reject_refcount_cleanups: true,
            no_nested_blocks: false,
            check_exec_context: true,
            run_fixup: true,
        }
    }

    /// Profile for the final form, after reference counting. Late passes
    /// place cleanups outside the owning block, so those only warn.
    pub fn final_form() -> Self {
        Self {
            check_var_passing: false,
            cleanup_policy: CleanupPolicy::Warn,
            reject_refcount_cleanups: false,
            no_nested_blocks: false,
            check_exec_context: true,
            run_fixup: false,
        }
    }

    pub fn with_no_nested_blocks(mut self, no_nested_blocks: bool) -> Self {
        self.no_nested_blocks = no_nested_blocks;
        self
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Runs the configured checks over every function of a program
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn standard() -> Self {
        Self::new(ValidatorConfig::standard())
    }

    pub fn final_form() -> Self {
        Self::new(ValidatorConfig::final_form())
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a program. If the profile asks for the fixup, passed-variable
    /// lists are recomputed first and the checks see the recomputed lists;
    /// the caller's program is not modified.
    pub fn validate(&self, program: &Program) -> ValidationResult<()> {
        check_unique_globals(program)?;
        check_program_structure(program, self.config.no_nested_blocks)?;
        if self.config.run_fixup {
            let fixed = FixupVariables::repaired(program)?;
            return self.check_functions(&fixed);
        }
        self.check_functions(program)
    }

    /// Validate a program without the fixup check
    pub fn check(&self, program: &Program) -> ValidationResult<()> {
        check_unique_globals(program)?;
        check_program_structure(program, self.config.no_nested_blocks)?;
        self.check_functions(program)
    }

    fn check_functions(&self, program: &Program) -> ValidationResult<()> {
        for function in &program.functions {
            debug!("validating function {} ({})", function.name, function.id);
            let cx = FunctionContext::new(program, function);
            declarations::check_declarations(&cx, &self.config)?;
            init::check_initialization(&cx)?;
            if self.config.check_exec_context {
                exec_context::check_exec_context(&cx)?;
            }
        }
        Ok(())
    }
}

impl ProgramPass for Validator {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn run(&self, program: &mut Program) -> ValidationResult<()> {
        self.validate(program)
    }
}

/// Global names must be unique across the program
fn check_unique_globals(program: &Program) -> ValidationResult<()> {
    let mut seen = FxHashSet::default();
    for global in &program.globals {
        if !seen.insert(global.name.as_str()) {
            return Err(ScopeError::DuplicateGlobal {
                name: global.name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// Tree shape and parent links of every function. Later checks, and the
/// fixup pass, only walk programs that passed this.
pub(crate) fn check_program_structure(
    program: &Program,
    no_nested_blocks: bool,
) -> ValidationResult<()> {
    let mut owners = structure::NodeOwners::default();
    for function in &program.functions {
        let cx = FunctionContext::new(program, function);
        structure::check_duplicate_nodes(&cx, &mut owners)?;
        structure::check_parent_links(&cx, no_nested_blocks)?;
    }
    Ok(())
}

/// A function being checked, with arena lookups that fail as validation
/// errors instead of panicking
pub(crate) struct FunctionContext<'p> {
    pub program: &'p Program,
    pub function: &'p Function,
}

impl<'p> FunctionContext<'p> {
    pub fn new(program: &'p Program, function: &'p Function) -> Self {
        Self { program, function }
    }

    pub fn name(&self) -> String {
        self.function.name.clone()
    }

    fn missing(&self, node: NodeId) -> ValidationError {
        StructuralError::MissingNode {
            function: self.name(),
            node,
        }
        .into()
    }

    pub fn block(&self, id: BlockId) -> ValidationResult<&'p Block> {
        trace!("visiting {} of {}", id, self.function.name);
        self.program
            .block(id)
            .ok_or_else(|| self.missing(NodeId::Block(id)))
    }

    pub fn continuation(&self, id: ContinuationId) -> ValidationResult<&'p Continuation> {
        self.program
            .continuation(id)
            .ok_or_else(|| self.missing(NodeId::Continuation(id)))
    }

    pub fn instruction(&self, id: InstructionId) -> ValidationResult<&'p Instruction> {
        self.program
            .instruction(id)
            .ok_or_else(|| self.missing(NodeId::Instruction(id)))
    }

    pub fn cleanup(&self, id: CleanupId) -> ValidationResult<&'p CleanupAction> {
        self.program
            .cleanup(id)
            .ok_or_else(|| self.missing(NodeId::Cleanup(id)))
    }

    /// Rendered node, for error messages
    pub fn dump(&self, node: NodeId) -> String {
        dump::dump_node(self.program, node)
    }
}
