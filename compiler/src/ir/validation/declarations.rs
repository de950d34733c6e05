//! Declaration and reference checks, with the capability check threaded
//! alongside
//!
//! Names are unique per function. References are resolved against the
//! declarations visible on the path from the main block, and must be
//! identical to what they resolve to. Past a continuation whose children
//! run in another task, every visible variable that can't be passed to a
//! child task becomes unavailable for the rest of that subtree.

use fxhash::FxHashMap;
use log::trace;

use super::{
    cleanups, CapabilityError, FunctionContext, ScopeError, ValidationResult, ValidatorConfig,
};
use crate::ir::scope::ScopedMap;
use crate::ir::{
    BlockId, CleanupId, ContVarDefType, ContinuationId, InstructionId, NodeId, Statement, Var,
};

/// Name to declaration, along the current path
type Declared = ScopedMap<String, Var>;

/// Unavailable variable to the continuation that made it unavailable
type Unavailable = ScopedMap<Var, ContinuationId>;

/// Where a reference was found
#[derive(Clone, Copy)]
enum RefSite {
    Block(BlockId),
    Instruction(InstructionId),
    Continuation(ContinuationId),
    Cleanup(CleanupId),
}

impl RefSite {
    fn node(self) -> NodeId {
        match self {
            RefSite::Block(id) => NodeId::Block(id),
            RefSite::Instruction(id) => NodeId::Instruction(id),
            RefSite::Continuation(id) => NodeId::Continuation(id),
            RefSite::Cleanup(id) => NodeId::Cleanup(id),
        }
    }
}

pub(super) fn check_declarations(
    cx: &FunctionContext<'_>,
    config: &ValidatorConfig,
) -> ValidationResult<()> {
    let mut checker = DeclChecker {
        cx,
        config,
        names: FxHashMap::default(),
    };

    let mut declared = Declared::new();
    for global in &cx.program.globals {
        checker.names.insert(global.name.clone(), global.clone());
        declared.insert(global.name.clone(), global.clone());
    }
    for param in cx.function.params() {
        checker.declare(param, &mut declared)?;
    }

    let mut unavailable = Unavailable::new();
    checker.check_block(cx.function.main_block, &mut declared, &mut unavailable)
}

struct DeclChecker<'a, 'p> {
    cx: &'a FunctionContext<'p>,
    config: &'a ValidatorConfig,
    /// Every name declared anywhere in the function so far
    names: FxHashMap<String, Var>,
}

impl DeclChecker<'_, '_> {
    fn is_param(&self, var: &Var) -> bool {
        self.cx.function.params().any(|p| p == var)
    }

    fn declare(&mut self, var: &Var, declared: &mut Declared) -> ValidationResult<()> {
        self.check_used(var)?;
        match self.names.get(&var.name) {
            None if var.def_type.is_global() => {
                return Err(ScopeError::MissingGlobal {
                    function: self.cx.name(),
                    var: var.describe(),
                }
                .into());
            }
            None => {}
            Some(existing) if existing.is_global() || self.is_param(existing) => {
                if existing != var {
                    return Err(ScopeError::DeclarationMismatch {
                        function: self.cx.name(),
                        var: var.describe(),
                        existing: existing.describe(),
                    }
                    .into());
                }
            }
            Some(existing) => {
                return Err(ScopeError::DuplicateDeclaration {
                    function: self.cx.name(),
                    var: var.describe(),
                    existing: existing.describe(),
                }
                .into());
            }
        }
        self.names.insert(var.name.clone(), var.clone());
        declared.insert(var.name.clone(), var.clone());
        Ok(())
    }

    fn check_used(&self, var: &Var) -> ValidationResult<()> {
        if var.is_global() || self.cx.function.var_name_used(&var.name) {
            Ok(())
        } else {
            Err(ScopeError::NameNotMarkedUsed {
                function: self.cx.name(),
                var: var.describe(),
            }
            .into())
        }
    }

    fn check_block(
        &mut self,
        block_id: BlockId,
        declared: &mut Declared,
        unavailable: &mut Unavailable,
    ) -> ValidationResult<()> {
        trace!("checking declarations in {}", block_id);
        let block = self.cx.block(block_id)?;
        for var in &block.variables {
            self.declare(var, declared)?;
        }

        for var in block.variables.iter().filter(|v| v.storage.is_global()) {
            self.check_reference(var, declared, unavailable, RefSite::Block(block_id))?;
        }
        for mapped in block.variables.iter().filter_map(|v| v.mapping.as_deref()) {
            self.check_reference(mapped, declared, unavailable, RefSite::Block(block_id))?;
        }
        for stmt in &block.statements {
            match *stmt {
                Statement::Instruction(id) => {
                    self.check_instruction_refs(id, declared, unavailable)?
                }
                Statement::Conditional(id) => {
                    self.check_continuation_refs(id, declared, unavailable)?
                }
            }
        }
        for &id in &block.continuations {
            self.check_continuation_refs(id, declared, unavailable)?;
        }
        for &id in &block.cleanups {
            let cleanup = self.cx.cleanup(id)?;
            self.check_reference(&cleanup.var, declared, unavailable, RefSite::Cleanup(id))?;
            self.check_instruction_refs(cleanup.action, declared, unavailable)?;
        }

        cleanups::check_cleanups(self.cx, self.config, block_id, block)?;

        for id in block.all_continuations() {
            self.check_continuation(id, declared, unavailable)?;
        }
        Ok(())
    }

    fn check_instruction_refs(
        &self,
        id: InstructionId,
        declared: &Declared,
        unavailable: &Unavailable,
    ) -> ValidationResult<()> {
        let inst = self.cx.instruction(id)?;
        for var in inst.referenced_vars() {
            self.check_reference(var, declared, unavailable, RefSite::Instruction(id))?;
        }
        Ok(())
    }

    fn check_continuation_refs(
        &self,
        id: ContinuationId,
        declared: &Declared,
        unavailable: &Unavailable,
    ) -> ValidationResult<()> {
        let cont = self.cx.continuation(id)?;
        for var in cont.referenced_vars() {
            self.check_reference(var, declared, unavailable, RefSite::Continuation(id))?;
        }
        if self.config.check_var_passing && !cont.variable_passing().is_local() {
            if let Some(var) = cont.passed_vars.iter().find(|v| !v.can_pass_to_child_task()) {
                return Err(CapabilityError::NotPassable {
                    function: self.cx.name(),
                    var: var.describe(),
                    cont: id,
                }
                .into());
            }
        }
        Ok(())
    }

    fn check_continuation(
        &mut self,
        id: ContinuationId,
        declared: &mut Declared,
        unavailable: &mut Unavailable,
    ) -> ValidationResult<()> {
        let cont = self.cx.continuation(id)?;

        let mut cont_unavailable = unavailable.make_child();
        if self.config.check_var_passing && !cont.variable_passing().is_local() {
            for (_, var) in declared.visible() {
                if !var.can_pass_to_child_task() && !cont_unavailable.contains_key(var) {
                    cont_unavailable.insert(var.clone(), id);
                }
            }
        }

        let mut cont_declared = declared.make_child();
        for def in &cont.construct_defined {
            match def.def {
                ContVarDefType::NewDef => self.declare(&def.var, &mut cont_declared)?,
                ContVarDefType::Redef => self.check_reference(
                    &def.var,
                    &cont_declared,
                    &cont_unavailable,
                    RefSite::Continuation(id),
                )?,
            }
        }

        for &inner in &cont.blocks {
            let mut block_declared = cont_declared.make_child();
            let mut block_unavailable = cont_unavailable.make_child();
            self.check_block(inner, &mut block_declared, &mut block_unavailable)?;
        }
        Ok(())
    }

    fn check_reference(
        &self,
        var: &Var,
        declared: &Declared,
        unavailable: &Unavailable,
        site: RefSite,
    ) -> ValidationResult<()> {
        match declared.get(&var.name) {
            None => {
                return Err(ScopeError::UnresolvedReference {
                    function: self.cx.name(),
                    var: var.describe(),
                    context: self.cx.dump(site.node()),
                }
                .into());
            }
            Some(decl) if decl != var => {
                return Err(ScopeError::ReferenceMismatch {
                    function: self.cx.name(),
                    var: var.describe(),
                    declared: decl.describe(),
                    context: self.cx.dump(site.node()),
                }
                .into());
            }
            Some(_) => {}
        }
        self.check_used(var)?;
        if let Some(&cont) = unavailable.get(var) {
            return Err(CapabilityError::Unavailable {
                function: self.cx.name(),
                var: var.describe(),
                cont,
                context: self.cx.dump(site.node()),
            }
            .into());
        }
        Ok(())
    }
}
