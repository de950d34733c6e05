//! Visibility fixup
//!
//! A continuation whose branches run in spawned tasks records which
//! enclosing variables get shipped into those tasks. Passes that rewrite
//! the tree leave the lists stale; this pass recomputes them. In check mode
//! it only reports the first stale list.

use std::borrow::Cow;
use std::collections::BTreeSet;

use fxhash::FxHashSet;
use log::debug;

use super::dump::var_list;
use super::passes::ProgramPass;
use super::validation::{
    check_program_structure, FunctionContext, ScopeError, ValidationResult,
};
use super::{BlockId, ContinuationId, Program, Var};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixupMode {
    /// Report stale passed-variable lists without touching the program
    Check,
    /// Rewrite stale lists
    Repair,
}

/// Recomputes `passed_vars` of continuations that spawn tasks
#[derive(Debug, Clone, Copy)]
pub struct FixupVariables {
    mode: FixupMode,
}

impl FixupVariables {
    pub fn new(mode: FixupMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> FixupMode {
        self.mode
    }

    /// Fail on the first continuation whose passed-variable list is stale
    pub fn verify(program: &Program) -> ValidationResult<()> {
        for (function, cont, expected) in compute_passed_vars(program)? {
            let Some(recorded) = program.continuation(cont).map(|c| &c.passed_vars) else {
                continue;
            };
            if *recorded != expected {
                return Err(ScopeError::StalePassedVars {
                    function,
                    cont,
                    recorded: var_list(recorded),
                    expected: var_list(&expected),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Rewrite every stale list, returning how many changed
    pub fn repair(program: &mut Program) -> ValidationResult<usize> {
        let mut changed = 0;
        for (function, cont, expected) in compute_passed_vars(program)? {
            if let Some(c) = program.continuation_mut(cont) {
                if c.passed_vars != expected {
                    debug!(
                        "fixup: passed vars of {} in {} now {}",
                        cont,
                        function,
                        var_list(&expected)
                    );
                    c.passed_vars = expected;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    /// The program with every passed-variable list recomputed. Borrows when
    /// nothing is stale.
    pub fn repaired(program: &Program) -> ValidationResult<Cow<'_, Program>> {
        let computed = compute_passed_vars(program)?;
        let stale = computed.iter().any(|(_, cont, expected)| {
            program
                .continuation(*cont)
                .map_or(false, |c| c.passed_vars != *expected)
        });
        if !stale {
            return Ok(Cow::Borrowed(program));
        }

        let mut fixed = program.clone();
        for (_, cont, expected) in computed {
            if let Some(c) = fixed.continuation_mut(cont) {
                c.passed_vars = expected;
            }
        }
        Ok(Cow::Owned(fixed))
    }
}

impl ProgramPass for FixupVariables {
    fn name(&self) -> &'static str {
        "fixup_variables"
    }

    fn run(&self, program: &mut Program) -> ValidationResult<()> {
        match self.mode {
            FixupMode::Check => Self::verify(program),
            FixupMode::Repair => Self::repair(program).map(|_| ()),
        }
    }
}

/// Expected passed-variable list of every remote continuation, in
/// traversal order
fn compute_passed_vars(program: &Program) -> ValidationResult<Vec<(String, ContinuationId, Vec<Var>)>> {
    check_program_structure(program, false)?;

    let mut result = Vec::new();
    for function in &program.functions {
        let cx = FunctionContext::new(program, function);
        let mut remote = Vec::new();
        collect_remote(&cx, function.main_block, &mut remote)?;
        for cont in remote {
            result.push((function.name.clone(), cont, free_vars(&cx, cont)?));
        }
    }
    Ok(result)
}

fn collect_remote(
    cx: &FunctionContext<'_>,
    block_id: BlockId,
    out: &mut Vec<ContinuationId>,
) -> ValidationResult<()> {
    let block = cx.block(block_id)?;
    for id in block.all_continuations() {
        let cont = cx.continuation(id)?;
        if !cont.variable_passing().is_local() {
            out.push(id);
        }
        for &inner in &cont.blocks {
            collect_remote(cx, inner, out)?;
        }
    }
    Ok(())
}

/// Variables used below a continuation but declared above it, sorted,
/// globals excluded
fn free_vars(cx: &FunctionContext<'_>, id: ContinuationId) -> ValidationResult<Vec<Var>> {
    let cont = cx.continuation(id)?;
    let mut refs = BTreeSet::new();
    let mut decls = FxHashSet::default();
    decls.extend(cont.new_defs().cloned());
    for &inner in &cont.blocks {
        collect_block(cx, inner, &mut refs, &mut decls)?;
    }
    Ok(refs
        .into_iter()
        .filter(|v: &Var| !v.is_global() && !decls.contains(v))
        .collect())
}

fn collect_block(
    cx: &FunctionContext<'_>,
    block_id: BlockId,
    refs: &mut BTreeSet<Var>,
    decls: &mut FxHashSet<Var>,
) -> ValidationResult<()> {
    let block = cx.block(block_id)?;
    decls.extend(block.variables.iter().cloned());
    refs.extend(block.variables.iter().filter_map(|v| v.mapping.as_deref()).cloned());
    for id in block.instructions() {
        refs.extend(cx.instruction(id)?.referenced_vars().cloned());
    }
    for id in block.all_continuations() {
        let cont = cx.continuation(id)?;
        decls.extend(cont.new_defs().cloned());
        refs.extend(cont.required_vars.iter().cloned());
        for &inner in &cont.blocks {
            collect_block(cx, inner, refs, decls)?;
        }
    }
    for &id in &block.cleanups {
        let cleanup = cx.cleanup(id)?;
        refs.insert(cleanup.var.clone());
        refs.extend(cx.instruction(cleanup.action)?.referenced_vars().cloned());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        Arg, ContVarDefType, ContinuationType, DefType, ExecContext, ExecTarget,
        ForeachSettings, Instruction, Opcode, ProgramBuilder, ScalarType, ValidationErrorKind,
        Validator, VarStorage, VarType,
    };

    fn stack(name: &str) -> Var {
        Var::new(name, VarType::Future(ScalarType::Int), VarStorage::Stack, DefType::LocalUser)
    }

    fn spawning_loop() -> (Program, ContinuationId) {
        let mut builder = ProgramBuilder::new();
        builder.add_global(Var::global_const("n", VarType::Future(ScalarType::Int)));
        builder.start_function("main");
        let a = builder.declare(stack("a")).unwrap();
        let b = builder.declare(stack("b")).unwrap();
        let settings = ForeachSettings {
            spawns_tasks: true,
            ..ForeachSettings::default()
        };
        let lp = builder
            .build_continuation(ContinuationType::RangeLoop(settings))
            .unwrap();
        let i = builder
            .define_construct_var(lp, stack("i"), ContVarDefType::NewDef)
            .unwrap();
        let body = builder.add_branch(lp).unwrap();
        builder.switch_to_block(body);
        let t = builder.declare(stack("t")).unwrap();
        let n = builder.program.globals[0].clone();
        builder
            .build(Instruction::new(
                Opcode::CallLocal,
                vec![Arg::from(&b), Arg::from(&i), Arg::from(&n)],
                vec![t.clone()],
            ))
            .unwrap();
        builder
            .build(Instruction::new(
                Opcode::StoreScalar,
                vec![Arg::from(&t)],
                vec![a.clone()],
            ))
            .unwrap();
        builder
            .build(Instruction::new(Opcode::CallLocal, vec![Arg::from(&b)], vec![]))
            .unwrap();
        (builder.finish(), lp)
    }

    #[test]
    fn test_repair_computes_sorted_free_vars() {
        let (mut program, lp) = spawning_loop();
        assert_eq!(FixupVariables::repair(&mut program).unwrap(), 1);
        let names: Vec<_> = program.continuation(lp).unwrap().passed_vars
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        assert_eq!(FixupVariables::repair(&mut program).unwrap(), 0);
        assert!(FixupVariables::verify(&program).is_ok());
    }

    #[test]
    fn test_check_mode_reports_stale_lists() {
        let (mut program, _) = spawning_loop();
        let err = FixupVariables::new(FixupMode::Check)
            .run(&mut program)
            .unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::Scope);
        assert!(err.to_string().contains("should be [a, b]"));

        // The validator checks a repaired view and leaves the program alone
        assert!(Validator::standard().validate(&program).is_ok());
        assert!(FixupVariables::verify(&program).is_err());

        FixupVariables::new(FixupMode::Repair).run(&mut program).unwrap();
        assert!(FixupVariables::verify(&program).is_ok());
        assert!(Validator::standard().validate(&program).is_ok());
    }

    #[test]
    fn test_repaired_borrows_when_current() {
        let (mut program, lp) = spawning_loop();
        match FixupVariables::repaired(&program).unwrap() {
            Cow::Owned(fixed) => {
                assert_eq!(fixed.continuation(lp).unwrap().passed_vars.len(), 2);
            }
            Cow::Borrowed(_) => panic!("stale list was not repaired"),
        }
        assert!(program.continuation(lp).unwrap().passed_vars.is_empty());

        FixupVariables::repair(&mut program).unwrap();
        assert!(matches!(
            FixupVariables::repaired(&program).unwrap(),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_mapping_target_is_passed() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let path = builder.declare(stack("path")).unwrap();
        let wait = builder
            .build_continuation(ContinuationType::WaitStatement {
                target: ExecTarget::async_any(),
            })
            .unwrap();
        let body = builder.add_branch(wait).unwrap();
        builder.switch_to_block(body);
        builder
            .declare(
                Var::new("f", VarType::Future(ScalarType::File), VarStorage::Stack, DefType::LocalUser)
                    .with_mapping(path),
            )
            .unwrap();
        let mut program = builder.finish();

        FixupVariables::repair(&mut program).unwrap();
        let names: Vec<_> = program.continuations[0]
            .passed_vars
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, vec!["path"]);
    }

    #[test]
    fn test_local_continuations_untouched() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let a = builder.declare(stack("a")).unwrap();
        let wait = builder
            .build_continuation(ContinuationType::WaitStatement {
                target: ExecTarget::sync(ExecContext::control()),
            })
            .unwrap();
        builder.require_var(wait, &a).unwrap();
        let body = builder.add_branch(wait).unwrap();
        builder.switch_to_block(body);
        builder
            .build(Instruction::new(Opcode::CallLocal, vec![Arg::from(&a)], vec![]))
            .unwrap();
        let mut program = builder.finish();
        assert_eq!(FixupVariables::repair(&mut program).unwrap(), 0);
        assert!(program.continuations[0].passed_vars.is_empty());
    }
}
