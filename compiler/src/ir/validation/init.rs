//! Definite initialization
//!
//! Forward pass over each function tracking which aliases and locals have
//! been written. Branches start from a copy of the enclosing state, and
//! nothing they initialize is visible to siblings or to the parent.

use super::{FunctionContext, InitializationError, ValidationResult};
use crate::ir::scope::ScopedSet;
use crate::ir::{BlockId, ContinuationId, InstructionId, NodeId, Statement, Var, VarStorage};

type InitVars = ScopedSet<Var>;

pub(super) fn check_initialization(cx: &FunctionContext<'_>) -> ValidationResult<()> {
    let mut init = InitVars::new();
    for input in cx.function.inputs.iter().filter(|v| v.must_be_initialized()) {
        init.insert(input.clone());
    }
    check_block(cx, cx.function.main_block, &mut init)
}

fn check_block(
    cx: &FunctionContext<'_>,
    block_id: BlockId,
    init: &mut InitVars,
) -> ValidationResult<()> {
    let block = cx.block(block_id)?;
    for var in &block.variables {
        if let Some(mapped) = &var.mapping {
            if mapped.must_be_initialized() && !init.contains(mapped) {
                return Err(InitializationError::MappingNotInitialized {
                    function: cx.name(),
                    var: var.describe(),
                    mapping: mapped.describe(),
                    block: block_id,
                }
                .into());
            }
        }
    }

    for stmt in &block.statements {
        match *stmt {
            Statement::Instruction(id) => update_init_vars(cx, id, init)?,
            Statement::Conditional(id) => check_continuation(cx, id, init)?,
        }
    }
    for &id in &block.continuations {
        check_continuation(cx, id, init)?;
    }
    Ok(())
}

fn check_continuation(
    cx: &FunctionContext<'_>,
    id: ContinuationId,
    init: &mut InitVars,
) -> ValidationResult<()> {
    let cont = cx.continuation(id)?;
    for var in cont.required_vars.iter().filter(|v| v.must_be_initialized()) {
        if !init.contains(var) {
            return Err(InitializationError::RequiredNotInitialized {
                function: cx.name(),
                var: var.describe(),
                cont: id,
            }
            .into());
        }
    }

    for &inner in &cont.blocks {
        let mut child = init.make_child();
        for var in cont.construct_defined_vars().filter(|v| v.must_be_initialized()) {
            child.insert(var.clone());
        }
        check_block(cx, inner, &mut child)?;
    }
    Ok(())
}

/// Apply one instruction to the initialized set
fn update_init_vars(
    cx: &FunctionContext<'_>,
    id: InstructionId,
    init: &mut InitVars,
) -> ValidationResult<()> {
    let inst = cx.instruction(id)?;
    let context = || cx.dump(NodeId::Instruction(id));

    for input in inst.input_vars().filter(|v| v.must_be_initialized()) {
        if !init.contains(input) {
            return Err(InitializationError::ReadBeforeInit {
                function: cx.name(),
                var: input.describe(),
                context: context(),
            }
            .into());
        }
    }

    for alias in &inst.initialized_aliases {
        if alias.storage != VarStorage::Alias {
            return Err(InitializationError::NotAnAlias {
                function: cx.name(),
                var: alias.describe(),
                context: context(),
            }
            .into());
        }
        if !init.insert(alias.clone()) {
            return Err(InitializationError::DoubleInit {
                function: cx.name(),
                var: alias.describe(),
                context: context(),
            }
            .into());
        }
    }

    for out in inst.regular_outputs() {
        if out.storage == VarStorage::Local {
            if !init.insert(out.clone()) {
                return Err(InitializationError::DoubleInit {
                    function: cx.name(),
                    var: out.describe(),
                    context: context(),
                }
                .into());
            }
        } else if out.must_be_initialized() && !init.contains(out) {
            // Writing through an alias that was never bound
            return Err(InitializationError::ReadBeforeInit {
                function: cx.name(),
                var: out.describe(),
                context: context(),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::ir::validation::{InitializationError, ValidationError, ValidationErrorKind};
    use crate::ir::{
        Arg, ContinuationType, DefType, Instruction, Opcode, Program, ProgramBuilder, ScalarType,
        Validator, Var, VarStorage, VarType,
    };

    fn var(name: &str, storage: VarStorage) -> Var {
        Var::new(name, VarType::Value(ScalarType::Int), storage, DefType::LocalUser)
    }

    fn store(out: &Var) -> Instruction {
        Instruction::new(Opcode::StoreScalar, vec![Arg::Int(0)], vec![out.clone()])
    }

    fn read(input: &Var) -> Instruction {
        Instruction::new(Opcode::CallLocal, vec![Arg::from(input)], vec![])
    }

    fn check(program: &Program) -> Result<(), ValidationError> {
        Validator::standard().check(program)
    }

    #[test]
    fn test_read_before_write() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let x = builder.declare(var("x", VarStorage::Local)).unwrap();
        builder.build(read(&x)).unwrap();
        builder.build(store(&x)).unwrap();

        let err = check(&builder.finish()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Initialization(InitializationError::ReadBeforeInit { .. })
        ));
    }

    #[test]
    fn test_local_written_twice() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let x = builder.declare(var("x", VarStorage::Local)).unwrap();
        builder.build(store(&x)).unwrap();
        builder.build(read(&x)).unwrap();
        builder.build(store(&x)).unwrap();

        let err = check(&builder.finish()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Initialization(InitializationError::DoubleInit { .. })
        ));
    }

    #[test]
    fn test_alias_binding() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let arr = builder
            .declare(Var::new(
                "arr",
                VarType::array(VarType::Value(ScalarType::Int), VarType::Future(ScalarType::Int)),
                VarStorage::Stack,
                DefType::LocalUser,
            ))
            .unwrap();
        let member = builder.declare(var("member", VarStorage::Alias)).unwrap();
        builder
            .build(
                Instruction::new(
                    Opcode::ArrayLookup,
                    vec![Arg::from(&arr), Arg::Int(0)],
                    vec![member.clone()],
                )
                .initializing(member.clone()),
            )
            .unwrap();
        builder.build(read(&member)).unwrap();
        assert!(check(&builder.program).is_ok());

        builder
            .build(
                Instruction::new(Opcode::CopyRef, vec![Arg::from(&arr)], vec![member.clone()])
                    .initializing(member),
            )
            .unwrap();
        let err = check(&builder.finish()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Initialization(InitializationError::DoubleInit { .. })
        ));
    }

    #[test]
    fn test_only_aliases_are_bound() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let s = builder.declare(var("s", VarStorage::Stack)).unwrap();
        builder
            .build(Instruction::new(Opcode::CopyRef, vec![], vec![s.clone()]).initializing(s))
            .unwrap();
        let err = check(&builder.finish()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Initialization(InitializationError::NotAnAlias { .. })
        ));
    }

    #[test]
    fn test_branch_init_not_visible_after() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let main = builder.main_block().unwrap();
        let x = builder.declare(var("x", VarStorage::Local)).unwrap();
        let cont = builder.build_conditional(ContinuationType::IfStatement).unwrap();
        let then_block = builder.add_branch(cont).unwrap();
        let else_block = builder.add_branch(cont).unwrap();

        builder.switch_to_block(then_block);
        builder.build(store(&x)).unwrap();
        builder.switch_to_block(else_block);
        builder.build(store(&x)).unwrap();
        assert!(check(&builder.program).is_ok());

        builder.switch_to_block(main);
        builder.build(read(&x)).unwrap();
        let err = check(&builder.finish()).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::Initialization);
    }

    #[test]
    fn test_required_vars_checked_before_branching() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let x = builder.declare(var("x", VarStorage::Local)).unwrap();
        let cont = builder.build_continuation(ContinuationType::NestedBlock).unwrap();
        builder.require_var(cont, &x).unwrap();
        builder.add_branch(cont).unwrap();

        let err = check(&builder.finish()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Initialization(InitializationError::RequiredNotInitialized { .. })
        ));
    }

    #[test]
    fn test_inputs_start_initialized() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("f");
        let a = builder
            .add_input(Var::new("a", VarType::Value(ScalarType::Int), VarStorage::Local, DefType::Inarg))
            .unwrap();
        builder.build(read(&a)).unwrap();
        assert!(check(&builder.finish()).is_ok());
    }

    #[test]
    fn test_mapping_must_be_initialized() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let path = builder.declare(var("path", VarStorage::Local)).unwrap();
        let cont = builder.build_continuation(ContinuationType::NestedBlock).unwrap();
        let inner = builder.add_branch(cont).unwrap();
        builder.switch_to_block(inner);
        builder
            .declare(
                Var::new("f", VarType::Future(ScalarType::File), VarStorage::Stack, DefType::LocalUser)
                    .with_mapping(path),
            )
            .unwrap();

        let err = check(&builder.finish()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Initialization(InitializationError::MappingNotInitialized { .. })
        ));
    }
}
