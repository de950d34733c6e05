//! Cleanup placement checks

use fxhash::FxHashSet;
use log::warn;

use super::{
    CleanupOwnershipError, CleanupPolicy, FunctionContext, ValidationResult, ValidatorConfig,
};
use crate::ir::{dump, Block, BlockId, BlockParent, NodeId, Var};

/// Cleanups of a block must target variables the block owns: its own
/// declarations, plus the function parameters for the main block or the
/// construct-defined variables of the parent continuation for a branch.
pub(super) fn check_cleanups(
    cx: &FunctionContext<'_>,
    config: &ValidatorConfig,
    block_id: BlockId,
    block: &Block,
) -> ValidationResult<()> {
    if block.cleanups.is_empty() {
        return Ok(());
    }

    let mut owned: FxHashSet<&Var> = block.variables.iter().collect();
    match block.parent {
        BlockParent::Function(_) => owned.extend(cx.function.params()),
        BlockParent::Continuation(cont) => {
            owned.extend(cx.continuation(cont)?.construct_defined_vars())
        }
    }

    for &id in &block.cleanups {
        let cleanup = cx.cleanup(id)?;
        let action = cx.instruction(cleanup.action)?;
        if config.reject_refcount_cleanups && action.op.is_refcount_op() {
            return Err(CleanupOwnershipError::UnexpectedRefcountOp {
                function: cx.name(),
                cleanup: cx.dump(NodeId::Cleanup(id)),
            }
            .into());
        }

        if owned.contains(&cleanup.var) {
            continue;
        }
        match config.cleanup_policy {
            CleanupPolicy::Fatal => {
                return Err(CleanupOwnershipError::NotOwned {
                    function: cx.name(),
                    var: cleanup.var.describe(),
                    block: block_id,
                    valid: dump::var_list(owned.iter().copied()),
                }
                .into());
            }
            CleanupPolicy::Warn => {
                warn!(
                    "Cleanup action for var not defined in block: {} in function {}. Valid variables are: {}",
                    cleanup.var.describe(),
                    cx.function.id,
                    dump::var_list(owned.iter().copied())
                );
            }
            CleanupPolicy::Skip => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::ir::validation::{CleanupOwnershipError, ValidationError};
    use crate::ir::{
        Arg, ContVarDefType, ContinuationType, DefType, ForeachSettings, Instruction, Opcode,
        Program, ProgramBuilder, ScalarType, Validator, Var, VarStorage, VarType,
    };

    fn stack(name: &str) -> Var {
        Var::new(name, VarType::Future(ScalarType::Int), VarStorage::Stack, DefType::LocalUser)
    }

    fn misplaced_cleanup(op: Opcode) -> Program {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let y = builder.declare(stack("y")).unwrap();
        let cont = builder.build_continuation(ContinuationType::NestedBlock).unwrap();
        let inner = builder.add_branch(cont).unwrap();
        builder.switch_to_block(inner);
        builder
            .build_cleanup(&y, Instruction::new(op, vec![Arg::from(&y)], vec![]))
            .unwrap();
        builder.finish()
    }

    #[test]
    fn test_owned_cleanups_pass() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let a = builder
            .add_input(Var::new("a", VarType::Future(ScalarType::Int), VarStorage::Stack, DefType::Inarg))
            .unwrap();
        builder
            .build_cleanup(&a, Instruction::new(Opcode::Comment, vec![Arg::from(&a)], vec![]))
            .unwrap();

        let lp = builder
            .build_continuation(ContinuationType::ForeachLoop(ForeachSettings::default()))
            .unwrap();
        let m = builder
            .define_construct_var(lp, stack("m"), ContVarDefType::NewDef)
            .unwrap();
        let body = builder.add_branch(lp).unwrap();
        builder.switch_to_block(body);
        builder
            .build_cleanup(&m, Instruction::new(Opcode::Comment, vec![Arg::from(&m)], vec![]))
            .unwrap();

        assert!(Validator::standard().check(&builder.finish()).is_ok());
    }

    #[test]
    fn test_unowned_cleanup_fatal_in_standard() {
        let program = misplaced_cleanup(Opcode::Comment);
        let err = Validator::standard().check(&program).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::CleanupOwnership(CleanupOwnershipError::NotOwned { .. })
        ));
    }

    #[test]
    fn test_unowned_cleanup_warns_in_final() {
        let program = misplaced_cleanup(Opcode::DecrRefcount);
        assert!(Validator::final_form().check(&program).is_ok());
    }

    #[test]
    fn test_refcount_cleanups_rejected_early() {
        let program = misplaced_cleanup(Opcode::DecrRefcount);
        let err = Validator::standard().check(&program).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::CleanupOwnership(CleanupOwnershipError::UnexpectedRefcountOp { .. })
        ));
    }
}
