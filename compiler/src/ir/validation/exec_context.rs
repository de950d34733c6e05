//! Execution context checks
//!
//! The main block of every function runs on a control engine. Continuations
//! decide the context of their branches, and each instruction must be able
//! to run in the context it ends up in.

use super::{ExecContextError, FunctionContext, ValidationResult};
use crate::ir::{BlockId, ContinuationId, ExecContext, NodeId, Statement};

pub(super) fn check_exec_context(cx: &FunctionContext<'_>) -> ValidationResult<()> {
    check_block(cx, cx.function.main_block, &ExecContext::control())
}

fn check_block(
    cx: &FunctionContext<'_>,
    block_id: BlockId,
    exec_cx: &ExecContext,
) -> ValidationResult<()> {
    let block = cx.block(block_id)?;
    for stmt in &block.statements {
        match *stmt {
            Statement::Instruction(id) => {
                let inst = cx.instruction(id)?;
                if !inst.exec_target.can_run_in(exec_cx) {
                    return Err(ExecContextError::IllegalTarget {
                        function: cx.name(),
                        inst: cx.dump(NodeId::Instruction(id)),
                        target: inst.exec_target.to_string(),
                        context: exec_cx.to_string(),
                    }
                    .into());
                }
            }
            Statement::Conditional(id) => check_continuation(cx, id, exec_cx)?,
        }
    }
    for &id in &block.continuations {
        check_continuation(cx, id, exec_cx)?;
    }
    Ok(())
}

fn check_continuation(
    cx: &FunctionContext<'_>,
    id: ContinuationId,
    exec_cx: &ExecContext,
) -> ValidationResult<()> {
    let cont = cx.continuation(id)?;
    let child_cx = cont.child_context(exec_cx);
    for &inner in &cont.blocks {
        check_block(cx, inner, &child_cx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::ir::validation::{ExecContextError, ValidationError};
    use crate::ir::{
        ContinuationType, ExecContext, ExecTarget, Instruction, Opcode, Program, ProgramBuilder,
        Validator,
    };

    fn worker_only() -> Instruction {
        Instruction::new(Opcode::CallLocal, vec![], vec![])
            .with_target(ExecTarget::sync(ExecContext::default_worker()))
    }

    fn in_wait(target: ExecTarget) -> Program {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let wait = builder
            .build_continuation(ContinuationType::WaitStatement { target })
            .unwrap();
        let body = builder.add_branch(wait).unwrap();
        builder.switch_to_block(body);
        builder.build(worker_only()).unwrap();
        builder.finish()
    }

    #[test]
    fn test_worker_op_in_control_block() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        builder.build(worker_only()).unwrap();
        let program = builder.finish();

        let err = Validator::standard().check(&program).unwrap_err();
        match err {
            ValidationError::ExecContext(ExecContextError::IllegalTarget { target, context, .. }) => {
                assert_eq!(target, "sync:WORKER(WORK)");
                assert_eq!(context, "CONTROL");
            }
            other => panic!("expected exec context error, got {:?}", other),
        }
    }

    #[test]
    fn test_worker_op_inside_worker_wait() {
        let program = in_wait(ExecTarget::dispatched(ExecContext::default_worker()));
        assert!(Validator::standard().check(&program).is_ok());
    }

    #[test]
    fn test_wait_without_context_switch() {
        let program = in_wait(ExecTarget::async_any());
        assert!(Validator::standard().check(&program).is_err());
    }

    #[test]
    fn test_async_ops_run_anywhere() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        builder
            .build(Instruction::new(Opcode::CallForeign, vec![], vec![]))
            .unwrap();
        builder
            .build(Instruction::new(Opcode::AsyncOp, vec![], vec![]))
            .unwrap();
        assert!(Validator::standard().check(&builder.finish()).is_ok());
    }

    #[test]
    fn test_check_can_be_disabled() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        builder.build(worker_only()).unwrap();
        let mut config = crate::ir::ValidatorConfig::standard();
        config.check_exec_context = false;
        assert!(Validator::new(config).check(&builder.finish()).is_ok());
    }
}
