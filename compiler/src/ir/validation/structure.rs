//! Tree-shape and parent-link checks

use fxhash::FxHashMap;

use super::{FunctionContext, StructuralError, ValidationResult};
use crate::ir::{
    BlockId, BlockParent, BlockType, ContinuationId, ContinuationType, FunctionId, NodeId,
    Statement,
};

/// Function each node was first reached from. Shared across all functions
/// of a program so cross-function sharing is caught too.
pub(super) type NodeOwners = FxHashMap<NodeId, FunctionId>;

/// Every block, continuation, instruction and cleanup is reachable from
/// exactly one position
pub(super) fn check_duplicate_nodes(
    cx: &FunctionContext<'_>,
    owners: &mut NodeOwners,
) -> ValidationResult<()> {
    let mut walker = DupeWalker { cx, owners };
    walker.visit_block(cx.function.main_block)
}

struct DupeWalker<'a, 'p> {
    cx: &'a FunctionContext<'p>,
    owners: &'a mut NodeOwners,
}

impl DupeWalker<'_, '_> {
    fn check_dupe(&mut self, node: NodeId) -> ValidationResult<()> {
        let fid = self.cx.function.id;
        if let Some(prev) = self.owners.insert(node, fid) {
            let previous = self
                .cx
                .program
                .function(prev)
                .map(|f| f.name.clone())
                .unwrap_or_else(|| prev.to_string());
            return Err(StructuralError::DuplicateNode {
                node,
                function: self.cx.name(),
                previous,
                dump: self.cx.dump(node),
            }
            .into());
        }
        Ok(())
    }

    fn visit_block(&mut self, id: BlockId) -> ValidationResult<()> {
        // Stop at the first revisit so cycles terminate
        self.check_dupe(NodeId::Block(id))?;
        let block = self.cx.block(id)?;
        for stmt in &block.statements {
            match *stmt {
                Statement::Instruction(inst) => {
                    self.cx.instruction(inst)?;
                    self.check_dupe(NodeId::Instruction(inst))?;
                }
                Statement::Conditional(cont) => self.visit_continuation(cont)?,
            }
        }
        for &cont in &block.continuations {
            self.visit_continuation(cont)?;
        }
        for &cleanup in &block.cleanups {
            self.check_dupe(NodeId::Cleanup(cleanup))?;
            let action = self.cx.cleanup(cleanup)?.action;
            self.cx.instruction(action)?;
            self.check_dupe(NodeId::Instruction(action))?;
        }
        Ok(())
    }

    fn visit_continuation(&mut self, id: ContinuationId) -> ValidationResult<()> {
        self.check_dupe(NodeId::Continuation(id))?;
        let cont = self.cx.continuation(id)?;
        for &block in &cont.blocks {
            self.visit_block(block)?;
        }
        Ok(())
    }
}

/// Parent links agree with tree position
pub(super) fn check_parent_links(
    cx: &FunctionContext<'_>,
    no_nested_blocks: bool,
) -> ValidationResult<()> {
    let main_id = cx.function.main_block;
    let main = cx.block(main_id)?;
    if main.kind != BlockType::MainBlock {
        return Err(StructuralError::BadMainBlockKind {
            function: cx.name(),
            block: main_id,
            kind: main.kind.to_string(),
        }
        .into());
    }
    let expected = BlockParent::Function(cx.function.id);
    if main.parent != expected {
        return Err(StructuralError::BadBlockParent {
            function: cx.name(),
            block: main_id,
            expected,
            found: main.parent,
        }
        .into());
    }
    check_parent_links_rec(cx, main_id, no_nested_blocks)
}

fn check_parent_links_rec(
    cx: &FunctionContext<'_>,
    block_id: BlockId,
    no_nested_blocks: bool,
) -> ValidationResult<()> {
    let block = cx.block(block_id)?;
    for cont_id in block.all_continuations() {
        let cont = cx.continuation(cont_id)?;
        if no_nested_blocks && cont.kind == ContinuationType::NestedBlock {
            return Err(StructuralError::NestedBlockForbidden {
                function: cx.name(),
                cont: cont_id,
            }
            .into());
        }
        if cont.parent != block_id {
            return Err(StructuralError::BadContinuationParent {
                function: cx.name(),
                cont: cont_id,
                expected: block_id,
                found: cont.parent,
                dump: cx.dump(NodeId::Continuation(cont_id)),
            }
            .into());
        }

        for &inner_id in &cont.blocks {
            let inner = cx.block(inner_id)?;
            if inner.kind == BlockType::MainBlock {
                return Err(StructuralError::MainBlockInContinuation {
                    function: cx.name(),
                    block: inner_id,
                    cont: cont_id,
                }
                .into());
            }
            let expected = BlockParent::Continuation(cont_id);
            if inner.parent != expected {
                return Err(StructuralError::BadBlockParent {
                    function: cx.name(),
                    block: inner_id,
                    expected,
                    found: inner.parent,
                }
                .into());
            }
            check_parent_links_rec(cx, inner_id, no_nested_blocks)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::validation::{ValidationError, ValidationErrorKind};
    use crate::ir::{
        Instruction, Opcode, Program, ProgramBuilder, Statement, Validator, ValidatorConfig,
    };

    fn run(program: &Program, config: ValidatorConfig) -> Result<(), ValidationError> {
        Validator::new(config).check(program)
    }

    fn two_branch_program() -> (Program, ContinuationId) {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        builder
            .build(Instruction::new(Opcode::Comment, vec![], vec![]))
            .unwrap();
        let cont = builder.build_conditional(ContinuationType::IfStatement).unwrap();
        builder.add_branch(cont).unwrap();
        builder.add_branch(cont).unwrap();
        (builder.finish(), cont)
    }

    #[test]
    fn test_well_formed_tree() {
        let (program, _) = two_branch_program();
        assert!(run(&program, ValidatorConfig::standard()).is_ok());
    }

    #[test]
    fn test_shared_instruction() {
        let (mut program, cont) = two_branch_program();
        let then_block = program.continuation(cont).unwrap().blocks[0];
        program.blocks[then_block.index()]
            .statements
            .push(Statement::Instruction(crate::ir::InstructionId(0)));

        let err = run(&program, ValidatorConfig::standard()).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::Structural);
        assert!(err.to_string().contains("duplicate construct inst0"));
    }

    #[test]
    fn test_shared_across_functions() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("f");
        let inst = builder
            .build(Instruction::new(Opcode::Comment, vec![], vec![]))
            .unwrap();
        builder.start_function("g");
        let g_main = builder.main_block().unwrap();
        let mut program = builder.finish();
        program.blocks[g_main.index()]
            .statements
            .push(Statement::Instruction(inst));

        let err = run(&program, ValidatorConfig::final_form()).unwrap_err();
        assert!(err.to_string().contains("in functions g f"));
    }

    #[test]
    fn test_shared_across_renumbered_functions() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("f");
        let f_main = builder.main_block().unwrap();
        let inst = builder
            .build(Instruction::new(Opcode::Comment, vec![], vec![]))
            .unwrap();
        builder.start_function("g");
        let g_main = builder.main_block().unwrap();
        let mut program = builder.finish();
        program.blocks[g_main.index()]
            .statements
            .push(Statement::Instruction(inst));

        // Ids no longer match arena positions, as in a hand-written program
        for (function, main, raw) in [(0, f_main, 1), (1, g_main, 0)] {
            program.functions[function].id = FunctionId::from_raw(raw);
            program.blocks[main.index()].parent = BlockParent::Function(FunctionId::from_raw(raw));
        }

        let err = run(&program, ValidatorConfig::final_form()).unwrap_err();
        match err {
            ValidationError::Structural(StructuralError::DuplicateNode {
                function, previous, ..
            }) => {
                assert_eq!(function, "g");
                assert_eq!(previous, "f");
            }
            other => panic!("expected duplicate node, got {}", other),
        }
    }

    #[test]
    fn test_cycle_terminates() {
        let (mut program, cont) = two_branch_program();
        let main = program.functions[0].main_block;
        program.continuations[cont.index()].blocks.push(main);
        let err = run(&program, ValidatorConfig::standard()).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::Structural);
    }

    #[test]
    fn test_bad_continuation_parent() {
        let (mut program, cont) = two_branch_program();
        program.continuations[cont.index()].parent = BlockId(2);
        let err = run(&program, ValidatorConfig::standard()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Structural(StructuralError::BadContinuationParent { .. })
        ));
    }

    #[test]
    fn test_bad_block_parent() {
        let (mut program, cont) = two_branch_program();
        let inner = program.continuation(cont).unwrap().blocks[1];
        program.blocks[inner.index()].parent = BlockParent::Continuation(ContinuationId(9));
        let err = run(&program, ValidatorConfig::standard()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Structural(StructuralError::BadBlockParent { .. })
        ));
    }

    #[test]
    fn test_nested_blocks_forbidden_late() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let cont = builder.build_continuation(ContinuationType::NestedBlock).unwrap();
        builder.add_branch(cont).unwrap();
        let program = builder.finish();

        assert!(run(&program, ValidatorConfig::standard()).is_ok());
        let err = run(&program, ValidatorConfig::standard().with_no_nested_blocks(true))
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Structural(StructuralError::NestedBlockForbidden { .. })
        ));
    }
}
