//! IR Dump Utility
//!
//! Pretty-prints IR trees in a human-readable form. Validation errors embed
//! these dumps so a failure can be reproduced from the message alone.

use super::{
    Block, BlockId, CleanupId, ContinuationId, Function, InstructionId, NodeId, Program, Statement,
    Var,
};
use std::fmt;

const INDENT: &str = "  ";

/// Dump an entire program to a string.
pub fn dump_program(program: &Program) -> String {
    ProgramDump { program }.to_string()
}

/// Dump a single function to a string.
pub fn dump_function(program: &Program, function: &Function) -> String {
    FunctionDump { program, function }.to_string()
}

/// Dump a block and everything below it.
pub fn dump_block(program: &Program, id: BlockId) -> String {
    TreeDump {
        program,
        root: Root::Block(id),
    }
    .to_string()
}

/// Dump a continuation and its child blocks.
pub fn dump_continuation(program: &Program, id: ContinuationId) -> String {
    TreeDump {
        program,
        root: Root::Continuation(id),
    }
    .to_string()
}

/// Dump a single instruction on one line.
pub fn dump_instruction(program: &Program, id: InstructionId) -> String {
    match program.instruction(id) {
        Some(inst) => format!("{} {}", id, inst),
        None => format!("{} <missing>", id),
    }
}

/// Dump a single cleanup action on one line.
pub fn dump_cleanup(program: &Program, id: CleanupId) -> String {
    match program.cleanup(id) {
        Some(cleanup) => format!(
            "{} {} => {}",
            id,
            cleanup.var.name,
            dump_instruction(program, cleanup.action)
        ),
        None => format!("{} <missing>", id),
    }
}

/// Dump whichever node an id names
pub fn dump_node(program: &Program, node: NodeId) -> String {
    match node {
        NodeId::Block(id) => dump_block(program, id),
        NodeId::Continuation(id) => dump_continuation(program, id),
        NodeId::Instruction(id) => dump_instruction(program, id),
        NodeId::Cleanup(id) => dump_cleanup(program, id),
    }
}

/// Comma-separated variable names, for error messages
pub fn var_list<'a>(vars: impl IntoIterator<Item = &'a Var>) -> String {
    let names: Vec<&str> = vars.into_iter().map(|v| v.name.as_str()).collect();
    format!("[{}]", names.join(", "))
}

struct ProgramDump<'a> {
    program: &'a Program,
}

impl fmt::Display for ProgramDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; Globals: {}", self.program.globals.len())?;
        for global in &self.program.globals {
            writeln!(f, "global {}", global.describe())?;
        }
        writeln!(f, "; Functions: {}", self.program.functions.len())?;
        for function in &self.program.functions {
            writeln!(f)?;
            write!(
                f,
                "{}",
                FunctionDump {
                    program: self.program,
                    function,
                }
            )?;
        }
        Ok(())
    }
}

struct FunctionDump<'a> {
    program: &'a Program,
    function: &'a Function,
}

impl fmt::Display for FunctionDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outputs: Vec<String> = self.function.outputs.iter().map(Var::describe).collect();
        let inputs: Vec<String> = self.function.inputs.iter().map(Var::describe).collect();
        writeln!(
            f,
            "function @{} ({}) ({}) [{}] {{",
            self.function.name,
            outputs.join(", "),
            inputs.join(", "),
            self.function.id
        )?;
        let tree = TreeDump {
            program: self.program,
            root: Root::Block(self.function.main_block),
        };
        tree.write_block(f, self.function.main_block, 1)?;
        writeln!(f, "}}")
    }
}

enum Root {
    Block(BlockId),
    Continuation(ContinuationId),
}

struct TreeDump<'a> {
    program: &'a Program,
    root: Root,
}

impl TreeDump<'_> {
    fn write_block(&self, f: &mut fmt::Formatter<'_>, id: BlockId, depth: usize) -> fmt::Result {
        let pad = INDENT.repeat(depth);
        let Some(block) = self.program.block(id) else {
            return writeln!(f, "{}{} <missing>", pad, id);
        };
        writeln!(f, "{}{} {}:", pad, id, block.kind)?;
        self.write_block_body(f, block, depth + 1)
    }

    fn write_block_body(&self, f: &mut fmt::Formatter<'_>, block: &Block, depth: usize) -> fmt::Result {
        let pad = INDENT.repeat(depth);
        for var in &block.variables {
            writeln!(f, "{}declare {}", pad, var.describe())?;
        }
        for stmt in &block.statements {
            match stmt {
                Statement::Instruction(id) => {
                    writeln!(f, "{}{}", pad, dump_instruction(self.program, *id))?;
                }
                Statement::Conditional(id) => self.write_continuation(f, *id, depth)?,
            }
        }
        for id in &block.continuations {
            self.write_continuation(f, *id, depth)?;
        }
        for id in &block.cleanups {
            writeln!(f, "{}cleanup {}", pad, dump_cleanup(self.program, *id))?;
        }
        Ok(())
    }

    fn write_continuation(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: ContinuationId,
        depth: usize,
    ) -> fmt::Result {
        let pad = INDENT.repeat(depth);
        let Some(cont) = self.program.continuation(id) else {
            return writeln!(f, "{}{} <missing>", pad, id);
        };
        write!(f, "{}{} {}", pad, id, cont.kind)?;
        if !cont.required_vars.is_empty() {
            write!(f, " requires {}", var_list(&cont.required_vars))?;
        }
        if !cont.construct_defined.is_empty() {
            write!(f, " defines {}", var_list(cont.construct_defined_vars()))?;
        }
        if !cont.passed_vars.is_empty() {
            write!(f, " passes {}", var_list(&cont.passed_vars))?;
        }
        writeln!(f, " {{")?;
        for block in &cont.blocks {
            self.write_block(f, *block, depth + 1)?;
        }
        writeln!(f, "{}}}", pad)
    }
}

impl fmt::Display for TreeDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Root::Block(id) => self.write_block(f, id, 0),
            Root::Continuation(id) => self.write_continuation(f, id, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        Arg, ContinuationType, DefType, Instruction, Opcode, ProgramBuilder, ScalarType,
        VarStorage, VarType,
    };

    #[test]
    fn test_dump_function_tree() {
        let mut builder = ProgramBuilder::new();
        builder.start_function("main");
        let x = builder
            .declare(Var::new(
                "x",
                VarType::Future(ScalarType::Int),
                VarStorage::Stack,
                DefType::LocalUser,
            ))
            .unwrap();
        builder
            .build(Instruction::new(Opcode::StoreScalar, vec![Arg::Int(7)], vec![x.clone()]))
            .unwrap();
        let cont = builder.build_continuation(ContinuationType::NestedBlock).unwrap();
        builder.require_var(cont, &x).unwrap();
        builder.add_branch(cont).unwrap();
        let program = builder.finish();

        let text = dump_program(&program);
        assert!(text.contains("function @main"));
        assert!(text.contains("declare x : int (stack local_user)"));
        assert!(text.contains("inst0 store_scalar [x] [7] @sync:ANY"));
        assert!(text.contains("cont0 nested_block requires [x] {"));
        assert!(text.contains("bb1 NESTED_BLOCK:"));
    }

    #[test]
    fn test_dump_missing_nodes() {
        let program = Program::new();
        assert_eq!(dump_instruction(&program, InstructionId(3)), "inst3 <missing>");
        assert!(dump_block(&program, BlockId(0)).contains("bb0 <missing>"));
        assert_eq!(
            dump_node(&program, NodeId::Cleanup(CleanupId(1))),
            "cleanup1 <missing>"
        );
    }
}
