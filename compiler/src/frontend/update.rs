//! Update statements
//!
//! `min x := e;`, `incr x := e;` and `scale x := e;` apply an in-place
//! update to an updateable scalar.

use super::{LocalContext, UserError};
use crate::ir::{Arg, Instruction, Opcode, UpdateMode, Var, VarType};

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub target: Var,
    pub mode: UpdateMode,
    /// Type of the right-hand expression
    pub expr_type: VarType,
}

impl Update {
    /// Type-check an update of `target` by an expression of `expr_type`
    pub fn new(target: Var, mode: UpdateMode, expr_type: VarType) -> Result<Self, UserError> {
        let Some(expected) = target.ty.as_scalar_future() else {
            return Err(UserError::TypeMismatch(format!(
                "can only update updateable variables: variable {} had type {}",
                target.name, target.ty
            )));
        };
        if !expr_type.assignable_to(&expected) {
            return Err(UserError::TypeMismatch(format!(
                "in update of variable {} with type {} expected expression of type {} but got expression of type {}",
                target.name, target.ty, expected, expr_type
            )));
        }
        Ok(Self {
            target,
            mode,
            expr_type,
        })
    }

    /// Resolve the command and target of `<command> <target> := <expr>`
    pub fn resolve(
        cx: &LocalContext,
        command: &str,
        target_name: &str,
        expr_type: VarType,
    ) -> Result<Self, UserError> {
        let mode = UpdateMode::from_name(command)
            .ok_or_else(|| UserError::UnknownUpdateMode(command.to_string()))?;
        let target = cx
            .get(target_name)
            .cloned()
            .ok_or_else(|| UserError::UndefinedVariable {
                name: target_name.to_string(),
            })?;
        Self::new(target, mode, expr_type)
    }

    /// Scalar future type the expression is converted to
    pub fn expected_type(&self) -> Option<VarType> {
        self.target.ty.as_scalar_future()
    }

    /// Instruction applying the update with the evaluated expression
    pub fn to_instruction(&self, value: Arg) -> Instruction {
        Instruction::new(
            Opcode::UpdateScalar(self.mode),
            vec![value],
            vec![self.target.clone()],
        )
    }
}
