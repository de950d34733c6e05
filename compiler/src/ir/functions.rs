//! IR Functions
//!
//! A function owns its parameter lists and exactly one main block. All other
//! blocks of the function are reached through continuations.

use super::{BlockId, FunctionId, Var};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// IR function representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Unique identifier for this function
    pub id: FunctionId,

    /// Function name (unique within the program)
    pub name: String,

    /// Input parameters, in order
    pub inputs: Vec<Var>,

    /// Output parameters, in order
    pub outputs: Vec<Var>,

    /// Root block
    pub main_block: BlockId,

    /// Every variable name lowering handed out in this function. Passes that
    /// create variables must register the name here.
    #[serde(default)]
    pub used_var_names: IndexSet<String>,
}

impl Function {
    pub fn new(id: FunctionId, name: impl Into<String>, main_block: BlockId) -> Self {
        Self {
            id,
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            main_block,
            used_var_names: IndexSet::new(),
        }
    }

    pub fn var_name_used(&self, name: &str) -> bool {
        self.used_var_names.contains(name)
    }

    pub fn mark_var_name_used(&mut self, name: &str) {
        if !self.used_var_names.contains(name) {
            self.used_var_names.insert(name.to_string());
        }
    }

    /// Input then output parameters
    pub fn params(&self) -> impl Iterator<Item = &Var> {
        self.inputs.iter().chain(self.outputs.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DefType, ScalarType, VarStorage, VarType};

    #[test]
    fn test_used_names() {
        let mut f = Function::new(FunctionId(0), "main", BlockId(0));
        assert!(!f.var_name_used("x"));
        f.mark_var_name_used("x");
        f.mark_var_name_used("x");
        assert!(f.var_name_used("x"));
        assert_eq!(f.used_var_names.len(), 1);
    }

    #[test]
    fn test_params_order() {
        let mut f = Function::new(FunctionId(1), "f", BlockId(3));
        let ty = VarType::Future(ScalarType::Int);
        f.inputs.push(Var::new("a", ty.clone(), VarStorage::Stack, DefType::Inarg));
        f.outputs.push(Var::new("r", ty, VarStorage::Stack, DefType::Outarg));
        let names: Vec<_> = f.params().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a", "r"]);
    }
}
