//! IR Variables
//!
//! A [`Var`] is a plain value. Every place that mentions a variable (a block
//! declaration, an instruction operand, a continuation's required list, a
//! cleanup action) holds its own copy, and two copies denote the same
//! declaration only when they are structurally identical.

use super::VarType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a variable's storage lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VarStorage {
    /// Shared datum allocated when the enclosing block starts
    Stack,
    /// Shared datum allocated on demand by the defining instruction
    Temp,
    /// Handle bound once to a datum owned elsewhere
    Alias,
    /// Value held in the memory of the current task
    Local,
    /// Program-wide constant
    GlobalConst,
    /// Program-wide variable
    GlobalVar,
}

impl VarStorage {
    /// Storage kinds that must be written by a defining instruction before
    /// they are read
    pub fn must_be_initialized(self) -> bool {
        matches!(self, VarStorage::Alias | VarStorage::Local)
    }

    pub fn is_global(self) -> bool {
        matches!(self, VarStorage::GlobalConst | VarStorage::GlobalVar)
    }

    /// Task-local values are not visible to a spawned task
    pub fn can_pass_to_child_task(self) -> bool {
        !matches!(self, VarStorage::Local)
    }
}

impl fmt::Display for VarStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VarStorage::Stack => "stack",
            VarStorage::Temp => "temp",
            VarStorage::Alias => "alias",
            VarStorage::Local => "local",
            VarStorage::GlobalConst => "global_const",
            VarStorage::GlobalVar => "global_var",
        };
        write!(f, "{}", name)
    }
}

/// How a variable came to be defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DefType {
    LocalUser,
    LocalCompiler,
    Inarg,
    Outarg,
    GlobalConst,
    GlobalUser,
}

impl DefType {
    pub fn is_global(self) -> bool {
        matches!(self, DefType::GlobalConst | DefType::GlobalUser)
    }
}

impl fmt::Display for DefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DefType::LocalUser => "local_user",
            DefType::LocalCompiler => "local_compiler",
            DefType::Inarg => "inarg",
            DefType::Outarg => "outarg",
            DefType::GlobalConst => "global_const",
            DefType::GlobalUser => "global_user",
        };
        write!(f, "{}", name)
    }
}

/// An IR variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Var {
    pub name: String,
    pub ty: VarType,
    pub storage: VarStorage,
    pub def_type: DefType,
    /// Declared variable this one is mapped onto (e.g. an alias of a file's path)
    #[serde(default)]
    pub mapping: Option<Box<Var>>,
}

impl Var {
    pub fn new(name: impl Into<String>, ty: VarType, storage: VarStorage, def_type: DefType) -> Self {
        Self {
            name: name.into(),
            ty,
            storage,
            def_type,
            mapping: None,
        }
    }

    /// Program-wide constant
    pub fn global_const(name: impl Into<String>, ty: VarType) -> Self {
        Self::new(name, ty, VarStorage::GlobalConst, DefType::GlobalConst)
    }

    pub fn with_mapping(mut self, mapped: Var) -> Self {
        self.mapping = Some(Box::new(mapped));
        self
    }

    /// Two variable records denote the same declaration
    pub fn identical(&self, other: &Var) -> bool {
        self == other
    }

    pub fn must_be_initialized(&self) -> bool {
        self.storage.must_be_initialized()
    }

    pub fn can_pass_to_child_task(&self) -> bool {
        self.storage.can_pass_to_child_task() && self.ty.can_pass_to_child_task()
    }

    pub fn is_global(&self) -> bool {
        self.storage.is_global() || self.def_type.is_global()
    }

    /// Full description used in internal error messages
    pub fn describe(&self) -> String {
        match &self.mapping {
            Some(mapped) => format!(
                "{} : {} ({} {}) mapped to {}",
                self.name, self.ty, self.storage, self.def_type, mapped.name
            ),
            None => format!("{} : {} ({} {})", self.name, self.ty, self.storage, self.def_type),
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Instruction operand: a variable reference or a literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Arg {
    Var(Var),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl Arg {
    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Arg::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Arg::Var(_))
    }
}

impl From<Var> for Arg {
    fn from(v: Var) -> Self {
        Arg::Var(v)
    }
}

impl From<&Var> for Arg {
    fn from(v: &Var) -> Self {
        Arg::Var(v.clone())
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Var(v) => write!(f, "{}", v),
            Arg::Int(i) => write!(f, "{}", i),
            Arg::Float(x) => write!(f, "{:?}", x),
            Arg::Str(s) => write!(f, "{:?}", s),
            Arg::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ScalarType;

    fn local_int(name: &str) -> Var {
        Var::new(name, VarType::Value(ScalarType::Int), VarStorage::Local, DefType::LocalUser)
    }

    #[test]
    fn test_identity_is_structural() {
        let a = local_int("x");
        let b = local_int("x");
        assert!(a.identical(&b));

        let mut c = local_int("x");
        c.storage = VarStorage::Stack;
        assert!(!a.identical(&c));

        let d = local_int("x").with_mapping(local_int("path"));
        assert!(!a.identical(&d));
    }

    #[test]
    fn test_storage_properties() {
        assert!(VarStorage::Alias.must_be_initialized());
        assert!(VarStorage::Local.must_be_initialized());
        assert!(!VarStorage::Stack.must_be_initialized());
        assert!(!VarStorage::Local.can_pass_to_child_task());
        assert!(VarStorage::Alias.can_pass_to_child_task());
        assert!(VarStorage::GlobalConst.is_global());
    }

    #[test]
    fn test_updateable_not_passable() {
        let v = Var::new(
            "counter",
            VarType::Updateable(ScalarType::Float),
            VarStorage::Stack,
            DefType::LocalUser,
        );
        assert!(!v.can_pass_to_child_task());
    }

    #[test]
    fn test_describe() {
        let v = local_int("x");
        assert_eq!(v.describe(), "x : $int (local local_user)");
        assert_eq!(Arg::from(&v).to_string(), "x");
        assert_eq!(Arg::Str("a".into()).to_string(), "\"a\"");
    }
}
