//! IR Type System
//!
//! Types carried by IR variables. They are coarse compared to the front-end
//! types: the validator only needs them for structural identity and for the
//! few semantic questions asked of a variable (can it cross a task boundary,
//! is it an updateable scalar).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScalarType {
    Int,
    Float,
    Str,
    Bool,
    Blob,
    Void,
    File,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::Str => "string",
            ScalarType::Bool => "boolean",
            ScalarType::Blob => "blob",
            ScalarType::Void => "void",
            ScalarType::File => "file",
        };
        write!(f, "{}", name)
    }
}

/// IR variable type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VarType {
    /// Future holding a scalar, assigned once
    Future(ScalarType),

    /// Plain scalar value held in task-local memory
    Value(ScalarType),

    /// Scalar cell that supports in-place min/incr/scale updates
    Updateable(ScalarType),

    /// Associative array
    Array {
        key: Box<VarType>,
        elem: Box<VarType>,
    },

    /// Reference to another datum
    Ref(Box<VarType>),
}

impl VarType {
    /// Create an array type keyed by `key` with elements `elem`
    pub fn array(key: VarType, elem: VarType) -> Self {
        VarType::Array {
            key: Box::new(key),
            elem: Box::new(elem),
        }
    }

    /// Create a reference type
    pub fn reference(inner: VarType) -> Self {
        VarType::Ref(Box::new(inner))
    }

    pub fn is_updateable(&self) -> bool {
        matches!(self, VarType::Updateable(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, VarType::Array { .. })
    }

    /// Future type that an update of this updateable expects
    pub fn as_scalar_future(&self) -> Option<VarType> {
        match self {
            VarType::Updateable(scalar) => Some(VarType::Future(*scalar)),
            _ => None,
        }
    }

    /// Whether a value of type `self` may be stored into a slot of type `other`
    pub fn assignable_to(&self, other: &VarType) -> bool {
        match (self, other) {
            (VarType::Future(a), VarType::Future(b)) | (VarType::Value(a), VarType::Future(b)) => {
                a == b || (*a == ScalarType::Int && *b == ScalarType::Float)
            }
            (a, b) => a == b,
        }
    }

    /// Updateable cells live in the memory of the task that created them,
    /// so they cannot be shipped to a spawned task.
    pub fn can_pass_to_child_task(&self) -> bool {
        !self.is_updateable()
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Future(s) => write!(f, "{}", s),
            VarType::Value(s) => write!(f, "${}", s),
            VarType::Updateable(s) => write!(f, "updateable_{}", s),
            VarType::Array { key, elem } => write!(f, "{}[{}]", elem, key),
            VarType::Ref(inner) => write!(f, "*({})", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ty = VarType::array(VarType::Value(ScalarType::Int), VarType::Future(ScalarType::Str));
        assert_eq!(ty.to_string(), "string[$int]");
        assert_eq!(VarType::reference(VarType::Future(ScalarType::Int)).to_string(), "*(int)");
    }

    #[test]
    fn test_updateable_scalar_future() {
        let upd = VarType::Updateable(ScalarType::Float);
        assert_eq!(upd.as_scalar_future(), Some(VarType::Future(ScalarType::Float)));
        assert!(!upd.can_pass_to_child_task());
        assert_eq!(VarType::Future(ScalarType::Float).as_scalar_future(), None);
    }

    #[test]
    fn test_assignable() {
        let int_f = VarType::Future(ScalarType::Int);
        let float_f = VarType::Future(ScalarType::Float);
        assert!(int_f.assignable_to(&float_f));
        assert!(!float_f.assignable_to(&int_f));
        assert!(VarType::Value(ScalarType::Float).assignable_to(&float_f));
    }
}
