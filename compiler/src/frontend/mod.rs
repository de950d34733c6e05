//! Front-end descriptors
//!
//! Pieces of the lowering front end that decide how source constructs
//! become IR: foreach-loop annotations and update statements. Errors here
//! are the user's, reported against the source program, and are kept apart
//! from IR validation errors.

pub mod foreach;
pub mod update;

pub use foreach::ForeachLoop;
pub use update::Update;

use crate::ir::scope::ScopedMap;
use crate::ir::Var;
use std::fmt;
use thiserror::Error;

/// Variables declared so far while lowering a function, by name
pub type LocalContext = ScopedMap<String, Var>;

/// Error in the user's program
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("invalid annotation: {0}")]
    InvalidAnnotation(String),

    #[error("variable {name} is not defined")]
    UndefinedVariable { name: String },

    #[error("variable {name} is already defined")]
    AlreadyDefined { name: String },

    #[error("type mismatch {0}")]
    TypeMismatch(String),

    #[error("unknown update mode {0}")]
    UnknownUpdateMode(String),

    #[error("{0} is not allowed outside a function")]
    OutsideFunction(String),
}

/// `@name` or `@name=value` attached to a construct
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Flag(String),
    Keyed { key: String, value: String },
}

impl Annotation {
    pub fn flag(name: impl Into<String>) -> Self {
        Annotation::Flag(name.into())
    }

    pub fn keyed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Annotation::Keyed {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse annotation text with the leading `@` already stripped
    pub fn parse(text: &str) -> Self {
        match text.split_once('=') {
            Some((key, value)) => Annotation::keyed(key.trim(), value.trim()),
            None => Annotation::flag(text.trim()),
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Flag(name) => write!(f, "@{}", name),
            Annotation::Keyed { key, value } => write!(f, "@{}={}", key, value),
        }
    }
}

/// Fail if `name` is already visible
pub fn check_not_defined(cx: &LocalContext, name: &str) -> Result<(), UserError> {
    if cx.contains_key(name) {
        return Err(UserError::AlreadyDefined {
            name: name.to_string(),
        });
    }
    Ok(())
}
