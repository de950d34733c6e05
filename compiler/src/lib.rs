//! Intermediate representation, validator and front-end helpers of the
//! flowc dataflow compiler.

pub mod config;
pub mod frontend;
pub mod ir;
pub mod logging;
