//! Pass manager
//!
//! Runs whole-program passes in order. Every pass must leave the IR valid
//! under the manager's validator profile, which is re-run after each one.

use log::{debug, info};

use super::fixup::{FixupMode, FixupVariables};
use super::validation::{ValidationResult, Validator};
use super::Program;

/// A whole-program transformation or check
pub trait ProgramPass {
    /// Get the name of this pass
    fn name(&self) -> &'static str;

    /// Run the pass on a program
    fn run(&self, program: &mut Program) -> ValidationResult<()>;
}

pub struct PassManager {
    passes: Vec<Box<dyn ProgramPass>>,
    validator: Option<Validator>,
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PassManager {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            validator: None,
        }
    }

    /// Validate with `validator` after every pass
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Repair passed-variable lists, then validate with the standard profile
    pub fn standard_pipeline() -> Self {
        let mut manager = Self::new().with_validator(Validator::standard());
        manager.add_pass(FixupVariables::new(FixupMode::Repair));
        manager
    }

    pub fn add_pass<P: ProgramPass + 'static>(&mut self, pass: P) {
        self.passes.push(Box::new(pass));
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run all passes, stopping at the first failure
    pub fn run(&self, program: &mut Program) -> ValidationResult<()> {
        for pass in &self.passes {
            info!("running pass {}", pass.name());
            pass.run(program)?;
            if let Some(validator) = &self.validator {
                debug!("validating after {}", pass.name());
                validator.validate(program)?;
            }
        }
        Ok(())
    }
}
