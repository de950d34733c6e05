//! Execution contexts and targets
//!
//! The runtime has two kinds of processes: control engines, which evaluate
//! dataflow and dispatch tasks, and workers, which run leaf tasks. Each
//! instruction says where it may run, and each block runs in the context
//! implied by its position in the tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named class of worker processes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkType(pub String);

impl WorkType {
    pub const DEFAULT: &'static str = "WORK";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn default_work() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

/// Runtime locality in which code executes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecContext {
    Control,
    Worker(WorkType),
}

impl ExecContext {
    pub fn control() -> Self {
        ExecContext::Control
    }

    pub fn default_worker() -> Self {
        ExecContext::Worker(WorkType::default_work())
    }

    pub fn is_control(&self) -> bool {
        matches!(self, ExecContext::Control)
    }
}

impl fmt::Display for ExecContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecContext::Control => write!(f, "CONTROL"),
            ExecContext::Worker(work) => write!(f, "WORKER({})", work.0),
        }
    }
}

/// Context an instruction or task is aimed at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetContext {
    Any,
    Specific(ExecContext),
}

/// Whether an operation runs in place or dispatches a new task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecMode {
    Sync,
    Async,
}

/// Where an instruction is permitted to run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecTarget {
    pub mode: ExecMode,
    pub context: TargetContext,
}

impl ExecTarget {
    /// Runs in place, anywhere
    pub fn sync_any() -> Self {
        Self {
            mode: ExecMode::Sync,
            context: TargetContext::Any,
        }
    }

    /// Runs in place, only in the given context
    pub fn sync(cx: ExecContext) -> Self {
        Self {
            mode: ExecMode::Sync,
            context: TargetContext::Specific(cx),
        }
    }

    /// Dispatches a task, which may run anywhere
    pub fn async_any() -> Self {
        Self {
            mode: ExecMode::Async,
            context: TargetContext::Any,
        }
    }

    /// Dispatches a task to the given context
    pub fn dispatched(cx: ExecContext) -> Self {
        Self {
            mode: ExecMode::Async,
            context: TargetContext::Specific(cx),
        }
    }

    pub fn is_async(&self) -> bool {
        self.mode == ExecMode::Async
    }

    /// Specific context targeted, if any
    pub fn target_context(&self) -> Option<&ExecContext> {
        match &self.context {
            TargetContext::Any => None,
            TargetContext::Specific(cx) => Some(cx),
        }
    }

    /// An async target can be dispatched from anywhere; a sync target must
    /// already be in a matching context.
    pub fn can_run_in(&self, cx: &ExecContext) -> bool {
        if self.is_async() {
            return true;
        }
        match &self.context {
            TargetContext::Any => true,
            TargetContext::Specific(target) => target == cx,
        }
    }
}

impl fmt::Display for ExecTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            ExecMode::Sync => "sync",
            ExecMode::Async => "async",
        };
        match &self.context {
            TargetContext::Any => write!(f, "{}:ANY", mode),
            TargetContext::Specific(cx) => write!(f, "{}:{}", mode, cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_targets() {
        let control = ExecContext::control();
        let worker = ExecContext::default_worker();

        assert!(ExecTarget::sync_any().can_run_in(&control));
        assert!(ExecTarget::sync_any().can_run_in(&worker));
        assert!(ExecTarget::sync(worker.clone()).can_run_in(&worker));
        assert!(!ExecTarget::sync(worker.clone()).can_run_in(&control));
        assert!(!ExecTarget::sync(control.clone()).can_run_in(&worker));
        assert!(!ExecTarget::sync(ExecContext::Worker(WorkType::new("GPU"))).can_run_in(&worker));
    }

    #[test]
    fn test_async_runs_anywhere() {
        let target = ExecTarget::dispatched(ExecContext::default_worker());
        assert!(target.can_run_in(&ExecContext::control()));
        assert_eq!(target.target_context(), Some(&ExecContext::default_worker()));
        assert_eq!(target.to_string(), "async:WORKER(WORK)");
    }
}
