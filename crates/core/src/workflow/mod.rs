//! Multi-step expense approval workflow.
//!
//! This module implements the approval rule model, the resolver that turns a
//! configured rule into the step sequence for one submitter, the quorum
//! evaluator, and the per-claim state machine.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (ApprovalStatus, Decision, StepDecision)
//! - `rule` - Validated approval rules and their ordered steps
//! - `error` - Workflow-specific error types
//! - `resolver` - Rule selection and the manager-default-approver policy
//! - `evaluator` - Quorum and required-step arithmetic
//! - `engine` - Per-claim state transitions and read accessors
//! - `events` - Side effects owed after a transition is persisted

pub mod engine;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod resolver;
pub mod rule;
pub mod types;

#[cfg(test)]
mod engine_props;
#[cfg(test)]
mod evaluator_props;

pub use engine::{ApprovalWorkflowEngine, ExpenseApproval, RuleSnapshot};
pub use error::{ConfigurationError, WorkflowError};
pub use evaluator::{ApprovalStepEvaluator, StepOutcome};
pub use events::{ApprovalEvent, EventKey};
pub use resolver::RuleResolver;
pub use rule::{ApprovalRule, ApprovalStep, NewApprovalRule};
pub use types::{
    ApprovalStatus, Decision, ExpenseSubmission, RejectionReason, StepDecision, Submitter,
};
