//! Workflow error types for expense approval.
//!
//! This module defines every failure the rule model, resolver, engine and
//! repository boundary can surface. None of them are swallowed; only
//! `ConcurrentModification` is meant to be retried automatically.

use claimflow_shared::{CompanyId, ExpenseId, UserId};
use thiserror::Error;

use crate::workflow::types::ApprovalStatus;

/// Rule-authoring failures, detected when a rule is built and when a rule
/// is resolved for a submitter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The rule has no name.
    #[error("Approval rule name must not be empty")]
    EmptyName,

    /// The rule has no steps.
    #[error("Approval rule must have at least one step")]
    NoSteps,

    /// Two steps share a step order.
    #[error("Duplicate step order {0}")]
    DuplicateStepOrder(u32),

    /// Step orders do not form 1, 2, 3, ...
    #[error("Step orders must be contiguous from 1: expected {expected}, found {found}")]
    NonContiguousStepOrder {
        /// The order that should have appeared at this position.
        expected: u32,
        /// The order that did appear.
        found: u32,
    },

    /// The minimum approval percentage is outside [1, 100].
    #[error("Minimum approval percentage must be between 1 and 100, got {0}")]
    PercentageOutOfRange(u8),

    /// The same approver is assigned to more than one step.
    #[error("Approver {0} is assigned to more than one step")]
    DuplicateApprover(UserId),

    /// The amount range is inverted.
    #[error("Minimum amount must not exceed maximum amount")]
    InvalidAmountRange,

    /// The rule makes the manager the first approver but the submitter has none.
    #[error("Rule requires the manager as first approver but user {0} has no manager")]
    ManagerRequired(UserId),
}

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A rule failed validation.
    #[error("Invalid approval configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// No approval rule is configured for the claim.
    #[error("No approval rule configured for company {company_id} and category {category}")]
    RuleNotFound {
        /// The submitting company.
        company_id: CompanyId,
        /// The claim category.
        category: String,
    },

    /// The actor is not the approver of the current step.
    #[error("User {user_id} is not the approver for step {step_order}")]
    NotCurrentApprover {
        /// The user who attempted to act.
        user_id: UserId,
        /// The step awaiting a decision.
        step_order: u32,
    },

    /// The claim already reached a terminal status.
    #[error("Expense {expense_id} is already {status}")]
    AlreadyFinalized {
        /// The claim.
        expense_id: ExpenseId,
        /// Its terminal status.
        status: ApprovalStatus,
    },

    /// Another writer saved the claim since it was loaded.
    #[error("Expense {expense_id} was modified concurrently (expected version {expected}, found {actual})")]
    ConcurrentModification {
        /// The claim.
        expense_id: ExpenseId,
        /// The version the writer loaded.
        expected: u64,
        /// The version currently stored.
        actual: u64,
    },

    /// Every retry lost the optimistic-concurrency race.
    #[error("Gave up on expense {expense_id} after {attempts} concurrent modifications")]
    ConcurrencyExhausted {
        /// The claim.
        expense_id: ExpenseId,
        /// How many attempts were made.
        attempts: u32,
    },

    /// No workflow exists for the claim.
    #[error("No approval workflow found for expense {0}")]
    ApprovalNotFound(ExpenseId),

    /// A workflow was already started for the claim.
    #[error("Approval workflow for expense {0} already exists")]
    ApprovalAlreadyExists(ExpenseId),

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Configuration(_) => 400,

            Self::NotCurrentApprover { .. } => 403,

            Self::RuleNotFound { .. } | Self::ApprovalNotFound(_) => 404,

            Self::ConcurrentModification { .. }
            | Self::ConcurrencyExhausted { .. }
            | Self::ApprovalAlreadyExists(_) => 409,

            Self::AlreadyFinalized { .. } => 422,

            Self::Storage(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::RuleNotFound { .. } => "RULE_NOT_FOUND",
            Self::NotCurrentApprover { .. } => "NOT_CURRENT_APPROVER",
            Self::AlreadyFinalized { .. } => "ALREADY_FINALIZED",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::ConcurrencyExhausted { .. } => "CONCURRENCY_EXHAUSTED",
            Self::ApprovalNotFound(_) => "APPROVAL_NOT_FOUND",
            Self::ApprovalAlreadyExists(_) => "APPROVAL_ALREADY_EXISTS",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns true if the caller should reload and retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error() {
        let err = WorkflowError::from(ConfigurationError::PercentageOutOfRange(150));
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert!(err.to_string().contains("150"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_non_contiguous_message() {
        let err = ConfigurationError::NonContiguousStepOrder {
            expected: 2,
            found: 3,
        };
        assert_eq!(
            err.to_string(),
            "Step orders must be contiguous from 1: expected 2, found 3"
        );
    }

    #[test]
    fn test_rule_not_found_error() {
        let err = WorkflowError::RuleNotFound {
            company_id: CompanyId::new(),
            category: "Travel".to_string(),
        };
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "RULE_NOT_FOUND");
        assert!(err.to_string().contains("Travel"));
    }

    #[test]
    fn test_not_current_approver_error() {
        let err = WorkflowError::NotCurrentApprover {
            user_id: UserId::new(),
            step_order: 2,
        };
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.error_code(), "NOT_CURRENT_APPROVER");
        assert!(err.to_string().contains("step 2"));
    }

    #[test]
    fn test_already_finalized_error() {
        let err = WorkflowError::AlreadyFinalized {
            expense_id: ExpenseId::new(),
            status: ApprovalStatus::Approved,
        };
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.error_code(), "ALREADY_FINALIZED");
        assert!(err.to_string().contains("approved"));
    }

    #[test]
    fn test_concurrent_modification_is_only_retryable_error() {
        let expense_id = ExpenseId::new();
        let conflict = WorkflowError::ConcurrentModification {
            expense_id,
            expected: 1,
            actual: 2,
        };
        assert!(conflict.is_retryable());
        assert_eq!(conflict.status_code(), 409);

        let exhausted = WorkflowError::ConcurrencyExhausted {
            expense_id,
            attempts: 3,
        };
        assert!(!exhausted.is_retryable());
        assert_eq!(exhausted.error_code(), "CONCURRENCY_EXHAUSTED");
    }

    #[test]
    fn test_storage_errors() {
        let expense_id = ExpenseId::new();
        assert_eq!(
            WorkflowError::ApprovalNotFound(expense_id).status_code(),
            404
        );
        assert_eq!(
            WorkflowError::ApprovalAlreadyExists(expense_id).status_code(),
            409
        );
        assert_eq!(
            WorkflowError::Storage("disk full".to_string()).error_code(),
            "STORAGE_ERROR"
        );
    }
}
