//! Expense approval repository abstraction.
//!
//! The engine reads and writes claims exclusively through this trait, so
//! storage backends are pluggable. Writers are serialised with optimistic
//! concurrency on `ExpenseApproval::version`.

use async_trait::async_trait;
use claimflow_core::workflow::{ApprovalStatus, ExpenseApproval, WorkflowError};
use claimflow_shared::{CompanyId, ExpenseId, UserId};

/// Filter for listing claims; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalFilter {
    /// Only claims in this status.
    pub status: Option<ApprovalStatus>,
    /// Only claims waiting on this approver.
    pub current_approver: Option<UserId>,
    /// Only claims submitted by this user.
    pub submitter_id: Option<UserId>,
    /// Only claims filed under this company.
    pub company_id: Option<CompanyId>,
}

impl ApprovalFilter {
    /// Returns true if the claim passes every set criterion.
    #[must_use]
    pub fn matches(&self, approval: &ExpenseApproval) -> bool {
        self.status.is_none_or(|s| approval.status() == s)
            && self
                .current_approver
                .is_none_or(|u| approval.current_approver() == Some(u))
            && self.submitter_id.is_none_or(|u| approval.submitter_id() == u)
            && self.company_id.is_none_or(|c| approval.company_id() == c)
    }
}

/// Persistence for per-claim workflow state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExpenseApprovalRepository: Send + Sync {
    /// Stores a freshly started workflow.
    ///
    /// Fails with `ApprovalAlreadyExists` if the claim already has one.
    async fn insert(&self, approval: &ExpenseApproval) -> Result<(), WorkflowError>;

    /// Loads the workflow of a claim.
    ///
    /// Fails with `ApprovalNotFound` if the claim has none.
    async fn load(&self, expense_id: ExpenseId) -> Result<ExpenseApproval, WorkflowError>;

    /// Saves a new state for a claim.
    ///
    /// The stored version must equal `approval.version()`, otherwise
    /// `ConcurrentModification` is returned. On success the stored copy, at
    /// the next version, is returned.
    async fn save(&self, approval: &ExpenseApproval) -> Result<ExpenseApproval, WorkflowError>;

    /// Lists claims matching a filter, oldest first.
    async fn list(&self, filter: &ApprovalFilter) -> Result<Vec<ExpenseApproval>, WorkflowError>;
}
