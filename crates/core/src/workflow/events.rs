//! Side effects owed after a transition is persisted.
//!
//! Events are derived purely from the saved state, so deriving them twice
//! (for example after a retried save) yields the same event with the same
//! key. Delivery layers use [`EventKey`] to make notification idempotent.

use claimflow_shared::{ExpenseId, UserId};
use serde::{Deserialize, Serialize};

use crate::workflow::engine::ExpenseApproval;
use crate::workflow::types::{ApprovalStatus, RejectionReason};

/// Idempotency key for an approval side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey {
    /// The claim.
    pub expense_id: ExpenseId,
    /// The step the event concerns.
    pub step_order: u32,
    /// Pending for an assignment, the final status for a finalization.
    pub status: ApprovalStatus,
}

/// A side effect to perform once a claim's state has been saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ApprovalEvent {
    /// A step became current; its approver should be told.
    ApproverAssigned {
        /// The claim.
        expense_id: ExpenseId,
        /// The step now awaiting a decision.
        step_order: u32,
        /// The approver to notify.
        approver_id: UserId,
    },
    /// The claim reached a terminal status; the submitter should be told.
    ClaimFinalized {
        /// The claim.
        expense_id: ExpenseId,
        /// The submitter to notify.
        submitter_id: UserId,
        /// The step whose decision finalized the claim.
        step_order: u32,
        /// Approved or Rejected.
        status: ApprovalStatus,
        /// Why the claim was rejected, if it was.
        rejection_reason: Option<RejectionReason>,
    },
}

impl ApprovalEvent {
    /// Derives the event owed for a claim's current state.
    ///
    /// Returns `None` only for a Pending claim whose current step is missing
    /// from its snapshot, which a well-formed approval never has.
    #[must_use]
    pub fn for_state(approval: &ExpenseApproval) -> Option<Self> {
        if approval.is_finalized() {
            return Some(Self::ClaimFinalized {
                expense_id: approval.expense_id(),
                submitter_id: approval.submitter_id(),
                step_order: approval.current_step_order(),
                status: approval.status(),
                rejection_reason: approval.rejection_reason(),
            });
        }

        approval.current_step().map(|step| Self::ApproverAssigned {
            expense_id: approval.expense_id(),
            step_order: step.step_order,
            approver_id: step.approver_id,
        })
    }

    /// Returns the idempotency key of this event.
    #[must_use]
    pub fn key(&self) -> EventKey {
        match self {
            Self::ApproverAssigned {
                expense_id,
                step_order,
                ..
            } => EventKey {
                expense_id: *expense_id,
                step_order: *step_order,
                status: ApprovalStatus::Pending,
            },
            Self::ClaimFinalized {
                expense_id,
                step_order,
                status,
                ..
            } => EventKey {
                expense_id: *expense_id,
                step_order: *step_order,
                status: *status,
            },
        }
    }

    /// Returns the user who should be notified.
    #[must_use]
    pub fn recipient(&self) -> UserId {
        match self {
            Self::ApproverAssigned { approver_id, .. } => *approver_id,
            Self::ClaimFinalized { submitter_id, .. } => *submitter_id,
        }
    }
}
