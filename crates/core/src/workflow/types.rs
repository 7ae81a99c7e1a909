//! Workflow domain types for expense approval.
//!
//! This module defines the statuses, decisions and submission records that
//! flow through the rule resolver and the workflow engine.

use chrono::{DateTime, Utc};
use claimflow_shared::{CompanyId, ExpenseId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a claim, or of a single step within it.
///
/// The valid transitions are:
/// - Pending → Approved
/// - Pending → Rejected
///
/// Approved and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a decision.
    Pending,
    /// Approved (terminal).
    Approved,
    /// Rejected (terminal).
    Rejected,
}

impl ApprovalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if no further transitions are accepted.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The verdict an approver hands down on their step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Approve the claim at this step.
    Approve,
    /// Reject the claim at this step.
    Reject,
}

impl Decision {
    /// Returns the step status this decision produces.
    #[must_use]
    pub fn status(self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// Why a claim ended up Rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RejectionReason {
    /// A required approver rejected; required rejections are an absolute veto.
    RequiredStepRejected {
        /// The step whose approver rejected.
        step_order: u32,
    },
    /// The minimum approval percentage can no longer be reached.
    QuorumUnreachable,
    /// Every step of a rule without required steps or threshold rejected.
    NoApprovals,
}

/// The recorded outcome of one approval step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDecision {
    /// The step this decision belongs to.
    pub step_order: u32,
    /// The approver assigned to the step.
    pub approver_id: UserId,
    /// Pending until the approver acts.
    pub status: ApprovalStatus,
    /// Optional comment left by the approver.
    pub comment: Option<String>,
    /// When the approver acted, if they have.
    pub decided_at: Option<DateTime<Utc>>,
}

impl StepDecision {
    /// Creates an undecided entry for a step.
    #[must_use]
    pub fn pending(step_order: u32, approver_id: UserId) -> Self {
        Self {
            step_order,
            approver_id,
            status: ApprovalStatus::Pending,
            comment: None,
            decided_at: None,
        }
    }

    /// Returns true once the approver has acted.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        self.status.is_terminal()
    }
}

/// The employee submitting a claim, as known to the rule resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitter {
    /// The submitting user.
    pub user_id: UserId,
    /// Their direct manager, if they have one.
    pub manager_id: Option<UserId>,
}

/// An expense claim handed over by the submission flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSubmission {
    /// The claim identifier.
    pub expense_id: ExpenseId,
    /// The company the claim is filed under.
    pub company_id: CompanyId,
    /// The submitting user.
    pub submitter_id: UserId,
    /// Claimed amount in `currency`.
    pub amount: Decimal,
    /// ISO currency code of `amount`.
    pub currency: String,
    /// Expense category, e.g. "Travel".
    pub category: String,
}
