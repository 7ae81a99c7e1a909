//! Quorum and required-step evaluation.
//!
//! Given the decisions accumulated on a claim, decides whether the claim is
//! finished and, if not, which step acts next. Kept free of sequencing state
//! so the numeric policy can be tested on its own. All percentage math is
//! done in integers: `approved / total >= p / 100` is checked as
//! `100 * approved >= p * total`.

use serde::{Deserialize, Serialize};

use crate::workflow::rule::ApprovalStep;
use crate::workflow::types::{ApprovalStatus, RejectionReason, StepDecision};

/// What the claim does after a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Still Pending; the given step acts next.
    Continue(u32),
    /// The claim is Approved.
    Approved,
    /// The claim is Rejected.
    Rejected(RejectionReason),
}

/// Stateless evaluator for approval progress.
pub struct ApprovalStepEvaluator;

impl ApprovalStepEvaluator {
    /// Evaluate a claim right after `decided_step` received its decision.
    ///
    /// # Arguments
    /// * `steps` - The snapshot's steps, ascending by order
    /// * `decisions` - One entry per step, ascending by order
    /// * `min_approval_percentage` - The quorum threshold, if configured
    /// * `decided_step` - The step that was just decided
    ///
    /// # Returns
    /// * `StepOutcome::Rejected` if a required step rejected, or a
    ///   configured quorum can no longer be reached
    /// * `StepOutcome::Approved` if the quorum is reached or, without a
    ///   threshold, every required step approved
    /// * `StepOutcome::Continue` with the next undecided step otherwise
    #[must_use]
    pub fn evaluate(
        steps: &[ApprovalStep],
        decisions: &[StepDecision],
        min_approval_percentage: Option<u8>,
        decided_step: u32,
    ) -> StepOutcome {
        if let Some(step_order) = Self::required_rejection(steps, decisions) {
            return StepOutcome::Rejected(RejectionReason::RequiredStepRejected { step_order });
        }

        let next = Self::next_pending(decisions, decided_step);

        match min_approval_percentage {
            Some(percentage) => Self::evaluate_quorum(decisions, percentage, next),
            None => Self::evaluate_required(steps, decisions, next),
        }
    }

    /// Returns the lowest required step that was rejected, if any.
    #[must_use]
    pub fn required_rejection(steps: &[ApprovalStep], decisions: &[StepDecision]) -> Option<u32> {
        steps
            .iter()
            .zip(decisions)
            .find(|(step, decision)| {
                step.is_required && decision.status == ApprovalStatus::Rejected
            })
            .map(|(step, _)| step.step_order)
    }

    /// Returns the first undecided step after `after`.
    #[must_use]
    pub fn next_pending(decisions: &[StepDecision], after: u32) -> Option<u32> {
        decisions
            .iter()
            .find(|d| d.step_order > after && d.status == ApprovalStatus::Pending)
            .map(|d| d.step_order)
    }

    /// Counts Approved decisions.
    #[must_use]
    pub fn approved_count(decisions: &[StepDecision]) -> usize {
        decisions
            .iter()
            .filter(|d| d.status == ApprovalStatus::Approved)
            .count()
    }

    /// Returns true if `approved` out of `total` reaches `percentage`.
    #[must_use]
    pub fn meets_threshold(approved: usize, total: usize, percentage: u8) -> bool {
        if total == 0 {
            return false;
        }
        (approved as u64) * 100 >= u64::from(percentage) * (total as u64)
    }

    /// Returns `100 * approved / total`, rounded down.
    #[must_use]
    pub fn approval_percentage(approved: usize, total: usize) -> u8 {
        if total == 0 {
            return 0;
        }
        let percentage = (approved as u64) * 100 / (total as u64);
        u8::try_from(percentage).unwrap_or(100)
    }

    fn evaluate_quorum(
        decisions: &[StepDecision],
        percentage: u8,
        next: Option<u32>,
    ) -> StepOutcome {
        let total = decisions.len();
        let approved = Self::approved_count(decisions);

        if Self::meets_threshold(approved, total, percentage) {
            return StepOutcome::Approved;
        }

        // Every still-pending step could yet approve; if even that falls
        // short the claim cannot be approved anymore.
        let undecided = decisions.iter().filter(|d| !d.is_decided()).count();
        if !Self::meets_threshold(approved + undecided, total, percentage) {
            return StepOutcome::Rejected(RejectionReason::QuorumUnreachable);
        }

        match next {
            Some(step_order) => StepOutcome::Continue(step_order),
            None => StepOutcome::Rejected(RejectionReason::QuorumUnreachable),
        }
    }

    fn evaluate_required(
        steps: &[ApprovalStep],
        decisions: &[StepDecision],
        next: Option<u32>,
    ) -> StepOutcome {
        let mut required = steps
            .iter()
            .zip(decisions)
            .filter(|(step, _)| step.is_required)
            .peekable();

        let satisfied = if required.peek().is_some() {
            required.all(|(_, decision)| decision.status == ApprovalStatus::Approved)
        } else {
            // No required steps: the first approval carries the claim.
            Self::approved_count(decisions) > 0
        };

        if satisfied {
            return StepOutcome::Approved;
        }

        match next {
            Some(step_order) => StepOutcome::Continue(step_order),
            None => StepOutcome::Rejected(RejectionReason::NoApprovals),
        }
    }
}
