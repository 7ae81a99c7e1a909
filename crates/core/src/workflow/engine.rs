//! Per-claim approval state machine.
//!
//! `ApprovalWorkflowEngine` turns one immutable `ExpenseApproval` value into
//! the next. It never mutates in place and never touches storage; callers
//! persist the returned value through a repository and emit side effects
//! only after that save succeeds.
//!
//! Steps are addressed by order: step `n` lives in slot `n - 1` of both the
//! snapshot's step list and the decision list.

use chrono::{DateTime, Utc};
use claimflow_shared::{ApprovalRuleId, CompanyId, ExpenseId, UserId};
use serde::{Deserialize, Serialize};

use crate::workflow::error::WorkflowError;
use crate::workflow::evaluator::{ApprovalStepEvaluator, StepOutcome};
use crate::workflow::rule::{ApprovalRule, ApprovalStep, step_index};
use crate::workflow::types::{
    ApprovalStatus, Decision, ExpenseSubmission, RejectionReason, StepDecision,
};

/// The resolved step sequence captured when a claim is submitted.
///
/// Later edits to the rule never reach a claim that is already in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    /// The rule the snapshot was taken from.
    pub rule_id: ApprovalRuleId,
    /// The rule's name at submission time.
    pub rule_name: String,
    /// The quorum threshold, if any.
    pub min_approval_percentage: Option<u8>,
    /// The resolved steps, ascending and contiguous from 1.
    pub steps: Vec<ApprovalStep>,
}

impl RuleSnapshot {
    /// Captures a resolved rule.
    #[must_use]
    pub fn capture(rule: &ApprovalRule) -> Self {
        Self {
            rule_id: rule.id(),
            rule_name: rule.name().to_string(),
            min_approval_percentage: rule.min_approval_percentage(),
            steps: rule.steps().to_vec(),
        }
    }

    /// Looks a step up by its order.
    #[must_use]
    pub fn step(&self, step_order: u32) -> Option<&ApprovalStep> {
        step_index(step_order).and_then(|index| self.steps.get(index))
    }
}

/// Workflow state of one expense claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseApproval {
    expense_id: ExpenseId,
    company_id: CompanyId,
    submitter_id: UserId,
    rule: RuleSnapshot,
    current_step_order: u32,
    status: ApprovalStatus,
    rejection_reason: Option<RejectionReason>,
    decisions: Vec<StepDecision>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ExpenseApproval {
    /// Returns the claim this workflow belongs to.
    #[must_use]
    pub fn expense_id(&self) -> ExpenseId {
        self.expense_id
    }

    /// Returns the company the claim was filed under.
    #[must_use]
    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns the submitting user.
    #[must_use]
    pub fn submitter_id(&self) -> UserId {
        self.submitter_id
    }

    /// Returns the rule snapshot taken at submission.
    #[must_use]
    pub fn rule(&self) -> &RuleSnapshot {
        &self.rule
    }

    /// Returns the step awaiting (or, once terminal, last given) a decision.
    #[must_use]
    pub fn current_step_order(&self) -> u32 {
        self.current_step_order
    }

    /// Returns the claim status.
    #[must_use]
    pub fn status(&self) -> ApprovalStatus {
        self.status
    }

    /// Returns true once the claim is Approved or Rejected.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns why the claim was rejected, if it was.
    #[must_use]
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        self.rejection_reason
    }

    /// Returns the step awaiting a decision, or `None` once terminal.
    #[must_use]
    pub fn current_step(&self) -> Option<&ApprovalStep> {
        if self.is_finalized() {
            return None;
        }
        self.rule.step(self.current_step_order)
    }

    /// Returns the user who must act next, or `None` once terminal.
    #[must_use]
    pub fn current_approver(&self) -> Option<UserId> {
        self.current_step().map(|s| s.approver_id)
    }

    /// Iterates over the steps that have not been decided.
    ///
    /// Once the claim is terminal these are the steps that were skipped.
    pub fn pending_steps(&self) -> impl Iterator<Item = &ApprovalStep> {
        self.rule
            .steps
            .iter()
            .zip(&self.decisions)
            .filter(|(_, decision)| !decision.is_decided())
            .map(|(step, _)| step)
    }

    /// Iterates over the decisions made so far, ascending by step.
    pub fn decision_history(&self) -> impl Iterator<Item = &StepDecision> {
        self.decisions.iter().filter(|d| d.is_decided())
    }

    /// Returns every step's decision entry, decided or not.
    #[must_use]
    pub fn decisions(&self) -> &[StepDecision] {
        &self.decisions
    }

    /// Returns the latest decision a user has made on this claim, if any.
    ///
    /// A resolved rule can assign the manager to two steps; the decision on
    /// the higher step is the one a repeated call would be replaying.
    #[must_use]
    pub fn recorded_decision_by(&self, user_id: UserId) -> Option<&StepDecision> {
        self.decisions
            .iter()
            .rev()
            .find(|d| d.is_decided() && d.approver_id == user_id)
    }

    /// Counts Approved steps.
    #[must_use]
    pub fn approved_count(&self) -> usize {
        ApprovalStepEvaluator::approved_count(&self.decisions)
    }

    /// Returns the share of all steps that approved, rounded down.
    #[must_use]
    pub fn approval_percentage(&self) -> u8 {
        ApprovalStepEvaluator::approval_percentage(self.approved_count(), self.decisions.len())
    }

    /// Returns the storage version the value was loaded or saved at.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the same state stamped with a storage version.
    ///
    /// Repositories call this when a save is accepted.
    #[must_use]
    pub fn with_version(self, version: u64) -> Self {
        Self { version, ..self }
    }

    /// Returns when the claim was submitted.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the claim last changed.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Stateless engine for claim state transitions.
///
/// All methods are associated functions that validate the caller and return
/// a new `ExpenseApproval`, leaving the input untouched.
pub struct ApprovalWorkflowEngine;

impl ApprovalWorkflowEngine {
    /// Start the workflow for a submitted claim.
    ///
    /// # Arguments
    /// * `expense` - The submitted claim
    /// * `rule` - The rule returned by `RuleResolver::resolve`
    ///
    /// # Returns
    /// A Pending `ExpenseApproval` at version 0 whose current step is the
    /// rule's first step and whose decisions are all Pending.
    #[must_use]
    pub fn start(expense: &ExpenseSubmission, rule: &ApprovalRule) -> ExpenseApproval {
        let now = Utc::now();
        let snapshot = RuleSnapshot::capture(rule);
        let decisions = snapshot
            .steps
            .iter()
            .map(|s| StepDecision::pending(s.step_order, s.approver_id))
            .collect();
        let current_step_order = snapshot.steps.first().map_or(1, |s| s.step_order);

        ExpenseApproval {
            expense_id: expense.expense_id,
            company_id: expense.company_id,
            submitter_id: expense.submitter_id,
            rule: snapshot,
            current_step_order,
            status: ApprovalStatus::Pending,
            rejection_reason: None,
            decisions,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record the current approver's decision.
    ///
    /// # Arguments
    /// * `approval` - The claim's current state
    /// * `actor` - The user acting
    /// * `decision` - Approve or reject
    /// * `comment` - Optional comment from the approver
    ///
    /// # Returns
    /// * `Ok(ExpenseApproval)` with the decision recorded and the claim
    ///   advanced or finalized
    /// * `Err(WorkflowError::AlreadyFinalized)` if the claim is not Pending
    /// * `Err(WorkflowError::NotCurrentApprover)` if `actor` is not assigned
    ///   to the current step
    pub fn record_decision(
        approval: &ExpenseApproval,
        actor: UserId,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<ExpenseApproval, WorkflowError> {
        Self::record_decision_at(approval, actor, decision, comment, Utc::now())
    }

    /// Same as [`Self::record_decision`] with an explicit decision time.
    pub fn record_decision_at(
        approval: &ExpenseApproval,
        actor: UserId,
        decision: Decision,
        comment: Option<String>,
        decided_at: DateTime<Utc>,
    ) -> Result<ExpenseApproval, WorkflowError> {
        if approval.is_finalized() {
            return Err(WorkflowError::AlreadyFinalized {
                expense_id: approval.expense_id,
                status: approval.status,
            });
        }

        let step_order = approval.current_step_order;
        let not_current = || WorkflowError::NotCurrentApprover {
            user_id: actor,
            step_order,
        };

        let step = approval.rule.step(step_order).ok_or_else(not_current)?;
        if step.approver_id != actor {
            return Err(not_current());
        }

        let mut next = approval.clone();
        let entry = step_index(step_order)
            .and_then(|index| next.decisions.get_mut(index))
            .ok_or_else(not_current)?;
        entry.status = decision.status();
        entry.comment = comment.filter(|c| !c.trim().is_empty());
        entry.decided_at = Some(decided_at);

        match ApprovalStepEvaluator::evaluate(
            &next.rule.steps,
            &next.decisions,
            next.rule.min_approval_percentage,
            step_order,
        ) {
            StepOutcome::Continue(next_step) => next.current_step_order = next_step,
            StepOutcome::Approved => next.status = ApprovalStatus::Approved,
            StepOutcome::Rejected(reason) => {
                next.status = ApprovalStatus::Rejected;
                next.rejection_reason = Some(reason);
            }
        }
        next.updated_at = decided_at;

        Ok(next)
    }
}
