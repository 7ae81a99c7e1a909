//! Rule resolution for a submitted claim.
//!
//! Picks the rule that governs a claim and prepares the step sequence the
//! engine will snapshot, applying the "manager is the default first
//! approver" policy.

use claimflow_shared::CompanyId;

use crate::workflow::error::{ConfigurationError, WorkflowError};
use crate::workflow::rule::{ApprovalRule, ApprovalStep};
use crate::workflow::types::{ExpenseSubmission, Submitter};

/// Stateless resolver from configured rules to an effective rule.
pub struct RuleResolver;

impl RuleResolver {
    /// Select the rule governing an expense.
    ///
    /// Rules are matched by company, category and amount range. When
    /// multiple rules match, the one with lowest priority value wins; ties go
    /// to the earliest rule in `rules`.
    #[must_use]
    pub fn select<'a>(
        company_id: CompanyId,
        rules: &'a [ApprovalRule],
        expense: &ExpenseSubmission,
    ) -> Option<&'a ApprovalRule> {
        rules
            .iter()
            .filter(|r| r.company_id() == company_id)
            .filter(|r| r.applies_to(&expense.category, expense.amount))
            .min_by_key(|r| r.priority())
    }

    /// Resolve the effective rule for a submitter's expense.
    ///
    /// # Arguments
    /// * `company_id` - The company the claim is filed under
    /// * `submitter` - The submitting user and their manager
    /// * `expense` - The claim being submitted
    /// * `rules` - The rules configured for the company
    ///
    /// # Returns
    /// * `Ok(ApprovalRule)` with the step sequence the claim must follow
    /// * `Err(WorkflowError::RuleNotFound)` if no rule matches
    /// * `Err(WorkflowError::Configuration)` if the rule needs a manager the
    ///   submitter does not have
    pub fn resolve(
        company_id: CompanyId,
        submitter: &Submitter,
        expense: &ExpenseSubmission,
        rules: &[ApprovalRule],
    ) -> Result<ApprovalRule, WorkflowError> {
        let rule = Self::select(company_id, rules, expense).ok_or_else(|| {
            WorkflowError::RuleNotFound {
                company_id,
                category: expense.category.clone(),
            }
        })?;

        Ok(Self::apply_manager_policy(rule, submitter)?)
    }

    /// Make the submitter's manager the required first approver when the
    /// rule asks for it.
    ///
    /// If step 1 already names the manager the rule is used unchanged.
    /// Otherwise the manager is prepended as a required step and every
    /// original step shifts down by one. A later step already assigned to
    /// the manager is kept, so the manager may act twice and the quorum is
    /// still taken over every step.
    pub fn apply_manager_policy(
        rule: &ApprovalRule,
        submitter: &Submitter,
    ) -> Result<ApprovalRule, ConfigurationError> {
        if !rule.is_manager_default_approver() {
            return Ok(rule.clone());
        }

        let manager_id = submitter
            .manager_id
            .ok_or(ConfigurationError::ManagerRequired(submitter.user_id))?;

        if rule.step(1).is_some_and(|s| s.approver_id == manager_id) {
            return Ok(rule.clone());
        }

        let mut steps = Vec::with_capacity(rule.steps().len() + 1);
        steps.push(ApprovalStep {
            step_order: 1,
            approver_id: manager_id,
            is_required: true,
        });
        steps.extend(rule.steps().iter().map(|step| ApprovalStep {
            step_order: step.step_order + 1,
            ..*step
        }));

        Ok(rule.with_steps(steps))
    }
}
