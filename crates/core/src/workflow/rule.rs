//! Approval rule model.
//!
//! Rules are authored elsewhere and only ever read by the engine. An
//! `ApprovalRule` can only be obtained through validation, so every rule in
//! memory has a non-empty step sequence whose orders run 1, 2, 3, ... without
//! gaps, and the engine can index steps by order.

use std::collections::HashSet;

use claimflow_shared::{ApprovalRuleId, CompanyId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflow::error::ConfigurationError;

/// One position in a rule's approver sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    /// 1-based position in the sequence.
    pub step_order: u32,
    /// The user who must act on this step.
    pub approver_id: UserId,
    /// Required steps veto on rejection; optional ones only count toward quorum.
    pub is_required: bool,
}

/// Authoring input for an approval rule, validated by [`ApprovalRule::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApprovalRule {
    /// Existing identifier, or `None` to allocate one.
    #[serde(default)]
    pub id: Option<ApprovalRuleId>,
    /// The company the rule belongs to.
    pub company_id: CompanyId,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Make the submitter's manager the required first approver.
    #[serde(default = "default_manager_approver")]
    pub is_manager_default_approver: bool,
    /// Percentage of all steps that must approve, in [1, 100].
    #[serde(default)]
    pub min_approval_percentage: Option<u8>,
    /// Selection priority (lower = higher priority).
    #[serde(default)]
    pub priority: i16,
    /// Expense categories this rule covers (empty = all).
    #[serde(default)]
    pub categories: Vec<String>,
    /// Minimum claim amount (inclusive, None = no minimum).
    #[serde(default)]
    pub min_amount: Option<Decimal>,
    /// Maximum claim amount (inclusive, None = no maximum).
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    /// Approver sequence, in any order.
    pub steps: Vec<ApprovalStep>,
}

fn default_manager_approver() -> bool {
    true
}

/// A validated, immutable approval rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NewApprovalRule", into = "NewApprovalRule")]
pub struct ApprovalRule {
    id: ApprovalRuleId,
    company_id: CompanyId,
    name: String,
    description: Option<String>,
    is_manager_default_approver: bool,
    min_approval_percentage: Option<u8>,
    priority: i16,
    categories: Vec<String>,
    min_amount: Option<Decimal>,
    max_amount: Option<Decimal>,
    steps: Vec<ApprovalStep>,
}

impl ApprovalRule {
    /// Validates authoring input into a rule.
    ///
    /// Steps are sorted by order before validation.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the name is blank, there are no
    /// steps, step orders are duplicated or not contiguous from 1, an
    /// approver appears twice, the percentage is outside [1, 100], or the
    /// amount range is inverted.
    pub fn new(input: NewApprovalRule) -> Result<Self, ConfigurationError> {
        if input.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyName);
        }

        if let Some(percentage) = input.min_approval_percentage
            && !(1..=100).contains(&percentage)
        {
            return Err(ConfigurationError::PercentageOutOfRange(percentage));
        }

        if let (Some(min), Some(max)) = (input.min_amount, input.max_amount)
            && min > max
        {
            return Err(ConfigurationError::InvalidAmountRange);
        }

        let steps = validate_steps(input.steps)?;

        Ok(Self {
            id: input.id.unwrap_or_default(),
            company_id: input.company_id,
            name: input.name,
            description: input.description,
            is_manager_default_approver: input.is_manager_default_approver,
            min_approval_percentage: input.min_approval_percentage,
            priority: input.priority,
            categories: input.categories,
            min_amount: input.min_amount,
            max_amount: input.max_amount,
            steps,
        })
    }

    /// Returns the rule identifier.
    #[must_use]
    pub fn id(&self) -> ApprovalRuleId {
        self.id
    }

    /// Returns the owning company.
    #[must_use]
    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the rule description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns true if the submitter's manager must approve first.
    #[must_use]
    pub fn is_manager_default_approver(&self) -> bool {
        self.is_manager_default_approver
    }

    /// Returns the quorum threshold, if any.
    #[must_use]
    pub fn min_approval_percentage(&self) -> Option<u8> {
        self.min_approval_percentage
    }

    /// Returns the selection priority.
    #[must_use]
    pub fn priority(&self) -> i16 {
        self.priority
    }

    /// Returns the steps in ascending order.
    #[must_use]
    pub fn steps(&self) -> &[ApprovalStep] {
        &self.steps
    }

    /// Looks a step up by its order.
    #[must_use]
    pub fn step(&self, step_order: u32) -> Option<&ApprovalStep> {
        step_index(step_order).and_then(|index| self.steps.get(index))
    }

    /// Iterates over the required steps in ascending order.
    pub fn required_steps(&self) -> impl Iterator<Item = &ApprovalStep> {
        self.steps.iter().filter(|s| s.is_required)
    }

    /// Returns true if the rule covers an expense of this category and amount.
    #[must_use]
    pub fn applies_to(&self, category: &str, amount: Decimal) -> bool {
        let category_matches = self.categories.is_empty()
            || self
                .categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(category));
        let above_min = self.min_amount.is_none_or(|min| amount >= min);
        let below_max = self.max_amount.is_none_or(|max| amount <= max);
        category_matches && above_min && below_max
    }

    /// Returns a copy of this rule with a different, already contiguous,
    /// step sequence.
    ///
    /// Approvers are not re-checked: a resolved rule may name the manager
    /// on two steps. Only authored rules go through [`Self::new`].
    pub(crate) fn with_steps(&self, steps: Vec<ApprovalStep>) -> Self {
        debug_assert!(
            steps
                .iter()
                .zip(1u32..)
                .all(|(step, order)| step.step_order == order)
        );
        Self {
            steps,
            ..self.clone()
        }
    }
}

impl TryFrom<NewApprovalRule> for ApprovalRule {
    type Error = ConfigurationError;

    fn try_from(input: NewApprovalRule) -> Result<Self, Self::Error> {
        Self::new(input)
    }
}

impl From<ApprovalRule> for NewApprovalRule {
    fn from(rule: ApprovalRule) -> Self {
        Self {
            id: Some(rule.id),
            company_id: rule.company_id,
            name: rule.name,
            description: rule.description,
            is_manager_default_approver: rule.is_manager_default_approver,
            min_approval_percentage: rule.min_approval_percentage,
            priority: rule.priority,
            categories: rule.categories,
            min_amount: rule.min_amount,
            max_amount: rule.max_amount,
            steps: rule.steps,
        }
    }
}

/// Maps a 1-based step order onto its slot in a step sequence.
pub(crate) fn step_index(step_order: u32) -> Option<usize> {
    step_order.checked_sub(1).map(|i| i as usize)
}

fn validate_steps(mut steps: Vec<ApprovalStep>) -> Result<Vec<ApprovalStep>, ConfigurationError> {
    if steps.is_empty() {
        return Err(ConfigurationError::NoSteps);
    }

    steps.sort_by_key(|s| s.step_order);

    if let Some(pair) = steps
        .windows(2)
        .find(|pair| pair[0].step_order == pair[1].step_order)
    {
        return Err(ConfigurationError::DuplicateStepOrder(pair[0].step_order));
    }

    for (step, expected) in steps.iter().zip(1u32..) {
        if step.step_order != expected {
            return Err(ConfigurationError::NonContiguousStepOrder {
                expected,
                found: step.step_order,
            });
        }
    }

    let mut approvers = HashSet::with_capacity(steps.len());
    for step in &steps {
        if !approvers.insert(step.approver_id) {
            return Err(ConfigurationError::DuplicateApprover(step.approver_id));
        }
    }

    Ok(steps)
}
