//! Per-company approval rule catalog.

use claimflow_core::workflow::ApprovalRule;
use claimflow_shared::{ApprovalRuleId, CompanyId};
use dashmap::DashMap;
use tracing::debug;

/// Holds the validated rules of every company.
///
/// Rules are immutable values; registering a rule with an existing id
/// replaces it. Claims already in flight keep their own snapshot and are not
/// affected.
#[derive(Debug, Default)]
pub struct RuleCatalog {
    rules: DashMap<CompanyId, Vec<ApprovalRule>>,
}

impl RuleCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a rule.
    pub fn register(&self, rule: ApprovalRule) {
        debug!(rule_id = %rule.id(), company_id = %rule.company_id(), "registering approval rule");
        let mut rules = self.rules.entry(rule.company_id()).or_default();
        match rules.iter_mut().find(|existing| existing.id() == rule.id()) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
    }

    /// Returns a company's rules in registration order.
    #[must_use]
    pub fn rules_for(&self, company_id: CompanyId) -> Vec<ApprovalRule> {
        self.rules
            .get(&company_id)
            .map(|rules| rules.value().clone())
            .unwrap_or_default()
    }

    /// Removes a rule, returning true if it was present.
    pub fn remove(&self, company_id: CompanyId, rule_id: ApprovalRuleId) -> bool {
        self.rules.get_mut(&company_id).is_some_and(|mut rules| {
            let before = rules.len();
            rules.retain(|rule| rule.id() != rule_id);
            rules.len() != before
        })
    }
}
