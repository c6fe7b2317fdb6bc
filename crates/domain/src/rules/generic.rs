//! Pass-through rule for types without a dedicated algorithm.

use std::collections::HashMap;

use super::RuleMeta;
use crate::models::{AlertEvent, AlertRuleType, LocationPoint};

/// Carries a rule definition's parameters; never triggers on its own.
#[derive(Debug)]
pub struct GenericAlertRule {
    pub(super) meta: RuleMeta,
    rule_type: AlertRuleType,
    parameters: HashMap<String, serde_json::Value>,
}

impl GenericAlertRule {
    pub fn new(
        rule_key: impl Into<String>,
        rule_name: impl Into<String>,
        rule_type: AlertRuleType,
        priority: i32,
        parameters: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            meta: RuleMeta::new(rule_key, rule_name, priority),
            rule_type,
            parameters,
        }
    }

    pub fn rule_type(&self) -> AlertRuleType {
        self.rule_type
    }

    pub fn parameters(&self) -> &HashMap<String, serde_json::Value> {
        &self.parameters
    }

    pub fn evaluate(&self, _vehicle_id: &str, _location: &LocationPoint) -> Option<AlertEvent> {
        None
    }
}
