//! Rule evaluation and configuration validation.

use validator::ValidationError;

use crate::error::DomainError;
use crate::models::{AlertEvent, LocationPoint};
use crate::rules::AlertRule;

/// Evaluates rules and checks their configuration.
///
/// The engine goes through this seam for every rule so that registration and
/// ad-hoc validation share one policy.
pub trait RuleEvaluator: Send + Sync {
    fn evaluate_rule(
        &self,
        rule: &AlertRule,
        vehicle_id: &str,
        location: &LocationPoint,
    ) -> Result<Option<AlertEvent>, DomainError>;

    fn validate_rule_configuration(&self, rule: &AlertRule) -> Result<(), DomainError>;
}

/// Default evaluator: delegates to the rule and validates with the shared rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertRuleEvaluationService;

impl AlertRuleEvaluationService {
    pub fn new() -> Self {
        Self
    }
}

fn invalid_configuration(rule: &AlertRule, err: ValidationError) -> DomainError {
    let detail = err
        .message
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string());
    DomainError::InvalidConfiguration {
        rule_key: rule.rule_key().to_string(),
        detail,
    }
}

impl RuleEvaluator for AlertRuleEvaluationService {
    fn evaluate_rule(
        &self,
        rule: &AlertRule,
        vehicle_id: &str,
        location: &LocationPoint,
    ) -> Result<Option<AlertEvent>, DomainError> {
        if vehicle_id.is_empty() {
            return Ok(None);
        }
        rule.evaluate(vehicle_id, location)
    }

    fn validate_rule_configuration(&self, rule: &AlertRule) -> Result<(), DomainError> {
        shared::validation::validate_rule_key(rule.rule_key())
            .map_err(|e| invalid_configuration(rule, e))?;
        shared::validation::validate_rule_name(rule.rule_name())
            .map_err(|e| invalid_configuration(rule, e))?;
        shared::validation::validate_priority(rule.priority())
            .map_err(|e| invalid_configuration(rule, e))?;
        Ok(())
    }
}
