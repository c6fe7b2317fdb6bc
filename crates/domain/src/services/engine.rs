//! Priority-ordered alert rule dispatch.
//!
//! The engine owns the registered rule set and runs every enabled rule
//! against each telemetry update, highest priority first. Triggered alerts
//! are published immediately, before the next rule is evaluated.
//!
//! The rule set is copy-on-write: readers load the current `Arc` snapshot
//! from an [`ArcSwap`] without taking any lock, while writers build a new
//! vector and swap it in. Writers are serialized among themselves so that
//! duplicate-key checks see the latest set. An update that is already
//! iterating never observes a concurrent registration or removal.

use arc_swap::ArcSwap;

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cmp::Reverse;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::evaluation::{AlertRuleEvaluationService, RuleEvaluator};
use super::metrics;
use super::publisher::EventPublisher;
use crate::error::DomainError;
use crate::models::{AlertEvent, LocationPoint};
use crate::rules::AlertRule;

type RuleSet = Arc<Vec<Arc<AlertRule>>>;

/// What the engine does when a rule fails during an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Surface the first failure and skip the remaining rules of the pass.
    #[default]
    FailFast,
    /// Record the failure and keep evaluating lower-priority rules.
    Isolate,
}

/// Result of one successful [`AlertingEngine::process_vehicle_update`] pass.
#[derive(Debug, Default)]
pub struct UpdateOutcome {
    /// Number of enabled rules that were evaluated.
    pub evaluated: usize,
    /// Alerts published during the pass, in publish order.
    pub alerts: Vec<AlertEvent>,
    /// Failures recorded under [`FailurePolicy::Isolate`].
    pub failures: Vec<DomainError>,
}

pub struct AlertingEngine {
    rules: ArcSwap<Vec<Arc<AlertRule>>>,
    writer: Mutex<()>,
    publisher: Arc<dyn EventPublisher>,
    evaluator: Arc<dyn RuleEvaluator>,
    failure_policy: FailurePolicy,
}

impl AlertingEngine {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self::with_evaluator(publisher, Arc::new(AlertRuleEvaluationService::new()))
    }

    pub fn with_evaluator(
        publisher: Arc<dyn EventPublisher>,
        evaluator: Arc<dyn RuleEvaluator>,
    ) -> Self {
        Self {
            rules: ArcSwap::from_pointee(Vec::new()),
            writer: Mutex::new(()),
            publisher,
            evaluator,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    fn snapshot(&self) -> RuleSet {
        self.rules.load_full()
    }

    fn update<T>(
        &self,
        f: impl FnOnce(&mut Vec<Arc<AlertRule>>) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        // the writer lock guards no data, only swaps; poisoning is harmless
        let _writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = Vec::clone(&self.rules.load());
        let value = f(&mut next)?;
        self.rules.store(Arc::new(next));
        Ok(value)
    }

    /// Registers `rule` after validating its configuration.
    ///
    /// Fails with `RuleAlreadyExists` if the key is taken and with
    /// `InvalidConfiguration` if validation rejects the rule.
    pub fn register_rule(&self, rule: AlertRule) -> Result<(), DomainError> {
        let rule_key = rule.rule_key().to_string();
        let rule = Arc::new(rule);

        self.update(|rules| {
            if rules.iter().any(|r| r.rule_key() == rule_key) {
                return Err(DomainError::RuleAlreadyExists {
                    rule_key: rule_key.clone(),
                });
            }
            self.evaluator.validate_rule_configuration(&rule)?;
            rules.push(Arc::clone(&rule));
            Ok(())
        })?;

        tracing::info!(
            rule_key = %rule_key,
            kind = rule.kind(),
            priority = rule.priority(),
            "Alert rule registered"
        );
        Ok(())
    }

    /// Registers an optional rule, as produced by the rule factory.
    ///
    /// `None` fails with `RuleIsNull`.
    pub fn try_register(&self, rule: Option<AlertRule>) -> Result<(), DomainError> {
        match rule {
            Some(rule) => self.register_rule(rule),
            None => Err(DomainError::RuleIsNull),
        }
    }

    /// Removes the rule registered under `rule_key` and returns it.
    pub fn unregister_rule(&self, rule_key: &str) -> Result<Arc<AlertRule>, DomainError> {
        let removed = self.update(|rules| {
            let index = rules
                .iter()
                .position(|r| r.rule_key() == rule_key)
                .ok_or_else(|| DomainError::RuleNotFound {
                    rule_key: rule_key.to_string(),
                })?;
            Ok(rules.remove(index))
        })?;

        tracing::info!(rule_key = %rule_key, "Alert rule unregistered");
        Ok(removed)
    }

    /// Copy of the registered rules, in registration order.
    pub fn get_active_rules(&self) -> Vec<Arc<AlertRule>> {
        self.snapshot().as_ref().clone()
    }

    pub fn find_rule(&self, rule_key: &str) -> Option<Arc<AlertRule>> {
        self.snapshot()
            .iter()
            .find(|r| r.rule_key() == rule_key)
            .cloned()
    }

    pub fn rule_count(&self) -> usize {
        self.snapshot().len()
    }

    pub fn clear_rules(&self) {
        let _writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.rules.store(Arc::new(Vec::new()));
        tracing::info!("Alert rules cleared");
    }

    /// Evaluates every enabled rule against one telemetry sample.
    ///
    /// Rules run in descending priority; equal priorities keep registration
    /// order. Each triggered alert is published before the next rule runs.
    /// Under [`FailurePolicy::FailFast`] the first failure, attributed to its
    /// rule, is returned and the remaining rules are skipped; alerts published
    /// before it stay published.
    pub fn process_vehicle_update(
        &self,
        vehicle_id: &str,
        location: &LocationPoint,
    ) -> Result<UpdateOutcome, DomainError> {
        if vehicle_id.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "Vehicle ID and location are required".to_string(),
            ));
        }

        let snapshot = self.snapshot();
        let mut ordered: Vec<&Arc<AlertRule>> =
            snapshot.iter().filter(|r| r.is_enabled()).collect();
        ordered.sort_by_key(|r| Reverse(r.priority()));

        tracing::debug!(
            vehicle_id = %vehicle_id,
            rules = ordered.len(),
            "Evaluating alert rules"
        );

        let mut outcome = UpdateOutcome::default();

        for rule in ordered {
            let started = Instant::now();
            let result = self.evaluate_guarded(rule, vehicle_id, location);
            metrics::record_rule_evaluated(rule.kind(), started.elapsed().as_secs_f64());
            outcome.evaluated += 1;

            let failure = match result {
                Ok(Some(alert)) => match self.publisher.publish(&alert) {
                    Ok(()) => {
                        tracing::info!(
                            rule_key = %alert.rule_key,
                            vehicle_id = %vehicle_id,
                            severity = %alert.severity,
                            "Alert triggered"
                        );
                        metrics::record_alert_published(alert.severity.as_str());
                        outcome.alerts.push(alert);
                        None
                    }
                    Err(e) => Some(DomainError::PublishFailed(e.to_string())),
                },
                Ok(None) => None,
                Err(e) => Some(e),
            };

            if let Some(err) = failure {
                let err = err.for_rule(rule.rule_key());
                metrics::record_rule_failure(err.code());

                match self.failure_policy {
                    FailurePolicy::FailFast => {
                        tracing::error!(
                            rule_key = %rule.rule_key(),
                            vehicle_id = %vehicle_id,
                            code = err.code(),
                            error = %err,
                            "Alert rule failed, aborting evaluation pass"
                        );
                        return Err(err);
                    }
                    FailurePolicy::Isolate => {
                        tracing::warn!(
                            rule_key = %rule.rule_key(),
                            vehicle_id = %vehicle_id,
                            code = err.code(),
                            error = %err,
                            "Alert rule failed, continuing"
                        );
                        outcome.failures.push(err);
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// Runs the evaluator, turning a panic inside the rule into an evaluation error.
    fn evaluate_guarded(
        &self,
        rule: &AlertRule,
        vehicle_id: &str,
        location: &LocationPoint,
    ) -> Result<Option<AlertEvent>, DomainError> {
        let evaluator = &self.evaluator;
        panic::catch_unwind(AssertUnwindSafe(|| {
            evaluator.evaluate_rule(rule, vehicle_id, location)
        }))
        .unwrap_or_else(|payload| {
            Err(DomainError::Evaluation {
                rule_key: rule.rule_key().to_string(),
                detail: panic_message(payload.as_ref()),
            })
        })
    }
}

impl std::fmt::Debug for AlertingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertingEngine")
            .field("rules", &self.rule_count())
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic during rule evaluation".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeoPoint;
    use crate::models::{AlertSeverity, GeofenceAction};
    use crate::rules::{GenericAlertRule, GeofenceRule, MaxSpeedRule};
    use crate::services::publisher::RecordingEventPublisher;
    use chrono::Utc;
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    /// Evaluator that can be told to fail or panic for specific rule keys.
    #[derive(Default)]
    struct ScriptedEvaluator {
        inner: AlertRuleEvaluationService,
        errors: HashMap<String, DomainError>,
        panics: Vec<String>,
        always_alert: Vec<String>,
    }

    impl ScriptedEvaluator {
        fn failing(mut self, rule_key: &str, err: DomainError) -> Self {
            self.errors.insert(rule_key.to_string(), err);
            self
        }

        fn panicking(mut self, rule_key: &str) -> Self {
            self.panics.push(rule_key.to_string());
            self
        }

        fn alerting(mut self, rule_key: &str) -> Self {
            self.always_alert.push(rule_key.to_string());
            self
        }
    }

    impl RuleEvaluator for ScriptedEvaluator {
        fn evaluate_rule(
            &self,
            rule: &AlertRule,
            vehicle_id: &str,
            location: &LocationPoint,
        ) -> Result<Option<AlertEvent>, DomainError> {
            let key = rule.rule_key();
            if self.panics.iter().any(|k| k == key) {
                panic!("boom in {key}");
            }
            if let Some(err) = self.errors.get(key) {
                return Err(err.clone());
            }
            if self.always_alert.iter().any(|k| k == key) {
                return Ok(Some(AlertEvent::new(
                    key,
                    vehicle_id,
                    format!("{key} fired"),
                    AlertSeverity::Info,
                    location.clone(),
                )));
            }
            self.inner.evaluate_rule(rule, vehicle_id, location)
        }

        fn validate_rule_configuration(&self, rule: &AlertRule) -> Result<(), DomainError> {
            self.inner.validate_rule_configuration(rule)
        }
    }

    fn generic(rule_key: &str, priority: i32) -> AlertRule {
        GenericAlertRule::new(
            rule_key,
            rule_key,
            crate::models::AlertRuleType::Custom,
            priority,
            HashMap::new(),
        )
        .into()
    }

    fn unit_square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(1.0, 0.0),
        ]
    }

    fn at(lat: f64, lon: f64, speed: f64) -> LocationPoint {
        LocationPoint::new(lat, lon, speed, Utc::now())
    }

    fn scripted_engine(
        evaluator: ScriptedEvaluator,
        policy: FailurePolicy,
    ) -> (AlertingEngine, Arc<RecordingEventPublisher>) {
        let publisher = Arc::new(RecordingEventPublisher::new());
        let engine = AlertingEngine::with_evaluator(publisher.clone(), Arc::new(evaluator))
            .with_failure_policy(policy);
        (engine, publisher)
    }

    fn engine() -> (AlertingEngine, Arc<RecordingEventPublisher>) {
        let publisher = Arc::new(RecordingEventPublisher::new());
        (AlertingEngine::new(publisher.clone()), publisher)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    #[test]
    fn test_register_and_list_rules() {
        let (engine, _) = engine();
        assert_ok!(engine.register_rule(MaxSpeedRule::new("SPEED_1", 80.0).into()));
        assert_ok!(engine.register_rule(generic("CUSTOM_1", 5)));

        let keys: Vec<String> = engine
            .get_active_rules()
            .iter()
            .map(|r| r.rule_key().to_string())
            .collect();
        assert_eq!(keys, vec!["SPEED_1", "CUSTOM_1"]);
        assert!(engine.find_rule("CUSTOM_1").is_some());
    }

    #[test]
    fn test_duplicate_rule_key_rejected() {
        let (engine, _) = engine();
        engine.register_rule(MaxSpeedRule::new("SPEED_1", 80.0).into()).unwrap();

        let err = assert_err!(engine.register_rule(MaxSpeedRule::new("SPEED_1", 120.0).into()));
        assert_eq!(
            err,
            DomainError::RuleAlreadyExists {
                rule_key: "SPEED_1".into()
            }
        );
        assert_eq!(engine.rule_count(), 1);
    }

    #[test]
    fn test_missing_rule_rejected() {
        let (engine, _) = engine();
        let err = assert_err!(engine.try_register(None));
        assert_eq!(err.code(), "ALERT_RULE_NULL");
        assert_eq!(engine.rule_count(), 0);

        assert_ok!(engine.try_register(Some(generic("CUSTOM_1", 5))));
        assert_eq!(engine.rule_count(), 1);
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let (engine, _) = engine();
        let err = assert_err!(engine.register_rule(generic("bad key", 5)));
        assert_eq!(err.code(), "ALERT_INVALID_CONFIG");

        let err = assert_err!(engine.register_rule(generic("HIGH", 101)));
        assert_eq!(err.code(), "ALERT_INVALID_CONFIG");
        assert_eq!(engine.rule_count(), 0);
    }

    #[test]
    fn test_unregister_rule() {
        let (engine, _) = engine();
        engine.register_rule(generic("A", 5)).unwrap();

        let removed = assert_ok!(engine.unregister_rule("A"));
        assert_eq!(removed.rule_key(), "A");
        assert_eq!(engine.rule_count(), 0);

        let err = assert_err!(engine.unregister_rule("A"));
        assert_eq!(err.code(), "ALERT_RULE_NOT_FOUND");
    }

    #[test]
    fn test_active_rules_is_a_snapshot() {
        let (engine, _) = engine();
        engine.register_rule(generic("A", 5)).unwrap();

        let snapshot = engine.get_active_rules();
        engine.register_rule(generic("B", 5)).unwrap();
        engine.clear_rules();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(engine.rule_count(), 0);
    }

    // =========================================================================
    // Dispatch Order
    // =========================================================================

    #[test]
    fn test_rules_run_in_descending_priority() {
        let evaluator = ScriptedEvaluator::default().alerting("A").alerting("B");
        let (engine, publisher) = scripted_engine(evaluator, FailurePolicy::FailFast);

        engine.register_rule(generic("B", 1)).unwrap();
        engine.register_rule(generic("A", 3)).unwrap();

        let outcome = engine.process_vehicle_update("V1", &at(0.0, 0.0, 0.0)).unwrap();

        assert_eq!(outcome.evaluated, 2);
        assert_eq!(publisher.rule_keys(), vec!["A", "B"]);
        let published: Vec<&str> = outcome.alerts.iter().map(|a| a.rule_key.as_str()).collect();
        assert_eq!(published, vec!["A", "B"]);
    }

    #[test]
    fn test_equal_priorities_keep_registration_order() {
        let evaluator = ScriptedEvaluator::default()
            .alerting("FIRST")
            .alerting("SECOND")
            .alerting("THIRD");
        let (engine, publisher) = scripted_engine(evaluator, FailurePolicy::FailFast);

        engine.register_rule(generic("FIRST", 5)).unwrap();
        engine.register_rule(generic("SECOND", 5)).unwrap();
        engine.register_rule(generic("THIRD", 9)).unwrap();

        engine.process_vehicle_update("V1", &at(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(publisher.rule_keys(), vec!["THIRD", "FIRST", "SECOND"]);
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let evaluator = ScriptedEvaluator::default().alerting("A").alerting("B");
        let (engine, publisher) = scripted_engine(evaluator, FailurePolicy::FailFast);

        engine.register_rule(generic("A", 5)).unwrap();
        engine.register_rule(generic("B", 5)).unwrap();
        engine.find_rule("A").unwrap().set_enabled(false);

        let outcome = engine.process_vehicle_update("V1", &at(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(outcome.evaluated, 1);
        assert_eq!(publisher.rule_keys(), vec!["B"]);
    }

    #[test]
    fn test_blank_vehicle_id_is_invalid_input() {
        let (engine, _) = engine();
        let err = assert_err!(engine.process_vehicle_update("  ", &at(0.0, 0.0, 0.0)));
        assert_eq!(err.code(), "ALERT_INVALID_INPUT");
    }

    #[test]
    fn test_no_rules_is_empty_outcome() {
        let (engine, publisher) = engine();
        let outcome = engine.process_vehicle_update("V1", &at(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(outcome.evaluated, 0);
        assert!(outcome.alerts.is_empty());
        assert!(publisher.events().is_empty());
    }

    // =========================================================================
    // Failure Policy
    // =========================================================================

    #[test]
    fn test_fail_fast_aborts_remaining_rules() {
        let evaluator = ScriptedEvaluator::default()
            .alerting("HIGH")
            .failing("MID", DomainError::InvalidLocation)
            .alerting("LOW");
        let (engine, publisher) = scripted_engine(evaluator, FailurePolicy::FailFast);

        engine.register_rule(generic("LOW", 1)).unwrap();
        engine.register_rule(generic("MID", 5)).unwrap();
        engine.register_rule(generic("HIGH", 9)).unwrap();

        let err = assert_err!(engine.process_vehicle_update("V1", &at(0.0, 0.0, 0.0)));
        assert_eq!(err.rule_key(), Some("MID"));
        assert_eq!(err.code(), "VEHICLE_INVALID_LOCATION");
        // higher priority alert already went out, lower one never ran
        assert_eq!(publisher.rule_keys(), vec!["HIGH"]);
    }

    #[test]
    fn test_isolate_continues_past_failures() {
        let evaluator = ScriptedEvaluator::default()
            .alerting("HIGH")
            .failing("MID", DomainError::InvalidLocation)
            .alerting("LOW");
        let (engine, publisher) = scripted_engine(evaluator, FailurePolicy::Isolate);

        engine.register_rule(generic("LOW", 1)).unwrap();
        engine.register_rule(generic("MID", 5)).unwrap();
        engine.register_rule(generic("HIGH", 9)).unwrap();

        let outcome = engine.process_vehicle_update("V1", &at(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(outcome.evaluated, 3);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].rule_key(), Some("MID"));
        assert_eq!(publisher.rule_keys(), vec!["HIGH", "LOW"]);
    }

    #[test]
    fn test_panic_becomes_evaluation_error() {
        let evaluator = ScriptedEvaluator::default().panicking("BOOM");
        let (engine, _) = scripted_engine(evaluator, FailurePolicy::FailFast);
        engine.register_rule(generic("BOOM", 5)).unwrap();

        let err = assert_err!(engine.process_vehicle_update("V1", &at(0.0, 0.0, 0.0)));
        assert_eq!(err.code(), "ALERT_EVALUATION_ERROR");
        assert_eq!(err.rule_key(), Some("BOOM"));
        assert!(err.to_string().contains("boom in BOOM"));
    }

    #[test]
    fn test_attributed_errors_are_not_rewrapped() {
        let original = DomainError::Evaluation {
            rule_key: "GEO_1".into(),
            detail: "state lock poisoned".into(),
        };
        let evaluator = ScriptedEvaluator::default().failing("GEO_1", original.clone());
        let (engine, _) = scripted_engine(evaluator, FailurePolicy::FailFast);
        engine.register_rule(generic("GEO_1", 5)).unwrap();

        let err = assert_err!(engine.process_vehicle_update("V1", &at(0.0, 0.0, 0.0)));
        assert_eq!(err, original);
    }

    #[test]
    fn test_publish_failure_is_attributed_to_rule() {
        let publisher = Arc::new(RecordingEventPublisher::failing());
        let engine = AlertingEngine::new(publisher);
        engine.register_rule(MaxSpeedRule::new("SPEED_1", 50.0).into()).unwrap();

        let err = assert_err!(engine.process_vehicle_update("V1", &at(0.0, 0.0, 90.0)));
        assert_eq!(err.code(), "ALERT_PUBLISH_FAILED");
        assert_eq!(err.rule_key(), Some("SPEED_1"));
    }

    // =========================================================================
    // End-to-end with Concrete Rules
    // =========================================================================

    #[test]
    fn test_speed_rule_through_engine() {
        let (engine, publisher) = engine();
        engine.register_rule(MaxSpeedRule::new("SPEED_1", 100.0).into()).unwrap();

        engine.process_vehicle_update("V1", &at(0.0, 0.0, 80.0)).unwrap();
        assert!(publisher.events().is_empty());

        engine.process_vehicle_update("V1", &at(0.0, 0.0, 120.0)).unwrap();
        engine.process_vehicle_update("V1", &at(0.0, 0.0, 160.0)).unwrap();

        let events = publisher.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].severity, AlertSeverity::Warning);
        assert!(events[0].message.contains("120.0"));
        assert_eq!(events[1].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_geofence_both_through_engine() {
        let (engine, publisher) = engine();
        let rule = GeofenceRule::new("GEO_1", "Square", "GF1", unit_square(), GeofenceAction::Both, 3);
        engine.register_rule(rule.into()).unwrap();

        engine.process_vehicle_update("V1", &at(0.5, 0.5, 10.0)).unwrap();
        engine.process_vehicle_update("V1", &at(5.0, 5.0, 10.0)).unwrap();

        let events = publisher.events();
        assert_eq!(events.len(), 2);
        assert!(events[0].message.contains("entered geofence GF1"));
        assert!(events[1].message.contains("exited geofence GF1"));
    }

    #[test]
    fn test_concurrent_updates_and_registration() {
        let (engine, publisher) = engine();
        engine.register_rule(MaxSpeedRule::new("SPEED_1", 10.0).into()).unwrap();
        let engine = Arc::new(engine);

        std::thread::scope(|scope| {
            for v in 0..4 {
                let engine = Arc::clone(&engine);
                scope.spawn(move || {
                    let vehicle_id = format!("V{v}");
                    for _ in 0..25 {
                        engine
                            .process_vehicle_update(&vehicle_id, &at(0.0, 0.0, 50.0))
                            .unwrap();
                    }
                });
            }

            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for i in 0..25 {
                    engine.register_rule(generic(&format!("EXTRA_{i}"), 1)).unwrap();
                }
            });
        });

        assert_eq!(engine.rule_count(), 26);
        assert_eq!(publisher.events().len(), 100);
    }

    #[test]
    fn test_reads_do_not_wait_for_writers() {
        let (engine, publisher) = engine();
        engine.register_rule(MaxSpeedRule::new("SPEED_1", 10.0).into()).unwrap();

        // a writer mid-swap must not block evaluation or queries
        let _writer = engine.writer.lock().unwrap();
        assert_eq!(engine.rule_count(), 1);
        assert!(engine.find_rule("SPEED_1").is_some());
        let outcome = engine
            .process_vehicle_update("V1", &at(0.0, 0.0, 50.0))
            .unwrap();
        assert_eq!(outcome.alerts.len(), 1);
        assert_eq!(publisher.events().len(), 1);
    }

    #[test]
    fn test_concurrent_duplicate_registration_admits_one() {
        let (engine, _) = engine();
        let engine = Arc::new(engine);

        let admitted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let engine = Arc::clone(&engine);
                    scope.spawn(move || engine.register_rule(generic("SHARED_KEY", 3)).is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| usize::from(h.join().unwrap()))
                .sum()
        });

        assert_eq!(admitted, 1);
        assert_eq!(engine.rule_count(), 1);
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_writes() {
        let (engine, _) = engine();
        engine.register_rule(generic("A_1", 3)).unwrap();
        let before = engine.get_active_rules();

        engine.register_rule(generic("B_1", 2)).unwrap();
        engine.clear_rules();

        assert_eq!(before.len(), 1);
        assert_eq!(before[0].rule_key(), "A_1");
        assert_eq!(engine.rule_count(), 0);
    }
}
