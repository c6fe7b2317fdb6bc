//! Domain services for alerting.
//!
//! Services contain business logic that operates on domain models.

pub mod engine;
pub mod evaluation;
pub mod factory;
pub mod metrics;
pub mod publisher;

pub use engine::{AlertingEngine, FailurePolicy, UpdateOutcome};
pub use evaluation::{AlertRuleEvaluationService, RuleEvaluator};
pub use factory::{AlertRuleFactory, GeofenceLookup, InMemoryGeofenceLookup};
pub use publisher::{
    BroadcastEventPublisher, EventPublisher, PublishError, RecordingEventPublisher,
};
