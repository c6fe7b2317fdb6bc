//! Telemetry ingestion pipeline.
//!
//! Reads newline-delimited JSON messages, applies them to the vehicle
//! aggregates and runs each telemetry sample through the vehicle's alerting
//! engine. Every vehicle gets its own engine, built from the catalog's rule
//! definitions on the vehicle's first telemetry.

use chrono::{DateTime, Utc};
use domain::models::{AlertEvent, AlertRuleDefinition, EngineState, LocationPoint, Trip};
use domain::rules::IdleDurationSource;
use domain::services::{
    AlertRuleFactory, AlertingEngine, BroadcastEventPublisher, EventPublisher, FailurePolicy,
};
use domain::DomainError;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use validator::Validate;

use crate::catalog::Catalog;
use crate::error::PipelineError;
use crate::registry::{lock_vehicle, VehicleRegistry};

// ============================================================================
// Inbound Messages
// ============================================================================

/// A telemetry sample as received from the device gateway.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryMessage {
    #[validate(length(min = 1, max = 100, message = "vehicleId must be 1-100 characters"))]
    pub vehicle_id: String,

    #[serde(default)]
    pub device_id: Option<String>,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(custom(function = "shared::validation::validate_speed"))]
    pub speed_kmh: f64,

    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl TelemetryMessage {
    /// Converts to a location sample. A sample without timestamp is not a valid location.
    pub fn to_location(&self) -> Result<LocationPoint, DomainError> {
        let timestamp = self.timestamp.ok_or(DomainError::InvalidLocation)?;
        let mut location =
            LocationPoint::new(self.latitude, self.longitude, self.speed_kmh, timestamp);
        location.metadata = self.metadata.clone();
        Ok(location)
    }
}

/// A command addressed to one vehicle.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VehicleCommand {
    #[validate(length(min = 1, max = 100, message = "vehicleId must be 1-100 characters"))]
    pub vehicle_id: String,
}

/// One line of pipeline input.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    Telemetry(TelemetryMessage),
    /// Ends the active trip at the given location.
    EndTrip(TelemetryMessage),
    FuelCut(VehicleCommand),
    FuelRestore(VehicleCommand),
}

/// What applying one message did.
#[derive(Debug)]
pub enum MessageOutcome {
    Telemetry {
        vehicle_id: String,
        engine_state: EngineState,
        alerts: Vec<AlertEvent>,
        rule_failures: Vec<DomainError>,
    },
    TripEnded(Trip),
    FuelCut {
        vehicle_id: String,
    },
    FuelRestored {
        vehicle_id: String,
        engine_state: EngineState,
    },
}

/// Totals of one [`TelemetryPipeline::run`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: u64,
    pub rejected: u64,
    pub alerts: u64,
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct TelemetryPipeline {
    registry: Arc<VehicleRegistry>,
    factory: AlertRuleFactory,
    definitions: Vec<AlertRuleDefinition>,
    publisher: Arc<BroadcastEventPublisher>,
    failure_policy: FailurePolicy,
    engines: RwLock<HashMap<String, Arc<AlertingEngine>>>,
}

impl TelemetryPipeline {
    pub fn new(
        mut catalog: Catalog,
        registry: Arc<VehicleRegistry>,
        publisher: Arc<BroadcastEventPublisher>,
        failure_policy: FailurePolicy,
    ) -> Self {
        let idle_source: Arc<dyn IdleDurationSource> = registry.clone();
        let factory = AlertRuleFactory::new(Arc::new(catalog.geofence_lookup()), idle_source);
        let skipped = catalog.retain_valid_rules(&factory);

        tracing::info!(
            geofences = catalog.geofences.len(),
            rules = catalog.rules.len(),
            skipped = skipped,
            failure_policy = ?failure_policy,
            "Telemetry pipeline ready"
        );

        Self {
            registry,
            factory,
            definitions: catalog.rules,
            publisher,
            failure_policy,
            engines: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<VehicleRegistry> {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.publisher.subscribe()
    }

    /// The alerting engine of `vehicle_id`, building it on first use.
    pub fn engine_for(&self, vehicle_id: &str) -> Arc<AlertingEngine> {
        if let Some(engine) = self
            .engines
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(vehicle_id)
        {
            return Arc::clone(engine);
        }

        let mut engines = self
            .engines
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let engine = engines
            .entry(vehicle_id.to_string())
            .or_insert_with(|| Arc::new(self.build_engine(vehicle_id)));
        Arc::clone(engine)
    }

    fn build_engine(&self, vehicle_id: &str) -> AlertingEngine {
        let publisher: Arc<dyn EventPublisher> = self.publisher.clone();
        let engine = AlertingEngine::new(publisher).with_failure_policy(self.failure_policy);

        for definition in &self.definitions {
            let Some(rule) = self.factory.create_domain_rule(definition, vehicle_id) else {
                continue;
            };
            if let Err(e) = engine.register_rule(rule) {
                tracing::warn!(
                    vehicle_id = %vehicle_id,
                    rule_key = %definition.rule_key,
                    code = e.code(),
                    error = %e,
                    "Rule not registered"
                );
            }
        }

        tracing::debug!(
            vehicle_id = %vehicle_id,
            rules = engine.rule_count(),
            "Alerting engine built"
        );
        engine
    }

    /// Parses and applies one input line. Blank lines are skipped.
    pub fn handle_line(&self, line: &str) -> Result<Option<MessageOutcome>, PipelineError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let message: InboundMessage = serde_json::from_str(line)?;
        self.handle_message(message).map(Some)
    }

    pub fn handle_message(&self, message: InboundMessage) -> Result<MessageOutcome, PipelineError> {
        match message {
            InboundMessage::Telemetry(telemetry) => self.handle_telemetry(telemetry),
            InboundMessage::EndTrip(telemetry) => self.handle_end_trip(telemetry),
            InboundMessage::FuelCut(command) => self.handle_fuel_cut(command),
            InboundMessage::FuelRestore(command) => self.handle_fuel_restore(command),
        }
    }

    fn handle_telemetry(
        &self,
        telemetry: TelemetryMessage,
    ) -> Result<MessageOutcome, PipelineError> {
        telemetry.validate()?;
        let location = telemetry.to_location()?;
        let vehicle_id = telemetry.vehicle_id.as_str();

        let handle = self
            .registry
            .get_or_register(vehicle_id, telemetry.device_id.as_deref());
        let engine_state = {
            let mut vehicle = lock_vehicle(&handle);
            vehicle.process_new_telemetry(location.clone())?;
            vehicle.engine_state()
        };

        // vehicle lock released: the idle-time rule reads the vehicle back
        let outcome = self
            .engine_for(vehicle_id)
            .process_vehicle_update(vehicle_id, &location)?;

        Ok(MessageOutcome::Telemetry {
            vehicle_id: vehicle_id.to_string(),
            engine_state,
            alerts: outcome.alerts,
            rule_failures: outcome.failures,
        })
    }

    fn handle_end_trip(
        &self,
        telemetry: TelemetryMessage,
    ) -> Result<MessageOutcome, PipelineError> {
        telemetry.validate()?;
        let location = telemetry.to_location()?;
        let handle = self
            .registry
            .get(&telemetry.vehicle_id)
            .ok_or_else(|| PipelineError::UnknownVehicle(telemetry.vehicle_id.clone()))?;

        let trip = lock_vehicle(&handle).end_trip(location)?;
        Ok(MessageOutcome::TripEnded(trip))
    }

    fn handle_fuel_cut(&self, command: VehicleCommand) -> Result<MessageOutcome, PipelineError> {
        command.validate()?;
        let handle = self
            .registry
            .get(&command.vehicle_id)
            .ok_or_else(|| PipelineError::UnknownVehicle(command.vehicle_id.clone()))?;

        lock_vehicle(&handle).issue_fuel_cut_off_command()?;
        Ok(MessageOutcome::FuelCut {
            vehicle_id: command.vehicle_id,
        })
    }

    fn handle_fuel_restore(
        &self,
        command: VehicleCommand,
    ) -> Result<MessageOutcome, PipelineError> {
        command.validate()?;
        let handle = self
            .registry
            .get(&command.vehicle_id)
            .ok_or_else(|| PipelineError::UnknownVehicle(command.vehicle_id.clone()))?;

        let engine_state = {
            let mut vehicle = lock_vehicle(&handle);
            vehicle.issue_fuel_restore_command();
            vehicle.engine_state()
        };
        Ok(MessageOutcome::FuelRestored {
            vehicle_id: command.vehicle_id,
            engine_state,
        })
    }

    /// Reads messages until end of input. Rejected messages are logged and skipped.
    pub async fn run<R>(&self, reader: R) -> std::io::Result<RunSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut summary = RunSummary::default();
        let mut line_number: u64 = 0;

        while let Some(line) = lines.next_line().await? {
            line_number += 1;
            match self.handle_line(&line) {
                Ok(Some(outcome)) => {
                    summary.processed += 1;
                    metrics::counter!("telemetry_messages_total", "outcome" => "processed")
                        .increment(1);
                    if let MessageOutcome::Telemetry { alerts, .. } = &outcome {
                        summary.alerts += alerts.len() as u64;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    summary.rejected += 1;
                    metrics::counter!("telemetry_messages_total", "outcome" => "rejected")
                        .increment(1);
                    tracing::warn!(
                        line = line_number,
                        code = e.code(),
                        error = %e,
                        "Message rejected"
                    );
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            rejected = summary.rejected,
            alerts = summary.alerts,
            "Telemetry input exhausted"
        );
        Ok(summary)
    }
}

/// Appends every broadcast alert to its vehicle's recent-alert ring.
///
/// The task ends when the publisher is dropped and returns the number of
/// alerts recorded.
pub fn spawn_alert_listener(
    registry: Arc<VehicleRegistry>,
    mut receiver: broadcast::Receiver<AlertEvent>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut recorded = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if registry.record_alert(&event) {
                        recorded += 1;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped = skipped, "Alert listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        recorded
    })
}

// ============================================================================
// Tests
// ============================================================================
