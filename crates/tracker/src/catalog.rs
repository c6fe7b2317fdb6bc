//! Geofence and rule catalog.
//!
//! A JSON document of the form `{ "geofences": [...], "rules": [...] }`
//! standing in for the geofence and rule repositories.

use domain::models::{AlertRuleDefinition, AlertRuleType, Geofence};
use domain::services::{AlertRuleFactory, InMemoryGeofenceLookup};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub geofences: Vec<Geofence>,
    #[serde(default)]
    pub rules: Vec<AlertRuleDefinition>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&contents)
    }

    pub fn geofence_lookup(&self) -> InMemoryGeofenceLookup {
        InMemoryGeofenceLookup::new(self.geofences.iter().cloned())
    }

    /// Drops geofence rules whose definition cannot be bound, logging why.
    ///
    /// Returns the number of rules removed.
    pub fn retain_valid_rules(&mut self, factory: &AlertRuleFactory) -> usize {
        let before = self.rules.len();
        self.rules.retain(|definition| {
            if definition.rule_type != AlertRuleType::Geofence {
                return true;
            }
            match factory.validate_geofence_rule(definition) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        rule_key = %definition.rule_key,
                        code = e.code(),
                        error = %e,
                        "Skipping invalid geofence rule"
                    );
                    false
                }
            }
        });
        before - self.rules.len()
    }
}
