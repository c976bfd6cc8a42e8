// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Function inventory types shared between the engine and its collaborators.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::FunctionName;

/// A function as reported by the gateway's enumeration call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: FunctionName,
    /// Labels attached at deploy time. `None` when the gateway sent no map.
    pub labels: Option<HashMap<String, String>>,
    pub available_replicas: u64,
    /// Desired replica count, when reported.
    pub replicas: Option<u64>,
    pub image: Option<String>,
    /// Informational only. Decisions are made from the metric source.
    pub invocation_count: f64,
}

impl FunctionDescriptor {
    /// Create a descriptor with no labels and no reported activity.
    pub fn new(name: FunctionName, available_replicas: u64) -> Self {
        Self {
            name,
            labels: None,
            available_replicas,
            replicas: None,
            image: None,
            invocation_count: 0.0,
        }
    }

    /// Attach a label, creating the label map if needed.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Look up a single label value.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }
}

/// Replica status of a single function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaStatus {
    pub available_replicas: u64,
}

impl ReplicaStatus {
    pub fn new(available_replicas: u64) -> Self {
        Self { available_replicas }
    }

    /// Whether any replica is running.
    pub fn is_running(&self) -> bool {
        self.available_replicas > 0
    }
}

/// Gateway release information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInfo {
    pub provider: Option<String>,
    pub release: String,
    pub sha: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_labels() {
        let name = FunctionName::new("figlet").unwrap();
        let function = FunctionDescriptor::new(name, 1);
        assert_eq!(function.label("com.openfaas.scale.zero"), None);

        let function = function.with_label("com.openfaas.scale.zero", "true");
        assert_eq!(function.label("com.openfaas.scale.zero"), Some("true"));
    }

    #[test]
    fn test_replica_status() {
        assert!(!ReplicaStatus::new(0).is_running());
        assert!(ReplicaStatus::new(3).is_running());
    }
}
