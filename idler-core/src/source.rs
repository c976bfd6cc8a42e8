// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Collaborator interfaces consumed by the engine and the reconciler.
//!
//! Concrete HTTP implementations live in the CLI crate. Every call made
//! through these traits by the reconciler is bounded by [`bounded`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{IdlerError, IdlerResult};
use crate::function::{FunctionDescriptor, GatewayInfo, ReplicaStatus};
use crate::types::FunctionName;

/// Source of cumulative invocation counters.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Cumulative invocation count for a function. Non-decreasing between
    /// metric source restarts.
    async fn read_counter(&self, name: &FunctionName) -> IdlerResult<f64>;
}

/// Gateway management API.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Enumerate deployed functions.
    async fn list_functions(&self) -> IdlerResult<Vec<FunctionDescriptor>>;

    /// Current replica status of one function.
    async fn replica_status(&self, name: &FunctionName) -> IdlerResult<ReplicaStatus>;

    /// Request a replica count. Dry-run implementations only log intent.
    async fn scale_to(&self, name: &FunctionName, replicas: u64) -> IdlerResult<()>;

    /// Gateway release information.
    async fn info(&self) -> IdlerResult<GatewayInfo>;
}

/// Await a collaborator call, failing with [`IdlerError::Timeout`] when it
/// does not complete within `limit`.
pub async fn bounded<T, F>(operation: &'static str, limit: Duration, call: F) -> IdlerResult<T>
where
    F: Future<Output = IdlerResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(IdlerError::Timeout {
            operation,
            after_ms: limit.as_millis() as u64,
        }),
    }
}

/// Metric source wrapper applying a timeout to every read.
pub struct DeadlineSource<'a> {
    inner: &'a dyn MetricSource,
    limit: Duration,
}

impl<'a> DeadlineSource<'a> {
    pub fn new(inner: &'a dyn MetricSource, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl MetricSource for DeadlineSource<'_> {
    async fn read_counter(&self, name: &FunctionName) -> IdlerResult<f64> {
        bounded("read_counter", self.limit, self.inner.read_counter(name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StalledSource;

    #[async_trait]
    impl MetricSource for StalledSource {
        async fn read_counter(&self, _name: &FunctionName) -> IdlerResult<f64> {
            std::future::pending().await
        }
    }

    struct FixedSource(f64);

    #[async_trait]
    impl MetricSource for FixedSource {
        async fn read_counter(&self, _name: &FunctionName) -> IdlerResult<f64> {
            Ok(self.0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_source_times_out() {
        let stalled = StalledSource;
        let source = DeadlineSource::new(&stalled, Duration::from_secs(5));
        let name = FunctionName::new("figlet").unwrap();

        let err = source.read_counter(&name).await.unwrap_err();
        assert!(matches!(
            err,
            IdlerError::Timeout {
                operation: "read_counter",
                after_ms: 5000
            }
        ));
    }

    #[tokio::test]
    async fn test_deadline_source_passes_through() {
        let fixed = FixedSource(12.0);
        let source = DeadlineSource::new(&fixed, Duration::from_secs(5));
        let name = FunctionName::new("figlet").unwrap();

        assert_eq!(source.read_counter(&name).await.unwrap(), 12.0);
    }
}
