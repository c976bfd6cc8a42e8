// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Reconciliation scheduler.
//!
//! Each round enumerates functions once, filters them by the opt-in label and
//! spawns one independent evaluation task per eligible function. Tasks report
//! their evaluation back by value; the control task submits scale requests as
//! results arrive and waits for every task before the round ends.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::TouchCache;
use crate::eligibility::EligibilityFilter;
use crate::engine::{Decision, Evaluation, IdleDecisionEngine, Reason};
use crate::error::IdlerResult;
use crate::function::FunctionDescriptor;
use crate::source::{bounded, DeadlineSource, GatewayClient, MetricSource};
use crate::types::{FunctionName, InactivityWindow};

/// Default bound on a single collaborator call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// What happened to one function during a round.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Missing or disabled opt-in label. Never sampled.
    Ineligible,
    /// Evaluated and left running.
    Kept(Reason),
    /// Scale-to-zero request accepted by the gateway.
    ScaledToZero,
    /// Decided idle, but replicas were already 0 when re-checked.
    ScaleSuppressed,
    /// A collaborator call failed. The function is kept for this round.
    Failed(String),
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ineligible => "ineligible",
            Outcome::Kept(_) => "kept",
            Outcome::ScaledToZero => "scaled_to_zero",
            Outcome::ScaleSuppressed => "scale_suppressed",
            Outcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionOutcome {
    pub name: FunctionName,
    pub outcome: Outcome,
}

/// Summary of one reconciliation round.
#[derive(Debug, Clone, Default)]
pub struct RoundReport {
    /// Outcomes sorted by function name.
    pub outcomes: Vec<FunctionOutcome>,
    pub elapsed: Duration,
}

impl RoundReport {
    /// Outcome recorded for a function, if it was part of the round.
    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.name.as_str() == name)
            .map(|o| &o.outcome)
    }

    /// Number of functions that went through the engine.
    pub fn evaluated(&self) -> usize {
        self.count(|o| !matches!(o, Outcome::Ineligible))
    }

    pub fn ineligible(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Ineligible))
    }

    pub fn kept(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Kept(_) | Outcome::ScaleSuppressed))
    }

    pub fn scaled(&self) -> usize {
        self.count(|o| matches!(o, Outcome::ScaledToZero))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }
}

/// Tunables for the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub filter: EligibilityFilter,
    /// Bound applied to every gateway and metric source call.
    pub call_timeout: Duration,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            filter: EligibilityFilter::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Drives reconciliation rounds against a gateway and a metric source.
pub struct Reconciler {
    gateway: Arc<dyn GatewayClient>,
    source: Arc<dyn MetricSource>,
    cache: TouchCache,
    settings: ReconcilerSettings,
}

impl Reconciler {
    pub fn new(
        gateway: Arc<dyn GatewayClient>,
        source: Arc<dyn MetricSource>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            gateway,
            source,
            cache: TouchCache::new(),
            settings,
        }
    }

    /// Use an existing touch cache instead of a fresh one.
    pub fn with_cache(mut self, cache: TouchCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &TouchCache {
        &self.cache
    }

    /// Enumerate functions and run one round over them.
    pub async fn reconcile(&self, window: InactivityWindow) -> IdlerResult<RoundReport> {
        let functions = bounded(
            "list_functions",
            self.settings.call_timeout,
            self.gateway.list_functions(),
        )
        .await?;

        Ok(self.run_round(functions, window).await)
    }

    /// Evaluate every eligible function concurrently and act on the decisions.
    pub async fn run_round(
        &self,
        functions: Vec<FunctionDescriptor>,
        window: InactivityWindow,
    ) -> RoundReport {
        let started = Instant::now();
        let engine = IdleDecisionEngine::new(window);
        let mut outcomes = Vec::with_capacity(functions.len());
        let mut pending = HashSet::new();
        let mut tasks = JoinSet::new();

        for function in functions {
            if !self.settings.filter.is_eligible(&function) {
                debug!(
                    function = %function.name,
                    label = %self.settings.filter.label(),
                    "Skip: missing scale label"
                );
                outcomes.push(FunctionOutcome {
                    name: function.name,
                    outcome: Outcome::Ineligible,
                });
                continue;
            }

            pending.insert(function.name.clone());
            let task = EvaluationTask {
                gateway: Arc::clone(&self.gateway),
                source: Arc::clone(&self.source),
                cache: self.cache.clone(),
                engine,
                limit: self.settings.call_timeout,
            };
            tasks.spawn(async move {
                let result = task.run(&function).await;
                (function.name, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (name, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "Evaluation task did not complete");
                    continue;
                }
            };
            pending.remove(&name);

            let outcome = match result {
                Ok(evaluation) => self.act(&name, evaluation).await,
                Err(e) => {
                    warn!(function = %name, error = %e, "Evaluation failed, keeping function");
                    Outcome::Failed(e.to_string())
                }
            };
            outcomes.push(FunctionOutcome { name, outcome });
        }

        for name in pending {
            outcomes.push(FunctionOutcome {
                name,
                outcome: Outcome::Failed("evaluation task aborted".to_string()),
            });
        }

        outcomes.sort_by(|a, b| a.name.cmp(&b.name));
        RoundReport {
            outcomes,
            elapsed: started.elapsed(),
        }
    }

    /// Run rounds until `shutdown` resolves, sleeping `interval` between them.
    /// `observe` is called with every completed round.
    pub async fn run<F, O>(
        &self,
        window: InactivityWindow,
        interval: Duration,
        shutdown: F,
        mut observe: O,
    ) where
        F: Future<Output = ()>,
        O: FnMut(&RoundReport),
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                result = self.reconcile(window) => match result {
                    Ok(report) => {
                        info!(
                            evaluated = report.evaluated(),
                            scaled = report.scaled(),
                            kept = report.kept(),
                            failed = report.failed(),
                            ineligible = report.ineligible(),
                            elapsed_ms = report.elapsed.as_millis() as u64,
                            "Reconciliation round complete"
                        );
                        observe(&report);
                    }
                    Err(e) => error!(error = %e, "Unable to list functions, skipping round"),
                },
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!("Shutdown requested, reconciliation stopped");
    }

    async fn act(&self, name: &FunctionName, evaluation: Evaluation) -> Outcome {
        if evaluation.decision == Decision::Keep {
            return Outcome::Kept(evaluation.reason);
        }

        let limit = self.settings.call_timeout;
        match bounded("replica_status", limit, self.gateway.replica_status(name)).await {
            Ok(status) if !status.is_running() => {
                info!(function = %name, "Ignoring scale to zero, replicas already 0");
                return Outcome::ScaleSuppressed;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(function = %name, error = %e, "Replica re-check failed, keeping function");
                return Outcome::Failed(e.to_string());
            }
        }

        match bounded("scale_to", limit, self.gateway.scale_to(name, 0)).await {
            Ok(()) => {
                info!(
                    function = %name,
                    counter = evaluation.after,
                    "Scaled to zero after inactivity window"
                );
                Outcome::ScaledToZero
            }
            Err(e) => {
                warn!(function = %name, error = %e, "Scale request failed");
                Outcome::Failed(e.to_string())
            }
        }
    }
}

/// Everything one evaluation task owns.
struct EvaluationTask {
    gateway: Arc<dyn GatewayClient>,
    source: Arc<dyn MetricSource>,
    cache: TouchCache,
    engine: IdleDecisionEngine,
    limit: Duration,
}

impl EvaluationTask {
    async fn run(self, function: &FunctionDescriptor) -> IdlerResult<Evaluation> {
        let name = &function.name;
        let status = bounded("replica_status", self.limit, self.gateway.replica_status(name)).await?;
        let cached = self.cache.observe(name);
        let source = DeadlineSource::new(self.source.as_ref(), self.limit);

        let evaluation = self.engine.evaluate(function, cached, &source, status).await?;
        self.cache.store(name, evaluation.touch);
        Ok(evaluation)
    }
}
