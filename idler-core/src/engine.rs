// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Idle decision engine.
//!
//! Decides whether a single function has been inactive for a full
//! inactivity window. The counter is sampled twice, one window apart, and
//! both samples must also equal the value recorded by the previous round:
//!
//! scale_to_zero = before == after && after == cached
//!
//! The third check stops a freshly deployed function that served one request
//! from being scaled to zero on its very first evaluation. The engine never
//! talks to the gateway; the caller acts on the returned decision and stores
//! the returned touch entry.

use std::fmt;

use tracing::debug;

use crate::cache::TouchEntry;
use crate::error::{IdlerError, IdlerResult};
use crate::function::{FunctionDescriptor, ReplicaStatus};
use crate::source::MetricSource;
use crate::types::{FunctionName, InactivityWindow};

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Keep,
    ScaleToZero,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Keep => "keep",
            Decision::ScaleToZero => "scale_to_zero",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// No replica available, nothing to scale.
    NoReplicas,
    /// No trustworthy previous value in the touch cache.
    FirstSighting,
    /// The counter moved during the inactivity window.
    Activity,
    /// The counter went backwards: the metric source restarted.
    CounterReset,
    /// Idle during the window, but invoked since the previous round.
    Stale,
    /// Idle for the window and since the previous round.
    Idle,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::NoReplicas => "no_replicas",
            Reason::FirstSighting => "first_sighting",
            Reason::Activity => "activity",
            Reason::CounterReset => "counter_reset",
            Reason::Stale => "stale",
            Reason::Idle => "idle",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating one function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub decision: Decision,
    pub reason: Reason,
    /// Entry the caller must store in the touch cache.
    pub touch: TouchEntry,
    /// First sample. `None` when the window was skipped.
    pub before: Option<f64>,
    /// Last sample.
    pub after: f64,
}

/// Pure decision table over two samples and the cached value.
pub fn decide(before: f64, after: f64, cached: TouchEntry) -> (Decision, Reason, TouchEntry) {
    let regressed = after < before || cached.value().is_some_and(|value| before < value);
    if regressed {
        return (Decision::Keep, Reason::CounterReset, TouchEntry::Unknown);
    }

    let touch = TouchEntry::Seen(after);

    if after != before {
        return (Decision::Keep, Reason::Activity, touch);
    }

    match cached {
        TouchEntry::Unknown => (Decision::Keep, Reason::FirstSighting, touch),
        TouchEntry::Seen(value) if value == after => (Decision::ScaleToZero, Reason::Idle, touch),
        TouchEntry::Seen(_) => (Decision::Keep, Reason::Stale, touch),
    }
}

/// Runs the two-sample protocol for one function at a time.
#[derive(Debug, Clone, Copy)]
pub struct IdleDecisionEngine {
    window: InactivityWindow,
}

impl IdleDecisionEngine {
    pub fn new(window: InactivityWindow) -> Self {
        Self { window }
    }

    /// Evaluate one labeled function.
    ///
    /// Suspends for the full inactivity window between the two samples
    /// unless the function has no available replica. Any collaborator error
    /// is returned unchanged; the caller keeps the function and leaves the
    /// cache untouched.
    pub async fn evaluate(
        &self,
        function: &FunctionDescriptor,
        cached: TouchEntry,
        source: &dyn MetricSource,
        replicas: ReplicaStatus,
    ) -> IdlerResult<Evaluation> {
        let name = &function.name;

        if !replicas.is_running() {
            let current = sample(source, name).await?;
            let touch = match cached.value() {
                Some(value) if current < value => TouchEntry::Unknown,
                _ => TouchEntry::Seen(current),
            };
            debug!(function = %name, counter = current, "No available replicas, keeping");
            return Ok(Evaluation {
                decision: Decision::Keep,
                reason: Reason::NoReplicas,
                touch,
                before: None,
                after: current,
            });
        }

        let before = sample(source, name).await?;
        debug!(
            function = %name,
            before,
            window = %self.window,
            "Waiting for inactivity window"
        );

        tokio::time::sleep(self.window.duration()).await;

        let after = sample(source, name).await?;
        let (decision, reason, touch) = decide(before, after, cached);

        debug!(
            function = %name,
            before,
            after,
            cached = %cached,
            decision = %decision,
            reason = %reason,
            "Evaluated function"
        );

        Ok(Evaluation {
            decision,
            reason,
            touch,
            before: Some(before),
            after,
        })
    }
}

/// Read the counter, rejecting values a cumulative counter cannot take.
async fn sample(source: &dyn MetricSource, name: &FunctionName) -> IdlerResult<f64> {
    let value = source.read_counter(name).await?;
    if !value.is_finite() || value < 0.0 {
        return Err(IdlerError::MalformedCounter {
            function: name.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}
