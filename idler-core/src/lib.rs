//! Idler Core Library
//!
//! Idle-detection decision engine for scaling serverless functions to zero.
//! Provides the touch cache, the opt-in label filter, the two-sample decision
//! engine, the collaborator traits and the reconciliation scheduler.

pub mod cache;
pub mod config;
pub mod credentials;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod function;
pub mod reconcile;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use cache::{TouchCache, TouchEntry};
pub use config::{Config, ConfigLoader, ConfigOverrides, GatewayConfig, IdlerConfig, MetricsConfig};
pub use credentials::Credentials;
pub use eligibility::{EligibilityFilter, DEFAULT_SCALE_LABEL};
pub use engine::{decide, Decision, Evaluation, IdleDecisionEngine, Reason};
pub use error::{HardValidationError, IdlerError, IdlerResult};
pub use function::{FunctionDescriptor, GatewayInfo, ReplicaStatus};
pub use reconcile::{FunctionOutcome, Outcome, Reconciler, ReconcilerSettings, RoundReport};
pub use source::{GatewayClient, MetricSource};
pub use types::{FunctionName, InactivityWindow};
