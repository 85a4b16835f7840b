//! Condition/action rule dispatch.
//!
//! Provides an engine that evaluates an ordered list of rules against a
//! caller-defined state. Each rule pairs a condition with an action; the
//! action runs only when the condition holds. The engine supports:
//!
//! - **First match**: rules are evaluated in order and evaluation stops at
//!   the first rule whose condition holds.
//! - **All matches**: every rule is evaluated in order, eagerly or lazily,
//!   and the results of matching rules are returned in rule order.
//! - **Parallel all matches**: every rule is evaluated on a worker pool
//!   scoped to the call; results are still returned in rule order.
//!
//! # Design
//!
//! Rules are values implementing the [`Rule`] trait. [`FnRule`] covers the
//! common case of two closures and provides the "no action" and
//! "otherwise" variants as constructors. Whether a rule matched is carried
//! by the [`Outcome`] type, never by a reserved result value.
//!
//! Failures belong to the caller: conditions and actions return
//! `Result<_, E>` and the engine hands the first error back unchanged.

mod config;
mod engine;
mod parallel;
mod rule;
mod types;

pub use config::{ConfigError, ParallelConfig};
pub use engine::{BoxedRule, Matches, RuleEngine};
pub use parallel::ParallelMatches;
pub use rule::FnRule;
pub use types::{Outcome, Rule};
