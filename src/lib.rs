//! Ordered condition/action rule dispatch.
//!
//! A [`RuleEngine`] holds rules in declaration order and evaluates them
//! against a caller-defined state:
//!
//! - [`RuleEngine::first_match`]: short-circuits on the first applicable rule.
//! - [`RuleEngine::all_matches`] / [`RuleEngine::all_matches_lazy`]: runs
//!   every applicable rule in order.
//! - [`RuleEngine::all_matches_parallel`] /
//!   [`RuleEngine::all_matches_parallel_lazy`]: runs every rule concurrently
//!   on a per-call worker pool, returning results in rule order.
//!
//! # Examples
//!
//! ```
//! use u_rules::{FnRule, RuleEngine};
//!
//! let engine = RuleEngine::<i64, &str>::new()
//!     .with_rule(FnRule::new(|x: &i64| x % 2 == 0, |_: &i64| "even"))
//!     .with_rule(FnRule::new(|x: &i64| x % 2 != 0, |_: &i64| "odd"));
//!
//! assert_eq!(engine.first_match(&4), Ok(Some("even")));
//! assert_eq!(engine.first_match(&3), Ok(Some("odd")));
//! ```
//!
//! # Logging
//!
//! Evaluation emits `tracing` events (`debug` per call, `trace` per match).
//! No subscriber is installed by this crate.

pub mod dispatching;

pub use dispatching::{
    BoxedRule, ConfigError, FnRule, Matches, Outcome, ParallelConfig, ParallelMatches, Rule,
    RuleEngine,
};
