//! Parallel evaluation across a per-call worker pool.

use std::iter::FusedIterator;
use std::vec;

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use super::engine::RuleEngine;
use super::types::Outcome;

impl<S, R, E> RuleEngine<S, R, E>
where
    S: Sync + ?Sized,
    R: Send,
    E: Send,
{
    /// Returns the results of every matching rule, evaluating all rules
    /// concurrently.
    ///
    /// Produces the same sequence as [`RuleEngine::all_matches`]. Every rule
    /// is evaluated (condition, then action if matched) on a worker pool
    /// built for this call and torn down before returning. Results are
    /// ordered by rule position, not by completion order.
    ///
    /// If several rules fail, the error of the lowest-positioned failing
    /// rule is returned; the others are discarded.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_rules::{FnRule, RuleEngine};
    ///
    /// let engine = RuleEngine::<u64, &str>::new()
    ///     .with_rule(FnRule::new(|n: &u64| n % 3 == 0, |_: &u64| "fizz"))
    ///     .with_rule(FnRule::new(|n: &u64| n % 5 == 0, |_: &u64| "buzz"));
    ///
    /// assert_eq!(engine.all_matches_parallel(&15), Ok(vec!["fizz", "buzz"]));
    /// assert_eq!(engine.all_matches_parallel(&7), Ok(vec![]));
    /// ```
    pub fn all_matches_parallel(&self, state: &S) -> Result<Vec<R>, E> {
        self.dispatch(state, "all_matches_parallel").collect()
    }

    /// Evaluates all rules concurrently and returns an iterator over the
    /// matching results.
    ///
    /// Evaluation is complete when this returns; only filtering out
    /// non-matching rules happens on demand. The iterator is fused after
    /// an error.
    pub fn all_matches_parallel_lazy(&self, state: &S) -> ParallelMatches<'_, R, E> {
        self.dispatch(state, "all_matches_parallel_lazy")
    }

    fn dispatch(&self, state: &S, mode: &'static str) -> ParallelMatches<'_, R, E> {
        debug!(rules = self.rules.len(), mode, "dispatching rules to worker pool");
        ParallelMatches {
            outcomes: self.evaluate_in_pool(state).into_iter(),
            failed: false,
        }
    }

    /// Runs every rule on a fresh pool whose workers are joined before
    /// this returns.
    fn evaluate_in_pool(&self, state: &S) -> Vec<Evaluated<'_, R, E>> {
        let scoped = self.parallel.pool_builder().build_scoped(
            |thread| thread.run(),
            |pool| pool.install(|| self.evaluate_all(state)),
        );
        match scoped {
            Ok(outcomes) => outcomes,
            Err(err) => {
                warn!(error = %err, "failed to build worker pool, using the global pool");
                self.evaluate_all(state)
            }
        }
    }

    fn evaluate_all(&self, state: &S) -> Vec<Evaluated<'_, R, E>> {
        self.rules
            .par_iter()
            .enumerate()
            .map(|(index, rule)| Evaluated {
                index,
                rule: rule.name(),
                outcome: rule.evaluate(state),
            })
            .collect()
    }
}

/// Outcome of one rule, tagged with its position and name.
#[derive(Debug)]
struct Evaluated<'a, R, E> {
    index: usize,
    rule: &'a str,
    outcome: Result<Outcome<R>, E>,
}

/// Matching results of a parallel evaluation, in rule order.
///
/// Created by [`RuleEngine::all_matches_parallel_lazy`].
#[derive(Debug)]
pub struct ParallelMatches<'a, R, E> {
    outcomes: vec::IntoIter<Evaluated<'a, R, E>>,
    failed: bool,
}

impl<R, E> Iterator for ParallelMatches<'_, R, E> {
    type Item = Result<R, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        for Evaluated {
            index,
            rule,
            outcome,
        } in self.outcomes.by_ref()
        {
            match outcome {
                Ok(Outcome::Matched(result)) => {
                    trace!(index, rule, "rule matched");
                    return Some(Ok(result));
                }
                Ok(Outcome::NotMatched) => {}
                Err(err) => {
                    debug!(index, rule, "rule evaluation failed");
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, Some(self.outcomes.len()))
        }
    }
}

impl<R, E> FusedIterator for ParallelMatches<'_, R, E> {}
