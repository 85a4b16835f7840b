//! Rule dispatch engine.

use std::convert::Infallible;
use std::fmt;
use std::iter::{Enumerate, FusedIterator};
use std::slice;

use tracing::{debug, trace};

use super::config::{ConfigError, ParallelConfig};
use super::types::{Outcome, Rule};

/// A type-erased rule as stored by [`RuleEngine`].
pub type BoxedRule<S, R, E = Infallible> = Box<dyn Rule<S, R, E>>;

/// Engine holding an ordered sequence of rules.
///
/// Rule order is exactly the order in which rules were added. Every
/// evaluation mode respects it: sequential modes evaluate in that order,
/// and the parallel mode reassembles results in that order.
///
/// The engine keeps no state between calls and never fails on its own
/// behalf. An empty engine is valid and simply matches nothing.
///
/// # Examples
///
/// ```
/// use u_rules::{FnRule, RuleEngine};
///
/// let engine = RuleEngine::<i32, &str>::new()
///     .with_rule(FnRule::new(|x: &i32| *x > 10, |_: &i32| "big"))
///     .with_rule(FnRule::new(|x: &i32| *x > 0, |_: &i32| "positive"))
///     .with_rule(FnRule::otherwise(|_: &i32| "other"));
///
/// assert_eq!(engine.first_match(&5), Ok(Some("positive")));
/// assert_eq!(engine.all_matches(&5), Ok(vec!["positive", "other"]));
/// ```
///
/// # Fallible rules
///
/// ```
/// use u_rules::{FnRule, RuleEngine};
///
/// let engine = RuleEngine::<str, u16, String>::new()
///     .with_rule(FnRule::try_new(
///         |s: &str| Ok(s.starts_with("port=")),
///         |s: &str| s[5..].parse::<u16>().map_err(|e| format!("bad port: {e}")),
///     ));
///
/// assert_eq!(engine.first_match("port=8080"), Ok(Some(8080)));
/// assert!(engine.first_match("port=http").is_err());
/// assert_eq!(engine.first_match("host=local"), Ok(None));
/// ```
pub struct RuleEngine<S: ?Sized, R, E = Infallible> {
    pub(super) rules: Vec<BoxedRule<S, R, E>>,
    pub(super) parallel: ParallelConfig,
}

impl<S: ?Sized, R, E> RuleEngine<S, R, E> {
    /// Creates an engine with no rules.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            parallel: ParallelConfig::default(),
        }
    }

    /// Creates an engine from an already ordered collection of rules.
    pub fn from_rules<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = BoxedRule<S, R, E>>,
    {
        Self {
            rules: rules.into_iter().collect(),
            parallel: ParallelConfig::default(),
        }
    }

    /// Appends a rule after all previously added rules.
    pub fn with_rule<T: Rule<S, R, E> + 'static>(mut self, rule: T) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Sets the worker pool configuration used by the parallel mode.
    pub fn with_parallel_config(mut self, config: ParallelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.parallel = config;
        Ok(self)
    }

    /// Returns the worker pool configuration.
    pub fn parallel_config(&self) -> &ParallelConfig {
        &self.parallel
    }

    /// Returns the number of rules in this engine.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the engine holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the names of all rules in order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Returns the result of the first rule whose condition holds.
    ///
    /// Rules are evaluated strictly in order on the calling thread. Once a
    /// condition holds, that rule's action runs and no later rule is
    /// touched. `Ok(None)` means no rule matched; a matched rule always
    /// yields `Ok(Some(_))`, even when its result is an "empty" value.
    ///
    /// The first condition or action error is returned as is.
    pub fn first_match(&self, state: &S) -> Result<Option<R>, E> {
        debug!(rules = self.rules.len(), mode = "first_match", "evaluating rules");
        self.iter_matches(state).next().transpose()
    }

    /// Returns the results of every matching rule, in rule order.
    ///
    /// Evaluation stops at the first error, which is returned as is.
    pub fn all_matches(&self, state: &S) -> Result<Vec<R>, E> {
        debug!(rules = self.rules.len(), mode = "all_matches", "evaluating rules");
        self.iter_matches(state).collect()
    }

    /// Returns an iterator evaluating rules on demand.
    ///
    /// Each `next` call evaluates conditions only up to the next match.
    /// The iterator is single-pass and fused: after yielding an error it
    /// yields nothing more.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_rules::{FnRule, RuleEngine};
    ///
    /// let engine = RuleEngine::<u32, u32>::new()
    ///     .with_rule(FnRule::new(|x: &u32| x % 2 == 0, |x: &u32| x / 2))
    ///     .with_rule(FnRule::new(|x: &u32| x % 3 == 0, |x: &u32| x / 3));
    ///
    /// let mut lazy = engine.all_matches_lazy(&6);
    /// assert_eq!(lazy.next(), Some(Ok(3)));
    /// assert_eq!(lazy.next(), Some(Ok(2)));
    /// assert_eq!(lazy.next(), None);
    /// ```
    pub fn all_matches_lazy<'a>(&'a self, state: &'a S) -> Matches<'a, S, R, E> {
        debug!(rules = self.rules.len(), mode = "all_matches_lazy", "evaluating rules");
        self.iter_matches(state)
    }

    fn iter_matches<'a>(&'a self, state: &'a S) -> Matches<'a, S, R, E> {
        Matches {
            rules: self.rules.iter().enumerate(),
            state,
            failed: false,
        }
    }
}

impl<S: ?Sized, R, E> Default for RuleEngine<S, R, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ?Sized, R, E> fmt::Debug for RuleEngine<S, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rule_names())
            .field("parallel", &self.parallel)
            .finish()
    }
}

/// Lazy sequence of matching rule results, in rule order.
///
/// Created by [`RuleEngine::all_matches_lazy`].
pub struct Matches<'a, S: ?Sized, R, E> {
    rules: Enumerate<slice::Iter<'a, BoxedRule<S, R, E>>>,
    state: &'a S,
    failed: bool,
}

impl<S: ?Sized, R, E> Iterator for Matches<'_, S, R, E> {
    type Item = Result<R, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        for (index, rule) in self.rules.by_ref() {
            match rule.evaluate(self.state) {
                Ok(Outcome::Matched(result)) => {
                    trace!(index, rule = rule.name(), "rule matched");
                    return Some(Ok(result));
                }
                Ok(Outcome::NotMatched) => {}
                Err(err) => {
                    debug!(index, rule = rule.name(), "rule evaluation failed");
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
            (0, Some(self.rules.len()))
        }
    }
}

impl<S: ?Sized, R, E> FusedIterator for Matches<'_, S, R, E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatching::FnRule;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn is_even(x: &i64) -> bool {
        x % 2 == 0
    }

    fn is_odd(x: &i64) -> bool {
        x % 2 != 0
    }

    fn parity_engine() -> RuleEngine<i64, &'static str> {
        RuleEngine::new()
            .with_rule(FnRule::new(is_even, |_: &i64| "even"))
            .with_rule(FnRule::new(is_odd, |_: &i64| "odd"))
    }

    fn magnitude_engine() -> RuleEngine<i64, &'static str> {
        RuleEngine::new()
            .with_rule(FnRule::new(|x: &i64| *x > 10, |_: &i64| "big"))
            .with_rule(FnRule::new(|x: &i64| *x > 0, |_: &i64| "positive"))
            .with_rule(FnRule::otherwise(|_: &i64| "other"))
    }

    /// A rule that counts how often its condition and action run.
    fn counting_rule(
        matches: bool,
        conditions: &Arc<AtomicUsize>,
        actions: &Arc<AtomicUsize>,
        result: &'static str,
    ) -> FnRule<i64, &'static str> {
        let conditions = Arc::clone(conditions);
        let actions = Arc::clone(actions);
        FnRule::new(
            move |_: &i64| {
                conditions.fetch_add(1, Ordering::SeqCst);
                matches
            },
            move |_: &i64| {
                actions.fetch_add(1, Ordering::SeqCst);
                result
            },
        )
    }

    #[test]
    fn test_first_match_parity() {
        let engine = parity_engine();
        assert_eq!(engine.first_match(&4), Ok(Some("even")));
        assert_eq!(engine.first_match(&3), Ok(Some("odd")));
    }

    #[test]
    fn test_first_match_in_declaration_order() {
        assert_eq!(magnitude_engine().first_match(&5), Ok(Some("positive")));
        assert_eq!(magnitude_engine().first_match(&50), Ok(Some("big")));
        assert_eq!(magnitude_engine().first_match(&-5), Ok(Some("other")));
    }

    #[test]
    fn test_all_matches_preserves_order() {
        let engine = magnitude_engine();
        assert_eq!(engine.all_matches(&5), Ok(vec!["positive", "other"]));
        assert_eq!(engine.all_matches(&50), Ok(vec!["big", "positive", "other"]));
        assert_eq!(engine.all_matches(&0), Ok(vec!["other"]));
    }

    #[test]
    fn test_lazy_equals_eager() {
        let engine = magnitude_engine();
        for x in [-20, 0, 5, 11, 100] {
            let lazy: Result<Vec<_>, _> = engine.all_matches_lazy(&x).collect();
            assert_eq!(lazy, engine.all_matches(&x));
        }
    }

    #[test]
    fn test_empty_engine() {
        let engine = RuleEngine::<i64, &str>::new();
        assert!(engine.is_empty());
        assert_eq!(engine.first_match(&1), Ok(None));
        assert_eq!(engine.all_matches(&1), Ok(vec![]));
        assert_eq!(engine.all_matches_lazy(&1).next(), None);
    }

    #[test]
    fn test_no_match_returns_none() {
        let engine = RuleEngine::<i64, &str>::new()
            .with_rule(FnRule::new(|x: &i64| *x > 100, |_: &i64| "huge"));
        assert_eq!(engine.first_match(&1), Ok(None));
        assert_eq!(engine.all_matches(&1), Ok(vec![]));
    }

    #[test]
    fn test_first_match_short_circuits() {
        let conditions = Arc::new(AtomicUsize::new(0));
        let actions = Arc::new(AtomicUsize::new(0));
        let later_conditions = Arc::new(AtomicUsize::new(0));
        let later_actions = Arc::new(AtomicUsize::new(0));

        let engine = RuleEngine::new()
            .with_rule(counting_rule(false, &conditions, &actions, "skipped"))
            .with_rule(counting_rule(true, &conditions, &actions, "hit"))
            .with_rule(counting_rule(true, &later_conditions, &later_actions, "later"));

        assert_eq!(engine.first_match(&0), Ok(Some("hit")));
        assert_eq!(conditions.load(Ordering::SeqCst), 2);
        assert_eq!(actions.load(Ordering::SeqCst), 1);
        assert_eq!(later_conditions.load(Ordering::SeqCst), 0);
        assert_eq!(later_actions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_lazy_evaluates_on_demand() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let unused = Arc::new(AtomicUsize::new(0));

        let engine = RuleEngine::new()
            .with_rule(counting_rule(true, &first, &unused, "a"))
            .with_rule(counting_rule(true, &second, &unused, "b"));

        let mut lazy = engine.all_matches_lazy(&0);
        assert_eq!(first.load(Ordering::SeqCst), 0);

        assert_eq!(lazy.next(), Some(Ok("a")));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        assert_eq!(lazy.next(), Some(Ok("b")));
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(lazy.next(), None);
    }

    #[test]
    fn test_first_match_propagates_action_error() {
        let later = Arc::new(AtomicUsize::new(0));
        let later_for_rule = Arc::clone(&later);

        let engine = RuleEngine::<i64, i64, String>::new()
            .with_rule(FnRule::try_new(
                |_: &i64| Ok(true),
                |x: &i64| Err(format!("action failed on {x}")),
            ))
            .with_rule(FnRule::try_new(
                move |_: &i64| {
                    later_for_rule.fetch_add(1, Ordering::SeqCst);
                    Ok(true)
                },
                |x: &i64| Ok(*x),
            ));

        assert_eq!(engine.first_match(&9), Err("action failed on 9".to_string()));
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_all_matches_propagates_condition_error() {
        let engine = RuleEngine::<i64, i64, String>::new()
            .with_rule(FnRule::new(|_: &i64| true, |x: &i64| *x))
            .with_rule(FnRule::try_new(
                |_: &i64| Err("condition failed".to_string()),
                |x: &i64| Ok(*x),
            ))
            .with_rule(FnRule::otherwise(|x: &i64| -x));

        assert_eq!(engine.all_matches(&1), Err("condition failed".to_string()));
    }

    #[test]
    fn test_lazy_fused_after_error() {
        let engine = RuleEngine::<i64, i64, String>::new()
            .with_rule(FnRule::new(|_: &i64| true, |x: &i64| *x))
            .with_rule(FnRule::try_new(
                |_: &i64| Ok(true),
                |_: &i64| Err("boom".to_string()),
            ))
            .with_rule(FnRule::otherwise(|x: &i64| -x));

        let mut lazy = engine.all_matches_lazy(&2);
        assert_eq!(lazy.next(), Some(Ok(2)));
        assert_eq!(lazy.next(), Some(Err("boom".to_string())));
        assert_eq!(lazy.next(), None);
        assert_eq!(lazy.next(), None);
    }

    #[test]
    fn test_no_action_counts_as_match() {
        let engine = RuleEngine::<i64, Option<&str>>::new()
            .with_rule(FnRule::no_action(|x: &i64| *x < 0))
            .with_rule(FnRule::otherwise(|_: &i64| Some("non-negative")));

        assert_eq!(engine.first_match(&-1), Ok(Some(None)));
        assert_eq!(engine.all_matches(&-1), Ok(vec![None, Some("non-negative")]));
        assert_eq!(engine.first_match(&1), Ok(Some(Some("non-negative"))));
    }

    #[test]
    fn test_from_rules_keeps_order() {
        let rules: Vec<BoxedRule<i64, i64>> = vec![
            Box::new(FnRule::otherwise(|_: &i64| 1)),
            Box::new(FnRule::otherwise(|_: &i64| 2)),
            Box::new(FnRule::otherwise(|_: &i64| 3)),
        ];
        let engine = RuleEngine::from_rules(rules);
        assert_eq!(engine.all_matches(&0), Ok(vec![1, 2, 3]));
    }

    #[test]
    fn test_rule_names() {
        let engine = RuleEngine::<i64, i64>::new()
            .with_rule(FnRule::new(|_: &i64| true, |x: &i64| *x).with_name("identity"))
            .with_rule(FnRule::no_action(|_: &i64| false))
            .with_rule(FnRule::otherwise(|_: &i64| 0));

        assert_eq!(engine.rule_names(), vec!["identity", "no_action", "otherwise"]);
        assert_eq!(engine.rule_count(), 3);
        assert!(format!("{engine:?}").contains("identity"));
    }

    #[test]
    fn test_state_is_shared_not_consumed() {
        let engine = RuleEngine::<Vec<i64>, usize>::new()
            .with_rule(FnRule::new(|v: &Vec<i64>| !v.is_empty(), |v: &Vec<i64>| v.len()));
        let state = vec![1, 2, 3];
        assert_eq!(engine.first_match(&state), Ok(Some(3)));
        assert_eq!(state, vec![1, 2, 3]);
    }
}
