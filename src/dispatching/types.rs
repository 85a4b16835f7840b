//! Core trait for dispatch rules.

use std::convert::Infallible;

/// The result of evaluating one rule against a state.
///
/// `NotMatched` is a distinct variant rather than a reserved value of `R`,
/// so filtering never depends on `R`'s equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome<R> {
    /// The condition held and the action produced this result.
    Matched(R),

    /// The condition did not hold; the action was not run.
    NotMatched,
}

impl<R> Outcome<R> {
    /// Returns `true` for [`Outcome::Matched`].
    pub fn is_matched(&self) -> bool {
        matches!(self, Outcome::Matched(_))
    }

    /// Converts into `Some(result)` for a match, `None` otherwise.
    pub fn into_matched(self) -> Option<R> {
        match self {
            Outcome::Matched(r) => Some(r),
            Outcome::NotMatched => None,
        }
    }
}

/// A condition/action pair evaluated against a caller-defined state.
///
/// The engine only ever hands out `&S`; rules must not rely on mutating the
/// state. Failures are reported through `E` and propagate to the caller
/// unchanged.
///
/// # Type Parameters
///
/// * `S` - The state type the rule inspects
/// * `R` - The result type produced by the action
/// * `E` - The failure type of condition and action
///
/// # Examples
///
/// ```
/// use u_rules::{Rule, RuleEngine};
///
/// struct Overheated;
///
/// impl Rule<f64, &'static str> for Overheated {
///     fn name(&self) -> &str { "overheated" }
///     fn matches(&self, celsius: &f64) -> Result<bool, std::convert::Infallible> {
///         Ok(*celsius > 90.0)
///     }
///     fn apply(&self, _celsius: &f64) -> Result<&'static str, std::convert::Infallible> {
///         Ok("shutdown")
///     }
/// }
///
/// let engine = RuleEngine::<f64, &str>::new().with_rule(Overheated);
/// assert_eq!(engine.first_match(&95.0), Ok(Some("shutdown")));
/// ```
pub trait Rule<S: ?Sized, R, E = Infallible>: Send + Sync {
    /// Returns the name of this rule.
    fn name(&self) -> &str {
        "rule"
    }

    /// Evaluates the condition.
    fn matches(&self, state: &S) -> Result<bool, E>;

    /// Runs the action. Only called after `matches` returned `Ok(true)`.
    fn apply(&self, state: &S) -> Result<R, E>;

    /// Evaluates the condition and, if it holds, the action.
    fn evaluate(&self, state: &S) -> Result<Outcome<R>, E> {
        if self.matches(state)? {
            self.apply(state).map(Outcome::Matched)
        } else {
            Ok(Outcome::NotMatched)
        }
    }
}

impl<S: ?Sized, R, E, T> Rule<S, R, E> for Box<T>
where
    T: Rule<S, R, E> + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn matches(&self, state: &S) -> Result<bool, E> {
        (**self).matches(state)
    }

    fn apply(&self, state: &S) -> Result<R, E> {
        (**self).apply(state)
    }

    fn evaluate(&self, state: &S) -> Result<Outcome<R>, E> {
        (**self).evaluate(state)
    }
}
