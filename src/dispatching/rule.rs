//! Closure-backed rules.

use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;

use super::types::Rule;

type Condition<S, E> = Box<dyn Fn(&S) -> Result<bool, E> + Send + Sync>;
type Action<S, R, E> = Box<dyn Fn(&S) -> Result<R, E> + Send + Sync>;

/// A rule built from a condition closure and an action closure.
///
/// The variants differ only in which closures they store:
///
/// - [`FnRule::new`] / [`FnRule::try_new`]: caller-provided condition and action
/// - [`FnRule::no_action`]: caller condition, action yields `R::default()`
/// - [`FnRule::otherwise`]: condition always holds, caller action
///
/// # Examples
///
/// ```
/// use u_rules::{FnRule, RuleEngine};
///
/// let engine = RuleEngine::<i32, &str>::new()
///     .with_rule(FnRule::new(|x: &i32| x % 2 == 0, |_: &i32| "even"))
///     .with_rule(FnRule::otherwise(|_: &i32| "odd"));
///
/// assert_eq!(engine.first_match(&4), Ok(Some("even")));
/// assert_eq!(engine.first_match(&3), Ok(Some("odd")));
/// ```
pub struct FnRule<S: ?Sized, R, E = Infallible> {
    name: Cow<'static, str>,
    condition: Condition<S, E>,
    action: Action<S, R, E>,
}

impl<S: ?Sized, R, E> FnRule<S, R, E> {
    /// Creates a rule from infallible condition and action closures.
    pub fn new<C, A>(condition: C, action: A) -> Self
    where
        C: Fn(&S) -> bool + Send + Sync + 'static,
        A: Fn(&S) -> R + Send + Sync + 'static,
    {
        Self::try_new(move |s: &S| Ok(condition(s)), move |s: &S| Ok(action(s)))
    }

    /// Creates a rule from fallible condition and action closures.
    pub fn try_new<C, A>(condition: C, action: A) -> Self
    where
        C: Fn(&S) -> Result<bool, E> + Send + Sync + 'static,
        A: Fn(&S) -> Result<R, E> + Send + Sync + 'static,
    {
        Self {
            name: Cow::Borrowed("rule"),
            condition: Box::new(condition),
            action: Box::new(action),
        }
    }

    /// Creates a catch-all rule whose condition holds for every state.
    ///
    /// Meant to be placed last as the default branch.
    pub fn otherwise<A>(action: A) -> Self
    where
        A: Fn(&S) -> R + Send + Sync + 'static,
    {
        Self::try_otherwise(move |s: &S| Ok(action(s)))
    }

    /// Fallible form of [`FnRule::otherwise`].
    pub fn try_otherwise<A>(action: A) -> Self
    where
        A: Fn(&S) -> Result<R, E> + Send + Sync + 'static,
    {
        Self::try_new(|_: &S| Ok(true), action).with_name("otherwise")
    }

    /// Sets the name reported in logs and [`RuleEngine::rule_names`].
    ///
    /// [`RuleEngine::rule_names`]: super::RuleEngine::rule_names
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }
}

impl<S: ?Sized, R: Default, E> FnRule<S, R, E> {
    /// Creates a rule whose action produces the empty result `R::default()`.
    ///
    /// A matching no-action rule still counts as a match: it is returned by
    /// `first_match` and contributes its empty result to `all_matches`.
    /// With `R = Option<T>` the empty result is `None`, which stays
    /// distinguishable from "no rule matched" (`Ok(None)` vs `Ok(Some(None))`).
    pub fn no_action<C>(condition: C) -> Self
    where
        C: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Self::try_new(move |s: &S| Ok(condition(s)), |_: &S| Ok(R::default()))
            .with_name("no_action")
    }
}

impl<S: ?Sized, R, E> Rule<S, R, E> for FnRule<S, R, E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, state: &S) -> Result<bool, E> {
        (self.condition)(state)
    }

    fn apply(&self, state: &S) -> Result<R, E> {
        (self.action)(state)
    }
}

impl<S: ?Sized, R, E> fmt::Debug for FnRule<S, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
