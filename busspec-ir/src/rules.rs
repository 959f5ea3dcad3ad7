//! Validation rules attached to a [`Unique`](crate::unique::Unique) collection.
//!
//! A rule pairs a [`Hook`] with a [`Validator`]. Pre-hooks run before the
//! collection is touched and veto the mutation on failure; post-hooks run after
//! it, and a failing post-hook rolls the mutation back.

use crate::error::SpecError;
use std::sync::Arc;

/// The point in a mutation at which a rule runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    PreAdd,
    PostAdd,
    PreRemove,
    PostRemove,
}

impl std::fmt::Display for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Hook::PreAdd => "pre-add",
            Hook::PostAdd => "post-add",
            Hook::PreRemove => "pre-remove",
            Hook::PostRemove => "post-remove",
        };
        f.write_str(s)
    }
}

/// A named check over a candidate element and the owner's context.
pub trait Validator<T, C>: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the reason for rejection on failure.
    fn validate(&self, candidate: &T, context: &C) -> Result<(), String>;
}

/// Adapts a closure into a [`Validator`].
pub struct FnValidator<F> {
    name: String,
    check: F,
}

/// Build a validator from a name and a closure.
pub fn rule<F>(name: impl Into<String>, check: F) -> FnValidator<F> {
    FnValidator {
        name: name.into(),
        check,
    }
}

impl<T, C, F> Validator<T, C> for FnValidator<F>
where
    F: Fn(&T, &C) -> Result<(), String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, candidate: &T, context: &C) -> Result<(), String> {
        (self.check)(candidate, context)
    }
}

struct Rule<T, C> {
    hook: Hook,
    validator: Arc<dyn Validator<T, C>>,
}

impl<T, C> Clone for Rule<T, C> {
    fn clone(&self) -> Self {
        Rule {
            hook: self.hook,
            validator: Arc::clone(&self.validator),
        }
    }
}

/// An ordered set of rules, inspectable by hook and name.
pub struct RuleSet<T, C = ()> {
    rules: Vec<Rule<T, C>>,
}

impl<T, C> RuleSet<T, C> {
    pub fn new() -> Self {
        RuleSet { rules: Vec::new() }
    }

    /// Attach a validator at `hook` (builder style).
    pub fn with(mut self, hook: Hook, validator: impl Validator<T, C> + 'static) -> Self {
        self.push(hook, Arc::new(validator));
        self
    }

    pub fn push(&mut self, hook: Hook, validator: Arc<dyn Validator<T, C>>) {
        self.rules.push(Rule { hook, validator });
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// `(hook, rule name)` pairs in attachment order.
    pub fn names(&self) -> Vec<(Hook, &str)> {
        self.rules
            .iter()
            .map(|r| (r.hook, r.validator.name()))
            .collect()
    }

    /// Run every rule registered for `hook`, stopping at the first failure.
    pub fn run(&self, hook: Hook, candidate: &T, context: &C) -> Result<(), SpecError> {
        for r in self.rules.iter().filter(|r| r.hook == hook) {
            r.validator
                .validate(candidate, context)
                .map_err(|reason| SpecError::RuleViolation {
                    rule: r.validator.name().to_string(),
                    reason,
                })?;
        }
        Ok(())
    }
}

impl<T, C> Default for RuleSet<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> Clone for RuleSet<T, C> {
    fn clone(&self) -> Self {
        RuleSet {
            rules: self.rules.clone(),
        }
    }
}

impl<T, C> std::fmt::Debug for RuleSet<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
