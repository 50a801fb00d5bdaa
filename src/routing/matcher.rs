//! Middleware predicates.
//!
//! # Responsibilities
//! - Match the request method (exact)
//! - Match the working pathname against a route pattern
//! - Match the working pathname against a mount base (segment-aware)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Predicates only read the event, they never mutate it
//! - Path matching is case-sensitive
//! - Empty `AndMatcher` = always matches

use std::fmt;
use std::sync::Arc;

use axum::http::Method;

use crate::event::Event;

use super::pattern::{is_under_base, Pattern};

/// Trait for deciding whether a middleware runs for an event.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Returns true if the event matches this condition.
    fn matches(&self, event: &Event) -> bool;
}

/// Matches the request method.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    method: Method,
}

impl MethodMatcher {
    pub fn new(method: Method) -> Self {
        Self { method }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, event: &Event) -> bool {
        *event.method() == self.method
    }
}

/// Matches the working pathname against a route pattern.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    pattern: Pattern,
}

impl RouteMatcher {
    pub fn new(pattern: Pattern) -> Self {
        Self { pattern }
    }
}

impl Matcher for RouteMatcher {
    fn matches(&self, event: &Event) -> bool {
        self.pattern.matches(event.pathname()).is_some()
    }
}

/// Matches pathnames at or below a base path.
#[derive(Debug, Clone)]
pub struct PrefixMatcher {
    base: String,
}

impl PrefixMatcher {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl Matcher for PrefixMatcher {
    fn matches(&self, event: &Event) -> bool {
        is_under_base(event.pathname(), &self.base)
    }
}

/// A custom predicate closure.
#[derive(Clone)]
pub struct FnMatcher {
    predicate: Arc<dyn Fn(&Event) -> bool + Send + Sync>,
}

impl FnMatcher {
    pub fn new(predicate: impl Fn(&Event) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
        }
    }
}

impl Matcher for FnMatcher {
    fn matches(&self, event: &Event) -> bool {
        (self.predicate)(event)
    }
}

impl fmt::Debug for FnMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnMatcher")
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug, Default)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    pub fn push(&mut self, matcher: Box<dyn Matcher>) {
        self.matchers.push(matcher);
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Collapse to the single inner matcher when there is only one.
    pub fn simplify(mut self) -> Option<Box<dyn Matcher>> {
        match self.matchers.len() {
            0 => None,
            1 => self.matchers.pop(),
            _ => Some(Box::new(self)),
        }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, event: &Event) -> bool {
        self.matchers.iter().all(|m| m.matches(event))
    }
}
