//! Route table storage and lookup.
//!
//! # Responsibilities
//! - Store `(method, pattern) -> data` entries in registration order
//! - `find`: best match for a request (most specific pattern wins)
//! - `find_all`: every match, in registration order
//!
//! # Design Decisions
//! - Populated during the build phase, read-only while serving (no locks)
//! - Patterns compiled once at insertion
//! - Explicit `None` on no match rather than a silent default

use std::fmt;
use std::str::FromStr;

use axum::http::Method;

use super::pattern::{Params, Pattern, PatternError};

/// Which request methods an entry accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MethodMatch {
    /// Empty method: every method matches.
    #[default]
    Any,
    Exact(Method),
}

impl MethodMatch {
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodMatch::Any => true,
            MethodMatch::Exact(expected) => expected == method,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, MethodMatch::Any)
    }
}

impl From<Method> for MethodMatch {
    fn from(method: Method) -> Self {
        MethodMatch::Exact(method)
    }
}

impl From<Option<Method>> for MethodMatch {
    fn from(method: Option<Method>) -> Self {
        method.map_or(MethodMatch::Any, MethodMatch::Exact)
    }
}

impl FromStr for MethodMatch {
    type Err = axum::http::method::InvalidMethod;

    /// Parses a method name case-insensitively; the empty string means any method.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(MethodMatch::Any);
        }
        Method::from_bytes(s.to_ascii_uppercase().as_bytes()).map(MethodMatch::Exact)
    }
}

impl fmt::Display for MethodMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodMatch::Any => f.write_str("*"),
            MethodMatch::Exact(method) => write!(f, "{method}"),
        }
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    pub data: &'a T,
    pub params: Params,
}

struct Entry<T> {
    method: MethodMatch,
    pattern: Pattern,
    data: T,
}

/// Method + pattern keyed route storage.
pub struct RouteTable<T> {
    entries: Vec<Entry<T>>,
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert an entry. The pattern is compiled here.
    pub fn insert(
        &mut self,
        method: MethodMatch,
        pattern: &str,
        data: T,
    ) -> Result<(), PatternError> {
        let pattern = Pattern::parse(pattern)?;
        self.entries.push(Entry {
            method,
            pattern,
            data,
        });
        Ok(())
    }

    /// Find the most specific entry matching the request.
    ///
    /// Ties are broken by preferring a method-specific entry over an
    /// any-method entry, then by registration order.
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.method.matches(method))
            .filter_map(|(index, entry)| {
                entry
                    .pattern
                    .matches(path)
                    .map(|params| ((entry.pattern.rank(), entry.method.is_any(), index), entry, params))
            })
            .min_by(|(a, _, _), (b, _, _)| a.cmp(b))
            .map(|(_, entry, params)| RouteMatch {
                data: &entry.data,
                params,
            })
    }

    /// Find every entry matching the request, in registration order.
    pub fn find_all(&self, method: &Method, path: &str) -> Vec<RouteMatch<'_, T>> {
        self.entries
            .iter()
            .filter(|entry| entry.method.matches(method))
            .filter_map(|entry| {
                entry.pattern.matches(path).map(|params| RouteMatch {
                    data: &entry.data,
                    params,
                })
            })
            .collect()
    }

    /// Iterate over entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&MethodMatch, &Pattern, &T)> {
        self.entries
            .iter()
            .map(|entry| (&entry.method, &entry.pattern, &entry.data))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for RouteTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|entry| format!("{} {}", entry.method, entry.pattern)),
            )
            .finish()
    }
}
