//! Per-request context bag.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Extensions;
use serde_json::Value;

use crate::app::Route;
use crate::routing::Params;

/// State passed forward along one request's chain.
///
/// Writes by one middleware are visible to every later middleware and the
/// handler of the same request.
#[derive(Debug, Default)]
pub struct Context {
    /// Parameters captured by the matched route.
    pub params: Params,

    /// The route record that matched, if any.
    pub matched_route: Option<Arc<Route>>,

    values: HashMap<String, Value>,
    extensions: Extensions,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Typed values, keyed by type.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}
