//! Side-effect-free lookup of what would serve a request.

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::Method;
use serde_json::{Map, Value};

use crate::handler::HandlerKind;
use crate::routing::{join_paths, without_base, MethodMatch, Params};

use super::dispatcher::App;

/// Upper bound on nested sub-app hops followed by [`App::resolve`].
pub const MAX_RESOLVE_DEPTH: usize = 32;

/// The route that would serve a request, with params merged across sub-apps.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Full route pattern as seen from the outermost App.
    pub route: String,
    pub method: MethodMatch,
    pub handler: HandlerKind,
    pub params: Params,
    pub meta: Map<String, Value>,
}

impl App {
    /// Look up the handler for `method` and `path` without running anything.
    ///
    /// Sub-app handlers are followed into their own route tables. A handler
    /// already visited, or the depth limit, stops the walk.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<Resolved> {
        let found = self.routes.find(method, path)?;
        let route = Arc::clone(found.data);
        let mut resolved = Resolved {
            route: route.pattern.clone(),
            method: route.method.clone(),
            handler: route.handler.clone(),
            params: found.params,
            meta: route.meta.clone(),
        };

        let mut visited = HashSet::from([resolved.handler.identity()]);
        let mut path = path.to_string();

        for depth in 0.. {
            let HandlerKind::SubApp(mounted) = resolved.handler.clone() else {
                break;
            };
            if depth >= MAX_RESOLVE_DEPTH {
                tracing::warn!(route = %resolved.route, "Resolve depth limit reached");
                break;
            }

            let inner_path = without_base(&path, mounted.base());
            let Some(found) = mounted.app().routes.find(method, &inner_path) else {
                break;
            };
            let inner = Arc::clone(found.data);
            if !visited.insert(inner.handler.identity()) {
                break;
            }

            let outer = resolved
                .route
                .strip_suffix("/**")
                .unwrap_or(&resolved.route);
            resolved.route = join_paths(outer, &inner.pattern);
            resolved.method = inner.method.clone();
            resolved.handler = inner.handler.clone();
            resolved.params.extend(found.params);
            resolved
                .meta
                .extend(inner.meta.iter().map(|(k, v)| (k.clone(), v.clone())));
            path = inner_path;
        }

        Some(resolved)
    }
}
