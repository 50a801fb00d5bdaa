//! Nested apps used as route handlers.

use crate::app::App;
use crate::handler::HandlerKind;

/// Serve `app` below `base`: the pathname seen inside `app` has `base` stripped.
///
/// Register it on a catch-all route, e.g. `app.all("/api/**", with_base("/api", api))`.
/// [`App::resolve`] follows it into `app`'s routes.
pub fn with_base(base: &str, app: App) -> HandlerKind {
    HandlerKind::sub_app(base, app)
}
