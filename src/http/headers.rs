//! Header helpers shared by the event and the normalizer.

use axum::http::header::{HeaderMap, HeaderName, HeaderValue, SET_COOKIE};

/// Set a header: replaces earlier values of the same name, except
/// `set-cookie`, which always appends.
pub fn set_header(headers: &mut HeaderMap, name: HeaderName, value: HeaderValue) {
    if name == SET_COOKIE {
        headers.append(name, value);
    } else {
        headers.insert(name, value);
    }
}

/// Merge `overrides` into `target` with the same rule as [`set_header`].
///
/// A multi-valued override name replaces the target values as a group.
pub fn merge_headers(target: &mut HeaderMap, overrides: &HeaderMap) {
    for name in overrides.keys() {
        if name != SET_COOKIE {
            target.remove(name);
        }
        for value in overrides.get_all(name) {
            target.append(name.clone(), value.clone());
        }
    }
}
