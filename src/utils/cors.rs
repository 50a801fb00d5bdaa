//! Cross-origin resource sharing.
//!
//! # Responsibilities
//! - Recognize preflight requests and answer them with an empty response
//! - Append `Access-Control-*` headers to the response shell
//! - Check a request origin against the configured rules

use std::fmt;
use std::sync::Arc;

use axum::http::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
    ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN,
    VARY,
};
use axum::http::Method;
use futures_util::future::BoxFuture;
use regex::Regex;

use crate::event::Event;
use crate::handler::{Middleware, Next, Outcome, Reply};

use super::response::no_content;

/// Which origins may read the response.
#[derive(Clone, Default)]
pub enum AllowOrigin {
    /// `*`
    #[default]
    Any,
    /// The literal `null` origin.
    Null,
    List(Vec<OriginRule>),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl AllowOrigin {
    pub fn exact<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowOrigin::List(origins.into_iter().map(|o| OriginRule::Exact(o.into())).collect())
    }

    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        AllowOrigin::Predicate(Arc::new(f))
    }
}

impl fmt::Debug for AllowOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowOrigin::Any => f.write_str("Any"),
            AllowOrigin::Null => f.write_str("Null"),
            AllowOrigin::List(rules) => f.debug_tuple("List").field(rules).finish(),
            AllowOrigin::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum OriginRule {
    Exact(String),
    Pattern(Regex),
}

impl OriginRule {
    fn matches(&self, origin: &str) -> bool {
        match self {
            OriginRule::Exact(expected) => expected == origin,
            OriginRule::Pattern(pattern) => pattern.is_match(origin),
        }
    }
}

/// `*` or an explicit list of names.
#[derive(Debug, Clone, Default)]
pub enum AllowList {
    #[default]
    Any,
    List(Vec<String>),
}

impl AllowList {
    pub fn of<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowList::List(items.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone)]
pub struct CorsOptions {
    pub origin: AllowOrigin,
    pub methods: AllowList,
    /// `Any` or an empty list echoes `Access-Control-Request-Headers`.
    pub allow_headers: AllowList,
    pub expose_headers: AllowList,
    pub credentials: bool,
    /// Seconds.
    pub max_age: Option<u64>,
    pub preflight_status: u16,
}

impl Default for CorsOptions {
    fn default() -> Self {
        Self {
            origin: AllowOrigin::Any,
            methods: AllowList::Any,
            allow_headers: AllowList::Any,
            expose_headers: AllowList::Any,
            credentials: false,
            max_age: None,
            preflight_status: 204,
        }
    }
}

/// `OPTIONS` carrying both `Origin` and `Access-Control-Request-Method`.
pub fn is_preflight_request(event: &Event) -> bool {
    let headers = event.headers();
    *event.method() == Method::OPTIONS
        && headers.contains_key(ORIGIN)
        && headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD)
}

/// Returns true if `origin` passes the configured rules. A missing origin never does.
pub fn is_cors_origin_allowed(origin: Option<&str>, options: &CorsOptions) -> bool {
    let Some(origin) = origin.filter(|o| !o.is_empty()) else {
        return false;
    };
    match &options.origin {
        AllowOrigin::Any => true,
        AllowOrigin::Null => origin == "null",
        AllowOrigin::List(rules) => rules.iter().any(|rule| rule.matches(origin)),
        AllowOrigin::Predicate(allow) => allow(origin),
    }
}

/// Headers for a simple (non-preflight) cross-origin request.
pub fn append_cors_headers(event: &mut Event, options: &CorsOptions) {
    let mut headers = origin_headers(event, options);
    headers.extend(credentials_header(options));
    if let Some(value) = list_value(&options.expose_headers) {
        headers.push((ACCESS_CONTROL_EXPOSE_HEADERS, value));
    }
    append_all(event, headers);
}

/// Headers answering a preflight request.
pub fn append_cors_preflight_headers(event: &mut Event, options: &CorsOptions) {
    let mut headers = origin_headers(event, options);
    headers.extend(credentials_header(options));
    if let Some(value) = list_value(&options.methods) {
        headers.push((ACCESS_CONTROL_ALLOW_METHODS, value));
    }
    headers.extend(allow_headers(event, options));
    if let Some(max_age) = options.max_age {
        headers.push((ACCESS_CONTROL_MAX_AGE, max_age.to_string()));
    }
    append_all(event, headers);
}

/// Answer a preflight with an empty response, or decorate any other request
/// and return `None` so the caller carries on.
pub fn handle_cors(event: &mut Event, options: &CorsOptions) -> Option<Reply> {
    if is_preflight_request(event) {
        append_cors_preflight_headers(event, options);
        return Some(no_content(Some(options.preflight_status)));
    }
    append_cors_headers(event, options);
    None
}

/// Middleware form of [`handle_cors`].
pub fn cors(options: CorsOptions) -> impl Middleware {
    Cors { options }
}

struct Cors {
    options: CorsOptions,
}

impl Middleware for Cors {
    fn call<'a>(&'a self, event: &'a mut Event, _next: Next<'a>) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            match handle_cors(event, &self.options) {
                Some(reply) => {
                    tracing::debug!(path = %event.pathname(), "Answered CORS preflight");
                    Ok(reply)
                }
                None => Ok(Reply::Continue),
            }
        })
    }
}

fn origin_headers(event: &Event, options: &CorsOptions) -> Vec<(HeaderName, String)> {
    let vary = (VARY, "origin".to_string());
    match &options.origin {
        AllowOrigin::Any => vec![(ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_string())],
        AllowOrigin::Null => vec![(ACCESS_CONTROL_ALLOW_ORIGIN, "null".to_string()), vary],
        _ => {
            let origin = event.headers().get(ORIGIN).and_then(|v| v.to_str().ok());
            match origin {
                Some(origin) if is_cors_origin_allowed(Some(origin), options) => {
                    vec![(ACCESS_CONTROL_ALLOW_ORIGIN, origin.to_string()), vary]
                }
                _ => Vec::new(),
            }
        }
    }
}

fn credentials_header(options: &CorsOptions) -> Option<(HeaderName, String)> {
    options
        .credentials
        .then(|| (ACCESS_CONTROL_ALLOW_CREDENTIALS, "true".to_string()))
}

fn allow_headers(event: &Event, options: &CorsOptions) -> Vec<(HeaderName, String)> {
    let vary = (VARY, ACCESS_CONTROL_REQUEST_HEADERS.as_str().to_string());
    match &options.allow_headers {
        AllowList::List(names) if !names.is_empty() => {
            vec![(ACCESS_CONTROL_ALLOW_HEADERS, names.join(",")), vary]
        }
        _ => event
            .headers()
            .get(ACCESS_CONTROL_REQUEST_HEADERS)
            .and_then(|v| v.to_str().ok())
            .map(|requested| vec![(ACCESS_CONTROL_ALLOW_HEADERS, requested.to_string()), vary])
            .unwrap_or_default(),
    }
}

/// `None` for an empty list.
fn list_value(list: &AllowList) -> Option<String> {
    match list {
        AllowList::Any => Some("*".to_string()),
        AllowList::List(names) if names.is_empty() => None,
        AllowList::List(names) => Some(names.join(",")),
    }
}

fn append_all(event: &mut Event, headers: Vec<(HeaderName, String)>) {
    for (name, value) in headers {
        match HeaderValue::from_str(&value) {
            Ok(value) => event.res_mut().append_header(name, value),
            Err(_) => tracing::warn!(header = %name, "Skipping invalid CORS header value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Request;

    fn event(method: Method, headers: &[(&'static str, &'static str)]) -> Event {
        let mut request = Request::new(method, "/").unwrap();
        for (name, value) in headers {
            request = request.with_header(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        Event::new(request)
    }

    fn written(event: &Event, name: HeaderName) -> Vec<String> {
        event
            .res()
            .and_then(|res| res.headers())
            .map(|headers| {
                headers
                    .get_all(name)
                    .iter()
                    .map(|v| v.to_str().unwrap().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_preflight_detection() {
        let preflight = event(
            Method::OPTIONS,
            &[("origin", "https://a.test"), ("access-control-request-method", "PUT")],
        );
        assert!(is_preflight_request(&preflight));

        let no_method = event(Method::OPTIONS, &[("origin", "https://a.test")]);
        assert!(!is_preflight_request(&no_method));

        let get = event(
            Method::GET,
            &[("origin", "https://a.test"), ("access-control-request-method", "PUT")],
        );
        assert!(!is_preflight_request(&get));
    }

    #[test]
    fn test_origin_rules() {
        let options = CorsOptions {
            origin: AllowOrigin::List(vec![
                OriginRule::Exact("https://a.test".into()),
                OriginRule::Pattern(Regex::new(r"^https://.*\.b\.test$").unwrap()),
            ]),
            ..CorsOptions::default()
        };
        assert!(is_cors_origin_allowed(Some("https://a.test"), &options));
        assert!(is_cors_origin_allowed(Some("https://x.b.test"), &options));
        assert!(!is_cors_origin_allowed(Some("https://evil.test"), &options));
        assert!(!is_cors_origin_allowed(None, &options));

        let predicate = CorsOptions {
            origin: AllowOrigin::predicate(|origin| origin.ends_with(".local")),
            ..CorsOptions::default()
        };
        assert!(is_cors_origin_allowed(Some("http://dev.local"), &predicate));
    }

    #[test]
    fn test_allowed_origin_is_echoed_with_vary() {
        let options = CorsOptions {
            origin: AllowOrigin::exact(["https://a.test"]),
            credentials: true,
            expose_headers: AllowList::of(["x-total"]),
            ..CorsOptions::default()
        };

        let mut allowed = event(Method::GET, &[("origin", "https://a.test")]);
        assert!(handle_cors(&mut allowed, &options).is_none());
        assert_eq!(written(&allowed, ACCESS_CONTROL_ALLOW_ORIGIN), vec!["https://a.test"]);
        assert_eq!(written(&allowed, VARY), vec!["origin"]);
        assert_eq!(written(&allowed, ACCESS_CONTROL_ALLOW_CREDENTIALS), vec!["true"]);
        assert_eq!(written(&allowed, ACCESS_CONTROL_EXPOSE_HEADERS), vec!["x-total"]);

        let mut denied = event(Method::GET, &[("origin", "https://evil.test")]);
        handle_cors(&mut denied, &options);
        assert!(written(&denied, ACCESS_CONTROL_ALLOW_ORIGIN).is_empty());
    }

    #[test]
    fn test_preflight_echoes_requested_headers() {
        let options = CorsOptions {
            methods: AllowList::of(["GET", "PUT"]),
            max_age: Some(600),
            ..CorsOptions::default()
        };
        let mut preflight = event(
            Method::OPTIONS,
            &[
                ("origin", "https://a.test"),
                ("access-control-request-method", "PUT"),
                ("access-control-request-headers", "x-token"),
            ],
        );

        assert!(matches!(handle_cors(&mut preflight, &options), Some(Reply::Response(_))));
        assert_eq!(written(&preflight, ACCESS_CONTROL_ALLOW_ORIGIN), vec!["*"]);
        assert_eq!(written(&preflight, ACCESS_CONTROL_ALLOW_METHODS), vec!["GET,PUT"]);
        assert_eq!(written(&preflight, ACCESS_CONTROL_ALLOW_HEADERS), vec!["x-token"]);
        assert_eq!(written(&preflight, ACCESS_CONTROL_MAX_AGE), vec!["600"]);
        assert_eq!(written(&preflight, VARY), vec!["access-control-request-headers"]);
    }
}
