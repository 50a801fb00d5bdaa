//! Cookie helpers over the request headers and the event response shell.

use std::collections::HashMap;

use axum::http::header::{HeaderValue, COOKIE, SET_COOKIE};
use cookie::time::{Duration, OffsetDateTime};
use cookie::Cookie;

pub use cookie::SameSite;

use crate::event::Event;

/// Attributes written with a `Set-Cookie` header.
#[derive(Debug, Clone, Default)]
pub struct CookieOptions {
    /// Defaults to `/`.
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Seconds.
    pub max_age: Option<i64>,
    pub expires: Option<OffsetDateTime>,
    pub http_only: bool,
    pub secure: bool,
    pub partitioned: bool,
    pub same_site: Option<SameSite>,
}

impl CookieOptions {
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn expires(mut self, at: OffsetDateTime) -> Self {
        self.expires = Some(at);
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn partitioned(mut self) -> Self {
        self.partitioned = true;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

/// Parse every cookie sent with the request. Values are percent-decoded
/// and the first occurrence of a name wins.
pub fn parse_cookies(event: &Event) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for header in event.headers().get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for cookie in Cookie::split_parse_encoded(header).flatten() {
            if cookie.name().is_empty() {
                continue;
            }
            cookies
                .entry(cookie.name().to_string())
                .or_insert_with(|| cookie.value().trim_matches('"').to_string());
        }
    }
    cookies
}

pub fn get_cookie(event: &Event, name: &str) -> Option<String> {
    parse_cookies(event).remove(name)
}

/// Write a `Set-Cookie` header. Name and value are percent-encoded.
///
/// An earlier cookie with the same name, domain and path is replaced;
/// cookies differing in any of those are kept alongside.
pub fn set_cookie(event: &mut Event, name: &str, value: &str, options: &CookieOptions) {
    let cookie = build(name, value, options);
    let Ok(header) = HeaderValue::from_str(&cookie.encoded().to_string()) else {
        tracing::warn!(cookie = %name, "Cookie is not a valid header value");
        return;
    };

    let key = CookieKey::of(&cookie);
    let headers = event.res_mut().headers_mut();
    let kept: Vec<HeaderValue> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter(|existing| {
            existing
                .to_str()
                .ok()
                .and_then(|existing| Cookie::parse_encoded(existing).ok())
                .map_or(true, |existing| CookieKey::of(&existing) != key)
        })
        .cloned()
        .collect();

    headers.remove(SET_COOKIE);
    for value in kept {
        headers.append(SET_COOKIE, value);
    }
    headers.append(SET_COOKIE, header);
}

/// Expire a cookie on the client.
pub fn delete_cookie(event: &mut Event, name: &str, options: &CookieOptions) {
    let options = CookieOptions {
        max_age: Some(0),
        ..options.clone()
    };
    set_cookie(event, name, "", &options);
}

fn build(name: &str, value: &str, options: &CookieOptions) -> Cookie<'static> {
    let mut builder = Cookie::build((name.to_string(), value.to_string()))
        .path(options.path.clone().unwrap_or_else(|| "/".to_string()));
    if let Some(domain) = &options.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(seconds) = options.max_age {
        builder = builder.max_age(Duration::seconds(seconds));
    }
    if let Some(at) = options.expires {
        builder = builder.expires(at);
    }
    if options.http_only {
        builder = builder.http_only(true);
    }
    if options.secure {
        builder = builder.secure(true);
    }
    if options.partitioned {
        builder = builder.partitioned(true);
    }
    if let Some(same_site) = options.same_site {
        builder = builder.same_site(same_site);
    }
    builder.build()
}

#[derive(Debug, PartialEq, Eq)]
struct CookieKey {
    name: String,
    domain: Option<String>,
    path: String,
}

impl CookieKey {
    fn of(cookie: &Cookie<'_>) -> Self {
        Self {
            name: cookie.name().to_string(),
            domain: cookie.domain().map(|d| d.to_ascii_lowercase()),
            path: cookie.path().unwrap_or("/").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Request;
    use axum::http::Method;

    fn set_cookies(event: &Event) -> Vec<String> {
        event
            .res()
            .and_then(|res| res.headers())
            .map(|headers| {
                headers
                    .get_all(SET_COOKIE)
                    .iter()
                    .map(|v| v.to_str().unwrap().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_parse_cookies() {
        let request = Request::new(Method::GET, "/")
            .unwrap()
            .with_header(COOKIE, HeaderValue::from_static("a=1; b=hello%20world; a=2"));
        let event = Event::new(request);

        let cookies = parse_cookies(&event);
        assert_eq!(cookies["a"], "1");
        assert_eq!(cookies["b"], "hello world");
        assert_eq!(get_cookie(&event, "missing"), None);
    }

    #[test]
    fn test_same_name_different_paths_are_kept() {
        let mut event = Event::new(Request::new(Method::GET, "/").unwrap());
        set_cookie(&mut event, "s", "a", &CookieOptions::default().path("/a"));
        set_cookie(&mut event, "s", "b", &CookieOptions::default().path("/b"));
        assert_eq!(set_cookies(&event), vec!["s=a; Path=/a", "s=b; Path=/b"]);
    }

    #[test]
    fn test_same_key_is_replaced() {
        let mut event = Event::new(Request::new(Method::GET, "/").unwrap());
        set_cookie(&mut event, "s", "a", &CookieOptions::default());
        set_cookie(&mut event, "s", "b", &CookieOptions::default().http_only());
        assert_eq!(set_cookies(&event), vec!["s=b; HttpOnly; Path=/"]);
    }

    #[test]
    fn test_delete_cookie() {
        let mut event = Event::new(Request::new(Method::GET, "/").unwrap());
        delete_cookie(&mut event, "s", &CookieOptions::default());
        assert_eq!(set_cookies(&event), vec!["s=; Path=/; Max-Age=0"]);
    }

    #[test]
    fn test_name_cannot_inject_attributes() {
        let mut event = Event::new(Request::new(Method::GET, "/").unwrap());
        set_cookie(&mut event, "a; Domain=evil.com", "v", &CookieOptions::default());

        let written = set_cookies(&event);
        assert_eq!(written.len(), 1);
        assert!(!written[0].contains("Domain="));
        assert!(written[0].ends_with("=v; Path=/"));
    }

    #[test]
    fn test_domain_key_is_case_insensitive() {
        let mut event = Event::new(Request::new(Method::GET, "/").unwrap());
        set_cookie(&mut event, "s", "a", &CookieOptions::default().domain("Example.com"));
        set_cookie(&mut event, "s", "b", &CookieOptions::default().domain("example.com"));
        assert_eq!(set_cookies(&event), vec!["s=b; Path=/; Domain=example.com"]);
    }

    #[test]
    fn test_secure_attributes() {
        let mut event = Event::new(Request::new(Method::GET, "/").unwrap());
        let options = CookieOptions::default()
            .secure()
            .partitioned()
            .same_site(SameSite::Strict);
        set_cookie(&mut event, "t", "1", &options);

        let written = &set_cookies(&event)[0];
        assert!(written.starts_with("t=1"));
        assert!(written.contains("SameSite=Strict"));
        assert!(written.contains("Secure"));
        assert!(written.contains("Partitioned"));
    }
}
