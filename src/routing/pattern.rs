//! Route pattern parsing and matching.
//!
//! # Pattern Language
//! - `/users` static segment (case-sensitive)
//! - `/users/:id` named single-segment capture
//! - `/files/*` unnamed single-segment capture (`_0`, `_1`, ...)
//! - `/assets/**` greedy suffix, also matches the empty suffix (captured as `_`)
//! - `/docs/**:slug` greedy suffix captured under `slug`
//!
//! # Design Decisions
//! - Empty path segments are ignored (`/a//b/` matches `/a/b`)
//! - A greedy suffix is only allowed as the final segment
//! - No regex: matching is a single pass over the path segments

use std::collections::HashMap;
use std::fmt;

/// Parameters extracted from a matched path.
pub type Params = HashMap<String, String>;

/// Errors raised while compiling a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("wildcard `**` must be the last segment in pattern `{pattern}`")]
    WildcardNotLast { pattern: String },

    #[error("empty parameter name in pattern `{pattern}`")]
    EmptyParamName { pattern: String },
}

/// One compiled segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    Param(String),
    Wildcard(Option<String>),
}

impl Segment {
    /// Lower is more specific.
    fn specificity(&self) -> u8 {
        match self {
            Segment::Static(_) => 0,
            Segment::Param(_) => 1,
            Segment::Wildcard(_) => 2,
        }
    }
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compile a pattern string.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let parts: Vec<&str> = split_path(raw).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut unnamed = 0usize;

        for (i, part) in parts.iter().enumerate() {
            let is_last = i + 1 == parts.len();
            let wildcard = match part.strip_prefix("**") {
                Some("") => Some(None),
                Some(rest) => rest.strip_prefix(':').map(Some),
                None => None,
            };

            let segment = if let Some(name) = wildcard {
                if !is_last {
                    return Err(PatternError::WildcardNotLast {
                        pattern: raw.to_string(),
                    });
                }
                match name {
                    Some("") => {
                        return Err(PatternError::EmptyParamName {
                            pattern: raw.to_string(),
                        })
                    }
                    name => Segment::Wildcard(name.map(str::to_string)),
                }
            } else if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(PatternError::EmptyParamName {
                        pattern: raw.to_string(),
                    });
                }
                Segment::Param(name.to_string())
            } else if *part == "*" {
                let name = format!("_{unnamed}");
                unnamed += 1;
                Segment::Param(name)
            } else {
                Segment::Static((*part).to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as it was registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true if the pattern ends with a greedy suffix.
    pub fn is_catch_all(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Wildcard(_)))
    }

    /// Match a request path, returning the captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = split_path(path).collect();
        let mut params = Params::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(expected) => {
                    if parts.get(i) != Some(&expected.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(i)?;
                    params.insert(name.clone(), (*value).to_string());
                }
                Segment::Wildcard(name) => {
                    let rest = parts.get(i..).unwrap_or_default().join("/");
                    if !rest.is_empty() {
                        let key = name.clone().unwrap_or_else(|| "_".to_string());
                        params.insert(key, rest);
                    }
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Specificity key, compared lexicographically (lower wins).
    pub(crate) fn rank(&self) -> Vec<u8> {
        self.segments.iter().map(Segment::specificity).collect()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

pub(crate) fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Join a base path and a sub path (`/api` + `/ping` = `/api/ping`).
pub fn join_paths(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (base.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{path}"),
        (false, true) => ensure_leading_slash(base),
        (false, false) => format!("{}/{path}", ensure_leading_slash(base)),
    }
}

/// `base` with a single leading slash and no trailing slash. The root is empty.
pub fn normalize_base(base: &str) -> String {
    let trimmed = base.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Returns true if `path` equals `base` or lies below it.
pub fn is_under_base(path: &str, base: &str) -> bool {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return true;
    }
    match path.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Strip `base` from `path`, defaulting to `/`. Paths outside `base` are returned unchanged.
pub fn without_base(path: &str, base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() || !is_under_base(path, base) {
        return path.to_string();
    }
    let rest = &path[base.len()..];
    if rest.is_empty() {
        "/".to_string()
    } else {
        rest.to_string()
    }
}

fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
