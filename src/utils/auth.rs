//! HTTP Basic authentication middleware.

use std::fmt;
use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::future::BoxFuture;
use subtle::{Choice, ConstantTimeEq};

use crate::error::HttpError;
use crate::event::Event;
use crate::handler::{Middleware, Next, Outcome, Reply};

type Validator = Arc<dyn Fn(String, String) -> BoxFuture<'static, bool> + Send + Sync>;

/// Credentials checked by [`basic_auth`].
///
/// Every configured check must pass: the fixed username, the fixed password
/// and the validator.
#[derive(Clone)]
pub struct BasicAuthOptions {
    username: Option<String>,
    password: Option<String>,
    realm: String,
    validate: Option<Validator>,
}

impl BasicAuthOptions {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            realm: "auth".to_string(),
            validate: None,
        }
    }

    /// Accept any username with this password.
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            username: None,
            ..Self::new(String::new(), password)
        }
    }

    /// Decide with `validate(username, password)` alone.
    pub fn validated<F>(validate: F) -> Self
    where
        F: Fn(String, String) -> BoxFuture<'static, bool> + Send + Sync + 'static,
    {
        Self {
            username: None,
            password: None,
            realm: "auth".to_string(),
            validate: Some(Arc::new(validate)),
        }
    }

    /// Add a validator on top of the fixed credentials.
    pub fn validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(String, String) -> BoxFuture<'static, bool> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }

    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }
}

impl fmt::Debug for BasicAuthOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthOptions")
            .field("username", &self.username)
            .field("realm", &self.realm)
            .field("validate", &self.validate.is_some())
            .finish_non_exhaustive()
    }
}

/// Reject requests without matching Basic credentials with `401`.
///
/// On success the username is stored in the context under `auth.user`.
pub fn basic_auth(options: BasicAuthOptions) -> impl Middleware {
    BasicAuth { options }
}

struct BasicAuth {
    options: BasicAuthOptions,
}

impl BasicAuth {
    /// Both parts must be non-empty.
    fn credentials(event: &Event) -> Option<(String, String)> {
        let header = event.headers().get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = header.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, pass) = decoded.split_once(':')?;
        if user.is_empty() || pass.is_empty() {
            return None;
        }
        Some((user.to_string(), pass.to_string()))
    }

    async fn accepts(&self, user: &str, pass: &str) -> bool {
        let fixed = matches_fixed(self.options.username.as_deref(), user)
            & matches_fixed(self.options.password.as_deref(), pass);
        if !bool::from(fixed) {
            return false;
        }
        match &self.options.validate {
            Some(validate) => validate(user.to_string(), pass.to_string()).await,
            None => true,
        }
    }
}

/// Constant-time for equal-length inputs; an unset expectation matches anything.
fn matches_fixed(expected: Option<&str>, given: &str) -> Choice {
    match expected {
        Some(expected) => expected.as_bytes().ct_eq(given.as_bytes()),
        None => Choice::from(1),
    }
}

impl Middleware for BasicAuth {
    fn call<'a>(&'a self, event: &'a mut Event, _next: Next<'a>) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let accepted = match Self::credentials(event) {
                Some((user, pass)) => self.accepts(&user, &pass).await.then_some(user),
                None => None,
            };
            match accepted {
                Some(user) => {
                    event.context.set("auth.user", user);
                    Ok(Reply::Continue)
                }
                None => {
                    tracing::debug!(path = %event.pathname(), "Basic auth rejected");
                    Err(HttpError::authentication_required(&self.options.realm).into())
                }
            }
        })
    }
}
