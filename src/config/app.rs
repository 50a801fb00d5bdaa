//! Dispatch configuration: flags plus lifecycle hooks.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::config::schema::AppSettings;
use crate::error::{Error, HttpError};
use crate::event::Event;
use crate::handler::Reply;
use crate::http::Response;

/// Runs once per request before dispatch. An error skips dispatch.
pub type OnRequest =
    Arc<dyn for<'a> Fn(&'a mut Event) -> BoxFuture<'a, Result<(), Error>> + Send + Sync>;

/// Runs once per request after normalization; `Some` replaces the response.
pub type OnResponse = Arc<
    dyn for<'a> Fn(&'a Response, &'a mut Event) -> BoxFuture<'a, Option<Response>> + Send + Sync,
>;

/// Runs at most once per request for an error; `Some` replaces the error value.
pub type OnError = Arc<
    dyn for<'a> Fn(&'a HttpError, &'a mut Event) -> BoxFuture<'a, Result<Option<Reply>, Error>>
        + Send
        + Sync,
>;

/// Immutable App configuration.
#[derive(Clone, Default)]
pub struct AppConfig {
    debug: bool,
    silent: bool,
    on_request: Option<OnRequest>,
    on_response: Option<OnResponse>,
    on_error: Option<OnError>,
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::builder()
            .debug(settings.debug)
            .silent(settings.silent)
            .build()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn silent(&self) -> bool {
        self.silent
    }

    pub fn on_request(&self) -> Option<&OnRequest> {
        self.on_request.as_ref()
    }

    pub fn on_response(&self) -> Option<&OnResponse> {
        self.on_response.as_ref()
    }

    pub fn on_error(&self) -> Option<&OnError> {
        self.on_error.as_ref()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("debug", &self.debug)
            .field("silent", &self.silent)
            .field("on_request", &self.on_request.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.config.silent = silent;
        self
    }

    pub fn on_request<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut Event) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        self.config.on_request = Some(Arc::new(hook));
        self
    }

    pub fn on_response<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a Response, &'a mut Event) -> BoxFuture<'a, Option<Response>>
            + Send
            + Sync
            + 'static,
    {
        self.config.on_response = Some(Arc::new(hook));
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a HttpError, &'a mut Event) -> BoxFuture<'a, Result<Option<Reply>, Error>>
            + Send
            + Sync
            + 'static,
    {
        self.config.on_error = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let config = AppConfig::from_settings(&AppSettings {
            debug: true,
            silent: false,
        });
        assert!(config.debug());
        assert!(!config.silent());
        assert!(config.on_error().is_none());
    }

    #[test]
    fn test_builder_hooks() {
        let config = AppConfig::builder()
            .silent(true)
            .on_request(|_event| Box::pin(async { Ok(()) }))
            .build();
        assert!(config.silent());
        assert!(config.on_request().is_some());
        assert!(config.on_response().is_none());
    }
}
