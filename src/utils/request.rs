//! Request inspection helpers.

use std::collections::HashMap;

use axum::http::header::HOST;
use axum::http::Method;

use crate::error::{Error, HttpError};
use crate::event::Event;
use crate::routing::Params;

/// Query parameters of the working URL. A repeated key keeps its last value.
pub fn get_query(event: &Event) -> HashMap<String, String> {
    event.url().query_pairs().into_owned().collect()
}

/// Every value given for `key`, in order.
pub fn get_query_all(event: &Event, key: &str) -> Vec<String> {
    event
        .url()
        .query_pairs()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .collect()
}

pub fn get_router_params(event: &Event) -> &Params {
    &event.context.params
}

pub fn get_router_param<'a>(event: &'a Event, name: &str) -> Option<&'a str> {
    event.context.param(name)
}

/// Returns true if the request method is one of `methods`.
pub fn is_method(event: &Event, methods: &[Method]) -> bool {
    methods.contains(event.method())
}

/// Fail with `405 Method Not Allowed` unless the method is one of `methods`.
pub fn assert_method(event: &Event, methods: &[Method]) -> Result<(), Error> {
    if is_method(event, methods) {
        Ok(())
    } else {
        Err(HttpError::method_not_allowed().into())
    }
}

/// The request host, from `x-forwarded-host` when `trust_forwarded` is set.
pub fn get_request_host(event: &Event, trust_forwarded: bool) -> String {
    let headers = event.headers();
    let forwarded = trust_forwarded
        .then(|| headers.get("x-forwarded-host"))
        .flatten();
    forwarded
        .or_else(|| headers.get(HOST))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| event.req().url().host_str().map(str::to_string))
        .unwrap_or_else(|| "localhost".to_string())
}

/// `http` or `https`, from `x-forwarded-proto` when `trust_forwarded` is set.
pub fn get_request_protocol(event: &Event, trust_forwarded: bool) -> String {
    if trust_forwarded {
        let forwarded = event
            .headers()
            .get("x-forwarded-proto")
            .and_then(|value| value.to_str().ok());
        if let Some(proto) = forwarded {
            return if proto == "https" { "https" } else { "http" }.to_string();
        }
    }
    event.req().url().scheme().to_string()
}
