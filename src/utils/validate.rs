//! Eager body validation.

use std::ops::Deref;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{Error, HttpError};
use crate::http::Request;

/// Checks a JSON body; `Err(issues)` is reported under `data.issues`.
pub type JsonValidator = Arc<dyn Fn(&Value) -> Result<(), Value> + Send + Sync>;

/// Checks a text body.
pub type TextValidator = Arc<dyn Fn(&str) -> Result<(), Value> + Send + Sync>;

/// A request whose `json()` and `text()` validate before returning.
///
/// Every other accessor is the wrapped [`Request`]'s, through `Deref`.
#[derive(Clone)]
pub struct ValidatedRequest {
    inner: Request,
    json: Option<JsonValidator>,
    text: Option<TextValidator>,
}

impl ValidatedRequest {
    pub fn new(inner: Request) -> Self {
        Self {
            inner,
            json: None,
            text: None,
        }
    }

    pub fn validate_json(
        mut self,
        validator: impl Fn(&Value) -> Result<(), Value> + Send + Sync + 'static,
    ) -> Self {
        self.json = Some(Arc::new(validator));
        self
    }

    pub fn validate_text(
        mut self,
        validator: impl Fn(&str) -> Result<(), Value> + Send + Sync + 'static,
    ) -> Self {
        self.text = Some(Arc::new(validator));
        self
    }

    /// Parse the body as JSON, validate it, then deserialize into `T`.
    ///
    /// Malformed JSON, a failed check and a shape mismatch all yield `400`.
    pub async fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let value: Value = self
            .inner
            .json()
            .await
            .map_err(|error| HttpError::validation(json!([error.to_string()])))?;
        if let Some(validator) = &self.json {
            validator(&value).map_err(HttpError::validation)?;
        }
        serde_json::from_value(value)
            .map_err(|error| HttpError::validation(json!([error.to_string()])).into())
    }

    /// Read the body as text and validate it.
    pub async fn text(&self) -> Result<String, Error> {
        let text = self
            .inner
            .text()
            .await
            .map_err(|error| HttpError::validation(json!([error.to_string()])))?;
        if let Some(validator) = &self.text {
            validator(&text).map_err(HttpError::validation)?;
        }
        Ok(text)
    }

    pub fn into_inner(self) -> Request {
        self.inner
    }
}

impl Deref for ValidatedRequest {
    type Target = Request;

    fn deref(&self) -> &Request {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Signup {
        name: String,
    }

    fn request(body: &'static str) -> ValidatedRequest {
        ValidatedRequest::new(Request::new(Method::POST, "/signup").unwrap().with_body(body))
    }

    fn require_name(value: &Value) -> Result<(), Value> {
        match value.get("name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => Ok(()),
            _ => Err(json!([{"path": "name", "message": "required"}])),
        }
    }

    #[tokio::test]
    async fn test_valid_body() {
        let signup: Signup = request(r#"{"name":"ada"}"#)
            .validate_json(require_name)
            .json()
            .await
            .unwrap();
        assert_eq!(signup.name, "ada");
    }

    #[tokio::test]
    async fn test_failed_check_is_400_with_issues() {
        let err = request(r#"{"name":""}"#)
            .validate_json(require_name)
            .json::<Signup>()
            .await
            .unwrap_err()
            .into_http();
        assert_eq!(err.status().as_u16(), 400);
        assert_eq!(err.data().unwrap()["issues"][0]["path"], "name");
    }

    #[tokio::test]
    async fn test_text_validation() {
        let req = request("").validate_text(|text| {
            if text.is_empty() {
                Err(json!(["empty"]))
            } else {
                Ok(())
            }
        });
        assert!(req.text().await.is_err());
        assert_eq!(*req.method(), Method::POST);
    }
}
