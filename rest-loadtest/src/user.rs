//! The simulated REST user: build the payload, POST it, check the response.
use crate::config::Settings;
use crate::error::{RequestFailure, SchemaError, StartError};
use crate::schema::{build_request_payload, json_type, parse, RequestPayload};
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, StatusCode,
};
use serde_json::Value;
use stampede::prelude::*;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use url::Url;
use uuid::Uuid;

pub const ENDPOINT_PATH: &str = "api/v1/some_rest_api_endpoint";
pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

/// Tags of [`RestUser::test_performance_some_rest_api_endpoint`].
pub const TASK_TAGS: [&str; 2] = ["fast", "rest_api"];

const NO_JSON: &str =
    "resp.js is None, which it will be when there is a connection failure, a non-json response etc.";

#[derive(Debug, Clone)]
pub struct RestUser {
    client: Client,
    endpoint: Url,
}

impl RestUser {
    pub fn new(settings: &Settings) -> Result<Self, StartError> {
        Ok(Self {
            client: Client::builder().build()?,
            endpoint: endpoint_url(&settings.host)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Whether the task runs under the given tag filter. An empty filter selects every task.
    pub fn enabled_for(tags: &[String]) -> bool {
        tags.is_empty() || tags.iter().any(|tag| TASK_TAGS.contains(&tag.as_str()))
    }

    /// One iteration of the user.
    ///
    /// A payload that fails its schema ends the iteration before anything is sent. Everything
    /// that goes wrong after that is recorded as a failed request instead.
    pub async fn test_performance_some_rest_api_endpoint(&self) -> Result<(), SchemaError> {
        let payload = build_request_payload()?;
        if let Err(err) = self.post_endpoint(&payload).await {
            debug!("Request failed: {err}");
        }
        Ok(())
    }

    #[transaction]
    async fn post_endpoint(&self, payload: &RequestPayload) -> Result<(), RequestFailure> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(IDEMPOTENCY_KEY, Uuid::new_v4().to_string())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let js = response.json::<Value>().await.ok();

        let mut resp = RestResponse::new(status, js);
        check_resp_json(&mut resp);
        validate_response(&mut resp);
        resp.into_result()
    }
}

/// `{host}/api/v1/some_rest_api_endpoint`, keeping any path prefix of the host.
pub fn endpoint_url(host: &Url) -> Result<Url, url::ParseError> {
    let mut base = host.clone();
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    base.join(ENDPOINT_PATH)
}

/// A completed response and the failure recorded against it, if any.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: StatusCode,
    pub js: Option<Value>,
    failure: Option<String>,
}

impl RestResponse {
    /// `js` is `None` when the body was not JSON. A non-2xx status is recorded as a failure.
    pub fn new(status: StatusCode, js: Option<Value>) -> Self {
        let mut resp = Self {
            status,
            js,
            failure: None,
        };
        if !status.is_success() {
            resp.failure(format!("HTTP {status}"));
        }
        resp
    }

    /// Mark the request failed. A later failure replaces the earlier message.
    pub fn failure(&mut self, message: impl Into<String>) {
        self.failure = Some(message.into());
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn into_result(self) -> Result<(), RequestFailure> {
        match self.failure {
            Some(message) => Err(RequestFailure::Response(message)),
            None => Ok(()),
        }
    }
}

/// The body must be a non-empty JSON object without an `"error"` member.
pub fn check_resp_json(resp: &mut RestResponse) {
    if matches!(resp.js, None | Some(Value::Null)) {
        resp.failure(NO_JSON);
    }

    // A missing body also gets the type message below, which replaces the one above.
    let failure = match &resp.js {
        Some(Value::Object(map)) if map.is_empty() => Some(NO_JSON.to_string()),
        Some(Value::Object(map)) => match map.get("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(message)) => Some(message.clone()),
            Some(other) => Some(other.to_string()),
        },
        other => Some(format!(
            "Invalid 'resp.js' object type. Should be: 'object'. Received: '{}'.",
            other.as_ref().map_or("null", json_type)
        )),
    };

    if let Some(message) = failure {
        resp.failure(message);
    }
}

/// Check the body against the payload schema. Failures are recorded on the response, never raised.
pub fn validate_response(resp: &mut RestResponse) {
    let result = match &resp.js {
        Some(js) => parse::<RequestPayload>(js),
        None => parse::<RequestPayload>(&Value::Null),
    };

    if let Err(err) = result {
        warn!(kind = err.kind(), schema = err.schema(), "{err}");
        resp.failure(err.to_string());
    }
}
