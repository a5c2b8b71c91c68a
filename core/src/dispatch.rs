//! Request composition, envelope decoding and error translation.
//!
//! # Design
//! Like the rest of the crate, the request/response cycle is split into a
//! pure `build_request` (method + params -> `HttpRequest`) and a pure
//! `parse_response` (`HttpResponse` -> data or `ApiError`). `Dispatcher`
//! glues them to a [`Transport`] and enforces the per-call deadline. Nothing
//! is retried: one failed attempt is one reported failure.
//!
//! Etherpad wraps every answer in `{"code": 0..4, "message": "...", "data": ...}`.
//! Only `code` is inspected; `data` is handed back untouched.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{ApiError, RemoteCode};
use crate::http::{HttpRequest, HttpResponse};
use crate::methods::Method;
use crate::transport::{Transport, TransportError};

/// Query parameter carrying the API key.
pub const API_KEY_PARAM: &str = "apikey";

/// What to do when Etherpad answers with a non-zero envelope code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnRemoteError {
    /// Fail with [`ApiError::Remote`].
    #[default]
    Propagate,
    /// Resolve with the envelope's `data` (usually `null`). Useful when a
    /// remote error is an answer, e.g. probing whether a pad exists.
    SuppressToData,
}

/// Etherpad's response wrapper.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn into_result(self, on_error: OnRemoteError) -> Result<Value, ApiError> {
        let code = RemoteCode::from_code(self.code);
        if code == RemoteCode::Ok {
            return Ok(self.data);
        }
        match on_error {
            OnRemoteError::SuppressToData => Ok(self.data),
            OnRemoteError::Propagate => Err(ApiError::Remote {
                code,
                message: self.message.unwrap_or_default(),
            }),
        }
    }
}

/// Flatten call parameters into query pairs.
///
/// Accepts anything serializing to an object, or to `null` / `()` for "no
/// parameters". Strings are sent as-is, numbers and booleans as their JSON
/// text, nested values JSON-encoded; `null` fields are dropped.
pub fn encode_params<P: Serialize + ?Sized>(params: &P) -> Result<Vec<(String, String)>, ApiError> {
    let value = serde_json::to_value(params).map_err(|e| ApiError::InvalidParams(e.to_string()))?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(fields) => Ok(fields
            .into_iter()
            .filter_map(|(name, value)| query_value(value).map(|value| (name, value)))
            .collect()),
        other => Err(ApiError::InvalidParams(format!(
            "expected an object of named parameters, got `{other}`"
        ))),
    }
}

fn query_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Build the `GET {api_root}/{method}?{params}&apikey={api_key}` request.
///
/// A caller-supplied `apikey` parameter is ignored in favour of `api_key`.
pub fn build_request(
    api_root: &Url,
    api_key: &str,
    method: Method,
    params: &[(String, String)],
) -> HttpRequest {
    let mut url = api_root.clone();
    url.set_path(&format!(
        "{}/{}",
        api_root.path().trim_end_matches('/'),
        method.name()
    ));
    {
        let mut query = url.query_pairs_mut();
        for (name, value) in params.iter().filter(|(name, _)| name != API_KEY_PARAM) {
            query.append_pair(name, value);
        }
        query.append_pair(API_KEY_PARAM, api_key);
    }
    HttpRequest {
        url: url.to_string(),
        headers: vec![("accept".to_string(), "application/json".to_string())],
    }
}

/// Decode a response into the envelope's `data` or an [`ApiError`].
///
/// Any body that decodes as an envelope is treated as one, whatever the HTTP
/// status (Etherpad >= 1.8 answers `401` with a `code: 4` envelope). Other
/// non-2xx responses keep their status and body.
pub fn parse_response(response: HttpResponse, on_error: OnRemoteError) -> Result<Value, ApiError> {
    match serde_json::from_str::<Envelope>(&response.body) {
        Ok(envelope) => envelope.into_result(on_error),
        Err(err) if response.is_success() => Err(ApiError::InvalidEnvelope(err.to_string())),
        Err(_) => {
            let body = response.body.trim();
            let message = if body.is_empty() {
                reqwest::StatusCode::from_u16(response.status)
                    .ok()
                    .and_then(|status| status.canonical_reason())
                    .unwrap_or("Unknown Error")
                    .to_string()
            } else {
                body.to_string()
            };
            Err(ApiError::Http {
                status: response.status,
                message,
            })
        }
    }
}

/// Issues API calls against one versioned root.
#[derive(Clone)]
pub struct Dispatcher {
    api_root: Url,
    api_key: String,
    timeout: Duration,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    /// `timeout` bounds each whole call; `Duration::ZERO` disables it.
    pub fn new(
        api_root: Url,
        api_key: impl Into<String>,
        timeout: Duration,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            api_root,
            api_key: api_key.into(),
            timeout,
            transport,
        }
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    pub async fn call<P: Serialize + ?Sized>(
        &self,
        method: Method,
        params: &P,
        on_error: OnRemoteError,
    ) -> Result<Value, ApiError> {
        let params = encode_params(params)?;

        let missing = method
            .descriptor()
            .missing_params(params.iter().map(|(name, _)| name.as_str()));
        if !missing.is_empty() {
            tracing::warn!(?missing, "required parameters missing");
        }

        let request = build_request(&self.api_root, &self.api_key, method, &params);
        let response = self.execute(request).await.map_err(|err| {
            tracing::debug!(error = %err, "transport failure");
            ApiError::from(err)
        })?;
        tracing::debug!(status = response.status, "response received");

        parse_response(response, on_error).inspect_err(|err| {
            tracing::warn!(status = err.status_code(), error = %err, "call failed");
        })
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if self.timeout.is_zero() {
            return self.transport.execute(request).await;
        }
        match tokio::time::timeout(self.timeout, self.transport.execute(request)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(TransportError::Timeout),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("api_root", &self.api_root.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    const API_KEY: &str = "6b95f6d270f4f719f1b70e8ad2f742deef94c5bccee7d495250c0fbb8cecefc7";

    fn root() -> Url {
        Url::parse("http://etherpad.com/api/1.2.13").unwrap()
    }

    fn envelope(code: i64, message: &str, data: Value) -> HttpResponse {
        HttpResponse::new(200, json!({"code": code, "message": message, "data": data}).to_string())
    }

    /// Replays one canned outcome and records the requested URLs.
    struct Scripted {
        outcome: Result<HttpResponse, TransportError>,
        delay: Duration,
        seen: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(outcome: Result<HttpResponse, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request.url);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome.clone()
        }
    }

    fn dispatcher(transport: Arc<Scripted>, timeout: Duration) -> Dispatcher {
        Dispatcher::new(root(), API_KEY, timeout, transport)
    }

    #[test]
    fn build_request_appends_method_and_api_key() {
        let params = vec![("padID".to_string(), "my pad".to_string())];
        let req = build_request(&root(), API_KEY, Method::GetText, &params);
        assert_eq!(
            req.url,
            format!("http://etherpad.com/api/1.2.13/getText?padID=my+pad&apikey={API_KEY}")
        );
        assert_eq!(
            req.headers,
            vec![("accept".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn build_request_without_params() {
        let req = build_request(&root(), API_KEY, Method::ListAllPads, &[]);
        assert_eq!(
            req.url,
            format!("http://etherpad.com/api/1.2.13/listAllPads?apikey={API_KEY}")
        );
    }

    #[test]
    fn configured_api_key_wins() {
        let params = vec![("apikey".to_string(), "forged".to_string())];
        let req = build_request(&root(), API_KEY, Method::CheckToken, &params);
        assert!(!req.url.contains("forged"));
        assert_eq!(req.url.matches("apikey=").count(), 1);
    }

    #[test]
    fn encode_params_flattens_scalars() {
        let pairs = encode_params(&json!({
            "padID": "p",
            "rev": 3,
            "force": true,
            "text": null,
        }))
        .unwrap();
        assert_eq!(
            pairs,
            vec![
                ("force".to_string(), "true".to_string()),
                ("padID".to_string(), "p".to_string()),
                ("rev".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn encode_params_accepts_unit_and_structs() {
        assert!(encode_params(&()).unwrap().is_empty());

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Move<'a> {
            source_id: &'a str,
        }
        let pairs = encode_params(&Move { source_id: "a" }).unwrap();
        assert_eq!(pairs, vec![("sourceId".to_string(), "a".to_string())]);
    }

    #[test]
    fn encode_params_rejects_non_objects() {
        let err = encode_params(&json!(["padID"])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParams(_)));
        assert_eq!(err.status_code(), 400);
        assert!(encode_params("padID").is_err());
    }

    #[test]
    fn parse_success_strips_envelope() {
        let data = parse_response(
            envelope(0, "ok", json!({"padIDs": ["a", "b"]})),
            OnRemoteError::Propagate,
        )
        .unwrap();
        assert_eq!(data, json!({"padIDs": ["a", "b"]}));
    }

    #[test]
    fn parse_success_ignores_policy() {
        let data = parse_response(envelope(0, "ok", json!(null)), OnRemoteError::SuppressToData).unwrap();
        assert_eq!(data, Value::Null);
    }

    #[test]
    fn parse_remote_error_maps_status() {
        let cases = [
            (1, "padID does not exist", 422),
            (2, "internal error", 500),
            (3, "no such function", 501),
            (4, "no or wrong API Key", 422),
            (9, "mystery", 500),
        ];
        for (code, message, status) in cases {
            let err = parse_response(envelope(code, message, Value::Null), OnRemoteError::Propagate)
                .unwrap_err();
            assert_eq!(err.status_code(), status, "code {code}");
            assert_eq!(err.to_string(), message, "code {code}");
        }
    }

    #[test]
    fn parse_remote_error_suppressed_returns_data() {
        let data = parse_response(
            envelope(1, "padID does not exist", Value::Null),
            OnRemoteError::SuppressToData,
        )
        .unwrap();
        assert_eq!(data, Value::Null);
    }

    #[test]
    fn parse_envelope_on_error_status() {
        let response = HttpResponse::new(
            401,
            r#"{"code":4,"message":"no or wrong API Key","data":null}"#,
        );
        let err = parse_response(response, OnRemoteError::Propagate).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Remote {
                code: RemoteCode::InvalidApiKey,
                ..
            }
        ));
    }

    #[test]
    fn parse_http_error_passes_status_and_body() {
        let err = parse_response(HttpResponse::new(509, "NetworkAuthenticationRequired"), OnRemoteError::Propagate)
            .unwrap_err();
        assert_eq!(err.status_code(), 509);
        assert_eq!(err.to_string(), "NetworkAuthenticationRequired");

        let err = parse_response(HttpResponse::new(400, ""), OnRemoteError::SuppressToData).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "Bad Request");
    }

    #[test]
    fn parse_undecodable_success_body() {
        let err = parse_response(HttpResponse::new(200, "<html>"), OnRemoteError::Propagate).unwrap_err();
        assert!(matches!(err, ApiError::InvalidEnvelope(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn parse_envelope_without_message_or_data() {
        let err = parse_response(HttpResponse::new(200, r#"{"code":2}"#), OnRemoteError::Propagate).unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "");
    }

    #[tokio::test]
    async fn dispatcher_round_trip() {
        let transport = Scripted::new(Ok(envelope(0, "ok", json!({"text": "hello"}))));
        let data = dispatcher(transport.clone(), Duration::from_secs(1))
            .call(Method::GetText, &json!({"padID": "p"}), OnRemoteError::Propagate)
            .await
            .unwrap();
        assert_eq!(data, json!({"text": "hello"}));
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("http://etherpad.com/api/1.2.13/getText?padID=p&apikey="));
    }

    #[tokio::test]
    async fn dispatcher_maps_connection_failure() {
        let transport = Scripted::new(Err(TransportError::Connect("refused".to_string())));
        let err = dispatcher(transport, Duration::from_secs(1))
            .call(Method::SendClientsMessage, &json!({"padID": "p", "msg": "hi"}), OnRemoteError::Propagate)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.to_string(), "Etherpad is unavailable");
    }

    #[tokio::test]
    async fn dispatcher_enforces_deadline() {
        let transport = Arc::new(Scripted {
            outcome: Ok(envelope(0, "ok", Value::Null)),
            delay: Duration::from_secs(5),
            seen: Mutex::new(Vec::new()),
        });
        let err = dispatcher(transport, Duration::from_millis(20))
            .call(Method::GetHtml, &json!({"padID": "p"}), OnRemoteError::Propagate)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 408);
        assert_eq!(err.to_string(), "Request Timeout");
    }

    #[tokio::test]
    async fn dispatcher_rejects_bad_params_before_sending() {
        let transport = Scripted::new(Ok(envelope(0, "ok", Value::Null)));
        let err = dispatcher(transport.clone(), Duration::from_secs(1))
            .call(Method::GetText, &json!(42), OnRemoteError::Propagate)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidParams(_)));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn debug_hides_api_key() {
        let rendered = format!("{:?}", dispatcher(Scripted::new(Err(TransportError::Timeout)), Duration::ZERO));
        assert!(!rendered.contains(API_KEY));
    }
}
