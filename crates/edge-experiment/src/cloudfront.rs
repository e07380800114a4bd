//! Lambda@Edge viewer-request codec.
//!
//! Translates a CloudFront viewer-request event into an [`EdgeRequest`] and
//! a [`Decision`] back into the JSON CloudFront expects: a response object
//! for redirects, or the untouched request object to continue to the origin.

use std::collections::BTreeMap;

use edge_core::{EdgeRequest, Method, RequestId, UnsupportedMethod};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decision::{Decision, Redirect};
use crate::policy::RandomSource;
use crate::router::ExperimentRouter;

/// Errors decoding a viewer-request event.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event has no records")]
    NoRecords,

    #[error(transparent)]
    Method(#[from] UnsupportedMethod),
}

/// One entry of a CloudFront header list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfHeader {
    /// Original header casing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Header value.
    pub value: String,
}

impl CfHeader {
    fn new(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.to_string()),
            value: value.into(),
        }
    }
}

/// The fields of `Records[0].cf.request` the router reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfRequest {
    pub uri: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub querystring: Option<String>,
    #[serde(default)]
    pub client_ip: Option<String>,
    /// Lowercase header name to entries.
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<CfHeader>>,
}

/// Response override returned to CloudFront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CfResponse {
    pub status: String,
    pub status_description: String,
    pub headers: BTreeMap<String, Vec<CfHeader>>,
}

impl From<&Redirect> for CfResponse {
    fn from(redirect: &Redirect) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            "location".to_string(),
            vec![CfHeader::new("Location", redirect.location.clone())],
        );
        if let Some(cookie) = &redirect.set_cookie {
            headers.insert(
                "set-cookie".to_string(),
                vec![CfHeader::new("Set-Cookie", cookie.clone())],
            );
        }

        Self {
            status: redirect.status.as_u16().to_string(),
            status_description: redirect
                .status
                .canonical_reason()
                .unwrap_or("Found")
                .to_string(),
            headers,
        }
    }
}

/// A decoded viewer-request event.
///
/// Keeps the raw request object so a pass-through returns it exactly as
/// received, including fields this codec does not model.
#[derive(Debug, Clone)]
pub struct ViewerRequest {
    raw: Value,
    request: CfRequest,
    request_id: Option<String>,
}

impl ViewerRequest {
    /// Decode from event JSON text.
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        let event: Value = serde_json::from_str(json)?;
        Self::from_event(&event)
    }

    /// Decode from a parsed event.
    pub fn from_event(event: &Value) -> Result<Self, EventError> {
        let raw = event
            .pointer("/Records/0/cf/request")
            .cloned()
            .ok_or(EventError::NoRecords)?;
        let request: CfRequest = serde_json::from_value(raw.clone())?;
        let request_id = event
            .pointer("/Records/0/cf/config/requestId")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            raw,
            request,
            request_id,
        })
    }

    /// The typed request view.
    pub fn request(&self) -> &CfRequest {
        &self.request
    }

    /// Convert to the router's request model.
    pub fn to_edge_request(&self) -> Result<EdgeRequest, EventError> {
        let method = match &self.request.method {
            Some(m) => m.parse::<Method>()?,
            None => Method::Get,
        };

        let headers = self
            .request
            .headers
            .iter()
            .flat_map(|(name, entries)| {
                entries.iter().map(move |entry| {
                    let key = entry.key.clone().unwrap_or_else(|| name.clone());
                    (key, entry.value.clone())
                })
            })
            .collect();

        let mut edge = EdgeRequest::from_parts(method, self.request.uri.clone(), headers)
            .with_query(self.request.querystring.clone().unwrap_or_default());
        if let Some(id) = &self.request_id {
            edge = edge.with_request_id(RequestId::from_string(id.clone()));
        }
        Ok(edge)
    }

    /// CloudFront result JSON for a decision on this request.
    pub fn respond(&self, decision: &Decision) -> Value {
        match decision {
            Decision::Redirect(redirect) => {
                serde_json::to_value(CfResponse::from(redirect)).unwrap_or(Value::Null)
            }
            Decision::PassThrough(_) => self.raw.clone(),
        }
    }
}

/// Decode an event, route it and encode the result.
pub fn handle_viewer_request(
    router: &ExperimentRouter,
    event_json: &str,
    rng: &mut dyn RandomSource,
) -> Result<Value, EventError> {
    let viewer = ViewerRequest::from_json(event_json)?;
    tracing::debug!(
        request_id = viewer.request_id.as_deref().unwrap_or(""),
        request = %viewer.raw,
        "viewer request"
    );

    let request = viewer.to_edge_request()?;
    let routed = router.route_with(request, rng);
    let result = viewer.respond(&routed.decision);

    tracing::debug!(
        variant = %routed.variant,
        redirect = routed.decision.is_redirect(),
        result = %result,
        "viewer request result"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::config::ExperimentConfig;
    use crate::policy::FixedDraw;

    /// Collects formatted tracing output.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn event(cookies: &[&str]) -> Value {
        let cookie_entries: Vec<Value> = cookies
            .iter()
            .map(|c| json!({ "key": "Cookie", "value": c }))
            .collect();
        json!({
            "Records": [{
                "cf": {
                    "config": { "distributionId": "EDFDVBD6EXAMPLE", "requestId": "abc==" },
                    "request": {
                        "clientIp": "203.0.113.178",
                        "method": "GET",
                        "querystring": "",
                        "uri": "/",
                        "headers": {
                            "host": [{ "key": "Host", "value": "d111111abcdef8.cloudfront.net" }],
                            "cookie": cookie_entries
                        }
                    }
                }
            }]
        })
    }

    #[test]
    fn test_decode_event() {
        let viewer = ViewerRequest::from_event(&event(&["a=1; X-Experiment-Name=B"])).unwrap();
        let req = viewer.to_edge_request().unwrap();

        assert_eq!(req.uri, "/");
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.query, None);
        assert_eq!(req.request_id.as_str(), "abc==");
        assert_eq!(req.header("host"), Some("d111111abcdef8.cloudfront.net"));
        assert_eq!(req.cookie("X-Experiment-Name"), Some("B"));
    }

    #[test]
    fn test_missing_cookie_header_means_no_cookies() {
        let mut ev = event(&[]);
        ev["Records"][0]["cf"]["request"]["headers"]
            .as_object_mut()
            .unwrap()
            .remove("cookie");
        let req = ViewerRequest::from_event(&ev).unwrap().to_edge_request().unwrap();
        assert!(req.cookies.is_empty());
    }

    #[test]
    fn test_empty_records() {
        let err = ViewerRequest::from_event(&json!({ "Records": [] })).unwrap_err();
        assert!(matches!(err, EventError::NoRecords));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ViewerRequest::from_json("{not json"),
            Err(EventError::Json(_))
        ));
    }

    #[test]
    fn test_unsupported_method() {
        let mut ev = event(&[]);
        ev["Records"][0]["cf"]["request"]["method"] = json!("BREW");
        let viewer = ViewerRequest::from_event(&ev).unwrap();
        assert!(matches!(viewer.to_edge_request(), Err(EventError::Method(_))));
    }

    #[test]
    fn test_redirect_response_shape() {
        let response = CfResponse::from(
            &Redirect::found("/blue/index.html").with_set_cookie("X-Experiment-Name=B"),
        );
        let value = serde_json::to_value(response).unwrap();

        assert_eq!(
            value,
            json!({
                "status": "302",
                "statusDescription": "Found",
                "headers": {
                    "location": [{ "key": "Location", "value": "/blue/index.html" }],
                    "set-cookie": [{ "key": "Set-Cookie", "value": "X-Experiment-Name=B" }]
                }
            })
        );
    }

    #[test]
    fn test_pass_through_returns_raw_request() {
        let ev = event(&["X-Experiment-Name=A"]);
        let viewer = ViewerRequest::from_event(&ev).unwrap();
        let decision = Decision::PassThrough(viewer.to_edge_request().unwrap());

        assert_eq!(viewer.respond(&decision), ev["Records"][0]["cf"]["request"]);
    }

    #[test]
    fn test_handler_logs_request_and_result() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(captured.clone())
            .finish();

        let router = ExperimentRouter::new(ExperimentConfig::default()).unwrap();
        let event_json = event(&["X-Experiment-Name=B"]).to_string();
        let result = tracing::subscriber::with_default(subscriber, || {
            handle_viewer_request(&router, &event_json, &mut FixedDraw::new(0.5)).unwrap()
        });
        assert_eq!(result["status"], "302");

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("viewer request"), "{}", logs);
        assert!(logs.contains("d111111abcdef8.cloudfront.net"), "{}", logs);
        assert!(logs.contains("viewer request result"), "{}", logs);
        assert!(logs.contains("/blue/index.html"), "{}", logs);
    }
}
