//! End-to-end Lambda@Edge viewer-request handling.

use edge_experiment::cloudfront::handle_viewer_request;
use edge_experiment::{ExperimentConfig, ExperimentRouter, FixedDraw};
use serde_json::{json, Value};

fn viewer_event(uri: &str, cookie: Option<&str>) -> String {
    let mut headers = json!({
        "host": [{ "key": "Host", "value": "d111111abcdef8.cloudfront.net" }],
        "user-agent": [{ "key": "User-Agent", "value": "curl/8.4.0" }]
    });
    if let Some(cookie) = cookie {
        headers["cookie"] = json!([{ "key": "Cookie", "value": cookie }]);
    }

    json!({
        "Records": [{
            "cf": {
                "config": {
                    "distributionDomainName": "d111111abcdef8.cloudfront.net",
                    "distributionId": "EDFDVBD6EXAMPLE",
                    "eventType": "viewer-request",
                    "requestId": "4TyzHTaYWb1GX1qTfsHhEqV6HUDd_BzoBZnwfnvQc_1oF26ClkoUSEQ=="
                },
                "request": {
                    "clientIp": "203.0.113.178",
                    "headers": headers,
                    "method": "GET",
                    "querystring": "",
                    "uri": uri
                }
            }
        }]
    })
    .to_string()
}

fn router() -> ExperimentRouter {
    ExperimentRouter::new(ExperimentConfig::default()).unwrap()
}

#[test]
fn test_first_visit_gets_cookie_and_redirect() {
    let result = handle_viewer_request(
        &router(),
        &viewer_event("/", None),
        &mut FixedDraw::new(0.99),
    )
    .unwrap();

    assert_eq!(result["status"], "302");
    assert_eq!(result["statusDescription"], "Found");
    assert_eq!(result["headers"]["location"][0]["value"], "/blue/index.html");
    assert_eq!(
        result["headers"]["set-cookie"][0]["value"],
        "X-Experiment-Name=B"
    );
}

#[test]
fn test_returning_b_visitor_on_root_is_sent_to_blue() {
    let result = handle_viewer_request(
        &router(),
        &viewer_event("/", Some("theme=dark; X-Experiment-Name=B")),
        &mut FixedDraw::new(0.0),
    )
    .unwrap();

    assert_eq!(result["status"], "302");
    assert_eq!(result["headers"]["location"][0]["value"], "/blue/index.html");
    assert!(result["headers"].get("set-cookie").is_none());
}

#[test]
fn test_returning_a_visitor_continues_to_origin() {
    let event = viewer_event("/", Some("X-Experiment-Name=A"));
    let result =
        handle_viewer_request(&router(), &event, &mut FixedDraw::new(0.99)).unwrap();

    let original: Value = serde_json::from_str(&event).unwrap();
    assert_eq!(result, original["Records"][0]["cf"]["request"]);
}

#[test]
fn test_malformed_event_is_an_error() {
    let result = handle_viewer_request(&router(), "{}", &mut FixedDraw::new(0.5));
    assert!(result.is_err());
}
