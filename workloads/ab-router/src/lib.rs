//! Viewer-request experiment router running as a Spin component.
//!
//! This workload:
//! - Reads the experiment policy, origin URLs and log settings from Spin
//!   variables
//! - Routes every request through `ExperimentRouter`
//! - Answers redirects directly and proxies pass-throughs to the blue or
//!   green origin by path

mod settings;

use anyhow::Result;
use spin_sdk::http::{Method as SpinMethod, Request, Response};
use spin_sdk::http_component;

use edge_core::{EdgeRequest, Method};
use edge_experiment::{Decision, ExperimentRouter, Redirect};
use edge_observability::{LogLevel, StructuredLogger};

use settings::Settings;

/// Experiment router entry point.
#[http_component]
async fn handle_ab_router(req: Request) -> Result<Response> {
    let Some(method) = edge_method(req.method()) else {
        return Ok(Response::new(405, "method not allowed"));
    };

    let headers = req
        .headers()
        .filter_map(|(name, value)| Some((name.to_string(), value.as_str()?.to_string())))
        .collect();
    let request = EdgeRequest::from_parts(method, req.path(), headers).with_query(req.query());

    let settings = Settings::load();
    let logger = {
        let logger = StructuredLogger::new(request.request_id.clone())
            .with_component("ab-router")
            .with_uri(request.uri.clone());
        match &settings {
            Ok(settings) => logger
                .with_min_level(settings.log_level)
                .with_format(settings.log_format),
            Err(_) => logger,
        }
    };
    logger
        .entry(LogLevel::Info, "viewer request")
        .field("method", method.as_str())
        .field_i64("cookies", request.cookies.len() as i64)
        .field_bool("has_query", request.query.is_some())
        .emit();

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            logger.error(&format!("{:#}", e));
            return Ok(Response::new(500, "experiment router misconfigured"));
        }
    };
    logger
        .entry(LogLevel::Debug, "experiment settings")
        .field("cookie_name", settings.experiment.cookie_name.as_str())
        .field("probability_a", settings.experiment.probability_a.to_string())
        .field("root_uri", settings.experiment.root_uri.as_str())
        .emit();

    let router = ExperimentRouter::new(settings.experiment.clone())?;

    let uri = request.uri.clone();
    let routed = router.evaluate(request);
    logger.decision(&routed.record(&uri));

    match routed.decision {
        Decision::Redirect(redirect) => Ok(redirect_response(&redirect)),
        Decision::PassThrough(request) => forward(&req, &request, &settings, &logger).await,
    }
}

fn edge_method(method: &SpinMethod) -> Option<Method> {
    match method {
        SpinMethod::Get => Some(Method::Get),
        SpinMethod::Post => Some(Method::Post),
        SpinMethod::Put => Some(Method::Put),
        SpinMethod::Delete => Some(Method::Delete),
        SpinMethod::Patch => Some(Method::Patch),
        SpinMethod::Head => Some(Method::Head),
        SpinMethod::Options => Some(Method::Options),
        _ => None,
    }
}

fn redirect_response(redirect: &Redirect) -> Response {
    let mut builder = Response::builder();
    builder.status(redirect.status.as_u16());
    for (name, value) in redirect.headers() {
        builder.header(name, value);
    }
    builder.body(Vec::<u8>::new()).build()
}

/// Proxy an unchanged request to the origin that serves its path.
async fn forward(
    original: &Request,
    request: &EdgeRequest,
    settings: &Settings,
    logger: &StructuredLogger,
) -> Result<Response> {
    let origin = settings.origins.resolve(&request.uri);
    let Some(url) = settings.origins.origin_url(&request.path_and_query()) else {
        logger.error(&format!("no base URL configured for origin '{}'", origin));
        return Ok(Response::new(502, "origin not configured"));
    };

    let mut builder = Request::builder();
    builder.method(original.method().clone()).uri(url);
    for (name, value) in &request.headers {
        if !name.eq_ignore_ascii_case("host") {
            builder.header(name.as_str(), value.as_str());
        }
    }
    let upstream = builder.body(original.body().to_vec()).build();

    let resp: Response = spin_sdk::http::send(upstream).await?;
    logger
        .entry(LogLevel::Info, "origin response")
        .field("origin", origin)
        .field_i64("status", i64::from(*resp.status()))
        .emit();

    Ok(resp)
}
