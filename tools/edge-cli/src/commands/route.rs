//! Evaluate the routing decision for a single request.

use anyhow::{Context as _, Result};
use edge_core::{EdgeRequest, Method};

use super::{random_source, RouteArgs};
use crate::context::Context;
use crate::output::variant_badge;

/// Run the route command.
pub async fn run(args: RouteArgs, ctx: &Context) -> Result<()> {
    let request = build_request(&args.uri, &args.cookies, &args.headers)?;
    let router = ctx.router()?;
    let mut rng = random_source(args.draw, args.seed);

    ctx.output.debug(&format!(
        "Routing {} with cookie name {}",
        request.path_and_query(),
        router.config().cookie_name
    ));

    let uri = request.uri.clone();
    let request_id = request.request_id.clone();
    let routed = router.route_with(request, rng.as_mut());
    let record = routed.record(&uri);

    tracing::info!(request_id = %request_id, outcome = ?record.outcome, "routed {}", uri);

    if ctx.output.is_json() {
        ctx.output.json(&record);
        return Ok(());
    }

    ctx.output.header("Decision");
    ctx.output.kv("variant", &variant_badge(&record.variant));
    ctx.output.kv("source", &record.source);
    if let Some(draw) = record.draw {
        ctx.output.kv("draw", &format!("{:.6}", draw));
    }

    match (record.status, &record.location) {
        (Some(status), Some(location)) => {
            ctx.output.kv("outcome", &format!("redirect {}", status));
            ctx.output.kv("location", location);
            if let Some(ref set_cookie) = record.set_cookie {
                ctx.output.kv("set-cookie", set_cookie);
            }
        }
        _ => {
            ctx.output.kv("outcome", "pass-through");
            let origin = ctx.config.origins.resolve(&record.uri);
            ctx.output.kv("origin", origin);
        }
    }

    Ok(())
}

/// Build a request from command-line parts.
fn build_request(uri: &str, cookies: &[String], headers: &[String]) -> Result<EdgeRequest> {
    let (path, query) = match uri.split_once('?') {
        Some((path, query)) => (path, query),
        None => (uri, ""),
    };

    let headers = headers
        .iter()
        .map(|h| parse_header(h))
        .collect::<Result<Vec<_>>>()?;

    let mut request = EdgeRequest::from_parts(Method::Get, path, headers).with_query(query);
    for cookie in cookies {
        let (name, value) = parse_cookie_arg(cookie)?;
        request = request.with_cookie(name, value);
    }

    Ok(request)
}

fn parse_cookie_arg(arg: &str) -> Result<(&str, &str)> {
    arg.split_once('=')
        .map(|(name, value)| (name.trim(), value.trim()))
        .filter(|(name, _)| !name.is_empty())
        .with_context(|| format!("Invalid cookie '{}', expected NAME=VALUE", arg))
}

fn parse_header(arg: &str) -> Result<(String, String)> {
    arg.split_once(':')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .with_context(|| format!("Invalid header '{}', expected NAME:VALUE", arg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_arg() {
        assert_eq!(
            parse_cookie_arg("X-Experiment-Name=B").unwrap(),
            ("X-Experiment-Name", "B")
        );
        assert_eq!(parse_cookie_arg("a=b=c").unwrap(), ("a", "b=c"));
        assert!(parse_cookie_arg("novalue").is_err());
        assert!(parse_cookie_arg("=B").is_err());
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("User-Agent: curl/8.0").unwrap(),
            ("User-Agent".to_string(), "curl/8.0".to_string())
        );
        assert!(parse_header("missing-colon").is_err());
    }

    #[test]
    fn test_build_request_splits_query_and_orders_cookies() {
        let request = build_request(
            "/blue/index.html?ref=mail",
            &["X-Experiment-Name=B".to_string(), "X-Experiment-Name=A".to_string()],
            &["Cookie: other=1".to_string()],
        )
        .unwrap();

        assert_eq!(request.uri, "/blue/index.html");
        assert_eq!(request.query.as_deref(), Some("ref=mail"));
        assert_eq!(request.cookie("other"), Some("1"));
        assert_eq!(request.cookie("X-Experiment-Name"), Some("B"));
    }
}
