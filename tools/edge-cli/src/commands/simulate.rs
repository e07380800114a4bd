//! Route a batch of first-time visitors and report the observed split.

use std::time::Instant;

use anyhow::{bail, Result};
use chrono::Utc;
use edge_core::EdgeRequest;
use edge_experiment::Variant;
use serde::Serialize;

use super::{random_source, SimulateArgs};
use crate::context::Context;
use crate::output::{format_percent, variant_badge};

/// Allowed gap between observed and configured share before warning.
const SHARE_TOLERANCE: f64 = 0.01;

/// Summary of a simulation run.
#[derive(Debug, Serialize)]
struct SimulationReport {
    timestamp: String,
    cookie_name: String,
    uri: String,
    visitors: u64,
    variant_a: u64,
    variant_b: u64,
    redirects: u64,
    probability_a: f64,
    observed_a: f64,
    seed: Option<u64>,
    elapsed_ms: u128,
}

/// Run the simulate command.
pub async fn run(args: SimulateArgs, ctx: &Context) -> Result<()> {
    if args.count == 0 {
        bail!("--count must be at least 1");
    }

    let router = ctx.router()?;
    let mut rng = random_source(None, args.seed);
    let started = Instant::now();

    ctx.output.debug(&format!(
        "Simulating {} visitors on {} (probability_a = {})",
        args.count,
        args.uri,
        router.config().probability_a
    ));

    let progress = ctx.output.progress(args.count, "Routing");
    let (mut variant_a, mut variant_b, mut redirects) = (0u64, 0u64, 0u64);

    for i in 0..args.count {
        let routed = router.route_with(EdgeRequest::new(args.uri.as_str()), rng.as_mut());
        match routed.variant {
            Variant::A => variant_a += 1,
            Variant::B => variant_b += 1,
        }
        if routed.decision.is_redirect() {
            redirects += 1;
        }

        if i % 1000 == 0 {
            progress.set_position(i);
        }
    }

    progress.finish_and_clear();

    let report = SimulationReport {
        timestamp: Utc::now().to_rfc3339(),
        cookie_name: router.config().cookie_name.clone(),
        uri: args.uri,
        visitors: args.count,
        variant_a,
        variant_b,
        redirects,
        probability_a: router.config().probability_a,
        observed_a: variant_a as f64 / args.count as f64,
        seed: args.seed,
        elapsed_ms: started.elapsed().as_millis(),
    };

    tracing::info!(
        visitors = report.visitors,
        variant_a = report.variant_a,
        variant_b = report.variant_b,
        "simulation finished"
    );

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.header("Simulation");
    ctx.output.kv("visitors", &report.visitors.to_string());
    ctx.output.kv(
        &variant_badge("A"),
        &format!("{} ({})", report.variant_a, format_percent(report.observed_a)),
    );
    ctx.output.kv(
        &variant_badge("B"),
        &format!(
            "{} ({})",
            report.variant_b,
            format_percent(1.0 - report.observed_a)
        ),
    );
    ctx.output.kv("redirects", &report.redirects.to_string());
    ctx.output.kv("elapsed", &format!("{}ms", report.elapsed_ms));

    let gap = (report.observed_a - report.probability_a).abs();
    if gap > SHARE_TOLERANCE {
        ctx.output.warn(&format!(
            "Observed share of A ({}) is {} away from the configured {}",
            format_percent(report.observed_a),
            format_percent(gap),
            format_percent(report.probability_a)
        ));
    } else {
        ctx.output.success(&format!(
            "Observed share of A is within {} of {}",
            format_percent(SHARE_TOLERANCE),
            format_percent(report.probability_a)
        ));
    }

    Ok(())
}
