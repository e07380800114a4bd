//! Evaluate a Lambda@Edge viewer-request event file.

use std::fs;

use anyhow::{Context as _, Result};
use edge_experiment::cloudfront::handle_viewer_request;

use super::{random_source, EventArgs};
use crate::context::Context;

/// Run the event command.
///
/// Prints the handler result: either the redirect response or, for a
/// pass-through, the request object exactly as it was received.
pub async fn run(args: EventArgs, ctx: &Context) -> Result<()> {
    let content = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read event file: {}", args.file))?;

    let router = ctx.router()?;
    let mut rng = random_source(args.draw, args.seed);

    ctx.output.debug(&format!(
        "Evaluating {} with cookie name {}",
        args.file,
        router.config().cookie_name
    ));

    let result = handle_viewer_request(&router, &content, rng.as_mut())
        .with_context(|| format!("Invalid viewer-request event: {}", args.file))?;

    ctx.output.json(&result);

    Ok(())
}
