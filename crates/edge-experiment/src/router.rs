//! The experiment router.

use edge_core::EdgeRequest;

use crate::config::{ConfigError, ExperimentConfig};
use crate::decision::{AssignmentSource, Decision, Redirect, Routed};
use crate::policy::{AssignmentPolicy, RandomSource};
use crate::variant::Variant;

/// Decides, per viewer request, between a redirect and a pass-through.
///
/// The router is immutable after construction and holds no per-request
/// state, so one instance can serve any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct ExperimentRouter {
    config: ExperimentConfig,
    policy: AssignmentPolicy,
}

impl ExperimentRouter {
    /// Create a router, rejecting invalid configuration.
    pub fn new(config: ExperimentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = config.policy();
        Ok(Self { config, policy })
    }

    /// The active configuration.
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// First recognized experiment cookie, in request order.
    ///
    /// Cookies carrying the experiment name with an unknown value are
    /// skipped as if absent.
    pub fn detect(&self, request: &EdgeRequest) -> Option<Variant> {
        request
            .cookies
            .iter()
            .filter(|cookie| cookie.name == self.config.cookie_name)
            .find_map(|cookie| cookie.value.parse::<Variant>().ok())
    }

    /// Route a request using the thread-local RNG.
    pub fn route(&self, request: EdgeRequest) -> Decision {
        self.evaluate(request).decision
    }

    /// Like [`route`](Self::route), keeping the variant and its source.
    pub fn evaluate(&self, request: EdgeRequest) -> Routed {
        self.route_with(request, &mut rand::thread_rng())
    }

    /// Route a request with an explicit random source.
    ///
    /// The source is consulted at most once, and only when the request has
    /// no recognized experiment cookie.
    pub fn route_with(&self, request: EdgeRequest, rng: &mut dyn RandomSource) -> Routed {
        let routed = match self.detect(&request) {
            Some(variant) => self.route_sticky(request, variant),
            None => self.route_fresh(rng),
        };

        tracing::debug!(
            variant = %routed.variant,
            source = routed.source.label(),
            redirect = routed.decision.is_redirect(),
            location = routed.decision.location().unwrap_or(""),
            "experiment decision"
        );

        routed
    }

    fn route_sticky(&self, request: EdgeRequest, variant: Variant) -> Routed {
        let decision = if variant == Variant::B && request.uri == self.config.root_uri {
            Decision::Redirect(Redirect::found(self.config.location_for(Variant::B)))
        } else {
            Decision::PassThrough(request)
        };

        Routed {
            decision,
            variant,
            source: AssignmentSource::Cookie,
        }
    }

    fn route_fresh(&self, rng: &mut dyn RandomSource) -> Routed {
        let assignment = self.policy.assign(rng);
        let variant = assignment.variant;

        // Always redirect, even when the target equals the current path, so the
        // cookie is in place before the next request is evaluated.
        let redirect = Redirect::found(self.config.location_for(variant))
            .with_set_cookie(self.config.set_cookie_for(variant));

        Routed {
            decision: Decision::Redirect(redirect),
            variant,
            source: AssignmentSource::Draw {
                draw: assignment.draw,
            },
        }
    }
}
