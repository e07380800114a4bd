//! Routing decisions.

use edge_core::EdgeRequest;
use edge_observability::{DecisionOutcome, DecisionRecord};
use http::StatusCode;

use crate::variant::Variant;

/// Redirect response override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Always `302 Found`.
    pub status: StatusCode,
    /// `Location` header value.
    pub location: String,
    /// `Set-Cookie` header value, present only on fresh assignments.
    pub set_cookie: Option<String>,
}

impl Redirect {
    /// A `302 Found` redirect to `location`.
    pub fn found(location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FOUND,
            location: location.into(),
            set_cookie: None,
        }
    }

    /// Attach a `Set-Cookie` value.
    pub fn with_set_cookie(mut self, set_cookie: impl Into<String>) -> Self {
        self.set_cookie = Some(set_cookie.into());
        self
    }

    /// Response headers in emission order.
    pub fn headers(&self) -> Vec<(&'static str, &str)> {
        let mut headers = vec![("location", self.location.as_str())];
        if let Some(cookie) = &self.set_cookie {
            headers.push(("set-cookie", cookie.as_str()));
        }
        headers
    }
}

/// Outcome of routing one viewer request. Exactly one variant is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Answer the viewer with a redirect instead of contacting an origin.
    Redirect(Redirect),
    /// Let the original request continue to its origin unchanged.
    PassThrough(EdgeRequest),
}

impl Decision {
    /// Whether this is a redirect.
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect(_))
    }

    /// Whether the request passes through.
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Self::PassThrough(_))
    }

    /// Response status for redirects.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Redirect(r) => Some(r.status),
            Self::PassThrough(_) => None,
        }
    }

    /// Redirect target.
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Redirect(r) => Some(&r.location),
            Self::PassThrough(_) => None,
        }
    }

    /// `Set-Cookie` value, if the redirect assigns a variant.
    pub fn set_cookie(&self) -> Option<&str> {
        match self {
            Self::Redirect(r) => r.set_cookie.as_deref(),
            Self::PassThrough(_) => None,
        }
    }

    /// The forwarded request, for pass-through decisions.
    pub fn request(&self) -> Option<&EdgeRequest> {
        match self {
            Self::Redirect(_) => None,
            Self::PassThrough(req) => Some(req),
        }
    }

    fn outcome(&self) -> DecisionOutcome {
        match self {
            Self::Redirect(_) => DecisionOutcome::Redirect,
            Self::PassThrough(_) => DecisionOutcome::PassThrough,
        }
    }
}

/// Where the variant came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssignmentSource {
    /// Read from the client's experiment cookie.
    Cookie,
    /// Freshly drawn for a client without a recognized cookie.
    Draw { draw: f64 },
}

impl AssignmentSource {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cookie => "cookie",
            Self::Draw { .. } => "draw",
        }
    }
}

/// A decision together with the variant behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    /// The decision handed back to the host.
    pub decision: Decision,
    /// Variant the client is in after this request.
    pub variant: Variant,
    /// Whether the variant was read or drawn.
    pub source: AssignmentSource,
}

impl Routed {
    /// Summarize for the decision log.
    pub fn record(&self, uri: &str) -> DecisionRecord {
        let draw = match self.source {
            AssignmentSource::Draw { draw } => Some(draw),
            AssignmentSource::Cookie => None,
        };

        DecisionRecord {
            uri: uri.to_string(),
            variant: self.variant.to_string(),
            source: self.source.label().to_string(),
            outcome: self.decision.outcome(),
            status: self.decision.status().map(|s| s.as_u16()),
            location: self.decision.location().map(str::to_string),
            set_cookie: self.decision.set_cookie().map(str::to_string),
            draw,
        }
    }
}
