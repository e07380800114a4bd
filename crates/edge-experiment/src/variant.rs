//! Experiment variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which deployed version of the application a client is bucketed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    /// Default deployment, served from `/`.
    A,
    /// Experimental deployment, served from `/blue/*`.
    B,
}

impl Variant {
    /// Cookie wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for cookie values that are not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized experiment variant: {0:?}")]
pub struct VariantParseError(pub String);

impl FromStr for Variant {
    type Err = VariantParseError;

    /// Exact match only: `"a"` or `" A"` are not variants.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            other => Err(VariantParseError(other.to_string())),
        }
    }
}
