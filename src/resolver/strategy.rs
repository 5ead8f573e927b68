use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RouterError;

/// The placement strategy in effect for key resolution.
///
/// A closed set: adding or removing a strategy is a compile-time-checked
/// change because every dispatch site matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Hash,
    Range,
    Lookup,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Hash => "hash",
            Strategy::Range => "range",
            Strategy::Lookup => "lookup",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hash" => Ok(Strategy::Hash),
            "range" => Ok(Strategy::Range),
            "lookup" => Ok(Strategy::Lookup),
            other => Err(RouterError::InvalidStrategy(other.to_string())),
        }
    }
}
