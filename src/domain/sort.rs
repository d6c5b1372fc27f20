//! Result ordering shared by both backends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error};

/// Sort direction, resolvable against either backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ASC")]
    Ascending,
    #[serde(alias = "DESC")]
    Descending,
}

impl SortDirection {
    /// Document-store sort order (`1` / `-1`).
    #[must_use]
    pub const fn mongo_order(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    /// SQL ordering keyword.
    #[must_use]
    pub const fn sql_keyword(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => f.write_str("ASCENDING"),
            SortDirection::Descending => f.write_str("DESCENDING"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" | "ASCENDING" => Ok(SortDirection::Ascending),
            "DESC" | "DESCENDING" => Ok(SortDirection::Descending),
            other => Err(ConfigError::InvalidValue {
                field: "sort_direction",
                reason: format!("unknown direction {other}"),
            }
            .into()),
        }
    }
}

/// Sort key plus direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    pub fn ascending(key: impl Into<String>) -> Self {
        Self::new(key, SortDirection::Ascending)
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self::new(key, SortDirection::Descending)
    }
}
