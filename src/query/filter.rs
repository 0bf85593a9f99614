use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator of a [`FilterSpec`].
///
/// Operators the compiler does not know are kept as [`FilterOperator::Other`]
/// so they can be reported and skipped rather than rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterOperator {
    EQ,
    NE,
    LT,
    LE,
    GT,
    GE,
    BT,
    Contains,
    StartsWith,
    EndsWith,
    Other(String),
}

impl FilterOperator {
    pub fn as_str(&self) -> &str {
        match self {
            FilterOperator::EQ => "EQ",
            FilterOperator::NE => "NE",
            FilterOperator::LT => "LT",
            FilterOperator::LE => "LE",
            FilterOperator::GT => "GT",
            FilterOperator::GE => "GE",
            FilterOperator::BT => "BT",
            FilterOperator::Contains => "Contains",
            FilterOperator::StartsWith => "StartsWith",
            FilterOperator::EndsWith => "EndsWith",
            FilterOperator::Other(name) => name,
        }
    }

    /// Operators that name acceptable values ("any of these") rather than
    /// narrowing a range. Several of them on one property are OR'd.
    pub fn is_alternative(&self) -> bool {
        matches!(
            self,
            FilterOperator::EQ
                | FilterOperator::Contains
                | FilterOperator::StartsWith
                | FilterOperator::EndsWith
        )
    }
}

impl FromStr for FilterOperator {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "EQ" => FilterOperator::EQ,
            "NE" => FilterOperator::NE,
            "LT" => FilterOperator::LT,
            "LE" => FilterOperator::LE,
            "GT" => FilterOperator::GT,
            "GE" => FilterOperator::GE,
            "BT" => FilterOperator::BT,
            "Contains" => FilterOperator::Contains,
            "StartsWith" => FilterOperator::StartsWith,
            "EndsWith" => FilterOperator::EndsWith,
            other => FilterOperator::Other(other.to_string()),
        })
    }
}

impl From<String> for FilterOperator {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(op) => op,
            Err(never) => match never {},
        }
    }
}

impl From<FilterOperator> for String {
    fn from(op: FilterOperator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declarative filter on one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub property_path: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value1: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<Value>,
    /// Set on compound (multi) filters, which are not supported.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub multi: bool,
}

impl FilterSpec {
    pub fn new(
        property_path: impl Into<String>,
        operator: FilterOperator,
        value1: impl Into<Value>,
    ) -> Self {
        Self {
            property_path: property_path.into(),
            operator,
            value1: value1.into(),
            value2: None,
            multi: false,
        }
    }

    pub fn between(
        property_path: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self {
            value2: Some(high.into()),
            ..Self::new(property_path, FilterOperator::BT, low)
        }
    }

    /// A compound filter grouping several others. Kept only so it can be
    /// reported; the compiler skips it.
    pub fn multi(property_path: impl Into<String>) -> Self {
        Self {
            multi: true,
            ..Self::new(property_path, FilterOperator::EQ, Value::Null)
        }
    }
}
