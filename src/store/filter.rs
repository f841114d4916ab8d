//! Query filters understood by every backend

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Comparison strength of a collation, following the ICU levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollationStrength {
    /// Base letters only
    Primary,
    /// Base letters and accents, case is ignored
    Secondary,
    /// Base letters, accents and case
    Tertiary,
}

impl CollationStrength {
    /// ICU level number used in `ks-levelN` locale extensions
    pub fn level(&self) -> u8 {
        match self {
            CollationStrength::Primary => 1,
            CollationStrength::Secondary => 2,
            CollationStrength::Tertiary => 3,
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        matches!(self, CollationStrength::Tertiary)
    }
}

/// Locale-aware comparison rules for text equality
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Collation {
    pub locale: String,
    pub strength: CollationStrength,
}

impl Collation {
    pub fn new(locale: impl Into<String>, strength: CollationStrength) -> Self {
        Self {
            locale: locale.into(),
            strength,
        }
    }

    /// Compare two strings under this collation
    ///
    /// Only case folding is applied in-process; accent folding for primary
    /// strength is left to backends with real ICU support.
    pub fn equals(&self, left: &str, right: &str) -> bool {
        if self.strength.is_case_sensitive() {
            left == right
        } else {
            left.to_lowercase() == right.to_lowercase()
        }
    }
}

impl Default for Collation {
    fn default() -> Self {
        Self::new("de", CollationStrength::Secondary)
    }
}

impl fmt::Display for Collation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/level{}", self.locale, self.strength.level())
    }
}

/// Single-field equality filter
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Exact equality on the field's JSON value
    Eq { field: String, value: Value },
    /// Text equality under a collation
    Collated {
        field: String,
        value: String,
        collation: Collation,
    },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn collated(
        field: impl Into<String>,
        value: impl Into<String>,
        collation: Collation,
    ) -> Self {
        Filter::Collated {
            field: field.into(),
            value: value.into(),
            collation,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Eq { field, .. } | Filter::Collated { field, .. } => field,
        }
    }

    /// Evaluate the filter against a document in its JSON form
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::Eq { field, value } => document.get(field) == Some(value),
            Filter::Collated {
                field,
                value,
                collation,
            } => document
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|text| collation.equals(text, value)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Eq { field, value } => write!(f, "{field} == {value}"),
            Filter::Collated {
                field,
                value,
                collation,
            } => write!(f, "{field} ~= \"{value}\" ({collation})"),
        }
    }
}
