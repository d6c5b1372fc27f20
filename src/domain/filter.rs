//! Backend-neutral query constraints.
//!
//! A [`Filter`] describes a single constraint over a field without knowing
//! which backend will run it. Backends compile filters through a
//! [`FilterParser`], which is dispatched on the filter kind:
//!
//! ```
//! use polystore::domain::filter::Filter;
//! use polystore::adapter::outbound::mongo::parser::MongoFilterParser;
//!
//! let filter = Filter::between("score", 1, 10);
//! let query = filter.parse(&MongoFilterParser);
//! assert_eq!(query.get_document("score").unwrap().len(), 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::value::Value;
use crate::error::{Error, Result};
use crate::port::outbound::filter::FilterParser;

/// Kind of a filter, which fixes the set of parameters it declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// Equality constraint.
    Match,
    /// Exclusive lower/upper bound constraint.
    Range,
}

impl FilterKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FilterKind::Match => "match",
            FilterKind::Range => "range",
        }
    }

    /// Parameter names declared by filters of this kind.
    #[must_use]
    pub const fn params(self) -> &'static [&'static str] {
        match self {
            FilterKind::Match => &["value"],
            FilterKind::Range => &["lower", "upper"],
        }
    }
}

/// Equality constraint: `key == value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchFilter {
    key: String,
    value: Value,
}

impl MatchFilter {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Range constraint: `lower < key < upper`, either side optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lower: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upper: Option<Value>,
}

impl RangeFilter {
    /// A `Value::Null` bound counts as absent.
    pub fn new(key: impl Into<String>, lower: Option<Value>, upper: Option<Value>) -> Self {
        Self {
            key: key.into(),
            lower: lower.filter(|v| !v.is_null()),
            upper: upper.filter(|v| !v.is_null()),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn lower(&self) -> Option<&Value> {
        self.lower.as_ref()
    }

    #[must_use]
    pub fn upper(&self) -> Option<&Value> {
        self.upper.as_ref()
    }
}

/// A single constraint over a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Filter {
    Match(MatchFilter),
    Range(RangeFilter),
}

impl Filter {
    /// Equality filter.
    pub fn matching(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Match(MatchFilter::new(key, value))
    }

    /// Range filter with optional exclusive bounds.
    pub fn range(key: impl Into<String>, lower: Option<Value>, upper: Option<Value>) -> Self {
        Filter::Range(RangeFilter::new(key, lower, upper))
    }

    /// `key > lower`.
    pub fn gt(key: impl Into<String>, lower: impl Into<Value>) -> Self {
        Self::range(key, Some(lower.into()), None)
    }

    /// `key < upper`.
    pub fn lt(key: impl Into<String>, upper: impl Into<Value>) -> Self {
        Self::range(key, None, Some(upper.into()))
    }

    /// `lower < key < upper`.
    pub fn between(key: impl Into<String>, lower: impl Into<Value>, upper: impl Into<Value>) -> Self {
        Self::range(key, Some(lower.into()), Some(upper.into()))
    }

    /// Build a filter of `kind` from named parameters.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if a name is not declared by `kind`.
    pub fn with_params<'a, I>(kind: FilterKind, key: impl Into<String>, params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut filter = match kind {
            FilterKind::Match => Self::matching(key, Value::Null),
            FilterKind::Range => Self::range(key, None, None),
        };
        for (name, value) in params {
            filter.set(name, value)?;
        }
        Ok(filter)
    }

    #[must_use]
    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::Match(_) => FilterKind::Match,
            Filter::Range(_) => FilterKind::Range,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Filter::Match(f) => &f.key,
            Filter::Range(f) => &f.key,
        }
    }

    /// Declared parameters with their current values.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, Option<&Value>)> {
        match self {
            Filter::Match(f) => vec![("value", Some(&f.value))],
            Filter::Range(f) => vec![("lower", f.lower.as_ref()), ("upper", f.upper.as_ref())],
        }
    }

    /// Update a declared parameter. Setting a range bound to `Value::Null`
    /// removes that bound.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if `name` is not declared by this filter.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match (self, name) {
            (Filter::Match(f), "value") => f.value = value,
            (Filter::Range(f), "lower") => f.lower = Some(value).filter(|v| !v.is_null()),
            (Filter::Range(f), "upper") => f.upper = Some(value).filter(|v| !v.is_null()),
            (filter, _) => return Err(filter.invalid(name)),
        }
        Ok(())
    }

    /// Clear a declared parameter.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if `name` is not declared by this filter.
    pub fn unset(&mut self, name: &str) -> Result<()> {
        self.set(name, Value::Null)
    }

    /// Compile this filter with a backend parser.
    pub fn parse<P: FilterParser + ?Sized>(&self, parser: &P) -> P::Output {
        match self {
            Filter::Match(f) => parser.parse_match(&f.key, &f.value),
            Filter::Range(f) => parser.parse_range(&f.key, f.lower.as_ref(), f.upper.as_ref()),
        }
    }

    fn invalid(&self, name: &str) -> Error {
        Error::InvalidParameter {
            name: name.to_string(),
            filter: self.kind().name(),
        }
    }
}

impl From<MatchFilter> for Filter {
    fn from(filter: MatchFilter) -> Self {
        Filter::Match(filter)
    }
}

impl From<RangeFilter> for Filter {
    fn from(filter: RangeFilter) -> Self {
        Filter::Range(filter)
    }
}
