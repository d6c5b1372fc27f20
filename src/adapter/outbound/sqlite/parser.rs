//! Compiles filters into SQL predicates.

use crate::domain::value::Value;
use crate::port::outbound::filter::FilterParser;

/// Comparison operator of a single predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Lt,
}

impl Comparison {
    #[must_use]
    pub const fn operator(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gt => ">",
            Comparison::Lt => "<",
        }
    }
}

/// `column <op> value`, with the value bound as a query parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub comparison: Comparison,
    pub value: Value,
}

impl Predicate {
    pub fn new(column: impl Into<String>, comparison: Comparison, value: Value) -> Self {
        Self {
            column: column.into(),
            comparison,
            value,
        }
    }

    /// True when the predicate binds a parameter.
    #[must_use]
    pub fn binds_value(&self) -> bool {
        !(self.comparison == Comparison::Eq && self.value.is_null())
    }

    /// SQL fragment; `?` marks the bound value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        if self.binds_value() {
            format!("{} {} ?", self.column, self.comparison.operator())
        } else {
            format!("{} IS NULL", self.column)
        }
    }
}

/// Relational filter parser. A match compiles to one predicate, a range to
/// one predicate per present bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlFilterParser;

impl FilterParser for SqlFilterParser {
    type Output = Vec<Predicate>;

    fn parse_match(&self, key: &str, value: &Value) -> Self::Output {
        vec![Predicate::new(key, Comparison::Eq, value.clone())]
    }

    fn parse_range(&self, key: &str, lower: Option<&Value>, upper: Option<&Value>) -> Self::Output {
        let lower = lower.map(|v| Predicate::new(key, Comparison::Gt, v.clone()));
        let upper = upper.map(|v| Predicate::new(key, Comparison::Lt, v.clone()));
        lower.into_iter().chain(upper).collect()
    }
}
