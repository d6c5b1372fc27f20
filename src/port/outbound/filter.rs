//! Filter compilation port.
//!
//! Each backend supplies a parser turning a [`Filter`](crate::domain::Filter)
//! into its native query fragment. The filter picks the method by its kind,
//! so one filter value compiles to entirely different representations.

use crate::domain::value::Value;

/// Translates filters into a backend query fragment.
pub trait FilterParser {
    /// Query fragment produced for one filter.
    type Output;

    /// Compile an equality constraint.
    fn parse_match(&self, key: &str, value: &Value) -> Self::Output;

    /// Compile a range constraint. Absent bounds are unconstrained.
    fn parse_range(&self, key: &str, lower: Option<&Value>, upper: Option<&Value>)
        -> Self::Output;
}
