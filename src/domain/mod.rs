//! Backend-independent storage types: filter values, filters and sorting.

pub mod filter;
pub mod sort;
pub mod value;

pub use filter::{Filter, FilterKind, MatchFilter, RangeFilter};
pub use sort::{SortDirection, SortSpec};
pub use value::Value;
