//! Compiles filters into document-query fragments.

use mongodb::bson::{doc, Bson, DateTime, Document};

use crate::domain::filter::Filter;
use crate::domain::value::Value;
use crate::port::outbound::filter::FilterParser;

/// Document-store representation of a filter value.
#[must_use]
pub fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Int(i) => Bson::Int64(*i),
        Value::Float(f) => Bson::Double(*f),
        Value::Timestamp(ts) => Bson::DateTime(DateTime::from_millis(ts.timestamp_millis())),
        Value::Text(s) => Bson::String(s.clone()),
    }
}

impl From<Value> for Bson {
    fn from(value: Value) -> Self {
        to_bson(&value)
    }
}

/// Document filter parser. Range bounds are exclusive (`$gt` / `$lt`); a
/// range with neither bound compiles to an empty fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoFilterParser;

impl FilterParser for MongoFilterParser {
    type Output = Document;

    fn parse_match(&self, key: &str, value: &Value) -> Document {
        doc! { key: to_bson(value) }
    }

    fn parse_range(&self, key: &str, lower: Option<&Value>, upper: Option<&Value>) -> Document {
        let mut bounds = Document::new();
        if let Some(lower) = lower {
            bounds.insert("$gt", to_bson(lower));
        }
        if let Some(upper) = upper {
            bounds.insert("$lt", to_bson(upper));
        }
        if bounds.is_empty() {
            return Document::new();
        }
        doc! { key: bounds }
    }
}

/// Merge the compiled filters into one query document.
///
/// A later filter on the same key replaces the earlier one, so two filters
/// on one field do not intersect.
#[must_use]
pub fn merge_filters(filters: &[Filter]) -> Document {
    filters.iter().fold(Document::new(), |mut query, filter| {
        query.extend(filter.parse(&MongoFilterParser));
        query
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn values_convert_to_bson() {
        assert_eq!(to_bson(&Value::from(7_i32)), Bson::Int64(7));
        assert_eq!(to_bson(&Value::Null), Bson::Null);

        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            Bson::from(Value::from(ts)),
            Bson::DateTime(DateTime::from_millis(ts.timestamp_millis()))
        );
    }

    #[test]
    fn match_compiles_to_equality() {
        let query = Filter::matching("test", "x").parse(&MongoFilterParser);
        assert_eq!(query, doc! { "test": "x" });
    }

    #[test]
    fn range_includes_only_present_bounds() {
        let parser = MongoFilterParser;

        assert_eq!(
            Filter::between("score", 1, 5).parse(&parser),
            doc! { "score": { "$gt": 1_i64, "$lt": 5_i64 } }
        );
        assert_eq!(
            Filter::gt("score", 1).parse(&parser),
            doc! { "score": { "$gt": 1_i64 } }
        );
        assert_eq!(
            Filter::lt("score", 5).parse(&parser),
            doc! { "score": { "$lt": 5_i64 } }
        );
        assert!(Filter::range("score", None, None).parse(&parser).is_empty());
    }

    #[test]
    fn merge_of_nothing_matches_all() {
        assert!(merge_filters(&[]).is_empty());
    }

    #[test]
    fn merge_combines_distinct_keys() {
        let query = merge_filters(&[Filter::matching("a", 1), Filter::gt("b", 2)]);
        assert_eq!(query, doc! { "a": 1_i64, "b": { "$gt": 2_i64 } });
    }

    #[test]
    fn later_filter_on_same_key_wins() {
        let query = merge_filters(&[Filter::gt("score", 1), Filter::lt("score", 5)]);
        assert_eq!(query.len(), 1);
        assert_eq!(query.get("score"), Some(&Bson::Document(doc! { "$lt": 5_i64 })));
    }
}
