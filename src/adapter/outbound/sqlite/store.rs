//! Relational [`Storage`] over SQLite.
//!
//! Every call runs in its own scope of the shared [`SessionProvider`]:
//! reads in read-only scopes, `save` and `delete` in write scopes. Called
//! from inside an open scope, they join its transaction instead.

use std::marker::PhantomData;
use std::sync::Arc;

use diesel::prelude::*;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{BigInt, Bool, Double, Nullable, Text, Timestamp};
use diesel::sqlite::Sqlite;
use tracing::{debug, error};

use super::database::model::SqlModel;
use super::parser::{Predicate, SqlFilterParser};
use super::session::SessionProvider;
use crate::domain::filter::Filter;
use crate::domain::sort::SortSpec;
use crate::domain::value::Value;
use crate::error::{Error, Result};
use crate::port::outbound::store::{Records, Storage};

type Query = BoxedSqlQuery<'static, Sqlite, SqlQuery>;

/// SQLite-backed storage for rows of model `M`.
pub struct SqlStorage<M> {
    sessions: Arc<SessionProvider>,
    _model: PhantomData<fn() -> M>,
}

impl<M: SqlModel> SqlStorage<M> {
    #[must_use]
    pub fn new(sessions: Arc<SessionProvider>) -> Self {
        Self {
            sessions,
            _model: PhantomData,
        }
    }

    /// Session provider shared with callers composing larger scopes.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionProvider> {
        &self.sessions
    }

    /// True when the database answers `SELECT 1`.
    #[must_use]
    pub fn health_check(&self) -> bool {
        self.sessions
            .session(true)
            .run(|session| session.execute(|conn| diesel::sql_query("SELECT 1").execute(conn)))
            .is_ok()
    }

    fn predicates(filters: &[Filter]) -> Result<Vec<Predicate>> {
        let mut predicates = Vec::new();
        for filter in filters {
            M::resolve(filter.key())?;
            predicates.extend(filter.parse(&SqlFilterParser));
        }
        Ok(predicates)
    }

    fn select(filters: &[Filter], sort: Option<&SortSpec>) -> Result<Query> {
        let predicates = Self::predicates(filters)?;
        let query = diesel::sql_query(format!("SELECT * FROM {}", M::TABLE)).into_boxed();
        let query = apply_predicates(query, predicates);

        match sort {
            Some(sort) => {
                let column = M::resolve(&sort.key)?;
                Ok(query.sql(format!(
                    " ORDER BY {column} {}",
                    sort.direction.sql_keyword()
                )))
            }
            None => Ok(query),
        }
    }
}

fn apply_predicates(mut query: Query, predicates: Vec<Predicate>) -> Query {
    for (i, predicate) in predicates.into_iter().enumerate() {
        let keyword = if i == 0 { " WHERE " } else { " AND " };
        query = query.sql(keyword).sql(predicate.to_sql());
        if predicate.binds_value() {
            query = bind_value(query, predicate.value);
        }
    }
    query
}

fn bind_value(query: Query, value: Value) -> Query {
    match value {
        Value::Null => query.bind::<Nullable<Text>, _>(None::<String>),
        Value::Bool(b) => query.bind::<Bool, _>(b),
        Value::Int(i) => query.bind::<BigInt, _>(i),
        Value::Float(f) => query.bind::<Double, _>(f),
        Value::Timestamp(ts) => query.bind::<Timestamp, _>(ts.naive_utc()),
        Value::Text(s) => query.bind::<Text, _>(s),
    }
}

impl<M: SqlModel> Storage for SqlStorage<M> {
    type Item = M;
    type Id = Value;

    fn save(&self, item: M) -> Result<M> {
        let reload = format!(
            "SELECT * FROM {} WHERE rowid = last_insert_rowid()",
            M::TABLE
        );
        let result = self.sessions.session(false).run(|session| {
            session.execute(|conn| {
                item.insert(conn)?;
                diesel::sql_query(reload).get_result::<M>(conn)
            })
        });

        match result {
            Ok(stored) => {
                debug!(table = M::TABLE, "row saved");
                Ok(stored)
            }
            Err(err) => {
                error!(table = M::TABLE, error = %err, "error saving row");
                Err(err)
            }
        }
    }

    /// Rows are loaded inside a read-only scope, which closes before the
    /// returned iterator is consumed.
    fn get(&self, filters: &[Filter], sort: Option<&SortSpec>) -> Result<Records<'_, M>> {
        let query = Self::select(filters, sort)?;
        let rows = self
            .sessions
            .session(true)
            .run(|session| session.execute(|conn| query.load::<M>(conn)))?;

        debug!(table = M::TABLE, rows = rows.len(), "rows loaded");
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn get_one(&self, filters: &[Filter]) -> Result<Option<M>> {
        let query = Self::select(filters, None)?.sql(" LIMIT 1");
        self.sessions
            .session(true)
            .run(|session| session.execute(|conn| query.get_result::<M>(conn).optional()))
    }

    fn delete(&self, identifier: Value) -> Result<()> {
        let filter = Filter::matching(M::PRIMARY_KEY, identifier);
        let predicates = Self::predicates(std::slice::from_ref(&filter))?;
        let query = apply_predicates(
            diesel::sql_query(format!("DELETE FROM {}", M::TABLE)).into_boxed(),
            predicates,
        );

        let result = self
            .sessions
            .session(false)
            .run(|session| session.execute(|conn| query.execute(conn)));

        match result {
            Ok(deleted) => {
                debug!(table = M::TABLE, deleted, "rows deleted");
                Ok(())
            }
            Err(err) => {
                error!(table = M::TABLE, error = %err, "error deleting row");
                Err(match err {
                    Error::StorageIntegrity(message) => Error::Storage(message),
                    other => other,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::testing::{count_records, record_pool, Record};
    use crate::domain::sort::SortDirection;

    fn storage() -> (tempfile::TempDir, SqlStorage<Record>) {
        let (dir, pool) = record_pool();
        (dir, SqlStorage::new(Arc::new(SessionProvider::new(pool))))
    }

    fn names(records: Records<'_, Record>) -> Vec<String> {
        records.map(|r| r.unwrap().test1).collect()
    }

    #[test]
    fn save_returns_stored_row() {
        let (_dir, storage) = storage();
        let saved = storage.save(Record::new("a").with_score(3)).unwrap();

        assert!(saved.id.is_some());
        assert_eq!(saved.test1, "a");
        assert_eq!(saved.score, 3);
    }

    #[test]
    fn unsorted_get_keeps_insertion_order() {
        let (_dir, storage) = storage();
        storage.save(Record::new("b")).unwrap();
        storage.save(Record::new("a")).unwrap();

        assert_eq!(names(storage.get(&[], None).unwrap()), vec!["b", "a"]);
    }

    #[test]
    fn get_sorts_in_either_direction() {
        let (_dir, storage) = storage();
        storage.save(Record::new("a")).unwrap();
        storage.save(Record::new("b")).unwrap();

        let desc = SortSpec::new("test1", SortDirection::Descending);
        assert_eq!(names(storage.get(&[], Some(&desc)).unwrap()), vec!["b", "a"]);

        let asc = SortSpec::ascending("test1");
        assert_eq!(names(storage.get(&[], Some(&asc)).unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn filters_combine_with_and() {
        let (_dir, storage) = storage();
        storage.save(Record::new("a").with_score(1)).unwrap();
        storage.save(Record::new("b").with_score(5).with_test2("x")).unwrap();
        storage.save(Record::new("c").with_score(9).with_test2("x")).unwrap();

        let filters = [Filter::matching("test2", "x"), Filter::lt("score", 9)];
        assert_eq!(names(storage.get(&filters, None).unwrap()), vec!["b"]);

        let between = [Filter::between("score", 1, 9)];
        assert_eq!(names(storage.get(&between, None).unwrap()), vec!["b"]);

        let unbounded = [Filter::range("score", None, None)];
        assert_eq!(storage.get(&unbounded, None).unwrap().count(), 3);

        let missing = [Filter::matching("test2", Value::Null)];
        assert_eq!(names(storage.get(&missing, None).unwrap()), vec!["a"]);
    }

    #[test]
    fn get_one_returns_first_match_or_none() {
        let (_dir, storage) = storage();
        storage.save(Record::new("a")).unwrap();
        storage.save(Record::new("b")).unwrap();

        let found = storage.get_one(&[Filter::matching("test1", "b")]).unwrap();
        assert_eq!(found.map(|r| r.test1), Some("b".to_string()));

        let first = storage.get_one(&[]).unwrap().unwrap();
        assert_eq!(first.test1, "a");

        assert!(storage
            .get_one(&[Filter::matching("test1", "z")])
            .unwrap()
            .is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let (_dir, storage) = storage();

        let result = storage.get(&[Filter::matching("nope", 1)], None);
        assert!(matches!(result, Err(Error::UnknownField { .. })));

        let result = storage.get(&[], Some(&SortSpec::ascending("nope")));
        assert!(matches!(result, Err(Error::UnknownField { .. })));

        let result = storage.get_one(&[Filter::gt("nope", 1)]);
        assert!(matches!(result, Err(Error::UnknownField { .. })));
    }

    #[test]
    fn duplicate_save_is_integrity_error() {
        let (_dir, storage) = storage();
        storage.save(Record::new("a")).unwrap();

        let err = storage.save(Record::new("a")).unwrap_err();
        assert!(err.is_integrity());
        assert_eq!(count_records(storage.sessions()), 1);
    }

    #[test]
    fn delete_removes_only_the_identified_row() {
        let (_dir, storage) = storage();
        let a = storage.save(Record::new("a")).unwrap();
        storage.save(Record::new("b")).unwrap();

        storage.delete(Value::from(a.id)).unwrap();

        assert_eq!(names(storage.get(&[], None).unwrap()), vec!["b"]);

        // Unknown identifiers delete nothing.
        storage.delete(Value::Int(999)).unwrap();
        assert_eq!(count_records(storage.sessions()), 1);
    }

    #[test]
    fn calls_join_an_open_scope() {
        let (_dir, storage) = storage();
        let sessions = Arc::clone(storage.sessions());

        let result: Result<()> = sessions.session(false).run(|_| {
            storage.save(Record::new("a"))?;
            // Read-your-writes inside the outer transaction.
            assert_eq!(storage.get(&[], None)?.count(), 1);
            Err(Error::Storage("abort".into()))
        });

        assert!(result.is_err());
        assert_eq!(count_records(&sessions), 0);
    }

    #[test]
    fn health_check_passes() {
        let (_dir, storage) = storage();
        assert!(storage.health_check());
    }
}
