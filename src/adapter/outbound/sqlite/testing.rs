//! Row model and fixtures shared by the SQLite unit tests.

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Nullable, Text};
use tempfile::TempDir;

use super::database::connection::{create_pool, init_sql_db, DbPool};
use super::database::model::SqlModel;
use super::session::SessionProvider;

diesel::table! {
    records (id) {
        id -> Integer,
        test1 -> Text,
        test2 -> Nullable<Text>,
        score -> BigInt,
    }
}

#[derive(Debug, Clone, PartialEq, QueryableByName)]
pub struct Record {
    #[diesel(sql_type = Nullable<Integer>)]
    pub id: Option<i32>,
    #[diesel(sql_type = Text)]
    pub test1: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub test2: Option<String>,
    #[diesel(sql_type = BigInt)]
    pub score: i64,
}

impl Record {
    pub fn new(test1: &str) -> Self {
        Self {
            id: None,
            test1: test1.to_string(),
            test2: None,
            score: 0,
        }
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = score;
        self
    }

    pub fn with_test2(mut self, test2: &str) -> Self {
        self.test2 = Some(test2.to_string());
        self
    }
}

impl SqlModel for Record {
    const TABLE: &'static str = "records";
    const PRIMARY_KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "test1", "test2", "score"];
    const SCHEMA: &'static str = "CREATE TABLE IF NOT EXISTS records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        test1 TEXT NOT NULL UNIQUE,
        test2 TEXT,
        score BIGINT NOT NULL DEFAULT 0
    )";

    fn insert(&self, conn: &mut SqliteConnection) -> QueryResult<usize> {
        match self.id {
            Some(id) => diesel::insert_into(records::table)
                .values((
                    records::id.eq(id),
                    records::test1.eq(&self.test1),
                    records::test2.eq(self.test2.as_deref()),
                    records::score.eq(self.score),
                ))
                .execute(conn),
            None => diesel::insert_into(records::table)
                .values((
                    records::test1.eq(&self.test1),
                    records::test2.eq(self.test2.as_deref()),
                    records::score.eq(self.score),
                ))
                .execute(conn),
        }
    }
}

#[derive(QueryableByName)]
struct Count {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// File-backed pool with the `records` table created.
pub fn record_pool() -> (TempDir, DbPool) {
    let dir = tempfile::tempdir().unwrap();
    let url = dir.path().join("records.db");
    let pool = create_pool(url.to_str().unwrap(), 4).unwrap();
    init_sql_db::<Record>(&pool, None).unwrap();
    (dir, pool)
}

/// Committed row count, read through a fresh read-only scope.
pub fn count_records(provider: &SessionProvider) -> i64 {
    provider
        .session(true)
        .run(|session| {
            session.execute(|conn| {
                diesel::sql_query("SELECT COUNT(*) AS count FROM records").get_result::<Count>(conn)
            })
        })
        .unwrap()
        .count
}
