use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A filter was built or updated with a parameter it does not declare.
    #[error("parameter {name} not allowed for {filter} filter")]
    InvalidParameter { name: String, filter: &'static str },

    /// A filter or sort key does not name a field of the relational model.
    #[error("{model} has not the {field} property")]
    UnknownField { model: &'static str, field: String },

    #[error("collection not set")]
    CollectionNotSet,

    #[error("session not provided, call the session provider in order to get it")]
    SessionNotProvided,

    /// Uniqueness or other constraint violation reported by the relational engine.
    #[error("integrity error: {0}")]
    StorageIntegrity(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("storage type {0} not implemented")]
    UnsupportedStorageType(String),

    #[error("insert watch interrupted")]
    Interrupted,
}

impl Error {
    /// True for failures the caller may retry with different data.
    #[must_use]
    pub fn is_integrity(&self) -> bool {
        matches!(self, Error::StorageIntegrity(_))
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::DatabaseErrorKind;

        match err {
            diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::NotNullViolation
                | DatabaseErrorKind::CheckViolation,
                ref info,
            ) => Error::StorageIntegrity(info.message().to_string()),
            other => Error::Storage(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Error::Storage(err.to_string())
    }
}

/// Server error code for a unique index violation.
const MONGO_DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == MONGO_DUPLICATE_KEY,
        ErrorKind::BulkWrite(failure) => failure
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| e.code == MONGO_DUPLICATE_KEY)),
        _ => false,
    }
}

impl From<mongodb::error::Error> for Error {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            Error::StorageIntegrity(err.to_string())
        } else {
            Error::Storage(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind};

    struct Info(&'static str);

    impl DatabaseErrorInformation for Info {
        fn message(&self) -> &str {
            self.0
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            None
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    #[test]
    fn unique_violation_maps_to_integrity_error() {
        let err: Error = diesel::result::Error::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(Info("UNIQUE constraint failed: records.id")),
        )
        .into();

        assert!(err.is_integrity());
        assert!(err.to_string().contains("UNIQUE constraint failed"));
    }

    fn mongo_write_error(code: i32, message: &str) -> mongodb::error::Error {
        use mongodb::bson::doc;
        use mongodb::error::{ErrorKind, WriteError, WriteFailure};

        let failure: WriteError =
            mongodb::bson::from_document(doc! { "code": code, "errmsg": message }).unwrap();
        ErrorKind::Write(WriteFailure::WriteError(failure)).into()
    }

    #[test]
    fn mongo_duplicate_key_maps_to_integrity_error() {
        let err: Error = mongo_write_error(
            11000,
            "E11000 duplicate key error collection: news.articles index: _id_",
        )
        .into();

        assert!(err.is_integrity());
        assert!(err.to_string().contains("E11000"));
    }

    #[test]
    fn other_mongo_write_errors_map_to_storage_error() {
        let err: Error = mongo_write_error(121, "Document failed validation").into();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn other_diesel_errors_map_to_storage_error() {
        let err: Error = diesel::result::Error::NotFound.into();
        assert!(matches!(err, Error::Storage(_)));
        assert!(!err.is_integrity());
    }
}
