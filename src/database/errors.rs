use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),
    #[error("Migration error: {0}")]
    MigrationError(String),
    #[error("Query error: {0}")]
    QueryError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Conflicting update: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DatabaseError::DuplicateKey(db_err.message().to_string())
            }
            other => DatabaseError::QueryError(other.to_string()),
        }
    }
}
