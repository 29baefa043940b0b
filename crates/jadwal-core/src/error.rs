use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Date window of {days} days exceeds the maximum of {max} days")]
    WindowTooWide { days: i64, max: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A range materialization stopped at `date`. Sessions created for earlier
    /// dates stay committed.
    #[error("Materialization aborted at {date} after creating {created} session(s)")]
    MaterializationAborted {
        date: NaiveDate,
        created: usize,
        #[source]
        source: Box<CoreError>,
    },
}

/// Whether a sqlx error is a uniqueness-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
