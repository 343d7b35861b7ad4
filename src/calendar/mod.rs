// Calendar integration module
// Exposes a native calendar store to the shell through the calendar channel.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::AppError;
use crate::models::{NativeEvent, NewNativeEvent};

pub mod adapter;
pub mod channel;
pub mod sqlite;

pub use adapter::CalendarAdapter;
pub use channel::CalendarChannel;
pub use sqlite::SqliteCalendarStore;

/// Failures reported by a native calendar store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("calendar access denied: {0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::PermissionDenied(msg) => AppError::PermissionDenied(msg),
            StoreError::Failed(msg) => AppError::Store(msg),
            StoreError::Database(e) => AppError::Store(e.to_string()),
        }
    }
}

/// The device calendar database. Times are epoch seconds.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Every event intersecting the closed interval `[start_secs, end_secs]`.
    async fn events_between(&self, start_secs: f64, end_secs: f64) -> Result<Vec<NativeEvent>, StoreError>;

    async fn create_event(&self, event: NewNativeEvent) -> Result<NativeEvent, StoreError>;
}
