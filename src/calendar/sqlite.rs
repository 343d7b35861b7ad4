use async_trait::async_trait;
use log::warn;
use uuid::Uuid;

use super::{CalendarStore, StoreError};
use crate::database::Database;
use crate::models::{NativeEvent, NewNativeEvent};

// Primary SQLite result codes that mean "not allowed" rather than "broken".
const SQLITE_PERM: i64 = 3;
const SQLITE_READONLY: i64 = 8;
const SQLITE_AUTH: i64 = 23;

/// Calendar store backed by the local SQLite database.
#[derive(Clone)]
pub struct SqliteCalendarStore {
    db: Database,
    writable: bool,
}

impl SqliteCalendarStore {
    pub fn new(db: Database) -> Self {
        Self { db, writable: true }
    }

    /// A store that denies every mutation, as a device calendar without write access does.
    pub fn read_only(db: Database) -> Self {
        Self { db, writable: false }
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

fn map_sqlx_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_error) = &error {
        let primary = db_error
            .code()
            .and_then(|code| code.parse::<i64>().ok())
            .map(|code| code & 0xff);
        if matches!(primary, Some(SQLITE_PERM | SQLITE_READONLY | SQLITE_AUTH)) {
            return StoreError::PermissionDenied(db_error.message().to_string());
        }
    }
    StoreError::Database(error)
}

#[async_trait]
impl CalendarStore for SqliteCalendarStore {
    async fn events_between(&self, start_secs: f64, end_secs: f64) -> Result<Vec<NativeEvent>, StoreError> {
        self.db
            .events_between(start_secs, end_secs)
            .await
            .map_err(map_sqlx_error)
    }

    async fn create_event(&self, event: NewNativeEvent) -> Result<NativeEvent, StoreError> {
        if !self.writable {
            warn!("Rejected event creation on read-only calendar store");
            return Err(StoreError::PermissionDenied(
                "calendar store is read-only".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        self.db.insert_event(&id, &event).await.map_err(map_sqlx_error)
    }
}
