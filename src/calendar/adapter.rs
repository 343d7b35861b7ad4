use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

use super::CalendarStore;
use crate::error::AppResult;
use crate::models::{EventDraft, EventRecord};
use crate::utils::logging::log_store_operation;
use crate::utils::time::{millis_to_seconds, seconds_to_datetime};

/// Projects the native calendar store onto bridge records.
///
/// Holds no event state of its own: every call goes to the store.
#[derive(Clone)]
pub struct CalendarAdapter {
    store: Arc<dyn CalendarStore>,
}

impl CalendarAdapter {
    pub fn new(store: Arc<dyn CalendarStore>) -> Self {
        Self { store }
    }

    /// Events overlapping `[start_millis, end_millis]`, in store order.
    pub async fn get_events(&self, start_millis: f64, end_millis: f64) -> AppResult<Vec<EventRecord>> {
        let start_secs = millis_to_seconds(start_millis);
        let end_secs = millis_to_seconds(end_millis);
        debug!(
            "Querying events between {:?} and {:?}",
            seconds_to_datetime(start_secs),
            seconds_to_datetime(end_secs)
        );

        let started = Instant::now();
        let events = self.store.events_between(start_secs, end_secs).await?;
        log_store_operation("events_between", events.len(), started.elapsed());

        Ok(events.into_iter().map(EventRecord::from).collect())
    }

    /// Creates an event from already-validated fields.
    pub async fn create_event(&self, draft: EventDraft) -> AppResult<EventRecord> {
        let started = Instant::now();
        let created = self.store.create_event(draft.into_native()).await?;
        log_store_operation("create_event", 1, started.elapsed());

        info!("Created calendar event {}", created.id);
        Ok(created.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{MockCalendarStore, StoreError};
    use crate::error::ErrorCode;
    use crate::models::NativeEvent;
    use mockall::predicate::eq;

    fn native(id: &str, start_secs: f64, end_secs: f64) -> NativeEvent {
        NativeEvent {
            id: id.to_string(),
            title: format!("Event {}", id),
            start_secs,
            end_secs,
            location: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_get_events_converts_range_and_records() {
        let mut store = MockCalendarStore::new();
        store
            .expect_events_between()
            .with(eq(0.0), eq(86_400.0))
            .times(1)
            .returning(|_, _| Ok(vec![native("a", 0.0, 3600.0)]));

        let adapter = CalendarAdapter::new(Arc::new(store));
        let events = adapter.get_events(0.0, 86_400_000.0).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_millis, 0.0);
        assert_eq!(events[0].end_millis, 3_600_000.0);
        assert_eq!(events[0].location, "");
    }

    #[tokio::test]
    async fn test_create_event_passes_seconds_to_store() {
        let mut store = MockCalendarStore::new();
        store.expect_create_event().times(1).returning(|new| {
            assert_eq!(new.start_secs, 60.0);
            assert_eq!(new.end_secs, 120.0);
            Ok(NativeEvent {
                id: "created".to_string(),
                title: new.title,
                start_secs: new.start_secs,
                end_secs: new.end_secs,
                location: new.location,
                notes: new.notes,
            })
        });

        let adapter = CalendarAdapter::new(Arc::new(store));
        let draft = EventDraft {
            title: "Lunch".to_string(),
            start_millis: 60_000.0,
            end_millis: 120_000.0,
            location: Some("Cafe".to_string()),
            notes: None,
        };
        let record = adapter.create_event(draft).await.unwrap();
        assert_eq!(record.id, "created");
        assert_eq!(record.end_millis, 120_000.0);
        assert_eq!(record.location, "Cafe");
        assert_eq!(record.notes, "");
    }

    #[tokio::test]
    async fn test_store_failures_keep_their_message() {
        let mut store = MockCalendarStore::new();
        store
            .expect_create_event()
            .returning(|_| Err(StoreError::Failed("calendar is read-only".to_string())));
        store
            .expect_events_between()
            .returning(|_, _| Err(StoreError::PermissionDenied("not authorized".to_string())));

        let adapter = CalendarAdapter::new(Arc::new(store));
        let draft = EventDraft {
            title: "x".to_string(),
            start_millis: 0.0,
            end_millis: 0.0,
            location: None,
            notes: None,
        };

        let err = adapter.create_event(draft).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoreError);
        assert_eq!(err.message(), "calendar is read-only");

        let err = adapter.get_events(0.0, 1.0).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }
}
