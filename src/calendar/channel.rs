use async_trait::async_trait;

use super::CalendarAdapter;
use crate::bridge::{MethodCall, MethodHandler, MethodResult, CALENDAR_CHANNEL};
use crate::error::{AppError, AppResult};
use crate::models::EventDraft;
use crate::utils::logging::log_bridge_failure;

/// Bridge handler for `ai.assistant/calendar`.
pub struct CalendarChannel {
    adapter: CalendarAdapter,
}

impl CalendarChannel {
    pub fn new(adapter: CalendarAdapter) -> Self {
        Self { adapter }
    }

    async fn get_events(&self, call: &MethodCall) -> AppResult<MethodResult> {
        let (start, end) = match (call.number("start"), call.number("end")) {
            (Ok(start), Ok(end)) => (start, end),
            _ => return Err(AppError::invalid_args("Invalid arguments")),
        };
        let events = self.adapter.get_events(start, end).await?;
        Ok(MethodResult::success(events))
    }

    async fn create_event(&self, call: &MethodCall) -> AppResult<MethodResult> {
        let draft = EventDraft::from_map(call.arguments_map()?)?;
        let created = self.adapter.create_event(draft).await?;
        Ok(MethodResult::success(created))
    }
}

#[async_trait]
impl MethodHandler for CalendarChannel {
    async fn handle(&self, call: MethodCall) -> MethodResult {
        let outcome = match call.method.as_str() {
            "getEvents" => self.get_events(&call).await,
            "createEvent" => self.create_event(&call).await,
            _ => return MethodResult::NotImplemented,
        };

        outcome.unwrap_or_else(|e| {
            log_bridge_failure(CALENDAR_CHANNEL, &call.method, &e);
            e.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::MockCalendarStore;
    use crate::error::ErrorCode;
    use serde_json::json;
    use std::sync::Arc;

    fn channel_with(store: MockCalendarStore) -> CalendarChannel {
        CalendarChannel::new(CalendarAdapter::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn test_get_events_requires_numeric_bounds() {
        let mut store = MockCalendarStore::new();
        store.expect_events_between().times(0);
        let channel = channel_with(store);

        for args in [json!(null), json!({"start": 0}), json!({"start": "0", "end": 10}), json!([0, 10])] {
            let result = channel.handle(MethodCall::new("getEvents", args)).await;
            assert_eq!(result.error_code(), Some(ErrorCode::InvalidArgs));
        }
    }

    #[tokio::test]
    async fn test_create_event_with_missing_fields_never_touches_store() {
        let mut store = MockCalendarStore::new();
        store.expect_create_event().times(0);
        let channel = channel_with(store);

        for args in [
            json!(null),
            json!({}),
            json!({"title": "Sync"}),
            json!({"title": "Sync", "start": 0}),
            json!({"start": 0, "end": 1000}),
        ] {
            let result = channel.handle(MethodCall::new("createEvent", args)).await;
            assert_eq!(result.error_code(), Some(ErrorCode::InvalidArgs));
        }
    }

    #[tokio::test]
    async fn test_get_events_replies_with_records() {
        let mut store = MockCalendarStore::new();
        store.expect_events_between().returning(|_, _| {
            Ok(vec![crate::models::NativeEvent {
                id: "e1".to_string(),
                title: "Demo".to_string(),
                start_secs: 10.0,
                end_secs: 20.0,
                location: Some("HQ".to_string()),
                notes: None,
            }])
        });
        let channel = channel_with(store);

        let result = channel
            .handle(MethodCall::new("getEvents", json!({"start": 0, "end": 60000})))
            .await;
        let value = result.into_value().unwrap();
        assert_eq!(
            value,
            json!([{"id": "e1", "title": "Demo", "start": 10000.0, "end": 20000.0, "location": "HQ", "notes": ""}])
        );
    }

    #[tokio::test]
    async fn test_unknown_method_is_not_implemented() {
        let channel = channel_with(MockCalendarStore::new());
        let result = channel.handle(MethodCall::bare("deleteEverything")).await;
        assert!(matches!(result, MethodResult::NotImplemented));
    }
}
