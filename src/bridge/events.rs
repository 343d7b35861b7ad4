use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// An asynchronous notification pushed to the shell outside any request/reply pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeEvent {
    pub event: String,
    pub channel: String,
    #[serde(default)]
    pub payload: Value,
}

impl BridgeEvent {
    pub fn new<C: Into<String>, E: Into<String>>(channel: C, event: E, payload: Value) -> Self {
        Self {
            event: event.into(),
            channel: channel.into(),
            payload,
        }
    }
}

/// Where adapters publish lifecycle events. A disconnected sink drops them.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<BridgeEvent>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<BridgeEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn channel() -> (Self, UnboundedReceiver<BridgeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: BridgeEvent) {
        match &self.tx {
            Some(tx) => {
                if let Err(e) = tx.send(event) {
                    debug!("Dropping '{}' event: listener gone", e.0.event);
                }
            }
            None => debug!("Dropping '{}' event: no listener attached", event.event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_emit_reaches_receiver() {
        let (sink, mut rx) = EventSink::channel();
        sink.emit(BridgeEvent::new("ch", "start", json!({"utteranceId": 1})));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event, "start");
        assert_eq!(event.payload["utteranceId"], 1);
    }

    #[test]
    fn test_disconnected_sink_drops_silently() {
        let sink = EventSink::disconnected();
        sink.emit(BridgeEvent::new("ch", "end", Value::Null));

        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(BridgeEvent::new("ch", "end", Value::Null));
    }
}
