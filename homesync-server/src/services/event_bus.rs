use homesync_api::models::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    HealthChanged {
        device_id: DeviceId,
        health: Health,
        consecutive_failures: u32,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    ReadingUpdated {
        device_id: DeviceId,
        metric: Capability,
        value: Value,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    IntentResolved {
        intent_id: Uuid,
        device_id: DeviceId,
        capability: Capability,
        status: IntentStatus,
        retry_count: u32,
    },
    /// Polled state disagrees with the last applied command
    StateDrift {
        device_id: DeviceId,
        capability: Capability,
        desired: Value,
        observed: Value,
    },
}

pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);

        Self { sender }
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: SyncEvent) -> usize {
        // Sending with no subscribers is not an error for us
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new(8);
        let mut receiver = bus.subscribe();

        assert!(bus.has_subscribers());

        let event = SyncEvent::StateDrift {
            device_id: "kitchen".into(),
            capability: Capability::OnOff,
            desired: Value::Bool(true),
            observed: Value::Bool(false),
        };
        assert_eq!(bus.publish(event.clone()), 1);

        assert_eq!(receiver.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();

        let delivered = bus.publish(SyncEvent::HealthChanged {
            device_id: "motion".into(),
            health: Health::Degraded,
            consecutive_failures: 3,
            timestamp: OffsetDateTime::now_utc(),
        });

        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_event_is_tagged() {
        let json = serde_json::to_value(SyncEvent::IntentResolved {
            intent_id: Uuid::nil(),
            device_id: "main_outlet".into(),
            capability: Capability::OnOff,
            status: IntentStatus::Applied,
            retry_count: 0,
        })
        .unwrap();

        assert_eq!(json["type"], "intent_resolved");
        assert_eq!(json["status"], "applied");
    }
}
