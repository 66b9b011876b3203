use crate::camera::CameraAvailability;
use crate::error::EventBusError;
use crate::registration::NotificationStatus;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Actions the surrounding shell can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserAction {
    /// Host came to the foreground
    Resume,
    /// Host went to the background
    Pause,
    /// Take a picture and announce the device
    Trigger,
}

/// Events that can occur in the scanner agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    /// Camera availability was recomputed after an acquire attempt
    CameraAvailabilityChanged {
        availability: CameraAvailability,
        timestamp: SystemTime,
    },
    /// A capture completed and the image was decoded
    ImageCaptured {
        generation: u64,
        width: u32,
        height: u32,
        timestamp: SystemTime,
    },
    /// A capture could not be completed
    CaptureFailed { error: String, timestamp: SystemTime },
    /// Progress of a server notification
    NotificationStatusChanged {
        status: NotificationStatus,
        timestamp: SystemTime,
    },
    /// The permission prompt answered
    PermissionResult { granted: bool, timestamp: SystemTime },
    /// The user or host requested an action
    UserAction {
        action: UserAction,
        timestamp: SystemTime,
    },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl AgentEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            AgentEvent::CameraAvailabilityChanged { timestamp, .. } => *timestamp,
            AgentEvent::ImageCaptured { timestamp, .. } => *timestamp,
            AgentEvent::CaptureFailed { timestamp, .. } => *timestamp,
            AgentEvent::NotificationStatusChanged { timestamp, .. } => *timestamp,
            AgentEvent::PermissionResult { timestamp, .. } => *timestamp,
            AgentEvent::UserAction { timestamp, .. } => *timestamp,
            AgentEvent::ShutdownRequested { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            AgentEvent::CameraAvailabilityChanged { availability, .. } => {
                format!("Camera: {}", availability.user_message())
            }
            AgentEvent::ImageCaptured {
                generation,
                width,
                height,
                ..
            } => {
                format!(
                    "Image captured {}x{} (camera generation {})",
                    width, height, generation
                )
            }
            AgentEvent::CaptureFailed { error, .. } => format!("Capture failed: {}", error),
            AgentEvent::NotificationStatusChanged { status, .. } => {
                format!("Server: {}", status.user_message())
            }
            AgentEvent::PermissionResult { granted, .. } => format!(
                "Camera permission {}",
                if *granted { "granted" } else { "denied" }
            ),
            AgentEvent::UserAction { action, .. } => format!("User action: {:?}", action),
            AgentEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            AgentEvent::CameraAvailabilityChanged { .. } => "camera_availability_changed",
            AgentEvent::ImageCaptured { .. } => "image_captured",
            AgentEvent::CaptureFailed { .. } => "capture_failed",
            AgentEvent::NotificationStatusChanged { .. } => "notification_status_changed",
            AgentEvent::PermissionResult { .. } => "permission_result",
            AgentEvent::UserAction { .. } => "user_action",
            AgentEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Event bus for component coordination using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<AgentEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Never blocks, so it is safe to call from hardware callback threads.
    pub fn publish(&self, event: AgentEvent) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        match &event {
            AgentEvent::CameraAvailabilityChanged { .. }
            | AgentEvent::ImageCaptured { .. }
            | AgentEvent::NotificationStatusChanged { .. } => {
                info!("{}", event.description());
            }
            AgentEvent::CaptureFailed { error, .. } => {
                warn!("Capture failed: {}", error);
            }
            AgentEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&AgentEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &AgentEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<AgentEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(
        receiver: broadcast::Receiver<AgentEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<AgentEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<AgentEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let subscriber_count = event_bus
            .publish(AgentEvent::NotificationStatusChanged {
                status: NotificationStatus::Starting,
                timestamp: SystemTime::now(),
            })
            .unwrap();
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            AgentEvent::NotificationStatusChanged { status, .. } => {
                assert_eq!(status, NotificationStatus::Starting);
            }
            _ => panic!("Unexpected event type"),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_fails() {
        let event_bus = EventBus::new(10);
        assert!(!event_bus.has_subscribers());

        let result = event_bus.publish(AgentEvent::PermissionResult {
            granted: true,
            timestamp: SystemTime::now(),
        });
        assert!(matches!(result, Err(EventBusError::PublishFailed { .. })));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus
            .publish(AgentEvent::UserAction {
                action: UserAction::Trigger,
                timestamp: SystemTime::now(),
            })
            .unwrap();

        let _ = timeout(Duration::from_millis(100), receiver1.recv())
            .await
            .unwrap()
            .unwrap();
        let _ = timeout(Duration::from_millis(100), receiver2.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::EventTypes(vec!["user_action", "permission_result"]);

        let action = AgentEvent::UserAction {
            action: UserAction::Pause,
            timestamp: SystemTime::now(),
        };
        let captured = AgentEvent::ImageCaptured {
            generation: 1,
            width: 640,
            height: 480,
            timestamp: SystemTime::now(),
        };

        assert!(filter.matches(&action));
        assert!(!filter.matches(&captured));
        assert!(EventFilter::All.matches(&captured));
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let receiver = event_bus.subscribe();
        let filter = EventFilter::EventTypes(vec!["image_captured"]);
        let mut filtered = EventReceiver::new(receiver, filter, "test".to_string());

        event_bus
            .publish(AgentEvent::PermissionResult {
                granted: false,
                timestamp: SystemTime::now(),
            })
            .unwrap();
        event_bus
            .publish(AgentEvent::ImageCaptured {
                generation: 3,
                width: 1920,
                height: 1080,
                timestamp: SystemTime::now(),
            })
            .unwrap();

        match timeout(Duration::from_millis(100), filtered.recv())
            .await
            .unwrap()
            .unwrap()
        {
            AgentEvent::ImageCaptured { generation, .. } => assert_eq!(generation, 3),
            other => panic!("Unexpected event: {:?}", other),
        }

        assert!(filtered.try_recv().unwrap().is_none());
    }
}
