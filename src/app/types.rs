use crate::camera::{CameraAvailability, CapturedImage};
use crate::error::CameraError;
use crate::registration::NotificationStatus;
use tokio::task::JoinHandle;

/// Component lifecycle states
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// System shutdown reason
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    UserRequest,
    Error(String),
}

/// Background work started by one trigger
pub struct TriggerHandles {
    /// `None` when no capture could be started (camera not open or busy)
    pub capture: Option<JoinHandle<Result<CapturedImage, CameraError>>>,
    pub notification: JoinHandle<NotificationStatus>,
}

/// Result of a single resume/trigger/pause cycle
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub availability: CameraAvailability,
    pub capture: Option<Result<(u32, u32), CameraError>>,
    pub notification: NotificationStatus,
}

impl RunSummary {
    /// Zero when the server was reached
    pub fn exit_code(&self) -> i32 {
        if self.notification.is_delivered() {
            0
        } else {
            1
        }
    }
}
