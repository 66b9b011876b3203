use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Camera availability as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraAvailability {
    NoHardwareFeature,
    PermissionDenied,
    Available,
}

impl CameraAvailability {
    pub fn is_available(&self) -> bool {
        matches!(self, CameraAvailability::Available)
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            CameraAvailability::NoHardwareFeature => "This device has no camera.",
            CameraAvailability::PermissionDenied => {
                "The camera is disabled. Please allow camera access."
            }
            CameraAvailability::Available => "The camera is available.",
        }
    }
}

/// States of the camera resource across one lifecycle cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unchecked,
    NoFeature,
    Checked,
    PermissionDenied,
    Open,
    Previewing,
    CaptureInFlight,
    Released,
}

impl LifecycleState {
    /// Whether a camera handle is held in this state
    pub fn holds_resource(&self) -> bool {
        matches!(
            self,
            LifecycleState::Open | LifecycleState::Previewing | LifecycleState::CaptureInFlight
        )
    }
}

/// A decoded picture delivered by the capture callback
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// Generation of the camera handle that produced the picture
    pub generation: u64,
    pub width: u32,
    pub height: u32,
    /// Size of the encoded bytes received from the driver
    pub encoded_len: usize,
    pub captured_at: DateTime<Utc>,
    pub image: DynamicImage,
}
