pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod keyboard_input;
pub mod registration;

pub use app::{ComponentState, RunSummary, ScannerAgent, ShutdownReason, TriggerHandles};
pub use camera::{
    CameraAvailability, CameraFacing, CameraHardware, CapturedImage, PendingCapture,
    ResourceLifecycleManager, ResourceLifecycleManagerBuilder,
};
pub use config::AgentConfig;
pub use error::{AgentError, CameraError, RegistrationError, Result};
pub use events::{AgentEvent, EventBus, EventFilter, EventReceiver, UserAction};
pub use identity::{device_name, DeviceIdentity, DeviceInfo};
pub use keyboard_input::KeyboardInputHandler;
pub use registration::{Endpoint, NotificationStatus, RegistrationClient};
