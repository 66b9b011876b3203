use crate::registration::NotificationStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl AgentError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event bus channel closed")]
    ChannelClosed,
}

/// Failures raised by the camera driver or the lifecycle manager
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Failed to open camera {camera_id}: {details}")]
    DeviceOpen { camera_id: u32, details: String },

    #[error("Camera reported no supported picture sizes")]
    NoSupportedResolutions,

    #[error("Camera is not open")]
    NotOpen,

    #[error("A capture is already in flight")]
    CaptureInFlight,

    #[error("Camera hardware error: {details}")]
    Hardware { details: String },

    #[error("Failed to decode captured image: {details}")]
    Decode { details: String },

    #[error("Camera was released before the capture completed")]
    Released,
}

impl CameraError {
    pub fn hardware<S: Into<String>>(details: S) -> Self {
        Self::Hardware {
            details: details.into(),
        }
    }
}

/// Failures of a single registration attempt, one per protocol step
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Malformed endpoint: {details}")]
    MalformedEndpoint { details: String },

    #[error("Failed to connect to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid request configuration: {details}")]
    ProtocolConfiguration { details: String },

    #[error("Failed to build notification payload: {0}")]
    PayloadConstruction(#[from] serde_json::Error),

    #[error("Failed to send notification: {0}")]
    Send(#[source] hyper::Error),

    #[error("Failed to read server response: {details}")]
    ResponseRead { details: String },
}

impl RegistrationError {
    /// Coarse status surfaced to the caller for this failure
    pub fn status(&self) -> NotificationStatus {
        match self {
            RegistrationError::MalformedEndpoint { .. } => NotificationStatus::MalformedEndpoint,
            RegistrationError::Connection { .. } => NotificationStatus::ConnectionError,
            RegistrationError::ProtocolConfiguration { .. } => {
                NotificationStatus::ProtocolConfigurationError
            }
            RegistrationError::PayloadConstruction(_) => {
                NotificationStatus::PayloadConstructionError
            }
            RegistrationError::Send(_) => NotificationStatus::SendError,
            RegistrationError::ResponseRead { .. } => NotificationStatus::ResponseReadError,
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
