use serde::{Deserialize, Serialize};

/// Outcome of a server notification, one variant per protocol step that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Attempt has begun
    Starting,
    /// Host or port cannot form a valid URL
    MalformedEndpoint,
    /// Connection could not be established
    ConnectionError,
    /// Request method or headers were rejected
    ProtocolConfigurationError,
    /// Payload could not be serialized
    PayloadConstructionError,
    /// Writing the request failed
    SendError,
    /// Response status could not be read
    ResponseReadError,
    /// Server answered; any status code counts
    Delivered,
}

impl NotificationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, NotificationStatus::Starting)
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, NotificationStatus::Delivered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Starting => "starting",
            NotificationStatus::MalformedEndpoint => "malformed_endpoint",
            NotificationStatus::ConnectionError => "connection_error",
            NotificationStatus::ProtocolConfigurationError => "protocol_configuration_error",
            NotificationStatus::PayloadConstructionError => "payload_construction_error",
            NotificationStatus::SendError => "send_error",
            NotificationStatus::ResponseReadError => "response_read_error",
            NotificationStatus::Delivered => "delivered",
        }
    }

    /// Text shown to the operator
    pub fn user_message(&self) -> &'static str {
        match self {
            NotificationStatus::Starting => "Connecting to scanner server...",
            NotificationStatus::MalformedEndpoint => "Malformed server address",
            NotificationStatus::ConnectionError => "Could not connect to scanner server",
            NotificationStatus::ProtocolConfigurationError => "Request setup failed",
            NotificationStatus::PayloadConstructionError => "Could not build device notification",
            NotificationStatus::SendError => "Could not send device notification",
            NotificationStatus::ResponseReadError => "No response from scanner server",
            NotificationStatus::Delivered => "Scanner server notified",
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
