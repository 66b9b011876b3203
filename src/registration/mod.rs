//! Server registration: announces this device to the scanner server
//! with a single chunked JSON POST and reports a per-step status.

pub mod client;
pub mod endpoint;
pub mod payload;
pub mod status;


pub use client::RegistrationClient;
pub use endpoint::{Endpoint, RequestTarget, DEFAULT_PORT, NOTIFICATION_PATH};
pub use payload::NotificationPayload;
pub use status::NotificationStatus;
