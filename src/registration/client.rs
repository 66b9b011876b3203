use super::endpoint::{Endpoint, RequestTarget};
use super::payload::NotificationPayload;
use super::status::NotificationStatus;
use crate::error::RegistrationError;
use crate::events::{AgentEvent, EventBus};
use crate::identity::DeviceIdentity;
use bytes::Bytes;
use http::header::{ACCEPT, CONNECTION, CONTENT_TYPE, HOST, TRANSFER_ENCODING};
use http::{Method, Request, StatusCode};
use http_body_util::Full;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::io;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Upper bound on the buffered response head
const MAX_RESPONSE_HEAD_BYTES: usize = 16 * 1024;

/// Announces this device to the scanner server over HTTP.
///
/// Every attempt reports `Starting` followed by exactly one terminal
/// status on the event bus; the terminal status is also returned.
pub struct RegistrationClient {
    event_bus: Arc<EventBus>,
    timeout: Duration,
}

impl RegistrationClient {
    pub fn new(event_bus: Arc<EventBus>, timeout: Duration) -> Self {
        Self { event_bus, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one notification attempt to completion
    pub async fn notify(
        &self,
        endpoint: &Endpoint,
        identity: &DeviceIdentity,
        device_name: &str,
    ) -> NotificationStatus {
        self.emit(NotificationStatus::Starting);

        let status = match self.send_notification(endpoint, identity, device_name).await {
            Ok(status_code) => {
                info!("Scanner server answered {}", status_code);
                NotificationStatus::Delivered
            }
            Err(e) => {
                error!("Server notification failed: {}", e);
                e.status()
            }
        };

        self.emit(status);
        status
    }

    /// Run a notification attempt in the background
    pub fn spawn_notify(
        self: &Arc<Self>,
        endpoint: Endpoint,
        identity: DeviceIdentity,
        device_name: String,
    ) -> JoinHandle<NotificationStatus> {
        let client = Arc::clone(self);
        tokio::spawn(async move { client.notify(&endpoint, &identity, &device_name).await })
    }

    async fn send_notification(
        &self,
        endpoint: &Endpoint,
        identity: &DeviceIdentity,
        device_name: &str,
    ) -> Result<StatusCode, RegistrationError> {
        let target = endpoint.resolve()?;
        debug!("URL: {}", target);

        let stream = self.connect(&target).await?;
        debug!("Connected to {}", target.authority());

        let (parts, ()) = Request::builder()
            .method(Method::POST)
            .uri(target.path())
            .header(HOST, target.authority())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(TRANSFER_ENCODING, "chunked")
            .header(CONNECTION, "close")
            .body(())
            .map_err(|e| RegistrationError::ProtocolConfiguration {
                details: e.to_string(),
            })?
            .into_parts();

        let body = NotificationPayload::new(device_name, identity).to_json()?;
        debug!("Payload: {} bytes", body.len());
        let request = Request::from_parts(parts, Full::new(Bytes::from(body)));

        let (mut sender, connection) = http1::Builder::new()
            .title_case_headers(true)
            .max_buf_size(MAX_RESPONSE_HEAD_BYTES)
            .handshake(TokioIo::new(stream))
            .await
            .map_err(|e| RegistrationError::ProtocolConfiguration {
                details: e.to_string(),
            })?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!("Server connection ended: {}", e);
            }
        });

        let result = match timeout(self.timeout, sender.send_request(request)).await {
            Ok(Ok(response)) => {
                debug!("Response headers: {:?}", response.headers());
                Ok(response.status())
            }
            Ok(Err(e)) => Err(classify_exchange_error(e)),
            Err(_) => Err(RegistrationError::ResponseRead {
                details: format!("no response within {:?}", self.timeout),
            }),
        };

        if result.is_err() {
            driver.abort();
        }
        result
    }

    async fn connect(&self, target: &RequestTarget) -> Result<TcpStream, RegistrationError> {
        let connection_error = |source: io::Error| RegistrationError::Connection {
            target: target.authority(),
            source,
        };

        match timeout(
            self.timeout,
            TcpStream::connect((target.host(), target.port())),
        )
        .await
        {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(connection_error(e)),
            Err(_) => Err(connection_error(io::Error::new(
                io::ErrorKind::TimedOut,
                "connect timed out",
            ))),
        }
    }

    fn emit(&self, status: NotificationStatus) {
        if let Err(e) = self.event_bus.publish(AgentEvent::NotificationStatusChanged {
            status,
            timestamp: SystemTime::now(),
        }) {
            warn!("Failed to publish notification status {}: {}", status, e);
        }
    }
}

/// Split a failed exchange into the request write and response read steps
fn classify_exchange_error(e: hyper::Error) -> RegistrationError {
    if e.is_body_write_aborted() || e.is_canceled() || e.is_closed() || e.is_user() {
        RegistrationError::Send(e)
    } else {
        RegistrationError::ResponseRead {
            details: e.to_string(),
        }
    }
}
