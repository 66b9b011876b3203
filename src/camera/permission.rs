use super::hardware::{Permission, PermissionOutcome, PermissionRequester};
use crate::events::{AgentEvent, EventBus};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A fire-and-forget permission prompt.
///
/// The outcome is only published on the event bus; it never touches
/// lifecycle state. The next lifecycle cycle re-queries the driver.
pub struct PermissionRequest {
    cancellation_token: CancellationToken,
    task: JoinHandle<()>,
}

impl PermissionRequest {
    /// Spawn the prompt on the current runtime. Returns `None` outside a
    /// tokio runtime.
    pub fn spawn(
        requester: Arc<dyn PermissionRequester>,
        event_bus: Arc<EventBus>,
        permissions: Vec<Permission>,
    ) -> Option<Self> {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime available, camera permission request skipped");
                return None;
            }
        };

        let cancellation_token = CancellationToken::new();
        let token = cancellation_token.clone();

        info!("Requesting permissions: {:?}", permissions);

        let task = handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Permission request cancelled");
                }
                outcome = requester.request(&permissions) => {
                    let granted = outcome == PermissionOutcome::Granted;
                    info!("Permission request answered: {:?}", outcome);
                    let _ = event_bus.publish(AgentEvent::PermissionResult {
                        granted,
                        timestamp: SystemTime::now(),
                    });
                }
            }
        });

        Some(Self {
            cancellation_token,
            task,
        })
    }

    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PermissionRequest {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}
