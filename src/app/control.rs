use super::state::CAMERA;
use super::types::{RunSummary, TriggerHandles};
use super::{ComponentState, ScannerAgent};
use crate::error::{AgentError, CameraError, Result};
use crate::events::{AgentEvent, UserAction};
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

impl ScannerAgent {
    /// Host went to the background: release the camera
    pub async fn pause(&self) {
        self.resumed.store(false, Ordering::SeqCst);
        self.camera.release();
        self.set_component_state(CAMERA, ComponentState::Stopped)
            .await;
    }

    /// Capture button: take a picture if the camera is open and announce
    /// the device to the server either way.
    pub fn trigger(&self) -> TriggerHandles {
        let capture = match self.camera.capture() {
            Ok(pending) => {
                debug!("Capture started (generation {})", pending.generation());
                Some(tokio::spawn(pending))
            }
            Err(CameraError::NotOpen) => {
                info!("Camera is not open, skipping capture");
                None
            }
            Err(e) => {
                warn!("Capture could not be started: {}", e);
                let _ = self.event_bus.publish(AgentEvent::CaptureFailed {
                    error: e.to_string(),
                    timestamp: std::time::SystemTime::now(),
                });
                None
            }
        };

        let notification = self.registration.spawn_notify(
            self.endpoint(),
            self.identity,
            self.device_name.clone(),
        );

        TriggerHandles {
            capture,
            notification,
        }
    }

    /// Start a fresh lifecycle cycle so a new permission grant is picked up
    pub async fn recycle_camera(&self) {
        if !self.resumed.load(Ordering::SeqCst) {
            debug!("Agent is paused, permission grant applies on next resume");
            return;
        }

        info!("Camera permission granted, reopening camera");
        self.camera.release();
        self.resume().await;
    }

    /// React to one event from the bus
    pub(super) async fn handle_event(&self, event: &AgentEvent) {
        match event {
            AgentEvent::UserAction { action, .. } => match action {
                UserAction::Resume => {
                    self.resume().await;
                }
                UserAction::Pause => self.pause().await,
                UserAction::Trigger => {
                    // Results are reported on the bus
                    let _ = self.trigger();
                }
            },
            AgentEvent::PermissionResult { granted: true, .. } => self.recycle_camera().await,
            AgentEvent::PermissionResult { granted: false, .. } => {
                warn!("Camera permission denied by user");
            }
            AgentEvent::NotificationStatusChanged { status, .. } => {
                info!("{}", status.user_message());
            }
            AgentEvent::ImageCaptured {
                width,
                height,
                generation,
                ..
            } => {
                info!(
                    "Picture taken: {}x{} (generation {})",
                    width, height, generation
                );
            }
            _ => {}
        }
    }

    /// One resume, trigger, pause cycle; waits for both the capture and
    /// the notification to finish.
    pub async fn run_once(&self) -> Result<RunSummary> {
        let availability = self.resume().await;
        let handles = self.trigger();

        let capture = match handles.capture {
            Some(handle) => Some(
                handle
                    .await
                    .map_err(|e| AgentError::component("camera", e.to_string()))?
                    .map(|image| (image.width, image.height)),
            ),
            None => None,
        };

        let notification = handles
            .notification
            .await
            .map_err(|e| AgentError::component("registration", e.to_string()))?;

        self.pause().await;

        let summary = RunSummary {
            availability,
            capture,
            notification,
        };
        info!("Run finished: {:?}", summary);
        Ok(summary)
    }
}
