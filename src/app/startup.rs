use super::state::{CAMERA, KEYBOARD};
use super::{ComponentState, ScannerAgent};
use crate::camera::CameraAvailability;
use crate::error::Result;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};

impl ScannerAgent {
    /// Register components in their initial state
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing scanner agent components");

        let mut states = self.component_states.lock().await;
        states.insert(CAMERA.to_string(), ComponentState::Stopped);

        if self.keyboard_enabled {
            states.insert(KEYBOARD.to_string(), ComponentState::Stopped);
        }

        drop(states);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start input handling and acquire the camera
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting scanner agent");

        if self.keyboard_enabled {
            if let Some(keyboard_handler) = &self.keyboard_handler {
                self.set_component_state(KEYBOARD, ComponentState::Starting)
                    .await;

                keyboard_handler.start().await.map_err(|e| {
                    error!("Failed to start keyboard handler: {}", e);
                    e
                })?;

                self.set_component_state(KEYBOARD, ComponentState::Running)
                    .await;
            }
        }

        self.resume().await;

        info!("Scanner agent started successfully");
        Ok(())
    }

    /// Host came to the foreground: acquire the camera for a new cycle
    pub async fn resume(&self) -> CameraAvailability {
        self.resumed.store(true, Ordering::SeqCst);
        self.set_component_state(CAMERA, ComponentState::Starting)
            .await;

        let availability = self.camera.acquire();
        if availability.is_available() {
            self.set_component_state(CAMERA, ComponentState::Running)
                .await;
            info!("{}", availability.user_message());
        } else {
            self.set_component_state(CAMERA, ComponentState::Failed)
                .await;
            warn!("{}", availability.user_message());
        }

        availability
    }
}
