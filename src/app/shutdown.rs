use super::state::{CAMERA, KEYBOARD};
use super::{ComponentState, ScannerAgent};
use crate::error::{AgentError, Result};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

const KEYBOARD_STOP_TIMEOUT: Duration = Duration::from_secs(2);

impl ScannerAgent {
    /// Stop input handling and release the camera
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();

        let mut exit_code = 0;

        if self.keyboard_enabled {
            if let Err(e) = self.stop_keyboard().await {
                error!("Error stopping keyboard: {}", e);
                exit_code = 1;
            }
        }

        self.set_component_state(CAMERA, ComponentState::Stopping)
            .await;
        self.pause().await;
        info!("{} component stopped", CAMERA);

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    async fn stop_keyboard(&self) -> Result<()> {
        let Some(keyboard_handler) = &self.keyboard_handler else {
            self.set_component_state(KEYBOARD, ComponentState::Stopped)
                .await;
            return Ok(());
        };

        info!("Stopping {} component", KEYBOARD);
        self.set_component_state(KEYBOARD, ComponentState::Stopping)
            .await;

        match timeout(KEYBOARD_STOP_TIMEOUT, keyboard_handler.stop()).await {
            Ok(Ok(())) => {
                self.set_component_state(KEYBOARD, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", KEYBOARD);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state(KEYBOARD, ComponentState::Failed)
                    .await;
                error!("Error stopping {} component: {}", KEYBOARD, e);
                Err(e)
            }
            Err(_) => {
                self.set_component_state(KEYBOARD, ComponentState::Failed)
                    .await;
                error!("{} component stop timeout", KEYBOARD);
                Err(AgentError::component(KEYBOARD, "stop timeout"))
            }
        }
    }
}
