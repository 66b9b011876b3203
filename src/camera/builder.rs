use super::decode::JpegImageDecoder;
use super::hardware::{CameraHardware, ImageDecoder, PermissionRequester};
use super::lifecycle::ResourceLifecycleManager;
use crate::config::CameraConfig;
use crate::error::{AgentError, Result};
use crate::events::EventBus;
use std::sync::Arc;

/// Builder for the camera lifecycle manager
pub struct ResourceLifecycleManagerBuilder {
    config: Option<CameraConfig>,
    hardware: Option<Arc<dyn CameraHardware>>,
    permissions: Option<Arc<dyn PermissionRequester>>,
    decoder: Option<Arc<dyn ImageDecoder>>,
    event_bus: Option<Arc<EventBus>>,
}

impl ResourceLifecycleManagerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            hardware: None,
            permissions: None,
            decoder: None,
            event_bus: None,
        }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn hardware(mut self, hardware: Arc<dyn CameraHardware>) -> Self {
        self.hardware = Some(hardware);
        self
    }

    pub fn permissions(mut self, permissions: Arc<dyn PermissionRequester>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Defaults to `JpegImageDecoder` when not set
    pub fn decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn build(self) -> Result<ResourceLifecycleManager> {
        let config = self
            .config
            .ok_or_else(|| AgentError::system("Camera configuration must be specified"))?;
        let hardware = self
            .hardware
            .ok_or_else(|| AgentError::system("Camera hardware must be specified"))?;
        let permissions = self
            .permissions
            .ok_or_else(|| AgentError::system("Permission requester must be specified"))?;
        let event_bus = self
            .event_bus
            .ok_or_else(|| AgentError::system("Event bus must be specified"))?;
        let decoder = self
            .decoder
            .unwrap_or_else(|| Arc::new(JpegImageDecoder));

        Ok(ResourceLifecycleManager::new(
            config,
            hardware,
            permissions,
            decoder,
            event_bus,
        ))
    }
}

impl Default for ResourceLifecycleManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
