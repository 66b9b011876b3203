use super::types::{ComponentState, ShutdownReason};
use crate::camera::{
    CameraHardware, PermissionRequester, ResourceLifecycleManager,
    ResourceLifecycleManagerBuilder, SimulatedCameraHardware, SimulatedPermissionPrompt,
};
use crate::config::AgentConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::identity::{DeviceIdentity, DeviceInfo};
use crate::keyboard_input::KeyboardInputHandler;
use crate::registration::{Endpoint, RegistrationClient};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

const SIMULATED_PROMPT_DELAY: Duration = Duration::from_millis(250);

/// Wires the camera lifecycle, server registration and event bus together
/// and reacts to host actions.
pub struct ScannerAgent {
    pub(super) config: AgentConfig,
    pub(super) identity: DeviceIdentity,
    pub(super) device_name: String,
    pub(super) event_bus: Arc<EventBus>,

    // Components
    pub(super) camera: Arc<ResourceLifecycleManager>,
    pub(super) registration: Arc<RegistrationClient>,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,

    // Lifecycle management
    pub(super) resumed: AtomicBool,
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl ScannerAgent {
    /// Create an agent backed by the built-in simulated camera
    pub fn new(config: AgentConfig) -> Result<Self> {
        let hardware = SimulatedCameraHardware::from_config(&config.simulator);
        let prompt = SimulatedPermissionPrompt::new(
            config.simulator.grant_on_request,
            SIMULATED_PROMPT_DELAY,
            hardware.permission_flag(),
        );
        let device = DeviceInfo::detect(&config.device);

        Self::with_components(
            config,
            DeviceIdentity::generate(),
            device,
            Arc::new(hardware),
            Arc::new(prompt),
        )
    }

    /// Create an agent with explicit collaborators
    pub fn with_components(
        config: AgentConfig,
        identity: DeviceIdentity,
        device: DeviceInfo,
        hardware: Arc<dyn CameraHardware>,
        permissions: Arc<dyn PermissionRequester>,
    ) -> Result<Self> {
        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let camera = ResourceLifecycleManagerBuilder::new()
            .config(config.camera.clone())
            .hardware(hardware)
            .permissions(permissions)
            .event_bus(Arc::clone(&event_bus))
            .build()?;

        let registration = RegistrationClient::new(Arc::clone(&event_bus), config.server.timeout());
        let keyboard_handler = Some(KeyboardInputHandler::new(Arc::clone(&event_bus)));
        let device_name = device.name();

        info!("Device {} ({})", device_name, identity);

        Ok(Self {
            config,
            identity,
            device_name,
            event_bus,
            camera: Arc::new(camera),
            registration: Arc::new(registration),
            keyboard_handler,
            keyboard_enabled: false,
            resumed: AtomicBool::new(false),
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Enable or disable the keyboard input handler
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn camera(&self) -> &ResourceLifecycleManager {
        &self.camera
    }

    /// Server endpoint, re-read from config on every trigger
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::from_config(&self.config.server)
    }
}
