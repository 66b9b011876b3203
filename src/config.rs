use crate::camera::CameraFacing;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AgentConfig {
    pub camera: CameraConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    pub simulator: SimulatorConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Which camera to prefer when several are present
    #[serde(default = "default_camera_facing")]
    pub facing: CameraFacing,

    /// JPEG quality applied before every capture (100 = no compression)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Host name or address of the scanner server
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Port as entered by the user; unparsable values fall back to 8001
    #[serde(default)]
    pub port: Option<String>,

    /// Timeout applied to each network step of a notification
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct DeviceConfig {
    /// Manufacturer override; detected from the platform when unset
    #[serde(default)]
    pub manufacturer: Option<String>,

    /// Model override; detected from the platform when unset
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Whether the simulated device reports a camera feature
    #[serde(default = "default_sim_has_camera")]
    pub has_camera: bool,

    /// Whether camera permission is granted at startup
    #[serde(default = "default_sim_permission_granted")]
    pub permission_granted: bool,

    /// Whether a permission request is granted by the simulated prompt
    #[serde(default = "default_sim_grant_on_request")]
    pub grant_on_request: bool,

    /// Supported picture sizes, in driver order
    #[serde(default = "default_sim_resolutions")]
    pub resolutions: Vec<(u32, u32)>,

    /// Delay between the capture trigger and the picture callback
    #[serde(default = "default_sim_capture_delay_ms")]
    pub capture_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl AgentConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("scanner-agent.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let resolutions: Vec<Vec<i64>> = default_sim_resolutions()
            .into_iter()
            .map(|(w, h)| vec![w as i64, h as i64])
            .collect();

        let settings = Config::builder()
            .set_default("camera.facing", default_camera_facing().as_str())?
            .set_default("camera.jpeg_quality", default_jpeg_quality() as i64)?
            .set_default("server.host", default_server_host())?
            .set_default("server.timeout_seconds", default_timeout_seconds() as i64)?
            .set_default("simulator.has_camera", default_sim_has_camera())?
            .set_default(
                "simulator.permission_granted",
                default_sim_permission_granted(),
            )?
            .set_default("simulator.grant_on_request", default_sim_grant_on_request())?
            .set_default("simulator.resolutions", resolutions)?
            .set_default("simulator.capture_delay_ms", default_sim_capture_delay_ms() as i64)?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            .add_source(Environment::with_prefix("SCANNER_AGENT").separator("__"))
            .build()?;

        let config: AgentConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.jpeg_quality == 0 || self.camera.jpeg_quality > 100 {
            return Err(ConfigError::Message(
                "Camera jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        if self.server.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Server timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self
            .simulator
            .resolutions
            .iter()
            .any(|&(w, h)| w == 0 || h == 0)
        {
            return Err(ConfigError::Message(
                "Simulator resolutions must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                facing: default_camera_facing(),
                jpeg_quality: default_jpeg_quality(),
            },
            server: ServerConfig {
                host: default_server_host(),
                port: None,
                timeout_seconds: default_timeout_seconds(),
            },
            device: DeviceConfig::default(),
            simulator: SimulatorConfig {
                has_camera: default_sim_has_camera(),
                permission_granted: default_sim_permission_granted(),
                grant_on_request: default_sim_grant_on_request(),
                resolutions: default_sim_resolutions(),
                capture_delay_ms: default_sim_capture_delay_ms(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_camera_facing() -> CameraFacing {
    CameraFacing::Back
}
fn default_jpeg_quality() -> u8 {
    100
}

fn default_server_host() -> String {
    String::new()
}
fn default_timeout_seconds() -> u64 {
    10
}

fn default_sim_has_camera() -> bool {
    true
}
fn default_sim_permission_granted() -> bool {
    true
}
fn default_sim_grant_on_request() -> bool {
    true
}
fn default_sim_resolutions() -> Vec<(u32, u32)> {
    vec![(640, 480), (1920, 1080), (1280, 720)]
}
fn default_sim_capture_delay_ms() -> u64 {
    150
}

fn default_event_bus_capacity() -> usize {
    100
}
