use super::hardware::{
    CameraDevice, CameraFacing, CameraHardware, CameraInfo, Permission, PermissionOutcome,
    PermissionRequester, PictureCallback,
};
use crate::config::SimulatorConfig;
use crate::error::CameraError;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// How the simulated driver delivers picture callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackMode {
    /// On a separate thread after the given delay
    Threaded(Duration),
    /// Held until `fire_pending_captures` is called
    Manual,
}

/// In-process camera driver used when no platform driver is wired in.
///
/// Produces real JPEG bytes at the requested picture size.
#[derive(Clone)]
pub struct SimulatedCameraHardware {
    has_feature: bool,
    cameras: Vec<CameraInfo>,
    resolutions: Vec<(u32, u32)>,
    mode: CallbackMode,
    permission_granted: Arc<AtomicBool>,
    state: Arc<SimulatorState>,
}

#[derive(Default)]
struct SimulatorState {
    open_devices: AtomicUsize,
    total_opens: AtomicU64,
    pictures_taken: AtomicU64,
    last_opened: Mutex<Option<u32>>,
    pending: Mutex<Vec<(PictureCallback, (u32, u32), u8)>>,
}

impl SimulatedCameraHardware {
    pub fn new(resolutions: Vec<(u32, u32)>) -> Self {
        Self {
            has_feature: true,
            cameras: vec![
                CameraInfo {
                    id: 0,
                    facing: CameraFacing::Back,
                },
                CameraInfo {
                    id: 1,
                    facing: CameraFacing::Front,
                },
            ],
            resolutions,
            mode: CallbackMode::Threaded(Duration::from_millis(10)),
            permission_granted: Arc::new(AtomicBool::new(true)),
            state: Arc::new(SimulatorState::default()),
        }
    }

    pub fn from_config(config: &SimulatorConfig) -> Self {
        Self::new(config.resolutions.clone())
            .with_feature(config.has_camera)
            .with_permission(config.permission_granted)
            .with_callback_mode(CallbackMode::Threaded(Duration::from_millis(
                config.capture_delay_ms,
            )))
    }

    pub fn with_feature(mut self, has_feature: bool) -> Self {
        self.has_feature = has_feature;
        self
    }

    pub fn with_cameras(mut self, cameras: Vec<CameraInfo>) -> Self {
        self.cameras = cameras;
        self
    }

    pub fn with_permission(self, granted: bool) -> Self {
        self.permission_granted.store(granted, Ordering::SeqCst);
        self
    }

    pub fn with_callback_mode(mut self, mode: CallbackMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shared flag the permission prompt flips when the user grants access
    pub fn permission_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.permission_granted)
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
    }

    pub fn open_devices(&self) -> usize {
        self.state.open_devices.load(Ordering::SeqCst)
    }

    pub fn total_opens(&self) -> u64 {
        self.state.total_opens.load(Ordering::SeqCst)
    }

    pub fn last_opened_camera(&self) -> Option<u32> {
        *self.state.last_opened.lock()
    }

    pub fn pictures_taken(&self) -> u64 {
        self.state.pictures_taken.load(Ordering::SeqCst)
    }

    pub fn pending_captures(&self) -> usize {
        self.state.pending.lock().len()
    }

    /// Deliver every held callback (manual mode). Returns how many fired.
    pub fn fire_pending_captures(&self) -> usize {
        let pending: Vec<_> = self.state.pending.lock().drain(..).collect();
        let count = pending.len();
        for (callback, (width, height), quality) in pending {
            callback(render_jpeg(width, height, quality));
        }
        count
    }
}

impl CameraHardware for SimulatedCameraHardware {
    fn has_camera_feature(&self) -> bool {
        self.has_feature
    }

    fn cameras(&self) -> Vec<CameraInfo> {
        if self.has_feature {
            self.cameras.clone()
        } else {
            Vec::new()
        }
    }

    fn open(&self, camera_id: u32) -> Result<Arc<dyn CameraDevice>, CameraError> {
        if !self.permission_granted.load(Ordering::SeqCst) {
            return Err(CameraError::DeviceOpen {
                camera_id,
                details: "camera permission not granted".to_string(),
            });
        }

        if !self.cameras.iter().any(|camera| camera.id == camera_id) {
            return Err(CameraError::DeviceOpen {
                camera_id,
                details: "no such camera".to_string(),
            });
        }

        if self
            .state
            .open_devices
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CameraError::DeviceOpen {
                camera_id,
                details: "camera is in use".to_string(),
            });
        }

        self.state.total_opens.fetch_add(1, Ordering::SeqCst);
        *self.state.last_opened.lock() = Some(camera_id);
        info!("Simulated camera {} opened", camera_id);

        let initial_size = self.resolutions.first().copied().unwrap_or((640, 480));
        Ok(Arc::new(SimulatedCameraDevice {
            camera_id,
            resolutions: self.resolutions.clone(),
            mode: self.mode,
            picture_size: Mutex::new(initial_size),
            jpeg_quality: Mutex::new(90),
            previewing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            state: Arc::clone(&self.state),
        }))
    }
}

struct SimulatedCameraDevice {
    camera_id: u32,
    resolutions: Vec<(u32, u32)>,
    mode: CallbackMode,
    picture_size: Mutex<(u32, u32)>,
    jpeg_quality: Mutex<u8>,
    previewing: AtomicBool,
    closed: AtomicBool,
    state: Arc<SimulatorState>,
}

impl SimulatedCameraDevice {
    fn ensure_open(&self) -> Result<(), CameraError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CameraError::hardware(format!(
                "camera {} is closed",
                self.camera_id
            )));
        }
        Ok(())
    }
}

impl CameraDevice for SimulatedCameraDevice {
    fn supported_picture_sizes(&self) -> Vec<(u32, u32)> {
        self.resolutions.clone()
    }

    fn set_picture_size(&self, width: u32, height: u32) -> Result<(), CameraError> {
        self.ensure_open()?;
        if !self.resolutions.contains(&(width, height)) {
            return Err(CameraError::hardware(format!(
                "unsupported picture size {}x{}",
                width, height
            )));
        }
        *self.picture_size.lock() = (width, height);
        Ok(())
    }

    fn set_jpeg_quality(&self, quality: u8) -> Result<(), CameraError> {
        self.ensure_open()?;
        *self.jpeg_quality.lock() = quality.clamp(1, 100);
        Ok(())
    }

    fn start_preview(&self) -> Result<(), CameraError> {
        self.ensure_open()?;
        self.previewing.store(true, Ordering::SeqCst);
        trace!("Simulated camera {} preview started", self.camera_id);
        Ok(())
    }

    fn stop_preview(&self) {
        self.previewing.store(false, Ordering::SeqCst);
        trace!("Simulated camera {} preview stopped", self.camera_id);
    }

    fn take_picture(&self, callback: PictureCallback) -> Result<(), CameraError> {
        self.ensure_open()?;
        if !self.previewing.load(Ordering::SeqCst) {
            return Err(CameraError::hardware("preview is not running"));
        }

        let size = *self.picture_size.lock();
        let quality = *self.jpeg_quality.lock();
        self.state.pictures_taken.fetch_add(1, Ordering::SeqCst);

        match self.mode {
            CallbackMode::Threaded(delay) => {
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    callback(render_jpeg(size.0, size.1, quality));
                });
            }
            CallbackMode::Manual => {
                self.state.pending.lock().push((callback, size, quality));
            }
        }

        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.previewing.store(false, Ordering::SeqCst);
            self.state.open_devices.fetch_sub(1, Ordering::SeqCst);
            info!("Simulated camera {} closed", self.camera_id);
        }
    }
}

/// Encode a gradient test pattern as JPEG
fn render_jpeg(width: u32, height: u32, quality: u8) -> Result<Vec<u8>, CameraError> {
    let pattern = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&DynamicImage::ImageRgb8(pattern))
        .map_err(|e| CameraError::hardware(format!("failed to encode picture: {}", e)))?;

    debug!("Rendered {}x{} test picture ({} bytes)", width, height, buf.len());
    Ok(buf)
}

/// Permission prompt that answers after a short delay and, when granting,
/// flips the simulated driver's permission flag.
pub struct SimulatedPermissionPrompt {
    grant: bool,
    delay: Duration,
    permission_flag: Arc<AtomicBool>,
    requests: AtomicU64,
}

impl SimulatedPermissionPrompt {
    pub fn new(grant: bool, delay: Duration, permission_flag: Arc<AtomicBool>) -> Self {
        Self {
            grant,
            delay,
            permission_flag,
            requests: AtomicU64::new(0),
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionRequester for SimulatedPermissionPrompt {
    async fn request(&self, permissions: &[Permission]) -> PermissionOutcome {
        self.requests.fetch_add(1, Ordering::SeqCst);
        debug!("Simulated permission prompt shown for {:?}", permissions);

        tokio::time::sleep(self.delay).await;

        if self.grant {
            self.permission_flag.store(true, Ordering::SeqCst);
            PermissionOutcome::Granted
        } else {
            PermissionOutcome::Denied
        }
    }
}
