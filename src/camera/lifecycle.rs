use super::hardware::{
    CameraDevice, CameraFacing, CameraHardware, CameraInfo, ImageDecoder, Permission,
    PermissionRequester, PictureCallback,
};
use super::permission::PermissionRequest;
use super::resolution::select_max_resolution;
use super::types::{CameraAvailability, CapturedImage, LifecycleState};
use crate::config::CameraConfig;
use crate::error::CameraError;
use crate::events::{AgentEvent, EventBus};
use chrono::Utc;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::SystemTime;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Owns the exclusive camera handle across resume/pause cycles.
///
/// Every opened handle is tagged with a generation number. Capture
/// callbacks carry the generation they were issued for and become no-ops
/// once that handle has been released.
pub struct ResourceLifecycleManager {
    config: CameraConfig,
    hardware: Arc<dyn CameraHardware>,
    permissions: Arc<dyn PermissionRequester>,
    decoder: Arc<dyn ImageDecoder>,
    event_bus: Arc<EventBus>,
    shared: Arc<Mutex<LifecycleInner>>,
}

struct OpenResource {
    generation: u64,
    camera_id: u32,
    device: Arc<dyn CameraDevice>,
}

struct LifecycleInner {
    state: LifecycleState,
    resource: Option<OpenResource>,
    last_generation: u64,
    last_open_succeeded: Option<bool>,
    permission_request: Option<PermissionRequest>,
}

impl LifecycleInner {
    fn transition(&mut self, next: LifecycleState) {
        if self.state != next {
            debug!("Camera lifecycle: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Device of the current handle, if `generation` still owns it and a
    /// capture is in flight
    fn in_flight_device(&self, generation: u64) -> Option<Arc<dyn CameraDevice>> {
        match &self.resource {
            Some(resource)
                if resource.generation == generation
                    && self.state == LifecycleState::CaptureInFlight =>
            {
                Some(Arc::clone(&resource.device))
            }
            _ => None,
        }
    }
}

impl ResourceLifecycleManager {
    pub fn new(
        config: CameraConfig,
        hardware: Arc<dyn CameraHardware>,
        permissions: Arc<dyn PermissionRequester>,
        decoder: Arc<dyn ImageDecoder>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        info!(
            "Initializing camera lifecycle manager (facing: {}, jpeg quality: {})",
            config.facing.as_str(),
            config.jpeg_quality
        );

        Self {
            config,
            hardware,
            permissions,
            decoder,
            event_bus,
            shared: Arc::new(Mutex::new(LifecycleInner {
                state: LifecycleState::Unchecked,
                resource: None,
                last_generation: 0,
                last_open_succeeded: None,
                permission_request: None,
            })),
        }
    }

    /// Static capability query; no side effects
    pub fn check_hardware_feature(&self) -> bool {
        self.hardware.has_camera_feature()
    }

    /// Open the preferred camera for this lifecycle cycle.
    ///
    /// Never fails: an open error is reported as `PermissionDenied` and
    /// starts a permission prompt in the background. `NoFeature` and
    /// `PermissionDenied` stick until `release()` starts a new cycle.
    pub fn acquire(&self) -> CameraAvailability {
        let mut inner = self.shared.lock();

        match inner.state {
            state if state.holds_resource() => {
                warn!(
                    "Camera already open (generation {}), ignoring acquire",
                    inner.last_generation
                );
                return CameraAvailability::Available;
            }
            LifecycleState::NoFeature => return CameraAvailability::NoHardwareFeature,
            LifecycleState::PermissionDenied => return CameraAvailability::PermissionDenied,
            _ => {}
        }

        if !self.check_hardware_feature() {
            inner.transition(LifecycleState::NoFeature);
            return self.report(CameraAvailability::NoHardwareFeature);
        }
        inner.transition(LifecycleState::Checked);

        let opened = match select_camera(&self.hardware.cameras(), self.config.facing) {
            Some(camera_id) => self
                .hardware
                .open(camera_id)
                .map(|device| (camera_id, device)),
            None => Err(CameraError::hardware("no camera enumerated")),
        };

        match opened {
            Ok((camera_id, device)) => {
                inner.last_generation += 1;
                let generation = inner.last_generation;
                inner.resource = Some(OpenResource {
                    generation,
                    camera_id,
                    device,
                });
                inner.last_open_succeeded = Some(true);
                inner.transition(LifecycleState::Open);
                info!("Opened camera {} (generation {})", camera_id, generation);
                self.report(CameraAvailability::Available)
            }
            Err(e) => {
                warn!("Camera open failed, treating as permission denied: {}", e);
                inner.last_open_succeeded = Some(false);
                inner.transition(LifecycleState::PermissionDenied);

                let pending = inner
                    .permission_request
                    .as_ref()
                    .is_some_and(|request| !request.is_finished());
                if !pending {
                    inner.permission_request = PermissionRequest::spawn(
                        Arc::clone(&self.permissions),
                        Arc::clone(&self.event_bus),
                        vec![Permission::Camera],
                    );
                }

                self.report(CameraAvailability::PermissionDenied)
            }
        }
    }

    /// Start a single capture.
    ///
    /// Only valid while the camera is open; otherwise returns `NotOpen`
    /// without side effects. The image arrives later through the returned
    /// future, which the driver callback completes.
    pub fn capture(&self) -> Result<PendingCapture, CameraError> {
        let (device, generation) = {
            let mut inner = self.shared.lock();

            match inner.state {
                LifecycleState::Open => {}
                LifecycleState::Previewing | LifecycleState::CaptureInFlight => {
                    debug!("Capture requested while another capture is in flight");
                    return Err(CameraError::CaptureInFlight);
                }
                state => {
                    debug!("Capture requested in state {:?}, nothing to do", state);
                    return Err(CameraError::NotOpen);
                }
            }

            let (device, generation) = match &inner.resource {
                Some(resource) => (Arc::clone(&resource.device), resource.generation),
                None => return Err(CameraError::NotOpen),
            };

            let (width, height) = select_max_resolution(&device.supported_picture_sizes())?;
            info!("Camera resolution: {}x{}px", width, height);
            device.set_picture_size(width, height)?;
            device.set_jpeg_quality(self.config.jpeg_quality)?;

            device.start_preview()?;
            inner.transition(LifecycleState::Previewing);
            inner.transition(LifecycleState::CaptureInFlight);

            (device, generation)
        };

        let (sender, receiver) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let decoder = Arc::clone(&self.decoder);
        let event_bus = Arc::clone(&self.event_bus);

        let callback: PictureCallback = Box::new(move |result| {
            complete_capture(&shared, decoder.as_ref(), &event_bus, generation, result, sender);
        });

        // Lock is released here; drivers may call back on any thread.
        if let Err(e) = device.take_picture(callback) {
            let mut inner = self.shared.lock();
            if let Some(device) = inner.in_flight_device(generation) {
                device.stop_preview();
                inner.transition(LifecycleState::Open);
            }
            warn!("Camera rejected capture trigger: {}", e);
            return Err(e);
        }

        debug!("Capture triggered (generation {})", generation);
        Ok(PendingCapture {
            generation,
            receiver,
        })
    }

    /// Close the camera if one is open. Idempotent and safe in any state.
    pub fn release(&self) {
        let mut inner = self.shared.lock();

        if let Some(request) = inner.permission_request.take() {
            request.cancel();
        }

        match inner.resource.take() {
            Some(resource) => {
                if matches!(
                    inner.state,
                    LifecycleState::Previewing | LifecycleState::CaptureInFlight
                ) {
                    resource.device.stop_preview();
                }
                resource.device.close();
                info!(
                    "Released camera {} (generation {})",
                    resource.camera_id, resource.generation
                );
            }
            None => debug!("Release requested with no camera open"),
        }

        inner.transition(LifecycleState::Released);
    }

    /// Availability derived from the hardware feature and the most recent
    /// open attempt. `None` until the first attempt.
    pub fn availability(&self) -> Option<CameraAvailability> {
        if !self.check_hardware_feature() {
            return Some(CameraAvailability::NoHardwareFeature);
        }
        self.shared
            .lock()
            .last_open_succeeded
            .map(|succeeded| match succeeded {
                true => CameraAvailability::Available,
                false => CameraAvailability::PermissionDenied,
            })
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.lock().state
    }

    /// Generation of the handle currently held, if any
    pub fn current_generation(&self) -> Option<u64> {
        self.shared
            .lock()
            .resource
            .as_ref()
            .map(|resource| resource.generation)
    }

    pub fn is_open(&self) -> bool {
        self.shared.lock().resource.is_some()
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    fn report(&self, availability: CameraAvailability) -> CameraAvailability {
        let _ = self.event_bus.publish(AgentEvent::CameraAvailabilityChanged {
            availability,
            timestamp: SystemTime::now(),
        });
        availability
    }
}

impl Drop for ResourceLifecycleManager {
    fn drop(&mut self) {
        self.release();
    }
}

/// First camera facing the preferred direction, else the first enumerated
fn select_camera(cameras: &[CameraInfo], facing: CameraFacing) -> Option<u32> {
    match cameras.iter().find(|camera| camera.facing == facing) {
        Some(camera) => {
            debug!("Selected {} camera {}", facing.as_str(), camera.id);
            Some(camera.id)
        }
        None => {
            let fallback = cameras.first().map(|camera| camera.id);
            if let Some(id) = fallback {
                debug!(
                    "No {} camera found, falling back to camera {}",
                    facing.as_str(),
                    id
                );
            }
            fallback
        }
    }
}

/// Driver callback body. Runs on the driver's thread.
fn complete_capture(
    shared: &Mutex<LifecycleInner>,
    decoder: &dyn ImageDecoder,
    event_bus: &EventBus,
    generation: u64,
    result: Result<Vec<u8>, CameraError>,
    sender: oneshot::Sender<Result<CapturedImage, CameraError>>,
) {
    {
        let mut inner = shared.lock();
        match inner.in_flight_device(generation) {
            Some(device) => {
                device.stop_preview();
                inner.transition(LifecycleState::Open);
            }
            None => {
                debug!(
                    "Ignoring capture callback for released camera generation {}",
                    generation
                );
                return;
            }
        }
    }

    let outcome = result.and_then(|data| {
        let image = decoder.decode(&data)?;
        Ok(CapturedImage {
            generation,
            width: image.width(),
            height: image.height(),
            encoded_len: data.len(),
            captured_at: Utc::now(),
            image,
        })
    });

    let event = match &outcome {
        Ok(captured) => AgentEvent::ImageCaptured {
            generation,
            width: captured.width,
            height: captured.height,
            timestamp: SystemTime::now(),
        },
        Err(e) => AgentEvent::CaptureFailed {
            error: e.to_string(),
            timestamp: SystemTime::now(),
        },
    };
    let _ = event_bus.publish(event);

    if sender.send(outcome).is_err() {
        debug!("Capture result dropped, nobody is waiting for it");
    }
}

/// Image of an in-flight capture.
///
/// Resolves to `Released` when the camera was released before the driver
/// delivered the picture.
pub struct PendingCapture {
    generation: u64,
    receiver: oneshot::Receiver<Result<CapturedImage, CameraError>>,
}

impl PendingCapture {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Future for PendingCapture {
    type Output = Result<CapturedImage, CameraError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CameraError::Released)))
    }
}
