mod builder;
mod decode;
mod hardware;
mod lifecycle;
mod permission;
mod resolution;
mod simulated;
mod types;
#[cfg(test)]
mod tests;

pub use builder::ResourceLifecycleManagerBuilder;
pub use decode::JpegImageDecoder;
pub use hardware::{
    CameraDevice, CameraFacing, CameraHardware, CameraInfo, ImageDecoder, Permission,
    PermissionOutcome, PermissionRequester, PictureCallback,
};
pub use lifecycle::{PendingCapture, ResourceLifecycleManager};
pub use permission::PermissionRequest;
pub use resolution::select_max_resolution;
pub use simulated::{CallbackMode, SimulatedCameraHardware, SimulatedPermissionPrompt};
pub use types::{CameraAvailability, CapturedImage, LifecycleState};
