//! Collaborator interfaces the lifecycle manager consumes.
//!
//! The platform camera driver, the permission prompt and the image decoder
//! are supplied by the host; the manager only talks to them through these
//! traits.

use crate::error::CameraError;
use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Direction a camera faces relative to the device screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Front,
    Back,
}

impl CameraFacing {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraFacing::Front => "front",
            CameraFacing::Back => "back",
        }
    }
}

/// Static description of one enumerated camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraInfo {
    pub id: u32,
    pub facing: CameraFacing,
}

/// Completion callback for a single picture.
///
/// Invoked by the driver on its own thread, at most once.
pub type PictureCallback = Box<dyn FnOnce(Result<Vec<u8>, CameraError>) + Send + 'static>;

/// Platform camera driver
pub trait CameraHardware: Send + Sync {
    /// Whether the device has any camera at all
    fn has_camera_feature(&self) -> bool;

    /// Cameras in driver enumeration order
    fn cameras(&self) -> Vec<CameraInfo>;

    /// Open a camera exclusively. Fails when permission is missing or the
    /// camera is held elsewhere.
    fn open(&self, camera_id: u32) -> Result<Arc<dyn CameraDevice>, CameraError>;
}

/// An opened camera handle
pub trait CameraDevice: Send + Sync {
    fn supported_picture_sizes(&self) -> Vec<(u32, u32)>;
    fn set_picture_size(&self, width: u32, height: u32) -> Result<(), CameraError>;
    fn set_jpeg_quality(&self, quality: u8) -> Result<(), CameraError>;
    fn start_preview(&self) -> Result<(), CameraError>;
    fn stop_preview(&self);

    /// Trigger one capture. Returns immediately; image bytes arrive through
    /// `callback`.
    fn take_picture(&self, callback: PictureCallback) -> Result<(), CameraError>;

    fn close(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    Camera,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied,
}

/// Permission prompt shown to the user
#[async_trait]
pub trait PermissionRequester: Send + Sync {
    async fn request(&self, permissions: &[Permission]) -> PermissionOutcome;
}

/// Raw capture bytes to displayable image
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, CameraError>;
}
