use super::hardware::ImageDecoder;
use crate::error::CameraError;
use image::{DynamicImage, ImageFormat};
use tracing::trace;

/// Decodes JPEG capture bytes with the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegImageDecoder;

impl ImageDecoder for JpegImageDecoder {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, CameraError> {
        let image = image::load_from_memory_with_format(data, ImageFormat::Jpeg).map_err(|e| {
            CameraError::Decode {
                details: e.to_string(),
            }
        })?;

        trace!(
            "Decoded {} byte JPEG into {}x{} image",
            data.len(),
            image.width(),
            image.height()
        );

        Ok(image)
    }
}
