use crate::error::CameraError;

/// Pick the picture size to capture at.
///
/// Single pass starting from the first entry; a later entry replaces the
/// candidate only when it is at least as wide and strictly taller. The
/// result depends on input order and is not always the largest area.
pub fn select_max_resolution(supported: &[(u32, u32)]) -> Result<(u32, u32), CameraError> {
    let (first, rest) = supported
        .split_first()
        .ok_or(CameraError::NoSupportedResolutions)?;

    let mut best = *first;
    for &(width, height) in rest {
        if width >= best.0 && height > best.1 {
            best = (width, height);
        }
    }

    Ok(best)
}
