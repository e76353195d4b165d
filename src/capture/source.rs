//! Where captured pixels come from.

use crate::error::CaptureError;
use image::DynamicImage;
use std::path::PathBuf;

/// Produces one full-screen (or region) image per call.
pub trait ScreenSource: Send + Sync {
    fn grab(&self) -> Result<DynamicImage, CaptureError>;
}

/// Re-reads a single image file on every grab. Pairs with an OS screenshot
/// tool configured to overwrite the same file.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScreenSource for FileSource {
    fn grab(&self) -> Result<DynamicImage, CaptureError> {
        let start = std::time::Instant::now();
        let image = image::open(&self.path).map_err(|source| CaptureError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        log::info!(
            "[CAPTURE] Read {}x{} from {} in {}ms",
            image.width(),
            image.height(),
            self.path.display(),
            start.elapsed().as_millis()
        );
        Ok(image)
    }
}

/// Used when no source is configured; every grab fails.
pub struct NoSource;

impl ScreenSource for NoSource {
    fn grab(&self) -> Result<DynamicImage, CaptureError> {
        Err(CaptureError::NoSource)
    }
}
