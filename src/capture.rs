//! Still-frame sources for `Session::capture`.

use image::DynamicImage;

use crate::error::EditError;

/// Anything that can hand over a single frame.
pub trait FrameSource {
    fn grab(&mut self) -> Result<DynamicImage, EditError>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Result<DynamicImage, EditError>,
{
    fn grab(&mut self) -> Result<DynamicImage, EditError> {
        self()
    }
}

/// A camera opened for one frame and released right after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Webcam {
    pub index: u32,
}

impl Default for Webcam {
    fn default() -> Self {
        Self { index: 0 }
    }
}

impl Webcam {
    pub fn new(index: u32) -> Self {
        Self { index }
    }

    fn failure(&self, reason: impl ToString) -> EditError {
        EditError::Capture {
            index: self.index,
            reason: reason.to_string(),
        }
    }
}

#[cfg(feature = "webcam")]
impl FrameSource for Webcam {
    fn grab(&mut self) -> Result<DynamicImage, EditError> {
        use nokhwa::pixel_format::RgbFormat;
        use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
        use nokhwa::Camera;

        let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(self.index), format)
            .map_err(|e| self.failure(e))?;
        camera.open_stream().map_err(|e| self.failure(e))?;

        let frame = camera.frame().and_then(|buffer| buffer.decode_image::<RgbFormat>());
        if let Err(err) = camera.stop_stream() {
            log::warn!("Failed to release camera {}: {}", self.index, err);
        }

        let rgb = frame.map_err(|e| self.failure(e))?;
        log::debug!("Captured {}x{} frame from camera {}", rgb.width(), rgb.height(), self.index);
        Ok(DynamicImage::ImageRgb8(rgb))
    }
}

#[cfg(not(feature = "webcam"))]
impl FrameSource for Webcam {
    fn grab(&mut self) -> Result<DynamicImage, EditError> {
        Err(self.failure("built without the `webcam` feature"))
    }
}
