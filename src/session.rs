//! The editing session: the image being edited plus the snapshot taken
//! when it was loaded.
//!
//! Every operation either replaces the current image or returns an error
//! and leaves the session exactly as it was. Images are shared behind
//! `Arc`, so cloning a session is cheap and the snapshot can be handed out
//! again on reset without copying pixels; in-place drawing goes through
//! `Arc::make_mut`, which copies first whenever the buffer is shared.

use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView};

use crate::capture::FrameSource;
use crate::channel::Channel;
use crate::error::EditError;
use crate::input::{Edit, Region};
use crate::ops;

#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Option<Arc<DynamicImage>>,
    original: Option<Arc<DynamicImage>>,
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Arc<DynamicImage>> {
        self.current.as_ref()
    }

    pub fn original(&self) -> Option<&Arc<DynamicImage>> {
        self.original.as_ref()
    }

    /// Number of changes committed so far. Every successful operation
    /// increments it, failed ones never do.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Decodes `path` and makes it both the current image and the snapshot.
    pub fn load(&mut self, path: &Path) -> Result<(), EditError> {
        let img = image::open(path).map_err(|source| EditError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!(
            "Loaded {} ({}x{})",
            path.display(),
            img.width(),
            img.height()
        );
        self.start_over(img);
        Ok(())
    }

    /// Grabs one frame and makes it both the current image and the snapshot.
    pub fn capture(&mut self, source: &mut dyn FrameSource) -> Result<(), EditError> {
        let img = source.grab()?;
        log::info!("Captured frame ({}x{})", img.width(), img.height());
        self.start_over(img);
        Ok(())
    }

    pub fn extract_channel(&mut self, name: &str) -> Result<(), EditError> {
        let current = self.require_current()?;
        let channel: Channel = name.parse()?;
        let plane = ops::extract_channel(current, channel)?;
        self.replace(plane);
        Ok(())
    }

    pub fn crop(&mut self, region: Region) -> Result<(), EditError> {
        let cropped = ops::crop(self.require_current()?, region)?;
        self.replace(cropped);
        Ok(())
    }

    pub fn rotate(&mut self, degrees: f64) -> Result<(), EditError> {
        let rotated = ops::rotate(self.require_current()?, degrees);
        self.replace(rotated);
        Ok(())
    }

    /// Draws onto the current image itself rather than producing a new one.
    pub fn draw_rectangle(&mut self, region: Region) -> Result<(), EditError> {
        let current = self.current.as_mut().ok_or(EditError::NoImage)?;
        ops::draw_rectangle(Arc::make_mut(current), region);
        self.generation += 1;
        Ok(())
    }

    /// Throws away every edit since the last load or capture.
    pub fn reset(&mut self) -> Result<(), EditError> {
        let original = self.original.clone().ok_or(EditError::NoSnapshot)?;
        self.current = Some(original);
        self.generation += 1;
        Ok(())
    }

    pub fn apply(&mut self, edit: &Edit) -> Result<(), EditError> {
        match edit {
            Edit::Channel(name) => self.extract_channel(name),
            Edit::Crop(region) => self.crop(*region),
            Edit::Rotate(degrees) => self.rotate(*degrees),
            Edit::Rectangle(region) => self.draw_rectangle(*region),
            Edit::Reset => self.reset(),
        }
    }

    fn require_current(&self) -> Result<&DynamicImage, EditError> {
        self.current.as_deref().ok_or(EditError::NoImage)
    }

    fn start_over(&mut self, img: DynamicImage) {
        // Edits work on 8-bit RGB regardless of what the file or camera gave us.
        let img = if img.as_rgb8().is_some() {
            img
        } else {
            DynamicImage::ImageRgb8(img.to_rgb8())
        };
        let img = Arc::new(img);
        self.original = Some(Arc::clone(&img));
        self.current = Some(img);
        self.generation += 1;
    }

    fn replace(&mut self, img: DynamicImage) {
        let (width, height) = img.dimensions();
        log::debug!("Current image is now {}x{}", width, height);
        self.current = Some(Arc::new(img));
        self.generation += 1;
    }
}
