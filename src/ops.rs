use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageBuffer, Luma, Rgb, Rgba};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use imageproc::rect::Rect;

use crate::channel::Channel;
use crate::error::EditError;
use crate::input::Region;

/// Outline thickness of `draw_rectangle`, in pixels.
pub const RECTANGLE_THICKNESS: i64 = 2;

pub fn is_image_file(path: &Path) -> bool {
    if let Some(extension) = path.extension() {
        if let Some(ext_str) = extension.to_str() {
            matches!(
                ext_str.to_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "tiff" | "tif" | "bmp" | "webp" | "gif"
            )
        } else {
            false
        }
    } else {
        false
    }
}

/// Returns the requested plane as a single-channel image.
pub fn extract_channel(img: &DynamicImage, channel: Channel) -> Result<DynamicImage, EditError> {
    if !img.color().has_color() {
        return Err(EditError::ChannelUnavailable {
            channel,
            channels: img.color().channel_count(),
        });
    }

    let converted;
    let rgb = match img.as_rgb8() {
        Some(rgb) => rgb,
        None => {
            converted = img.to_rgb8();
            &converted
        }
    };

    let offset = channel.rgb_offset();
    let plane = ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
        Luma([rgb.get_pixel(x, y)[offset]])
    });
    Ok(DynamicImage::ImageLuma8(plane))
}

/// Copies `region` out of `img`. The region must be non-empty and lie
/// entirely inside the image.
pub fn crop(img: &DynamicImage, region: Region) -> Result<DynamicImage, EditError> {
    if region.is_empty() {
        return Err(EditError::EmptyRegion(region));
    }

    let (width, height) = img.dimensions();
    let right = region.x as i64 + region.width as i64;
    let bottom = region.y as i64 + region.height as i64;
    if region.x < 0 || region.y < 0 || right > width as i64 || bottom > height as i64 {
        return Err(EditError::CropOutOfBounds {
            region,
            width,
            height,
        });
    }

    Ok(img.crop_imm(
        region.x as u32,
        region.y as u32,
        region.width as u32,
        region.height as u32,
    ))
}

/// Rotates about the image centre, counter-clockwise for positive angles.
/// The output keeps the input size: corners that leave the frame are cut
/// off and uncovered pixels are black.
pub fn rotate(img: &DynamicImage, degrees: f64) -> DynamicImage {
    // imageproc rotates clockwise for positive theta.
    let theta = -degrees.to_radians() as f32;

    match img {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(rotate_about_center(
            gray,
            theta,
            Interpolation::Bilinear,
            Luma([0]),
        )),
        DynamicImage::ImageRgba8(rgba) => DynamicImage::ImageRgba8(rotate_about_center(
            rgba,
            theta,
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
        )),
        other => {
            let converted;
            let rgb = match other.as_rgb8() {
                Some(rgb) => rgb,
                None => {
                    converted = other.to_rgb8();
                    &converted
                }
            };
            DynamicImage::ImageRgb8(rotate_about_center(
                rgb,
                theta,
                Interpolation::Bilinear,
                Rgb([0, 0, 0]),
            ))
        }
    }
}

/// Draws a blue outline with corners `(x, y)` and `(x + width, y + height)`
/// directly onto `img`. Both corners are part of the outline; negative sizes
/// draw between the same two corners. Single-channel images get a white
/// outline.
pub fn draw_rectangle(img: &mut DynamicImage, region: Region) {
    let (width, height) = img.dimensions();
    let bounds = Bounds::from_corners(region, width, height);

    match img {
        DynamicImage::ImageRgb8(rgb) => bounds.outline(rgb, Rgb([0, 0, 255])),
        DynamicImage::ImageRgba8(rgba) => bounds.outline(rgba, Rgba([0, 0, 255, 255])),
        DynamicImage::ImageLuma8(gray) => bounds.outline(gray, Luma([255])),
        other => {
            let mut rgb = other.to_rgb8();
            bounds.outline(&mut rgb, Rgb([0, 0, 255]));
            *other = DynamicImage::ImageRgb8(rgb);
        }
    }
}

/// Inclusive pixel bounds of a rectangle outline, clamped so that lines
/// outside the image stay outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl Bounds {
    fn from_corners(region: Region, width: u32, height: u32) -> Self {
        let x0 = region.x as i64;
        let y0 = region.y as i64;
        let x1 = x0 + region.width as i64;
        let y1 = y0 + region.height as i64;

        let clamp_x = |v: i64| v.clamp(-RECTANGLE_THICKNESS, width as i64 + RECTANGLE_THICKNESS);
        let clamp_y = |v: i64| v.clamp(-RECTANGLE_THICKNESS, height as i64 + RECTANGLE_THICKNESS);

        Self {
            left: clamp_x(x0.min(x1)),
            top: clamp_y(y0.min(y1)),
            right: clamp_x(x0.max(x1)),
            bottom: clamp_y(y0.max(y1)),
        }
    }

    /// Shrinks the bounds by one pixel on each side, if anything is left.
    fn inset(self) -> Option<Self> {
        if self.right - self.left < 2 || self.bottom - self.top < 2 {
            return None;
        }
        Some(Self {
            left: self.left + 1,
            top: self.top + 1,
            right: self.right - 1,
            bottom: self.bottom - 1,
        })
    }

    fn rect(self) -> Rect {
        Rect::at(self.left as i32, self.top as i32).of_size(
            (self.right - self.left + 1) as u32,
            (self.bottom - self.top + 1) as u32,
        )
    }

    fn outline<C: imageproc::drawing::Canvas>(self, canvas: &mut C, color: C::Pixel) {
        let mut ring = Some(self);
        for _ in 0..RECTANGLE_THICKNESS {
            match ring {
                Some(bounds) => {
                    draw_hollow_rect_mut(canvas, bounds.rect(), color);
                    ring = bounds.inset();
                }
                None => break,
            }
        }
    }
}

pub fn save_image(img: &DynamicImage, output_path: &Path) -> Result<(), EditError> {
    let is_jpeg = output_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false);

    let result = if is_jpeg {
        // JPEG has no alpha channel
        match img {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img.save(output_path),
            other => DynamicImage::ImageRgb8(other.to_rgb8()).save(output_path),
        }
    } else {
        img.save(output_path)
    };

    result.map_err(|source| EditError::Save {
        path: output_path.to_path_buf(),
        source,
    })
}
