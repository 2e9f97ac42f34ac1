use std::path::PathBuf;

use crate::channel::Channel;
use crate::input::Region;

/// Every failure an edit can report. None of them is fatal: the session
/// keeps the image it had before the failing call.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("no image loaded")]
    NoImage,

    #[error("no original image to reset to")]
    NoSnapshot,

    #[error("failed to load image {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to save image {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("camera {index} unavailable: {reason}")]
    Capture { index: u32, reason: String },

    #[error("unknown channel name '{0}' (expected red, green or blue)")]
    UnknownChannel(String),

    #[error("cannot extract {channel} from an image with {channels} channel(s)")]
    ChannelUnavailable { channel: Channel, channels: u8 },

    #[error("invalid {field} '{value}': expected {expected}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("region {0} must have a positive width and height")]
    EmptyRegion(Region),

    #[error("crop region {region} lies outside the {width}x{height} image")]
    CropOutOfBounds {
        region: Region,
        width: u32,
        height: u32,
    },

    #[error("invalid edit '{0}' (expected channel=NAME, crop=X,Y,W,H, rotate=DEG, rect=X,Y,W,H or reset)")]
    InvalidEdit(String),

    #[error("edit cancelled")]
    Cancelled,

    #[error("editor worker failed: {0}")]
    Worker(String),
}

impl EditError {
    /// True for errors caused by the edit's own parameters, as opposed to
    /// missing state or unavailable resources.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            EditError::UnknownChannel(_)
                | EditError::ChannelUnavailable { .. }
                | EditError::InvalidNumber { .. }
                | EditError::EmptyRegion(_)
                | EditError::CropOutOfBounds { .. }
                | EditError::InvalidEdit(_)
        )
    }
}
