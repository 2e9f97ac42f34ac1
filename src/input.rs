//! Parsing of user-typed parameters.
//!
//! The GUI hands over raw text-field contents and the CLI hands over
//! `--edit` strings; both end up here so malformed numbers are reported
//! the same way instead of surfacing as a panic further down.

use std::fmt;
use std::str::FromStr;

use crate::channel::Channel;
use crate::error::EditError;

/// Axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Builds a region from four text fields (x, y, width, height).
    pub fn from_fields(x: &str, y: &str, width: &str, height: &str) -> Result<Self, EditError> {
        Ok(Self {
            x: parse_int("x", x)?,
            y: parse_int("y", y)?,
            width: parse_int("width", width)?,
            height: parse_int("height", height)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}{:+}{:+}", self.width, self.height, self.x, self.y)
    }
}

/// Parses `x,y,width,height`.
impl FromStr for Region {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(EditError::InvalidNumber {
                field: "region",
                value: s.to_string(),
                expected: "four comma-separated integers x,y,width,height",
            });
        }
        Region::from_fields(parts[0], parts[1], parts[2], parts[3])
    }
}

pub fn parse_int(field: &'static str, text: &str) -> Result<i32, EditError> {
    text.trim().parse::<i32>().map_err(|_| EditError::InvalidNumber {
        field,
        value: text.to_string(),
        expected: "an integer",
    })
}

/// Parses a rotation angle in degrees. NaN and infinities are rejected.
pub fn parse_angle(text: &str) -> Result<f64, EditError> {
    match text.trim().parse::<f64>() {
        Ok(angle) if angle.is_finite() => Ok(angle),
        _ => Err(EditError::InvalidNumber {
            field: "angle",
            value: text.to_string(),
            expected: "a finite number of degrees",
        }),
    }
}

/// A single transformation applied to the current image.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Keeps only the named plane. The name is validated when the edit runs
    /// so an unknown name is reported like any other failed edit.
    Channel(String),
    Crop(Region),
    Rotate(f64),
    Rectangle(Region),
    Reset,
}

impl Edit {
    pub fn label(&self) -> &'static str {
        match self {
            Edit::Channel(_) => "channel",
            Edit::Crop(_) => "crop",
            Edit::Rotate(_) => "rotate",
            Edit::Rectangle(_) => "rectangle",
            Edit::Reset => "reset",
        }
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Edit::Channel(name) => write!(f, "channel={}", name),
            Edit::Crop(r) => write!(f, "crop={},{},{},{}", r.x, r.y, r.width, r.height),
            Edit::Rotate(angle) => write!(f, "rotate={}", angle),
            Edit::Rectangle(r) => write!(f, "rect={},{},{},{}", r.x, r.y, r.width, r.height),
            Edit::Reset => write!(f, "reset"),
        }
    }
}

/// Parses the `--edit` syntax: `channel=red`, `crop=10,10,50,50`,
/// `rotate=30`, `rect=0,0,20,10` or `reset`.
impl FromStr for Edit {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, value) = match s.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value)),
            None => (s, None),
        };

        match (name.to_lowercase().as_str(), value) {
            ("channel", Some(value)) => {
                // Fail early on the CLI; the GUI path goes through Session instead.
                value.parse::<Channel>()?;
                Ok(Edit::Channel(value.trim().to_string()))
            }
            ("crop", Some(value)) => Ok(Edit::Crop(value.parse()?)),
            ("rotate", Some(value)) => Ok(Edit::Rotate(parse_angle(value)?)),
            ("rect" | "rectangle", Some(value)) => Ok(Edit::Rectangle(value.parse()?)),
            ("reset", None) => Ok(Edit::Reset),
            _ => Err(EditError::InvalidEdit(s.to_string())),
        }
    }
}
