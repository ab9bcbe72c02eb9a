use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DetectError;

/// Which side of the animal faces the camera.
///
/// Serialized as `""`, `"face_left"` and `"face_right"`; parsing also accepts
/// the short forms `left`/`right` and `none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Orientation {
    #[default]
    Unspecified,
    FaceLeft,
    FaceRight,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Unspecified => "",
            Orientation::FaceLeft => "face_left",
            Orientation::FaceRight => "face_right",
        }
    }

    pub fn is_specified(&self) -> bool {
        !matches!(self, Orientation::Unspecified)
    }
}

impl FromStr for Orientation {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Orientation::Unspecified),
            "left" | "face_left" => Ok(Orientation::FaceLeft),
            "right" | "face_right" => Ok(Orientation::FaceRight),
            _ => Err(DetectError::InvalidOrientation(s.to_string())),
        }
    }
}

impl TryFrom<String> for Orientation {
    type Error = DetectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Orientation> for String {
    fn from(value: Orientation) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
