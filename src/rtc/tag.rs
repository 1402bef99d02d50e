//! Media type tags
//!
//! Producers carry a tag in their application data so receivers can tell a
//! camera from a screen share without inspecting the media.

use std::fmt;

/// What a produced track represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaTypeTag {
    Camera,
    Microphone,
    Screen,
    ScreenAudio,
}

/// Which bundle of a peer a track belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaClass {
    Camera,
    Screen,
}

impl MediaTypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaTypeTag::Camera => "camera",
            MediaTypeTag::Microphone => "microphone",
            MediaTypeTag::Screen => "screen",
            MediaTypeTag::ScreenAudio => "screen-audio",
        }
    }

    /// Parse a wire label; anything unrecognised counts as camera
    pub fn from_label(label: &str) -> Self {
        match label {
            "microphone" => MediaTypeTag::Microphone,
            "screen" => MediaTypeTag::Screen,
            "screen-audio" => MediaTypeTag::ScreenAudio,
            _ => MediaTypeTag::Camera,
        }
    }

    pub fn is_screen(&self) -> bool {
        matches!(self, MediaTypeTag::Screen | MediaTypeTag::ScreenAudio)
    }

    pub fn class(&self) -> MediaClass {
        if self.is_screen() {
            MediaClass::Screen
        } else {
            MediaClass::Camera
        }
    }
}

impl fmt::Display for MediaTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
