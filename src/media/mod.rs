//! Media handles
//!
//! Platform tracks and streams are opaque; the crate only needs to add tracks
//! to a stream, list them, toggle them, and stop them.

pub mod source;
pub mod stream;
pub mod track;

pub use source::{AudioConstraints, CaptureConstraints, DisplayConstraints, MediaSource};
pub use stream::MediaStream;
pub use track::{MediaKind, MediaTrack, StopHook};
