use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("failed to open {path}: {message}")]
    Open { path: PathBuf, message: String },
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("no video stream found in {0}")]
    NoVideoStream(PathBuf),
    #[error("frame {frame_number} is out of range for {path}")]
    FrameOutOfRange { path: PathBuf, frame_number: usize },
}

/// Reads still images and video frames as RGB [`Frame`]s.
///
/// Implementations handle codec and container details; analysis code only
/// sees frames and frame rates.
pub trait VisionReader: Send + Sync {
    fn read_image(&self, path: &Path) -> Result<Frame, VisionError>;

    /// Decode the frame at zero-based `frame_number`.
    fn read_video_frame(&self, path: &Path, frame_number: usize) -> Result<Frame, VisionError>;

    fn detect_video_fps(&self, path: &Path) -> Result<f64, VisionError>;

    fn count_video_frames(&self, path: &Path) -> Result<usize, VisionError>;

    /// Decode frames in order, handing each to `on_frame` until it returns
    /// `false` or the video ends. Returns the number of frames delivered.
    fn for_each_video_frame(
        &self,
        path: &Path,
        on_frame: &mut dyn FnMut(Frame) -> bool,
    ) -> Result<usize, VisionError>;
}
