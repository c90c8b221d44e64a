use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::video::domain::vision_reader::{VisionError, VisionReader};

/// libavformat's internal timestamp unit (microseconds).
const AV_TIME_BASE: f64 = 1_000_000.0;

/// Reads images with the `image` crate and video via ffmpeg-next.
///
/// Stateless: every call opens its own demuxer, so one reader can serve
/// many threads.
#[derive(Default)]
pub struct FfmpegVisionReader;

impl FfmpegVisionReader {
    pub fn new() -> Self {
        Self
    }
}

type OnDecoded<'a> = dyn FnMut(&mut OpenVideo, usize, &ffmpeg_next::util::frame::video::Video) -> Result<bool, VisionError>
    + 'a;

/// An opened video stream with a decoder and an RGB24 scaler.
struct OpenVideo {
    path: PathBuf,
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    fps: f64,
    time_base: f64,
    start_time: i64,
    declared_frames: usize,
    duration: i64,
}

impl OpenVideo {
    fn open(path: &Path) -> Result<Self, VisionError> {
        let open_err = |e: ffmpeg_next::Error| VisionError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        ffmpeg_next::init().map_err(open_err)?;
        let ictx = ffmpeg_next::format::input(path).map_err(open_err)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| VisionError::NoVideoStream(path.to_path_buf()))?;

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(open_err)?;
        let decoder = codec_ctx.decoder().video().map_err(open_err)?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg_next::format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(open_err)?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        let tb = stream.time_base();
        let time_base = if tb.denominator() != 0 {
            tb.numerator() as f64 / tb.denominator() as f64
        } else {
            0.0
        };
        // AV_NOPTS_VALUE is i64::MIN
        let start_time = stream.start_time().max(0);
        let stream_index = stream.index();
        let declared_frames = stream.frames().max(0) as usize;
        let duration = stream.duration();

        Ok(Self {
            path: path.to_path_buf(),
            ictx,
            decoder,
            scaler,
            stream_index,
            fps,
            time_base,
            start_time,
            declared_frames,
            duration,
        })
    }

    fn frame_count(&self) -> usize {
        if self.declared_frames > 0 {
            return self.declared_frames;
        }
        if self.duration > 0 && self.time_base > 0.0 {
            return (self.duration as f64 * self.time_base * self.fps).round() as usize;
        }
        0
    }

    /// Frame number of a decoded frame, derived from its timestamp.
    fn index_of(&self, timestamp: Option<i64>) -> Option<usize> {
        let ts = timestamp?;
        if self.time_base <= 0.0 || self.fps <= 0.0 {
            return None;
        }
        let seconds = (ts - self.start_time) as f64 * self.time_base;
        Some((seconds * self.fps).round().max(0.0) as usize)
    }

    fn decode_err(&self, e: ffmpeg_next::Error) -> VisionError {
        VisionError::Decode {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }

    fn to_frame(
        &mut self,
        decoded: &ffmpeg_next::util::frame::video::Video,
        index: usize,
    ) -> Result<Frame, VisionError> {
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .map_err(|e| self.decode_err(e))?;
        let (width, height) = (self.decoder.width(), self.decoder.height());
        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        Ok(Frame::new(pixels, width, height, index))
    }

    /// Decode frames in order, passing `(estimated_index, frame)` to
    /// `on_decoded` until it returns `false`.
    fn decode_while(&mut self, on_decoded: &mut OnDecoded<'_>) -> Result<(), VisionError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        let mut next_index = 0;
        let mut eof_sent = false;

        loop {
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let index = self.index_of(decoded.timestamp()).unwrap_or(next_index);
                next_index = index + 1;
                if !on_decoded(self, index, &decoded)? {
                    return Ok(());
                }
            }
            if eof_sent {
                return Ok(());
            }

            let packet = loop {
                match self.ictx.packets().next() {
                    Some((stream, packet)) if stream.index() == self.stream_index => {
                        break Some(packet)
                    }
                    Some(_) => continue,
                    None => break None,
                }
            };
            match packet {
                Some(packet) => {
                    // Corrupt packets are skipped rather than aborting the read.
                    let _ = self.decoder.send_packet(&packet);
                }
                None => {
                    let _ = self.decoder.send_eof();
                    eof_sent = true;
                }
            }
        }
    }
}

/// Random access to a decoded video stream.
trait SeekableVideo {
    /// Position the demuxer on the keyframe at or before `frame_number`.
    /// Returns whether a seek happened.
    fn seek_to(&mut self, frame_number: usize) -> Result<bool, VisionError>;

    /// Decode forward until `frame_number`. After a seek only frames with a
    /// timestamp can be placed, so untimed frames are skipped.
    fn find_frame(
        &mut self,
        frame_number: usize,
        after_seek: bool,
    ) -> Result<Option<Frame>, VisionError>;
}

impl SeekableVideo for OpenVideo {
    fn seek_to(&mut self, frame_number: usize) -> Result<bool, VisionError> {
        if frame_number == 0 || self.fps <= 0.0 {
            return Ok(false);
        }
        let target = (frame_number as f64 / self.fps * AV_TIME_BASE) as i64;
        self.ictx
            .seek(target, ..target)
            .map_err(|e| self.decode_err(e))?;
        self.decoder.flush();
        Ok(true)
    }

    fn find_frame(
        &mut self,
        frame_number: usize,
        after_seek: bool,
    ) -> Result<Option<Frame>, VisionError> {
        let mut found = None;
        self.decode_while(&mut |video, index, decoded| {
            if after_seek && video.index_of(decoded.timestamp()).is_none() {
                return Ok(true);
            }
            if index < frame_number {
                return Ok(true);
            }
            found = Some(video.to_frame(decoded, frame_number)?);
            Ok(false)
        })?;
        Ok(found)
    }
}

/// Seek to `frame_number` and decode it. When the container refuses the seek
/// or the seeked decode misses the frame, reopen and count from the start.
fn locate_frame<V: SeekableVideo>(
    path: &Path,
    frame_number: usize,
    open: impl Fn() -> Result<V, VisionError>,
) -> Result<Frame, VisionError> {
    let mut video = open()?;
    match video.seek_to(frame_number) {
        Ok(true) => {
            if let Some(frame) = video.find_frame(frame_number, true)? {
                return Ok(frame);
            }
            video = open()?;
        }
        Ok(false) => {}
        Err(e) => {
            log::warn!(
                "Seeking {} to frame {frame_number} failed, decoding from the start: {e}",
                path.display()
            );
            video = open()?;
        }
    }

    video
        .find_frame(frame_number, false)?
        .ok_or_else(|| VisionError::FrameOutOfRange {
            path: path.to_path_buf(),
            frame_number,
        })
}

impl VisionReader for FfmpegVisionReader {
    fn read_image(&self, path: &Path) -> Result<Frame, VisionError> {
        let image = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(io) => VisionError::Open {
                path: path.to_path_buf(),
                message: io.to_string(),
            },
            other => VisionError::Decode {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        })?;
        Ok(Frame::from_rgb_image(image.to_rgb8(), 0))
    }

    fn read_video_frame(&self, path: &Path, frame_number: usize) -> Result<Frame, VisionError> {
        locate_frame(path, frame_number, || OpenVideo::open(path))
    }

    fn detect_video_fps(&self, path: &Path) -> Result<f64, VisionError> {
        Ok(OpenVideo::open(path)?.fps)
    }

    fn count_video_frames(&self, path: &Path) -> Result<usize, VisionError> {
        Ok(OpenVideo::open(path)?.frame_count())
    }

    fn for_each_video_frame(
        &self,
        path: &Path,
        on_frame: &mut dyn FnMut(Frame) -> bool,
    ) -> Result<usize, VisionError> {
        let mut video = OpenVideo::open(path)?;
        let mut delivered = 0;
        video.decode_while(&mut |video, _, decoded| {
            let frame = video.to_frame(decoded, delivered)?;
            delivered += 1;
            Ok(on_frame(frame))
        })?;
        Ok(delivered)
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
