use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::analysis::content_analyser::{AnalyseError, ContentAnalyser};
use crate::analysis::stream_sampler::{sample_interval, StreamSampler};
use crate::shared::frame::Frame;
use crate::video::domain::vision_reader::{VisionError, VisionReader};

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

#[derive(Error, Debug)]
pub enum StreamScanError {
    #[error(transparent)]
    Analyse(#[from] AnalyseError),
    #[error("decoder thread panicked while reading {0}")]
    ReaderPanicked(PathBuf),
}

impl From<VisionError> for StreamScanError {
    fn from(e: VisionError) -> Self {
        Self::Analyse(AnalyseError::Vision(e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamReport {
    /// Frames decoded and fed to the analyser.
    pub frames: usize,
    /// Frames that reached the detector.
    pub sampled: usize,
    /// Sampled frames judged unsafe.
    pub unsafe_frames: usize,
}

/// Replays a video file as a live stream through
/// [`ContentAnalyser::analyse_stream`].
///
/// Layout: `reader → analyse`. Decoding runs on its own thread so it overlaps
/// with inference; the bounded channel keeps at most a few frames in flight.
pub struct ScanStreamUseCase {
    analyser: Arc<ContentAnalyser>,
    reader: Arc<dyn VisionReader>,
    channel_capacity: usize,
}

impl ScanStreamUseCase {
    pub fn new(analyser: Arc<ContentAnalyser>, reader: Arc<dyn VisionReader>) -> Self {
        Self {
            analyser,
            reader,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn execute(&self, path: &Path) -> Result<StreamReport, StreamScanError> {
        let fps = self.reader.detect_video_fps(path)?;
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Frame>(self.channel_capacity);

        let reader = self.reader.clone();
        let source = path.to_path_buf();
        let reader_handle = std::thread::spawn(move || {
            reader.for_each_video_frame(&source, &mut |frame| frame_tx.send(frame).is_ok())
        });

        let mut sampler = StreamSampler::new();
        let mut report = StreamReport::default();
        let mut analyse_error = None;

        for frame in &frame_rx {
            match self.analyser.analyse_stream(&mut sampler, &frame, fps) {
                Ok(unsafe_frame) => {
                    report.frames += 1;
                    if unsafe_frame {
                        report.unsafe_frames += 1;
                    }
                }
                Err(e) => {
                    analyse_error = Some(e);
                    break;
                }
            }
        }
        // Unblocks the decoder if we stopped early.
        drop(frame_rx);

        let decoded = reader_handle
            .join()
            .map_err(|_| StreamScanError::ReaderPanicked(path.to_path_buf()))?;
        if let Some(e) = analyse_error {
            return Err(e.into());
        }
        decoded?;

        report.sampled = (sampler.ticks() / sample_interval(fps)) as usize;
        log::info!(
            "{}: {} frames, {} sampled, {} unsafe",
            path.display(),
            report.frames,
            report.sampled,
            report.unsafe_frames
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::domain::inference_session::{
        InferenceError, InferenceSession, ModelLoadError, SessionLoader,
    };
    use crate::inference::inference_pool::InferencePool;
    use crate::models::domain::asset_provisioner::AssetProvisioner;
    use crate::models::domain::model_descriptor::ModelSource;
    use crate::shared::config::{AnalyserConfig, ContentPolicy};
    use ndarray::{Array3, Array4, ArrayD};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    // --- Stubs ---

    struct BrightnessSession {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl InferenceSession for BrightnessSession {
        fn run(&self, _input_name: &str, tensor: Array4<f32>) -> Result<ArrayD<f32>, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(InferenceError::NoOutputs);
            }
            let (_, _, h, w) = tensor.dim();
            let mut detection = Array3::<f32>::zeros((1, 9, 8400));
            if tensor[[0, 0, h / 2, w / 2]] > 0.5 {
                detection[[0, 5, 7]] = 0.7;
            }
            Ok(detection.into_dyn())
        }
    }

    struct StubLoader(Arc<BrightnessSession>);

    impl SessionLoader for StubLoader {
        fn load(
            &self,
            _model_name: &str,
            _source: &ModelSource,
        ) -> Result<Arc<dyn InferenceSession>, ModelLoadError> {
            Ok(self.0.clone())
        }
    }

    struct ReadyProvisioner;

    impl AssetProvisioner for ReadyProvisioner {
        fn conditional_download_hashes(&self, _hashes: &[ModelSource]) -> bool {
            true
        }

        fn conditional_download_sources(&self, _sources: &[ModelSource]) -> bool {
            true
        }
    }

    /// A `total`-frame stream where frames listed in `bright` are white.
    struct StubStream {
        fps: f64,
        total: usize,
        bright: Vec<usize>,
        fail_at: Option<usize>,
        delivered: AtomicUsize,
    }

    impl StubStream {
        fn new(fps: f64, total: usize, bright: Vec<usize>) -> Self {
            Self {
                fps,
                total,
                bright,
                fail_at: None,
                delivered: AtomicUsize::new(0),
            }
        }
    }

    impl VisionReader for StubStream {
        fn read_image(&self, path: &Path) -> Result<Frame, VisionError> {
            Err(VisionError::NoVideoStream(path.to_path_buf()))
        }

        fn read_video_frame(&self, path: &Path, frame_number: usize) -> Result<Frame, VisionError> {
            Err(VisionError::FrameOutOfRange {
                path: path.to_path_buf(),
                frame_number,
            })
        }

        fn detect_video_fps(&self, _path: &Path) -> Result<f64, VisionError> {
            Ok(self.fps)
        }

        fn count_video_frames(&self, _path: &Path) -> Result<usize, VisionError> {
            Ok(self.total)
        }

        fn for_each_video_frame(
            &self,
            path: &Path,
            on_frame: &mut dyn FnMut(Frame) -> bool,
        ) -> Result<usize, VisionError> {
            let mut delivered = 0;
            for index in 0..self.total {
                if self.fail_at == Some(index) {
                    return Err(VisionError::Decode {
                        path: path.to_path_buf(),
                        message: "corrupt packet".into(),
                    });
                }
                let level = if self.bright.contains(&index) { 255 } else { 0 };
                let frame = Frame::new(vec![level; 16 * 16 * 3], 16, 16, index);
                delivered += 1;
                self.delivered.store(delivered, Ordering::SeqCst);
                if !on_frame(frame) {
                    break;
                }
            }
            Ok(delivered)
        }
    }

    fn setup(stream: StubStream) -> (ScanStreamUseCase, Arc<BrightnessSession>, Arc<StubStream>) {
        let session = Arc::new(BrightnessSession {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        });
        let stream = Arc::new(stream);
        let pool = Arc::new(InferencePool::new(Box::new(StubLoader(session.clone()))));
        let config = AnalyserConfig {
            policy: ContentPolicy::Enforced,
            ..AnalyserConfig::default()
        };
        let analyser = Arc::new(ContentAnalyser::new(
            config,
            pool,
            Arc::new(ReadyProvisioner),
            stream.clone(),
        ));
        (ScanStreamUseCase::new(analyser, stream.clone()), session, stream)
    }

    // --- Tests ---

    #[test]
    fn test_samples_once_per_second() {
        // 1-based ticks 10, 20, 30 land on frame indices 9, 19, 29
        let (use_case, session, _) = setup(StubStream::new(10.0, 35, vec![19]));

        let report = use_case.execute(Path::new("cam.mp4")).unwrap();

        assert_eq!(
            report,
            StreamReport {
                frames: 35,
                sampled: 3,
                unsafe_frames: 1,
            }
        );
        assert_eq!(session.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unsampled_bright_frames_are_not_flagged() {
        let (use_case, session, _) = setup(StubStream::new(10.0, 9, (0..9).collect()));

        let report = use_case.execute(Path::new("cam.mp4")).unwrap();

        assert_eq!(report.unsafe_frames, 0);
        assert_eq!(report.sampled, 0);
        assert_eq!(session.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_decode_error_is_reported() {
        let mut stream = StubStream::new(10.0, 30, vec![]);
        stream.fail_at = Some(12);
        let (use_case, _, _) = setup(stream);

        let result = use_case.execute(Path::new("cam.mp4"));

        assert!(matches!(
            result,
            Err(StreamScanError::Analyse(AnalyseError::Vision(VisionError::Decode { .. })))
        ));
    }

    #[test]
    fn test_inference_error_stops_decoding() {
        let (use_case, session, stream) = setup(StubStream::new(1.0, 10_000, vec![]));
        session.fail.store(true, Ordering::SeqCst);

        let result = use_case.execute(Path::new("cam.mp4"));

        assert!(matches!(
            result,
            Err(StreamScanError::Analyse(AnalyseError::Inference(InferenceError::NoOutputs)))
        ));
        assert!(stream.delivered.load(Ordering::SeqCst) < 10_000);
    }
}
