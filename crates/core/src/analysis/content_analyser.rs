use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{Array4, ArrayD};
use thiserror::Error;

use crate::analysis::memo_cache::MemoCache;
use crate::analysis::preprocess::{fit_frame, prepare_detect_frame};
use crate::analysis::score_extractor::extract_nsfw_scores;
use crate::analysis::stream_sampler::{sample_interval, StreamSampler};
use crate::inference::domain::inference_session::{InferenceError, ModelLoadError};
use crate::inference::inference_pool::{InferencePool, SessionSet};
use crate::inference::thread_gate::ThreadGate;
use crate::models::domain::asset_provisioner::AssetProvisioner;
use crate::models::domain::model_descriptor::ModelDescriptor;
use crate::models::infrastructure::model_registry::get_model_options;
use crate::shared::config::{AnalyserConfig, ContentPolicy};
use crate::shared::constants::{NSFW_MODEL_INPUT_NAME, NSFW_MODEL_NAME, NSFW_SCORE_THRESHOLD};
use crate::shared::frame::Frame;
use crate::video::domain::vision_reader::{VisionError, VisionReader};

#[derive(Error, Debug)]
pub enum AnalyseError {
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Vision(#[from] VisionError),
}

/// Progress callback for video analysis: `(frames_done, frames_total)`.
pub type VideoProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

type VideoKey = (PathBuf, usize, Option<usize>);

/// Caller-facing NSFW decisions for frames, images, videos and streams.
///
/// Shared by reference across threads. Image and video verdicts are computed
/// once per key and served from cache afterwards. Under
/// [`ContentPolicy::Disabled`] frame and video verdicts are always "safe" and
/// never touch the detector; [`detect_nsfw`](Self::detect_nsfw) runs the
/// detector regardless.
pub struct ContentAnalyser {
    config: AnalyserConfig,
    pool: Arc<InferencePool>,
    provisioner: Arc<dyn AssetProvisioner>,
    reader: Arc<dyn VisionReader>,
    gate: ThreadGate,
    image_verdicts: MemoCache<PathBuf, bool>,
    video_verdicts: MemoCache<VideoKey, bool>,
    video_progress: Option<VideoProgressFn>,
}

impl ContentAnalyser {
    pub fn new(
        config: AnalyserConfig,
        pool: Arc<InferencePool>,
        provisioner: Arc<dyn AssetProvisioner>,
        reader: Arc<dyn VisionReader>,
    ) -> Self {
        let gate = ThreadGate::new(config.execution_thread_count);
        Self {
            config,
            pool,
            provisioner,
            reader,
            gate,
            image_verdicts: MemoCache::new(),
            video_verdicts: MemoCache::new(),
            video_progress: None,
        }
    }

    pub fn with_video_progress(mut self, progress: VideoProgressFn) -> Self {
        self.video_progress = Some(progress);
        self
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    pub fn gate(&self) -> &ThreadGate {
        &self.gate
    }

    pub fn model_options(&self) -> &'static ModelDescriptor {
        get_model_options()
    }

    /// Make sure the detector's digest and weights are present and verified.
    /// Inference must not be attempted when this returns `false`.
    pub fn pre_check(&self) -> bool {
        let options = self.model_options();
        self.provisioner
            .conditional_download_hashes(std::slice::from_ref(&options.hash_source))
            && self
                .provisioner
                .conditional_download_sources(std::slice::from_ref(&options.weight_source))
    }

    pub fn get_inference_pool(&self) -> Result<SessionSet, ModelLoadError> {
        let options = self.model_options();
        self.pool.get_all(&[(NSFW_MODEL_NAME, &options.weight_source)])
    }

    pub fn clear_inference_pool(&self) {
        self.pool.clear(&[NSFW_MODEL_NAME]);
    }

    /// One detector pass over a prepared `[1, 3, H, W]` tensor.
    ///
    /// Blocks while the gate is full. The gate slot is released on every
    /// exit path.
    pub fn forward(&self, tensor: Array4<f32>) -> Result<ArrayD<f32>, AnalyseError> {
        let session = self
            .pool
            .get(NSFW_MODEL_NAME, &self.model_options().weight_source)?;

        let _permit = self.gate.acquire();
        let detection = session.run(NSFW_MODEL_INPUT_NAME, tensor)?;
        log::debug!("NSFW forward pass produced {:?}", detection.shape());
        Ok(detection)
    }

    /// Confidence of every candidate whose best class score exceeds the
    /// NSFW threshold. Empty when nothing unsafe was found.
    pub fn detect_nsfw(&self, frame: &Frame) -> Result<Vec<f32>, AnalyseError> {
        let fitted = fit_frame(frame, self.model_options().input_size);
        let detection = self.forward(prepare_detect_frame(&fitted))?;
        Ok(extract_nsfw_scores(detection.view(), NSFW_SCORE_THRESHOLD)?)
    }

    pub fn analyse_frame(&self, frame: &Frame) -> Result<bool, AnalyseError> {
        match self.config.policy {
            ContentPolicy::Disabled => Ok(false),
            ContentPolicy::Enforced => Ok(!self.detect_nsfw(frame)?.is_empty()),
        }
    }

    /// Analyse roughly one frame per second of a stream; every other frame
    /// is reported safe without inference.
    pub fn analyse_stream(
        &self,
        sampler: &mut StreamSampler,
        frame: &Frame,
        fps: f64,
    ) -> Result<bool, AnalyseError> {
        if sampler.tick(fps) {
            return self.analyse_frame(frame);
        }
        Ok(false)
    }

    pub fn analyse_image(&self, path: &Path) -> Result<bool, AnalyseError> {
        self.image_verdicts
            .get_or_try_insert_with(path.to_path_buf(), || {
                let frame = self.reader.read_image(path)?;
                self.analyse_frame(&frame)
            })
    }

    /// Verdict for frames `trim_start..trim_end` of a video. `trim_end` of
    /// `None` runs to the last frame.
    pub fn analyse_video(
        &self,
        path: &Path,
        trim_start: usize,
        trim_end: Option<usize>,
    ) -> Result<bool, AnalyseError> {
        let key = (path.to_path_buf(), trim_start, trim_end);
        self.video_verdicts.get_or_try_insert_with(key, || match self.config.policy {
            ContentPolicy::Disabled => Ok(false),
            ContentPolicy::Enforced => self.scan_video(path, trim_start, trim_end),
        })
    }

    fn scan_video(
        &self,
        path: &Path,
        trim_start: usize,
        trim_end: Option<usize>,
    ) -> Result<bool, AnalyseError> {
        let fps = self.reader.detect_video_fps(path)?;
        let trim_end = match trim_end {
            Some(end) => end,
            None => self.reader.count_video_frames(path)?,
        };
        if trim_end <= trim_start {
            return Ok(false);
        }

        let interval = sample_interval(fps) as usize;
        let total = trim_end - trim_start;
        let mut unsafe_frames = 0usize;

        for (done, frame_number) in (trim_start..trim_end).enumerate() {
            if frame_number % interval == 0 {
                let frame = self.reader.read_video_frame(path, frame_number)?;
                if self.analyse_frame(&frame)? {
                    unsafe_frames += 1;
                }
            }
            if let Some(progress) = &self.video_progress {
                progress(done + 1, total);
            }
        }

        let rate = (unsafe_frames * interval) as f64 / total as f64 * 100.0;
        log::info!(
            "{}: {unsafe_frames} unsafe sampled frames, rate {rate:.1}%",
            path.display()
        );
        Ok(rate > self.config.nsfw_rate_threshold)
    }
}
