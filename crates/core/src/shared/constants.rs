/// Registry key of the NSFW detector.
pub const NSFW_MODEL_NAME: &str = "yolo_nsfw";

/// Release bucket holding the detector assets.
pub const NSFW_MODEL_BUCKET: &str = "models-3.2.0";
pub const NSFW_MODEL_FILE: &str = "yolo_11m_nsfw.onnx";
pub const NSFW_HASH_FILE: &str = "yolo_11m_nsfw.hash";

/// Square input resolution the detector was trained on.
pub const NSFW_MODEL_INPUT_SIZE: (u32, u32) = (640, 640);

/// Name of the single input tensor of the exported model.
pub const NSFW_MODEL_INPUT_NAME: &str = "input";

/// Minimum class score for a candidate to count as unsafe (exclusive).
pub const NSFW_SCORE_THRESHOLD: f32 = 0.2;

/// Percentage of sampled video frames that must be unsafe to flag a video.
pub const DEFAULT_NSFW_RATE_THRESHOLD: f64 = 10.0;

/// Environment variable overriding the model directory.
pub const MODELS_DIR_ENV: &str = "CONTENT_GUARD_MODELS_DIR";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
