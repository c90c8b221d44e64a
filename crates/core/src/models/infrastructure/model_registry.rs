use std::sync::OnceLock;

use crate::models::domain::model_descriptor::{
    DownloadScope, ModelDescriptor, ModelSet, ModelSource,
};
use crate::models::infrastructure::download_url::resolve_download_url;
use crate::shared::constants::{
    NSFW_HASH_FILE, NSFW_MODEL_BUCKET, NSFW_MODEL_FILE, NSFW_MODEL_INPUT_SIZE, NSFW_MODEL_NAME,
};
use crate::shared::paths::resolve_relative_path;

static LITE_MODEL_SET: OnceLock<ModelSet> = OnceLock::new();
static FULL_MODEL_SET: OnceLock<ModelSet> = OnceLock::new();

/// Model descriptors for `scope`, built once per process.
///
/// Every call with the same scope returns the same instance.
pub fn create_static_model_set(scope: DownloadScope) -> &'static ModelSet {
    let cell = match scope {
        DownloadScope::Lite => &LITE_MODEL_SET,
        DownloadScope::Full => &FULL_MODEL_SET,
    };
    cell.get_or_init(build_model_set)
}

/// Descriptor of the NSFW detector in the default (full) scope.
pub fn get_model_options() -> &'static ModelDescriptor {
    create_static_model_set(DownloadScope::Full)
        .get(NSFW_MODEL_NAME)
        .expect("model registry always contains the NSFW detector")
}

// The detector ships a single variant, so both scopes describe the same assets.
fn build_model_set() -> ModelSet {
    ModelSet::new().with(
        NSFW_MODEL_NAME,
        ModelDescriptor {
            hash_source: ModelSource {
                url: resolve_download_url(NSFW_MODEL_BUCKET, NSFW_HASH_FILE),
                path: resolve_relative_path(NSFW_HASH_FILE),
            },
            weight_source: ModelSource {
                url: resolve_download_url(NSFW_MODEL_BUCKET, NSFW_MODEL_FILE),
                path: resolve_relative_path(NSFW_MODEL_FILE),
            },
            input_size: NSFW_MODEL_INPUT_SIZE,
        },
    )
}
