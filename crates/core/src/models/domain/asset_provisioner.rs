use crate::models::domain::model_descriptor::ModelSource;

/// Makes model assets available and verified on the local filesystem.
///
/// Both methods return `true` only when every referenced local file is
/// present and verified. Failures are reported as `false`, never as errors,
/// so callers can simply retry later.
pub trait AssetProvisioner: Send + Sync {
    /// Ensure digest files exist locally, downloading any that are missing.
    fn conditional_download_hashes(&self, hashes: &[ModelSource]) -> bool;

    /// Ensure source files exist locally and match their sibling digest
    /// file, downloading any that are missing.
    fn conditional_download_sources(&self, sources: &[ModelSource]) -> bool;
}
