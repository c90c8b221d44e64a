use std::collections::BTreeMap;
use std::path::PathBuf;

/// Where an asset lives remotely and where it is kept locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSource {
    pub url: String,
    pub path: PathBuf,
}

impl ModelSource {
    /// Path of the digest file that verifies this source: same stem, `.hash`
    /// extension.
    pub fn hash_path(&self) -> PathBuf {
        self.path.with_extension("hash")
    }
}

/// Everything needed to provision and feed one detector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub hash_source: ModelSource,
    pub weight_source: ModelSource,
    /// `(width, height)` of the model input.
    pub input_size: (u32, u32),
}

/// Which model variants a caller intends to provision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DownloadScope {
    Lite,
    Full,
}

/// Named model descriptors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelSet {
    models: BTreeMap<&'static str, ModelDescriptor>,
}

impl ModelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, descriptor: ModelDescriptor) -> Self {
        self.models.insert(name, descriptor);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.models.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(path: &str) -> ModelSource {
        ModelSource {
            url: format!("https://example.com/{path}"),
            path: PathBuf::from(path),
        }
    }

    #[test]
    fn test_hash_path_swaps_extension() {
        assert_eq!(
            source("/models/yolo.onnx").hash_path(),
            PathBuf::from("/models/yolo.hash")
        );
    }

    #[test]
    fn test_model_set_lookup() {
        let descriptor = ModelDescriptor {
            hash_source: source("a.hash"),
            weight_source: source("a.onnx"),
            input_size: (320, 320),
        };
        let set = ModelSet::new().with("a", descriptor.clone());

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a"), Some(&descriptor));
        assert_eq!(set.get("b"), None);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_empty_model_set() {
        assert!(ModelSet::new().is_empty());
    }
}
