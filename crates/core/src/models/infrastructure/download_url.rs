/// Hosts that mirror the model release buckets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DownloadProvider {
    #[default]
    Github,
    HuggingFace,
}

impl DownloadProvider {
    fn base_url(self) -> &'static str {
        match self {
            DownloadProvider::Github => "https://github.com",
            DownloadProvider::HuggingFace => "https://huggingface.co",
        }
    }

    /// Remote URL of `file` within release `bucket` on this host.
    pub fn url_for(self, bucket: &str, file: &str) -> String {
        let base = self.base_url();
        match self {
            DownloadProvider::Github => {
                format!("{base}/facefusion/{bucket}/releases/download/{bucket}/{file}")
            }
            DownloadProvider::HuggingFace => {
                format!("{base}/facefusion/{bucket}/resolve/main/{file}")
            }
        }
    }
}

/// Remote URL of `file` within release `bucket` on the default host.
pub fn resolve_download_url(bucket: &str, file: &str) -> String {
    DownloadProvider::default().url_for(bucket, file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_url_layout() {
        assert_eq!(
            resolve_download_url("models-3.2.0", "yolo_11m_nsfw.onnx"),
            "https://github.com/facefusion/models-3.2.0/releases/download/models-3.2.0/yolo_11m_nsfw.onnx"
        );
    }

    #[test]
    fn test_huggingface_url_layout() {
        assert_eq!(
            DownloadProvider::HuggingFace.url_for("models-3.2.0", "yolo_11m_nsfw.hash"),
            "https://huggingface.co/facefusion/models-3.2.0/resolve/main/yolo_11m_nsfw.hash"
        );
    }
}
