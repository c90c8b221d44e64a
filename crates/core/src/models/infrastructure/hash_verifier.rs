use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// CRC32 of a file's contents as 8 lowercase hex digits, the format the
/// published `.hash` files use.
pub fn file_digest(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:08x}", hasher.finalize()))
}

/// Expected digest stored in a `.hash` file, or `None` if the file is
/// missing, unreadable or blank.
pub fn read_expected_digest(hash_path: &Path) -> Option<String> {
    let content = fs::read_to_string(hash_path).ok()?;
    let digest = content.trim();
    if digest.is_empty() {
        None
    } else {
        Some(digest.to_string())
    }
}

/// Whether a hash file holds a usable digest.
pub fn validate_hash(hash_path: &Path) -> bool {
    read_expected_digest(hash_path).is_some()
}

/// Whether `source_path` matches the digest in `hash_path`.
pub fn validate_source(source_path: &Path, hash_path: &Path) -> bool {
    let Some(expected) = read_expected_digest(hash_path) else {
        return false;
    };
    match file_digest(source_path) {
        Ok(actual) => actual.eq_ignore_ascii_case(&expected),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // crc32("hello")
    const HELLO_DIGEST: &str = "3610a686";

    #[test]
    fn test_file_digest_matches_known_value() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.bin");
        fs::write(&path, b"hello").unwrap();
        assert_eq!(file_digest(&path).unwrap(), HELLO_DIGEST);
    }

    #[test]
    fn test_file_digest_keeps_leading_zeros() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.bin");
        fs::write(&path, b"").unwrap();
        assert_eq!(file_digest(&path).unwrap(), "00000000");
    }

    #[test]
    fn test_validate_source_accepts_published_hash_file() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("model.onnx");
        let hash = tmp.path().join("model.hash");
        fs::write(&source, b"hello").unwrap();
        fs::write(&hash, "3610a686").unwrap();

        assert!(validate_source(&source, &hash));
    }

    #[test]
    fn test_validate_source_accepts_matching_digest_with_whitespace() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("model.onnx");
        let hash = tmp.path().join("model.hash");
        fs::write(&source, b"hello").unwrap();
        fs::write(&hash, format!("{}\n", HELLO_DIGEST.to_uppercase())).unwrap();

        assert!(validate_source(&source, &hash));
    }

    #[test]
    fn test_validate_source_rejects_mismatch() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("model.onnx");
        let hash = tmp.path().join("model.hash");
        fs::write(&source, b"tampered").unwrap();
        fs::write(&hash, HELLO_DIGEST).unwrap();

        assert!(!validate_source(&source, &hash));
    }

    #[test]
    fn test_validate_source_without_hash_file_fails() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("model.onnx");
        fs::write(&source, b"hello").unwrap();

        assert!(!validate_source(&source, &tmp.path().join("model.hash")));
    }

    #[test]
    fn test_validate_hash_rejects_blank_file() {
        let tmp = TempDir::new().unwrap();
        let hash = tmp.path().join("model.hash");
        fs::write(&hash, "  \n").unwrap();

        assert!(!validate_hash(&hash));
        assert!(!validate_hash(&tmp.path().join("missing.hash")));
    }
}
