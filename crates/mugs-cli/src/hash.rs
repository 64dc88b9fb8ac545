//! Content identity.
//!
//! A file's identity is the BLAKE3 digest of its full byte content, rendered
//! as lowercase hex. Paths, timestamps and permissions do not participate.

use std::fs::File;
use std::io;
use std::path::Path;

/// Hashes a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Hashes a file's current content, streaming it from disk.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_identical_bytes_hash_identically() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.star");
        let b = dir.path().join("nested_b.bzl");
        std::fs::write(&a, "command(name = 'x', execute = len)").unwrap();
        std::fs::write(&b, "command(name = 'x', execute = len)").unwrap();

        assert_eq!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
        assert_eq!(
            hash_file(&a).unwrap(),
            hash_bytes(b"command(name = 'x', execute = len)")
        );
    }

    #[test]
    fn test_hash_changes_with_content() {
        assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
        assert_eq!(hash_bytes(b"").len(), 64);
    }

    #[test]
    fn test_missing_file() {
        assert!(hash_file(Path::new("/nonexistent/file.star")).is_err());
    }
}
