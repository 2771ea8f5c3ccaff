//! Hashing utilities for the lockfile staleness fingerprint.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Compute SHA256 hash of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 hash of a string.
pub fn sha256_str(s: &str) -> String {
    sha256_bytes(s.as_bytes())
}

/// Compute SHA256 hash of a file's content.
///
/// This is the fingerprint stored in the lockfile's `sha` field: it is
/// computed over the spec file, so a changed spec no longer matches the
/// recorded value and the lockfile is known to be out of date.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_hash_matches_string_hash() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Galleyfile");
        std::fs::write(&path, "cookbook 'apt'\n").unwrap();

        assert_eq!(sha256_file(&path).unwrap(), sha256_str("cookbook 'apt'\n"));
    }

    #[test]
    fn different_content_different_hash() {
        assert_ne!(sha256_str("a"), sha256_str("b"));
    }
}
