use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("failed to read binary {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("hash mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: String, actual: String },
}

/// Compare a downloaded binary's SHA-256 against the hash carried by the
/// winning signal. Executor implementations call this before swapping
/// binaries; a mismatch means the download must be discarded.
pub fn verify_binary_hash(
    binary_path: impl AsRef<Path>,
    expected_hash: &str,
) -> Result<(), VerificationError> {
    let path = binary_path.as_ref();
    let mut file = File::open(path).map_err(|source| VerificationError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|source| VerificationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let actual = hex::encode(hasher.finalize());
    if !actual.eq_ignore_ascii_case(expected_hash) {
        return Err(VerificationError::Mismatch {
            expected: expected_hash.to_string(),
            actual,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_matching_hash() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hyperqube binary contents").unwrap();

        let expected = hex::encode(Sha256::digest(b"hyperqube binary contents"));
        assert!(verify_binary_hash(file.path(), &expected).is_ok());
        // Hex case must not matter.
        assert!(verify_binary_hash(file.path(), &expected.to_uppercase()).is_ok());
    }

    #[test]
    fn test_mismatched_hash() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hyperqube binary contents").unwrap();

        let err = verify_binary_hash(file.path(), &"00".repeat(32)).unwrap_err();
        assert!(matches!(err, VerificationError::Mismatch { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = verify_binary_hash("/nonexistent/binary", &"00".repeat(32)).unwrap_err();
        assert!(matches!(err, VerificationError::Read { .. }));
    }
}
