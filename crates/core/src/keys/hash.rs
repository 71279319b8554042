//! Content hashing for media files.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::model::Media;

use super::KeyError;

const CHUNK_SIZE: usize = 64 * 1024;

/// The digest used for content addressing and deduplication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// 256-bit SHA-2 digest.
    #[default]
    Sha256,
    /// 512-bit SHA-2 digest.
    Sha512,
}

impl HashAlgorithm {
    /// The label used when recording hashes, e.g. `"sha256"`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Streams the file at `path` through the digest and returns the hex
    /// rendering.
    pub fn digest_file(&self, path: &Path) -> Result<String, KeyError> {
        let io_err = |source| KeyError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(io_err)?;
        let hex = match self {
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                stream_into(&mut hasher, &mut file).map_err(io_err)?;
                format!("{:x}", hasher.finalize())
            }
            Self::Sha512 => {
                let mut hasher = Sha512::new();
                stream_into(&mut hasher, &mut file).map_err(io_err)?;
                format!("{:x}", hasher.finalize())
            }
        };
        Ok(hex)
    }
}

fn stream_into<D: Digest>(hasher: &mut D, reader: &mut impl Read) -> io::Result<()> {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(())
}

/// Ensures `media` carries a content hash, computing one when absent.
///
/// The recorded form is `"<label>:<hex>"`. Hashing cascades one level into
/// nested media (thumbnails, previews) since their lifecycle follows the
/// owner's.
pub fn ensure_hash(media: &mut Media, algo: HashAlgorithm) -> Result<(), KeyError> {
    if media.hash().is_none() {
        let hex = algo.digest_file(&media.filename)?;
        media.set_hash(format!("{}:{}", algo.label(), hex));
    }
    for nested in media.nested_media_mut() {
        if nested.hash().is_none() {
            let hex = algo.digest_file(&nested.filename)?;
            nested.set_hash(format!("{}:{}", algo.label(), hex));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_sha256_known_digest() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.txt", b"abc");
        let hex = HashAlgorithm::Sha256.digest_file(&path).unwrap();
        assert_eq!(
            hex,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha512_digest_length() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.txt", b"abc");
        let hex = HashAlgorithm::Sha512.digest_file(&path).unwrap();
        assert_eq!(hex.len(), 128);
    }

    #[test]
    fn test_same_bytes_same_digest() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.bin", b"identical bytes");
        let b = write_file(&dir, "b.bin", b"identical bytes");
        assert_eq!(
            HashAlgorithm::Sha256.digest_file(&a).unwrap(),
            HashAlgorithm::Sha256.digest_file(&b).unwrap()
        );
    }

    #[test]
    fn test_ensure_hash_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.txt", b"abc");
        let mut media = Media::new(&path);

        ensure_hash(&mut media, HashAlgorithm::Sha256).unwrap();
        let first = media.hash().unwrap().to_string();
        assert!(first.starts_with("sha256:"));

        // A second pass must not recompute or change anything, even if the
        // file has since been deleted.
        std::fs::remove_file(&path).unwrap();
        ensure_hash(&mut media, HashAlgorithm::Sha256).unwrap();
        assert_eq!(media.hash().unwrap(), first);
    }

    #[test]
    fn test_ensure_hash_cascades_into_nested() {
        let dir = TempDir::new().unwrap();
        let main = write_file(&dir, "main.mp4", b"main");
        let thumb = write_file(&dir, "thumb.jpg", b"thumb");

        let mut media = Media::new(&main);
        media.set("preview", Media::new(&thumb));

        ensure_hash(&mut media, HashAlgorithm::Sha256).unwrap();
        assert!(media.hash().is_some());
        assert!(media.nested_media()[0].hash().is_some());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut media = Media::new("/nonexistent/file.bin");
        let result = ensure_hash(&mut media, HashAlgorithm::Sha256);
        assert!(matches!(result, Err(KeyError::Io { .. })));
    }
}
