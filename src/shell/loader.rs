use std::cell::Cell;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use super::types::CommandError;

thread_local! {
    /// Number of image handles currently open on this thread
    static OPEN_HANDLES: Cell<usize> = const { Cell::new(0) };
}

/// Count of handles opened but not yet released on the current thread
#[cfg(test)]
pub fn open_handles() -> usize {
    OPEN_HANDLES.with(Cell::get)
}

/// A file opened for a single `load` invocation.
///
/// The file is closed when the handle is dropped, so every return path out of
/// [`load_image`] releases it.
pub struct ImageHandle {
    path: PathBuf,
    reader: BufReader<File>,
}

impl ImageHandle {
    /// Open a file read-only
    pub fn open(path: &Path) -> Result<Self, CommandError> {
        let file = File::open(path).map_err(|source| CommandError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;

        OPEN_HANDLES.with(|count| count.set(count.get() + 1));
        trace!("opened {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }

    /// Read the whole file. Called once per handle.
    fn read_all(&mut self) -> Result<Vec<u8>, CommandError> {
        let mut bytes = Vec::new();
        self.reader
            .read_to_end(&mut bytes)
            .map_err(|source| CommandError::NotFound {
                path: self.path.clone(),
                source,
            })?;
        Ok(bytes)
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        OPEN_HANDLES.with(|count| count.set(count.get().saturating_sub(1)));
        trace!("released {}", self.path.display());
    }
}

/// A validated image and its content digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub file_name: String,
    pub digest: String,
    pub width: u32,
    pub height: u32,
}

impl LoadedImage {
    /// Two-line summary shown to the user
    pub fn summary(&self) -> String {
        format!("Loaded {}\nSHA-256: {}", self.file_name, self.digest)
    }
}

/// Hex-encoded SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Open, validate and hash the image at `path`
pub fn load_image(path: &Path) -> Result<LoadedImage, CommandError> {
    let bytes = {
        let mut handle = ImageHandle::open(path)?;
        handle.read_all()?
    };

    let format = image::guess_format(&bytes).ok();
    let decoded = image::load_from_memory(&bytes)?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let loaded = LoadedImage {
        file_name,
        digest: sha256_hex(&bytes),
        width: decoded.width(),
        height: decoded.height(),
    };
    debug!(
        "decoded {} as {:?}: {}x{}",
        loaded.file_name, format, loaded.width, loaded.height
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        let img = RgbImage::from_fn(4, 3, |x, y| Rgb([x as u8 * 40, y as u8 * 60, 128]));
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    #[test]
    fn test_load_valid_png() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "pixel art.png");

        let loaded = load_image(&path).unwrap();
        let expected = hex::encode(Sha256::digest(fs::read(&path).unwrap()));

        assert_eq!(loaded.file_name, "pixel art.png");
        assert_eq!(loaded.digest, expected);
        assert_eq!(loaded.digest.len(), 64);
        assert!(loaded.digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!((loaded.width, loaded.height), (4, 3));
    }

    #[test]
    fn test_identical_copies_share_digest() {
        let dir = TempDir::new().unwrap();
        let original = write_png(&dir, "a.png");
        let copy = dir.path().join("b.png");
        fs::copy(&original, &copy).unwrap();

        let first = load_image(&original).unwrap();
        let second = load_image(&copy).unwrap();
        assert_eq!(first.digest, second.digest);
        assert_ne!(first.file_name, second.file_name);
    }

    #[test]
    fn test_text_file_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "definitely not an image\n").unwrap();

        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, CommandError::Decode(_)));
        assert!(err.to_string().starts_with("Failed to load image: "));
    }

    #[test]
    fn test_truncated_png_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "cut.png");
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(matches!(load_image(&path), Err(CommandError::Decode(_))));
    }

    #[test]
    fn test_missing_file_mentions_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nowhere.png");

        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, CommandError::NotFound { .. }));
        assert!(err.to_string().contains("nowhere.png"));
    }

    #[test]
    fn test_handles_released_on_every_path() {
        let dir = TempDir::new().unwrap();
        let good = write_png(&dir, "good.png");
        let bad = dir.path().join("bad.txt");
        fs::write(&bad, "text").unwrap();

        let baseline = open_handles();
        for _ in 0..50 {
            load_image(&good).unwrap();
            load_image(&bad).unwrap_err();
            load_image(&dir.path().join("missing")).unwrap_err();
        }
        assert_eq!(open_handles(), baseline);
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
