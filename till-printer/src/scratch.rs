//! Per-delivery scratch file
//!
//! The file lives exactly as long as its [`ScratchArtifact`]; dropping the
//! value (normal return, `?`, panic unwind, or a cancelled future) deletes it.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{PrintError, PrintResult};

const PREFIX: &str = "receipt-";
const SUFFIX: &str = ".txt";

#[derive(Debug)]
pub(crate) struct ScratchArtifact {
    file: NamedTempFile,
}

impl ScratchArtifact {
    /// Create a uniquely named file and write `bytes` into it
    pub(crate) fn create(dir: Option<&Path>, bytes: &[u8]) -> PrintResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX).suffix(SUFFIX);

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(PrintError::Scratch)?;

        file.write_all(bytes).map_err(PrintError::Scratch)?;
        file.flush().map_err(PrintError::Scratch)?;

        debug!(path = %file.path().display(), bytes = bytes.len(), "Scratch artifact written");
        Ok(Self { file })
    }

    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }

    /// Bare file name, used as the remote staging name
    pub(crate) fn file_name(&self) -> PrintResult<String> {
        self.path()
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                PrintError::Scratch(std::io::Error::other(format!(
                    "scratch path has no usable file name: {}",
                    self.path().display()
                )))
            })
    }

    #[cfg(test)]
    fn path_buf(&self) -> std::path::PathBuf {
        self.path().to_path_buf()
    }
}

impl Drop for ScratchArtifact {
    fn drop(&mut self) {
        debug!(path = %self.file.path().display(), "Scratch artifact released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_is_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let artifact = ScratchArtifact::create(Some(dir.path()), b"hello").unwrap();
        let path = artifact.path_buf();

        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        let name = artifact.file_name().unwrap();
        assert!(name.starts_with("receipt-"));
        assert!(name.ends_with(".txt"));

        drop(artifact);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_names_are_unique() {
        let dir = TempDir::new().unwrap();
        let a = ScratchArtifact::create(Some(dir.path()), b"a").unwrap();
        let b = ScratchArtifact::create(Some(dir.path()), b"b").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_missing_dir_is_scratch_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = ScratchArtifact::create(Some(&missing), b"x").unwrap_err();
        assert!(matches!(err, PrintError::Scratch(_)));
    }
}
