//! Where frames come from.
//!
//! Frames on disk follow `<directory>/frame<NNNN>.<ext>` with a 1-based,
//! zero-padded four-digit index.

use std::path::{Path, PathBuf};

use crate::error::RenderError;

/// Supplies encoded frames to the scheduler.
///
/// Implementations are shared across worker threads.
pub trait FrameProvider: Sync {
    /// Number of frames, indexed `1..=count`.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] if the frames cannot be enumerated.
    fn frame_count(&self) -> Result<usize, RenderError>;

    /// Encoded image bytes of frame `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Read`] if the frame cannot be read.
    fn read_frame(&self, index: usize) -> Result<Vec<u8>, RenderError>;

    /// Location reported in errors about frame `index`.
    fn frame_path(&self, index: usize) -> PathBuf;
}

/// A directory of numbered frame files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSource {
    directory: PathBuf,
    extension: String,
}

impl FrameSource {
    /// Default frame directory.
    pub const DEFAULT_DIRECTORY: &str = "frames";
    /// Default frame file extension.
    pub const DEFAULT_EXTENSION: &str = "png";

    /// Frames in `directory` with extension `extension` (a leading `.`
    /// is ignored).
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.trim_start_matches('.').to_owned(),
        }
    }

    /// The frame directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The frame file extension, without a leading dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Count directory entries that are files with the configured
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Enumerate`] if the directory cannot be
    /// listed and [`RenderError::NoFrames`] if nothing matches.
    pub fn count_frames(&self) -> Result<usize, RenderError> {
        let enumerate_err = |source| RenderError::Enumerate {
            directory: self.directory.clone(),
            source,
        };
        let mut count = 0;
        for entry in std::fs::read_dir(&self.directory).map_err(enumerate_err)? {
            let path = entry.map_err(enumerate_err)?.path();
            let matches = path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension));
            if matches && path.is_file() {
                count += 1;
            }
        }
        if count == 0 {
            return Err(RenderError::NoFrames {
                directory: self.directory.clone(),
                extension: self.extension.clone(),
            });
        }
        Ok(count)
    }
}

impl Default for FrameSource {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIRECTORY, Self::DEFAULT_EXTENSION)
    }
}

impl FrameProvider for FrameSource {
    fn frame_count(&self) -> Result<usize, RenderError> {
        self.count_frames()
    }

    fn read_frame(&self, index: usize) -> Result<Vec<u8>, RenderError> {
        let path = self.frame_path(index);
        std::fs::read(&path).map_err(|source| RenderError::Read { path, source })
    }

    fn frame_path(&self, index: usize) -> PathBuf {
        self.directory
            .join(format!("frame{index:04}.{}", self.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_path_is_zero_padded_and_one_based() {
        let source = FrameSource::new("clips/intro", "jpg");
        assert_eq!(
            source.frame_path(1),
            Path::new("clips/intro").join("frame0001.jpg")
        );
        assert_eq!(
            source.frame_path(123),
            Path::new("clips/intro").join("frame0123.jpg")
        );
    }

    #[test]
    fn indices_past_four_digits_are_not_truncated() {
        let source = FrameSource::new("f", "png");
        assert_eq!(source.frame_path(12345), Path::new("f").join("frame12345.png"));
    }

    #[test]
    fn leading_dot_in_extension_is_dropped() {
        assert_eq!(FrameSource::new("f", ".png").extension(), "png");
    }

    #[test]
    fn default_source_reads_pngs_from_frames() {
        let source = FrameSource::default();
        assert_eq!(source.directory(), Path::new("frames"));
        assert_eq!(source.extension(), "png");
    }

    #[test]
    fn missing_directory_is_an_enumerate_error() {
        let source = FrameSource::new("/nonexistent/graphtrace/frames", "png");
        assert!(matches!(
            source.count_frames(),
            Err(RenderError::Enumerate { .. })
        ));
    }
}
