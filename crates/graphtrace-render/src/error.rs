//! Render-level errors.

use std::path::PathBuf;

use graphtrace_pipeline::PipelineError;

/// Errors that abort a render.
///
/// Every variant is fatal: no partial results are returned.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A frame file could not be read.
    #[error("failed to read frame file {}", path.display())]
    Read {
        /// The file that was expected.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A frame file was read but is not a usable image.
    #[error("failed to decode frame {index} ({})", path.display())]
    Decode {
        /// 1-based frame index.
        index: usize,
        /// The file the bytes came from.
        path: PathBuf,
        /// Underlying pipeline failure.
        #[source]
        source: PipelineError,
    },

    /// The frame directory holds no files with the configured extension.
    #[error("no .{extension} frames found in {}", directory.display())]
    NoFrames {
        /// Directory that was searched.
        directory: PathBuf,
        /// Extension that was looked for.
        extension: String,
    },

    /// The frame directory could not be listed.
    #[error("failed to list frame directory {}", directory.display())]
    Enumerate {
        /// Directory that was searched.
        directory: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Render or pipeline configuration is invalid.
    #[error("invalid render configuration: {0}")]
    InvalidConfig(String),

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl RenderError {
    /// How frame files are expected to be named, for errors that are
    /// usually caused by a misnamed or missing frame.
    #[must_use]
    pub fn naming_hint(&self) -> Option<String> {
        let (directory, extension) = match self {
            Self::Read { path, .. } | Self::Decode { path, .. } => (
                path.parent().map(PathBuf::from).unwrap_or_default(),
                path.extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            ),
            Self::NoFrames {
                directory,
                extension,
            } => (directory.clone(), extension.clone()),
            Self::Enumerate { .. } | Self::InvalidConfig(_) | Self::ThreadPool(_) => return None,
        };
        Some(format!(
            "frames must be named {}, {}, ... \
             (4-digit zero-padded index starting at 1) and be valid images",
            directory.join(format!("frame0001.{extension}")).display(),
            directory.join(format!("frame0002.{extension}")).display(),
        ))
    }
}
