//! The render manifest: what the serving layer needs to play a render
//! back.

use graphtrace_pipeline::FrameResult;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::scheduler::RenderOutput;

/// Calculator viewer settings carried through to the manifest.
///
/// The pipeline does not interpret these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Line colour requested by the user, `#rrggbb`.
    pub line_color: String,
    /// Draw the calculator grid behind the frames.
    pub show_grid: bool,
    /// Offer each rendered frame as an image download.
    pub download_images: bool,
}

impl ViewerSettings {
    /// Default line colour.
    pub const DEFAULT_LINE_COLOR: &str = "#2464b4";

    /// Check that `line_color` is a `#rrggbb` hex colour.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidConfig`] otherwise.
    pub fn validate(&self) -> Result<(), RenderError> {
        let valid = self.line_color.len() == 7
            && self.line_color.starts_with('#')
            && self.line_color[1..].chars().all(|c| c.is_ascii_hexdigit());
        if valid {
            Ok(())
        } else {
            Err(RenderError::InvalidConfig(format!(
                "line colour must look like #rrggbb, got {:?}",
                self.line_color
            )))
        }
    }
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            line_color: Self::DEFAULT_LINE_COLOR.to_owned(),
            show_grid: true,
            download_images: false,
        }
    }
}

/// A complete render, ready to be serialized for the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderManifest {
    /// Number of frames.
    pub total_frames: usize,
    /// Canvas width: largest frame width times the scale factor.
    pub width: u32,
    /// Canvas height: largest frame height times the scale factor.
    pub height: u32,
    /// See [`ViewerSettings::line_color`].
    pub line_color: String,
    /// See [`ViewerSettings::show_grid`].
    pub show_grid: bool,
    /// See [`ViewerSettings::download_images`].
    pub download_images: bool,
    /// Expressions per frame, in frame order.
    pub frames: Vec<FrameResult>,
}

impl RenderManifest {
    /// Assemble the manifest for `output`, rendered with scale factor
    /// `scale`.
    #[must_use]
    pub fn new(output: RenderOutput, scale: f64, settings: &ViewerSettings) -> Self {
        let canvas = output.stats.scaled_dimensions(scale);
        Self {
            total_frames: output.stats.total_frames,
            width: canvas.width,
            height: canvas.height,
            line_color: settings.line_color.to_ascii_lowercase(),
            show_grid: settings.show_grid,
            download_images: settings.download_images,
            frames: output.frames,
        }
    }
}
