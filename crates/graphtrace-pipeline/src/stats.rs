//! Render-wide counters shared by every worker.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::Dimensions;

/// Progress counter and frame-size maxima updated concurrently by the
/// per-frame pipeline.
///
/// Every field is updated with a single atomic read-modify-write, so no
/// update is lost however the passes interleave.
#[derive(Debug)]
pub struct SharedRenderStats {
    total: usize,
    processed: AtomicUsize,
    max_width: AtomicU32,
    max_height: AtomicU32,
}

impl SharedRenderStats {
    /// Fresh statistics for a render of `total` frames.
    #[must_use]
    pub const fn new(total: usize) -> Self {
        Self {
            total,
            processed: AtomicUsize::new(0),
            max_width: AtomicU32::new(0),
            max_height: AtomicU32::new(0),
        }
    }

    /// Number of frames the render was started with.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Record one extraction pass over a frame of size `dimensions`.
    ///
    /// Controller retries count as separate passes.
    pub fn record_pass(&self, dimensions: Dimensions) {
        let n = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        self.max_width.fetch_max(dimensions.width, Ordering::Relaxed);
        self.max_height.fetch_max(dimensions.height, Ordering::Relaxed);
        tracing::info!("Frame {n}/{}", self.total);
    }

    /// Current values.
    ///
    /// Only meaningful once the workers have been joined; before that the
    /// fields may come from different moments.
    #[must_use]
    pub fn snapshot(&self) -> RenderStats {
        RenderStats {
            total_frames: self.total,
            passes: self.processed.load(Ordering::Relaxed),
            max_width: self.max_width.load(Ordering::Relaxed),
            max_height: self.max_height.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SharedRenderStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Frames in the render.
    pub total_frames: usize,
    /// Extraction passes run, retries included.
    pub passes: usize,
    /// Largest frame width seen, in pixels.
    pub max_width: u32,
    /// Largest frame height seen, in pixels.
    pub max_height: u32,
}

impl RenderStats {
    /// Largest frame size multiplied by the render scale factor, as the
    /// calculator canvas expects it.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn scaled_dimensions(&self, scale: f64) -> Dimensions {
        Dimensions {
            width: (f64::from(self.max_width) * scale).round() as u32,
            height: (f64::from(self.max_height) * scale).round() as u32,
        }
    }
}
