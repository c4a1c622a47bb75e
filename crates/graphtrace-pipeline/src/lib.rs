//! graphtrace-pipeline: per-frame vectorization pipeline (sans-IO).
//!
//! Converts one video frame into coloured parametric Bezier expressions
//! for a graphing calculator:
//! grayscale -> optional bilateral smoothing -> Canny -> edge and colour
//! masks -> bitmap tracing -> expression emission, wrapped in an
//! adaptive controller that picks the smoothing mode per frame.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and pixel buffers. Finding and reading frame files, and
//! running frames in parallel, lives in `graphtrace-render`.

pub mod bilateral;
pub mod canny;
pub mod color_mask;
pub mod control;
pub mod edge;
pub mod emit;
pub mod grayscale;
pub mod path;
pub mod sample;
pub mod stats;
pub mod trace;
pub mod types;

pub use bilateral::BilateralParams;
pub use control::{ComplexityBand, ControlledFrame};
pub use emit::{Expression, FrameResult};
pub use path::{Curve, CurvePath, Segment};
pub use stats::{RenderStats, SharedRenderStats};
pub use trace::{CurveTracer, TraceParams, TurnPolicy};
pub use types::{
    Dimensions, Frame, GradientNorm, PipelineConfig, PipelineError, Point, SmoothingMode,
};

/// Decode a frame and vectorize it under the complexity controller.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
pub fn process(
    index: usize,
    image_bytes: &[u8],
    config: &PipelineConfig,
    stats: &SharedRenderStats,
) -> Result<ControlledFrame, PipelineError> {
    let frame = Frame::decode(index, image_bytes)?;
    Ok(vectorize_frame(&frame, config, stats))
}

/// Vectorize `frame`, starting in `config.initial_mode` and switching
/// mode at most once when the expression count leaves `config.band`.
#[must_use]
pub fn vectorize_frame(
    frame: &Frame,
    config: &PipelineConfig,
    stats: &SharedRenderStats,
) -> ControlledFrame {
    let controlled = control::run_controlled(config.initial_mode, &config.band, |mode| {
        vectorize_pass(frame, mode, config, stats)
    });
    tracing::debug!(
        frame = frame.index(),
        mode = ?controlled.mode,
        passes = controlled.passes,
        expressions = controlled.result.len(),
        "frame accepted"
    );
    controlled
}

/// Run one full pass of the pipeline on `frame` in a fixed mode.
///
/// # Pipeline steps
///
/// 1. Grayscale, optional bilateral filter, Canny ([`edge::extract`])
/// 2. Record the pass in `stats`
/// 3. Trace the edge mask into closed curves (pluggable strategy)
/// 4. Emit coloured, scaled formulas ([`emit::emit`])
#[must_use]
pub fn vectorize_pass(
    frame: &Frame,
    mode: SmoothingMode,
    config: &PipelineConfig,
    stats: &SharedRenderStats,
) -> FrameResult {
    // 1. Edge and colour masks.
    let edge::Extraction { edges, colors } = edge::extract(frame, mode, config);

    // 2. Progress and size maxima.
    stats.record_pass(frame.dimensions());

    // 3. Bitmap tracing.
    let path = config.tracer.trace(&edges);

    // 4. Expression emission.
    let result = emit::emit(&path, &colors, config.scale_factor);
    tracing::debug!(
        frame = frame.index(),
        ?mode,
        curves = path.len(),
        expressions = result.len(),
        "pass complete"
    );
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn black_frame(width: u32, height: u32) -> Frame {
        Frame::new(1, RgbImage::new(width, height))
    }

    /// Black frame with a white axis-aligned square.
    fn white_square_frame() -> Frame {
        Frame::new(
            1,
            RgbImage::from_fn(100, 100, |x, y| {
                if (30..70).contains(&x) && (30..70).contains(&y) {
                    Rgb([255, 255, 255])
                } else {
                    Rgb([0, 0, 0])
                }
            }),
        )
    }

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    fn is_hex_color(s: &str) -> bool {
        s.len() == 7
            && s.starts_with('#')
            && s[1..]
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    #[test]
    fn process_empty_input() {
        let stats = SharedRenderStats::new(1);
        let result = process(1, &[], &PipelineConfig::default(), &stats);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let stats = SharedRenderStats::new(1);
        let result = process(1, &[0xFF, 0x00], &PipelineConfig::default(), &stats);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn black_frame_produces_no_expressions() {
        let stats = SharedRenderStats::new(1);
        let config = PipelineConfig::default();
        let controlled = vectorize_frame(&black_frame(100, 100), &config, &stats);
        assert!(controlled.result.is_empty());
        assert_eq!(controlled.mode, SmoothingMode::Plain);
        assert_eq!(controlled.passes, 1);

        let snap = stats.snapshot();
        assert_eq!(snap.passes, 1);
        assert_eq!((snap.max_width, snap.max_height), (100, 100));
    }

    #[test]
    fn white_square_produces_coloured_expressions() {
        let stats = SharedRenderStats::new(1);
        let config = PipelineConfig::default();
        let controlled = vectorize_frame(&white_square_frame(), &config, &stats);
        assert_eq!((controlled.mode, controlled.passes), (SmoothingMode::Plain, 1));

        let exprs = controlled.result.expressions();
        assert_eq!(exprs.len(), 16);
        for (i, expr) in exprs.iter().enumerate() {
            assert_eq!(expr.id, format!("expr-{}", i + 1));
            assert!(expr.secret);
            assert!(is_hex_color(&expr.color), "bad colour {}", expr.color);
            assert!(expr.latex.starts_with('(') && expr.latex.ends_with(')'));
        }

        // Left and top edges land on the black side of the step, so
        // their samples start outside the white square and fall back.
        let fallbacks: Vec<&str> = exprs
            .iter()
            .filter(|e| e.color == "#000000")
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(fallbacks, ["expr-2", "expr-8", "expr-13", "expr-15"]);
        assert!(
            exprs
                .iter()
                .all(|e| e.color == "#ffffff" || e.color == "#000000")
        );
    }

    #[test]
    fn white_square_traces_both_sides_of_the_edge_ring() {
        let config = PipelineConfig::default();
        let edge::Extraction { edges, .. } =
            edge::extract(&white_square_frame(), SmoothingMode::Plain, &config);
        let path = config.tracer.trace(&edges);

        let corners: Vec<Vec<bool>> = path
            .curves
            .iter()
            .map(|curve| {
                curve
                    .segments
                    .iter()
                    .map(|s| matches!(s, Segment::Corner { .. }))
                    .collect()
            })
            .collect();
        assert_eq!(
            corners,
            [
                vec![false, true, true, true, false],
                vec![true, true, false, false, true],
            ]
        );
    }

    #[test]
    fn process_decodes_png_bytes() {
        let png = encode_png(white_square_frame().pixels());
        let stats = SharedRenderStats::new(1);
        let from_bytes = process(1, &png, &PipelineConfig::default(), &stats).unwrap();
        let direct = vectorize_frame(&white_square_frame(), &PipelineConfig::default(), &stats);
        assert_eq!(from_bytes, direct);
    }

    #[test]
    fn repeated_pass_is_identical() {
        let frame = white_square_frame();
        let config = PipelineConfig::default();
        for mode in [SmoothingMode::Plain, SmoothingMode::Smoothed] {
            let first = vectorize_pass(&frame, mode, &config, &SharedRenderStats::new(1));
            let second = vectorize_pass(&frame, mode, &config, &SharedRenderStats::new(1));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn dense_frame_switches_to_smoothed() {
        // A band this low forces any non-trivial plain result out of band.
        let config = PipelineConfig {
            band: ComplexityBand { min: 0, max: 1 },
            ..PipelineConfig::default()
        };
        let stats = SharedRenderStats::new(1);
        let controlled = vectorize_frame(&white_square_frame(), &config, &stats);
        assert_eq!(controlled.mode, SmoothingMode::Smoothed);
        assert_eq!(controlled.passes, 2);
        assert_eq!(stats.snapshot().passes, 2);
    }

    #[test]
    fn emitted_coordinates_follow_scale_factor() {
        let frame = white_square_frame();
        let unit = PipelineConfig {
            scale_factor: 1.0,
            ..PipelineConfig::default()
        };
        let stats = SharedRenderStats::new(1);
        let small = vectorize_pass(&frame, SmoothingMode::Plain, &unit, &stats);
        let scaled = PipelineConfig::default();
        let large = vectorize_pass(&frame, SmoothingMode::Plain, &scaled, &stats);
        assert_eq!(small.len(), large.len());
        assert_ne!(small.expressions()[0].latex, large.expressions()[0].latex);
    }
}
