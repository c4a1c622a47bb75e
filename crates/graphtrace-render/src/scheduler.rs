//! Frame scheduler: every frame through the pipeline on a worker pool.

use std::time::{Duration, Instant};

use graphtrace_pipeline::{FrameResult, PipelineConfig, RenderStats, SharedRenderStats};
use rayon::prelude::*;

use crate::error::RenderError;
use crate::source::FrameProvider;

/// Scheduler settings that do not affect the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Worker count. `None` uses one worker per available processing
    /// unit.
    pub threads: Option<usize>,
}

/// Everything a finished render hands to the serving layer.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// One result per frame, in frame-index order.
    pub frames: Vec<FrameResult>,
    /// Counters after all workers finished.
    pub stats: RenderStats,
    /// Wall-clock time spent processing frames.
    pub elapsed: Duration,
}

/// Build the worker pool.
///
/// # Errors
///
/// Returns [`RenderError::InvalidConfig`] for `Some(0)` and
/// [`RenderError::ThreadPool`] if the pool cannot be created.
pub fn build_thread_pool(threads: Option<usize>) -> Result<rayon::ThreadPool, RenderError> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(RenderError::InvalidConfig(
            "threads must be >= 1 when set".to_owned(),
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| RenderError::ThreadPool(e.to_string()))
}

/// Vectorize every frame of `provider` in parallel.
///
/// Results come back in frame order whatever order the workers finish
/// in. The first unreadable or undecodable frame aborts the render.
///
/// # Errors
///
/// Returns [`RenderError::InvalidConfig`] before any work starts if
/// `config` is invalid, and otherwise the first fatal frame error.
#[tracing::instrument(skip_all)]
pub fn render<P: FrameProvider>(
    provider: &P,
    config: &PipelineConfig,
    options: &RenderOptions,
) -> Result<RenderOutput, RenderError> {
    config
        .validate()
        .map_err(|e| RenderError::InvalidConfig(e.to_string()))?;

    let total = provider.frame_count()?;
    let pool = build_thread_pool(options.threads)?;
    let stats = SharedRenderStats::new(total);
    tracing::info!(
        total,
        threads = pool.current_num_threads(),
        "starting render"
    );

    let started = Instant::now();
    let frames = pool.install(|| {
        (1..=total)
            .into_par_iter()
            .map(|index| render_frame(provider, index, config, &stats))
            .collect::<Result<Vec<_>, _>>()
    })?;
    let elapsed = started.elapsed();

    let stats = stats.snapshot();
    tracing::info!(
        frames = frames.len(),
        passes = stats.passes,
        elapsed_ms = elapsed.as_millis(),
        "render finished"
    );

    Ok(RenderOutput {
        frames,
        stats,
        elapsed,
    })
}

fn render_frame<P: FrameProvider>(
    provider: &P,
    index: usize,
    config: &PipelineConfig,
    stats: &SharedRenderStats,
) -> Result<FrameResult, RenderError> {
    let bytes = provider.read_frame(index)?;
    let controlled =
        graphtrace_pipeline::process(index, &bytes, config, stats).map_err(|source| {
            RenderError::Decode {
                index,
                path: provider.frame_path(index),
                source,
            }
        })?;
    Ok(controlled.result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_is_rejected() {
        assert!(matches!(
            build_thread_pool(Some(0)),
            Err(RenderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn explicit_thread_count_is_honoured() {
        let pool = build_thread_pool(Some(3));
        assert!(matches!(pool, Ok(ref p) if p.current_num_threads() == 3));
    }
}
