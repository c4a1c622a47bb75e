//! Adaptive complexity control.
//!
//! A frame whose plain-mode output is too dense is retried with
//! bilateral smoothing; one whose smoothed output is too sparse is
//! retried without it. The mode is a per-frame value: each frame starts
//! from the configured mode and reports the mode it settled in.

use serde::{Deserialize, Serialize};

use crate::emit::FrameResult;
use crate::types::{PipelineError, SmoothingMode};

/// A frame never runs more passes than there are modes.
const MAX_PASSES: u32 = 2;

/// Acceptable expression counts for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityBand {
    /// Smoothed output at or below this count is retried in plain mode.
    pub min: usize,
    /// Plain output at or above this count is retried in smoothed mode.
    pub max: usize,
}

impl ComplexityBand {
    /// Default lower bound.
    pub const DEFAULT_MIN: usize = 3000;
    /// Default upper bound.
    pub const DEFAULT_MAX: usize = 12000;

    pub(crate) fn validate(&self) -> Result<(), PipelineError> {
        if self.min >= self.max {
            return Err(PipelineError::InvalidConfig(format!(
                "complexity band min must be below max, got min={} max={}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Decide what to do with a result of `count` expressions produced
    /// in `mode`.
    #[must_use]
    pub const fn judge(&self, count: usize, mode: SmoothingMode) -> Verdict {
        match mode {
            SmoothingMode::Plain if count >= self.max => {
                Verdict::SwitchTo(SmoothingMode::Smoothed)
            }
            SmoothingMode::Smoothed if count <= self.min => {
                Verdict::SwitchTo(SmoothingMode::Plain)
            }
            _ => Verdict::Accept,
        }
    }
}

impl Default for ComplexityBand {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

/// Outcome of judging one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep the result.
    Accept,
    /// Discard the result and rerun in this mode.
    SwitchTo(SmoothingMode),
}

/// The accepted result for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlledFrame {
    /// Expressions to keep.
    pub result: FrameResult,
    /// Mode that produced `result`.
    pub mode: SmoothingMode,
    /// Pipeline passes run, including the accepted one.
    pub passes: u32,
}

/// Run `pass` starting in `initial` until the band accepts the result.
///
/// No mode is run twice for the same frame: when the band asks to go
/// back to a mode already tried, the current result is kept.
pub fn run_controlled<F>(
    initial: SmoothingMode,
    band: &ComplexityBand,
    mut pass: F,
) -> ControlledFrame
where
    F: FnMut(SmoothingMode) -> FrameResult,
{
    let mut mode = initial;
    let mut passes = 0;
    loop {
        let result = pass(mode);
        passes += 1;
        let count = result.len();
        match band.judge(count, mode) {
            Verdict::Accept => {}
            Verdict::SwitchTo(next) if passes < MAX_PASSES => {
                tracing::debug!(
                    count,
                    from = ?mode,
                    to = ?next,
                    "complexity out of band, switching mode"
                );
                mode = next;
                continue;
            }
            Verdict::SwitchTo(next) => {
                tracing::debug!(
                    count,
                    mode = ?mode,
                    rejected = ?next,
                    "complexity still out of band, keeping result"
                );
            }
        }
        return ControlledFrame {
            result,
            mode,
            passes,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Expression;

    fn result_of(len: usize) -> FrameResult {
        FrameResult::new(
            (1..=len)
                .map(|i| Expression {
                    id: format!("expr-{i}"),
                    latex: String::new(),
                    color: "#000000".to_owned(),
                    secret: true,
                })
                .collect(),
        )
    }

    fn small_band() -> ComplexityBand {
        ComplexityBand { min: 3, max: 12 }
    }

    #[test]
    fn judge_follows_band_edges() {
        let band = ComplexityBand::default();
        assert_eq!(band.judge(11_999, SmoothingMode::Plain), Verdict::Accept);
        assert_eq!(
            band.judge(12_000, SmoothingMode::Plain),
            Verdict::SwitchTo(SmoothingMode::Smoothed)
        );
        assert_eq!(band.judge(3_001, SmoothingMode::Smoothed), Verdict::Accept);
        assert_eq!(
            band.judge(3_000, SmoothingMode::Smoothed),
            Verdict::SwitchTo(SmoothingMode::Plain)
        );
        // Out-of-band counts in the other mode are accepted.
        assert_eq!(band.judge(0, SmoothingMode::Plain), Verdict::Accept);
        assert_eq!(band.judge(50_000, SmoothingMode::Smoothed), Verdict::Accept);
    }

    #[test]
    fn in_band_plain_result_runs_once() {
        let mut modes = Vec::new();
        let frame = run_controlled(SmoothingMode::Plain, &small_band(), |mode| {
            modes.push(mode);
            result_of(5)
        });
        assert_eq!(modes, vec![SmoothingMode::Plain]);
        assert_eq!(frame.passes, 1);
        assert_eq!(frame.mode, SmoothingMode::Plain);
        assert_eq!(frame.result.len(), 5);
    }

    #[test]
    fn dense_plain_result_is_retried_smoothed() {
        let frame = run_controlled(SmoothingMode::Plain, &small_band(), |mode| match mode {
            SmoothingMode::Plain => result_of(20),
            SmoothingMode::Smoothed => result_of(6),
        });
        assert_eq!(frame.mode, SmoothingMode::Smoothed);
        assert_eq!(frame.passes, 2);
        assert_eq!(frame.result.len(), 6);
    }

    #[test]
    fn sparse_smoothed_result_is_retried_plain() {
        let frame = run_controlled(SmoothingMode::Smoothed, &small_band(), |mode| match mode {
            SmoothingMode::Plain => result_of(8),
            SmoothingMode::Smoothed => result_of(1),
        });
        assert_eq!(frame.mode, SmoothingMode::Plain);
        assert_eq!(frame.result.len(), 8);
    }

    #[test]
    fn oscillation_stops_after_both_modes() {
        // Plain is always too dense and smoothed always too sparse.
        let mut calls = 0;
        let frame = run_controlled(SmoothingMode::Plain, &small_band(), |mode| {
            calls += 1;
            match mode {
                SmoothingMode::Plain => result_of(100),
                SmoothingMode::Smoothed => result_of(0),
            }
        });
        assert_eq!(calls, 2);
        assert_eq!(frame.passes, 2);
        assert_eq!(frame.mode, SmoothingMode::Smoothed);
        assert!(frame.result.is_empty());
    }

    #[test]
    fn inverted_band_is_rejected() {
        let band = ComplexityBand { min: 10, max: 10 };
        assert!(band.validate().is_err());
        assert!(ComplexityBand::default().validate().is_ok());
    }
}
