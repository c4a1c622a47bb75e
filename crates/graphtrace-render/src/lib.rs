//! graphtrace-render: frame discovery, parallel scheduling, and render
//! manifests.
//!
//! This is the I/O boundary around `graphtrace-pipeline`: it finds and
//! reads numbered frame files, runs every frame through the pipeline on
//! a worker pool, turns decode failures into a fatal render error, and
//! assembles the manifest the viewer consumes.

pub mod error;
pub mod manifest;
pub mod scheduler;
pub mod source;

pub use error::RenderError;
pub use manifest::{RenderManifest, ViewerSettings};
pub use scheduler::{RenderOptions, RenderOutput, build_thread_pool, render};
pub use source::{FrameProvider, FrameSource};
