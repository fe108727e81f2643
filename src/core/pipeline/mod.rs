//! # Pipeline Module
//!
//! Orchestrates the full scene-pair workflow.
//!
//! ## Pipeline Stages
//! 1. **Search** - Query the catalog for scene records
//! 2. **Match** - Find same-strip pairs acquired moments apart
//! 3. **Process** - Download both scenes and render their overlap
//!
//! ## Parallelism
//! Uses rayon to process pairs across multiple CPU cores. A pair that fails
//! is reported and skipped; the rest of the run continues.

mod executor;

pub use executor::{CancellationToken, Pipeline, PipelineBuilder, PipelineConfig, PipelineResult};
