//! Pipeline execution implementation.

use crate::core::catalog::{ImageCatalog, SearchQuery};
use crate::core::matcher::{find_pairs_with_events, ImagePair, StripCriteria};
use crate::core::processor::{process_rasters, PairOutputs, ProcessOptions};
use crate::error::SceneError;
use crate::events::{
    null_sender, Event, EventSender, PipelineEvent, PipelinePhase, PipelineSummary, ProcessEvent,
    ProcessProgress, SearchEvent,
};
use chrono::TimeDelta;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Result of pipeline execution
#[derive(Debug)]
pub struct PipelineResult {
    /// Records returned by the search
    pub total_records: usize,
    /// Every pair found, in matcher order
    pub pairs: Vec<ImagePair>,
    /// Outputs of the pairs that processed successfully
    pub outputs: Vec<PairOutputs>,
    /// Per-pair failures (non-fatal)
    pub errors: Vec<String>,
    /// Whether the run was cancelled before every pair was processed
    pub cancelled: bool,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Catalog search filter
    pub query: SearchQuery,
    /// Maximum acquisition difference within a pair (exclusive)
    pub max_time_delta: TimeDelta,
    /// Skip rendering and only report pairs
    pub pairs_only: bool,
    /// Rendering options
    pub process: ProcessOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            query: SearchQuery::default(),
            max_time_delta: TimeDelta::seconds(2),
            pairs_only: false,
            process: ProcessOptions::default(),
        }
    }
}

/// Shared flag for abandoning a run between pairs
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    cancellation: CancellationToken,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Set the catalog search filter
    pub fn query(mut self, query: SearchQuery) -> Self {
        self.config.query = query;
        self
    }

    /// Set the pairing time window
    pub fn max_time_delta(mut self, max_time_delta: TimeDelta) -> Self {
        self.config.max_time_delta = max_time_delta;
        self
    }

    /// Only find pairs, do not download or render
    pub fn pairs_only(mut self, pairs_only: bool) -> Self {
        self.config.pairs_only = pairs_only;
        self
    }

    /// Set rendering options
    pub fn process_options(mut self, options: ProcessOptions) -> Self {
        self.config.process = options;
        self
    }

    /// Use an externally owned cancellation token
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            cancellation: self.cancellation,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Search, match and render pipeline
pub struct Pipeline {
    config: PipelineConfig,
    cancellation: CancellationToken,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Token that cancels this pipeline
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Run the pipeline without events
    pub fn run(&self, catalog: &dyn ImageCatalog) -> Result<PipelineResult, SceneError> {
        self.run_with_events(catalog, &null_sender())
    }

    /// Run the pipeline with event reporting
    pub fn run_with_events(
        &self,
        catalog: &dyn ImageCatalog,
        events: &EventSender,
    ) -> Result<PipelineResult, SceneError> {
        let start_time = Instant::now();

        events.send(Event::Pipeline(PipelineEvent::Started));

        // Phase 1: Searching
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Searching,
        }));
        events.send(Event::Search(SearchEvent::Started));

        let records = catalog.search(&self.config.query)?;
        let total_records = records.len();

        events.send(Event::Search(SearchEvent::Completed { total_records }));

        // Phase 2: Matching
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Matching,
        }));

        let criteria = StripCriteria::new().with_max_delta(self.config.max_time_delta);
        let pairs = find_pairs_with_events(&records, &criteria, events);

        if self.config.pairs_only || pairs.is_empty() {
            return Ok(self.finish(
                events,
                start_time,
                total_records,
                pairs,
                Vec::new(),
                Vec::new(),
            ));
        }

        // Phase 3: Processing
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Processing,
        }));
        events.send(Event::Process(ProcessEvent::Started {
            total_pairs: pairs.len(),
        }));

        let out_dir = self
            .config
            .process
            .out_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let completed = AtomicUsize::new(0);
        let total_pairs = pairs.len();

        // Each pair is independent; failures are collected, not propagated
        let results: Vec<Option<Result<PairOutputs, String>>> = pairs
            .par_iter()
            .map(|pair| {
                if self.cancellation.is_cancelled() {
                    return None;
                }

                let basename = pair.basename();
                let result = catalog
                    .download(&pair.first)
                    .and_then(|first| Ok((first, catalog.download(&pair.second)?)))
                    .map_err(|e| e.to_string())
                    .and_then(|(first, second)| {
                        process_rasters(&first, &second, &basename, &out_dir, &self.config.process)
                            .map_err(|e| e.to_string())
                    });

                match &result {
                    Ok(_) => events.send(Event::Process(ProcessEvent::PairCompleted {
                        basename: basename.clone(),
                    })),
                    Err(message) => {
                        tracing::warn!(pair = %basename, error = %message, "skipping pair");
                        events.send(Event::Process(ProcessEvent::Error {
                            basename: basename.clone(),
                            message: message.clone(),
                        }));
                    }
                }

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                events.send(Event::Process(ProcessEvent::Progress(ProcessProgress {
                    completed: done,
                    total: total_pairs,
                    out_dir: out_dir.clone(),
                })));

                Some(result)
            })
            .collect();

        let mut outputs = Vec::new();
        let mut errors = Vec::new();
        for (pair, result) in pairs.iter().zip(results) {
            match result {
                Some(Ok(output)) => outputs.push(output),
                Some(Err(message)) => errors.push(format!("{}: {}", pair.basename(), message)),
                None => {}
            }
        }

        events.send(Event::Process(ProcessEvent::Completed {
            processed: outputs.len(),
            failed: errors.len(),
        }));

        Ok(self.finish(events, start_time, total_records, pairs, outputs, errors))
    }

    fn finish(
        &self,
        events: &EventSender,
        start_time: Instant,
        total_records: usize,
        pairs: Vec<ImagePair>,
        outputs: Vec<PairOutputs>,
        errors: Vec<String>,
    ) -> PipelineResult {
        let duration_ms = start_time.elapsed().as_millis() as u64;
        let cancelled = self.cancellation.is_cancelled();

        if cancelled {
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
        }

        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                total_records,
                total_pairs: pairs.len(),
                processed: outputs.len(),
                failed: errors.len(),
                duration_ms,
            },
        }));

        PipelineResult {
            total_records,
            pairs,
            outputs,
            errors,
            cancelled,
            duration_ms,
        }
    }
}
