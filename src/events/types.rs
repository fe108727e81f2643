//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted while finding and processing scene pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Catalog search events
    Search(SearchEvent),
    /// Pair matching events
    Match(MatchEvent),
    /// Pair processing events
    Process(ProcessEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the catalog search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SearchEvent {
    /// Search has started
    Started,
    /// Search completed
    Completed { total_records: usize },
}

/// Events during pair matching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchEvent {
    /// Matching has started
    Started { total_records: usize },
    /// A valid pair was found
    PairFound { first: String, second: String },
    /// Matching completed
    Completed { total_pairs: usize },
}

/// Events while processing pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProcessEvent {
    /// Processing has started
    Started { total_pairs: usize },
    /// Progress update after a pair finished (successfully or not)
    Progress(ProcessProgress),
    /// A pair produced its outputs
    PairCompleted { basename: String },
    /// A pair failed; the batch continues
    Error { basename: String, message: String },
    /// Processing completed
    Completed { processed: usize, failed: usize },
}

/// Progress information while processing pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessProgress {
    /// Number of pairs finished so far
    pub completed: usize,
    /// Total number of pairs to process
    pub total: usize,
    /// Output directory for the current batch
    pub out_dir: PathBuf,
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
    /// Pipeline was cancelled
    Cancelled,
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Searching,
    Matching,
    Processing,
}

/// Summary of pipeline results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Records returned by the search
    pub total_records: usize,
    /// Pairs found
    pub total_pairs: usize,
    /// Pairs that produced outputs
    pub processed: usize,
    /// Pairs that failed
    pub failed: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Searching => write!(f, "Searching"),
            PipelinePhase::Matching => write!(f, "Matching"),
            PipelinePhase::Processing => write!(f, "Processing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Match(MatchEvent::PairFound {
            first: "scene_a".to_string(),
            second: "scene_b".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Match(MatchEvent::PairFound { first, second }) => {
                assert_eq!(first, "scene_a");
                assert_eq!(second, "scene_b");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn pipeline_summary_is_serializable() {
        let summary = PipelineSummary {
            total_records: 120,
            total_pairs: 7,
            processed: 6,
            failed: 1,
            duration_ms: 5000,
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"total_pairs\":7"));
    }
}
