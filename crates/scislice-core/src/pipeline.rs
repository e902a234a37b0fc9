//! Document orchestration: classify, chunk, and account for one document
//! end to end. The orchestrator never fails a whole document for a bad
//! span; recoverable problems are absorbed into the outcome's error count
//! and the rest of the document is processed normally.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use scislice_common::ContentType;
use scislice_config::ProcessingConfig;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::chunker::ContentChunker;
use crate::classifier::ContentClassifier;
use crate::models::{EnhancedChunk, EquationType, TypeMetadata};

pub use crate::parser::FormatHint;

/// One document to process.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub source_id: String,
    pub text: String,
    pub format_hint: FormatHint,
}

impl ProcessRequest {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
            format_hint: FormatHint::StructuredMarkup,
        }
    }

    pub fn with_format_hint(mut self, format_hint: FormatHint) -> Self {
        self.format_hint = format_hint;
        self
    }
}

/// Per-document processing statistics.
#[derive(Debug, Clone, Default)]
pub struct ProcessingStats {
    pub chunk_count: usize,
    pub content_type_counts: BTreeMap<ContentType, usize>,
    /// Recoverable problems absorbed during processing: parse issues plus
    /// equation spans whose markup could not be analysed.
    pub error_count: usize,
    pub duration_ms: u64,
}

/// The result of processing one document. Produced even when every span of
/// the input was degraded.
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    pub job_id: Uuid,
    pub source_id: String,
    pub chunks: Vec<EnhancedChunk>,
    pub stats: ProcessingStats,
}

pub struct DocumentProcessor {
    classifier: ContentClassifier,
    chunker: ContentChunker,
}

impl DocumentProcessor {
    pub fn new(config: ProcessingConfig) -> Self {
        Self {
            classifier: ContentClassifier::new(config.clone()),
            chunker: ContentChunker::new(config),
        }
    }

    /// Process a single document. An empty document yields an outcome with
    /// zero chunks and zeroed statistics; it is not an error.
    #[instrument(skip_all, fields(source_id = %request.source_id))]
    pub fn process(&self, request: &ProcessRequest) -> ProcessingOutcome {
        let started = Instant::now();
        let job_id = Uuid::new_v4();

        let (spans, issues) =
            self.classifier
                .classify_with_hint(&request.text, request.format_hint, &request.source_id);
        let chunks = self.chunker.chunk(&spans, &request.source_id);

        let mut content_type_counts: BTreeMap<ContentType, usize> = BTreeMap::new();
        let mut error_count = issues.len();
        for chunk in &chunks {
            *content_type_counts.entry(chunk.content_type).or_insert(0) += 1;
            if let Some(TypeMetadata::Math(math)) = &chunk.type_metadata {
                if math.equation_type == EquationType::Unknown {
                    error_count += 1;
                }
            }
        }
        for issue in &issues {
            warn!(
                source_id = %request.source_id,
                start = issue.start,
                end = issue.end,
                "{}", issue.message
            );
        }

        let stats = ProcessingStats {
            chunk_count: chunks.len(),
            content_type_counts,
            error_count,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            job_id = %job_id,
            chunks = stats.chunk_count,
            errors = stats.error_count,
            "document processed"
        );

        ProcessingOutcome {
            job_id,
            source_id: request.source_id.clone(),
            chunks,
            stats,
        }
    }

    /// Process several documents concurrently on blocking worker threads.
    /// Outcomes come back in request order; a worker that panics drops only
    /// its own document.
    pub async fn process_documents(
        self: Arc<Self>,
        requests: Vec<ProcessRequest>,
    ) -> Vec<ProcessingOutcome> {
        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            let processor = Arc::clone(&self);
            handles.push(tokio::task::spawn_blocking(move || {
                processor.process(&request)
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => warn!(error = %err, "document worker failed"),
            }
        }
        outcomes
    }
}
