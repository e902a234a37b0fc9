//! Integrity validation for emitted chunks.
//!
//! Validation never mutates or drops chunks; it reports. A chunk is valid
//! when its identifiers and text are non-empty, its confidence lies in
//! [0, 1], its overlap bookkeeping is consistent with its text, and any
//! equation metadata is well-formed.

use std::collections::BTreeMap;

use scislice_common::ContentType;
use serde::Serialize;
use tracing::debug;

use crate::models::{EnhancedChunk, TypeMetadata};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub total_chunks: usize,
    pub valid_chunks: usize,
    pub invalid_chunks: usize,
    pub content_type_distribution: BTreeMap<ContentType, usize>,
}

/// Validate a batch of chunks. An empty batch produces an all-zero report.
pub fn validate_chunks(chunks: &[EnhancedChunk]) -> ValidationReport {
    let mut report = ValidationReport {
        total_chunks: chunks.len(),
        ..ValidationReport::default()
    };

    for chunk in chunks {
        *report
            .content_type_distribution
            .entry(chunk.content_type)
            .or_insert(0) += 1;
        if chunk_is_valid(chunk) {
            report.valid_chunks += 1;
        } else {
            report.invalid_chunks += 1;
            debug!(id = %chunk.id, "chunk failed validation");
        }
    }
    report
}

fn chunk_is_valid(chunk: &EnhancedChunk) -> bool {
    if chunk.id.is_empty() || chunk.source_id.is_empty() || chunk.text.is_empty() {
        return false;
    }
    if !chunk.confidence.is_finite() || !(0.0..=1.0).contains(&chunk.confidence) {
        return false;
    }
    if chunk.overlap_with_previous > chunk.text.len()
        || !chunk.text.is_char_boundary(chunk.overlap_with_previous)
    {
        return false;
    }
    match (&chunk.content_type, &chunk.type_metadata) {
        // Equation chunks must carry analysis with a sane complexity score.
        (ContentType::Equation, Some(TypeMetadata::Math(math))) => {
            math.complexity_score.is_finite()
                && (0.0..=10.0).contains(&math.complexity_score)
        }
        (ContentType::Equation, _) => false,
        _ => true,
    }
}
