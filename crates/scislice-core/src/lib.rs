//! scislice-core — Retrieval-ready chunking for scientific documents.
//! Covers the full processing flow:
//! - Structural parse into raw blocks (paragraphs, environments, fences)
//! - Ordered-rule content classification with confidence scoring
//! - Mathematical normalisation, tokenisation, and complexity analysis
//! - Content-aware chunking (structural units never split, prose windowed)
//! - Document orchestration with per-span failure recovery and statistics
//! - JSON/CSV export and chunk integrity validation

pub mod assets;
pub mod chunker;
pub mod classifier;
pub mod export;
pub mod math;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod validate;

pub use chunker::ContentChunker;
pub use classifier::ContentClassifier;
pub use export::export_chunks;
pub use math::{MathProcessor, NoCanonicalizer, SymbolicCanonicalizer};
pub use models::{
    AssetRef, ContentSpan, EnhancedChunk, EquationType, MathematicalContent, TypeMetadata,
};
pub use pipeline::{
    DocumentProcessor, FormatHint, ProcessRequest, ProcessingOutcome, ProcessingStats,
};
pub use validate::{validate_chunks, ValidationReport};
