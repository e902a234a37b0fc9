//! Data models for the chunking pipeline.

use std::collections::BTreeSet;

use scislice_common::ContentType;
use serde::{Deserialize, Serialize};

/// A contiguous region of source text with one assigned content type.
///
/// Spans are non-overlapping and, concatenated in offset order, cover the
/// entire source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSpan {
    pub source_id: String,
    /// Byte offset of the span start in the source document.
    pub start_offset: usize,
    /// Byte offset one past the span end.
    pub end_offset: usize,
    pub text: String,
    pub content_type: ContentType,
    pub confidence: f64,
}

impl ContentSpan {
    /// Zero-length spans carry no content and are skipped by the chunker.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Structural class of a mathematical expression, by dominance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquationType {
    Fraction,
    Integral,
    Summation,
    Matrix,
    Vector,
    SetMembership,
    Inline,
    Display,
    Aligned,
    Unknown,
}

impl EquationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquationType::Fraction => "fraction",
            EquationType::Integral => "integral",
            EquationType::Summation => "summation",
            EquationType::Matrix => "matrix",
            EquationType::Vector => "vector",
            EquationType::SetMembership => "set_membership",
            EquationType::Inline => "inline",
            EquationType::Display => "display",
            EquationType::Aligned => "aligned",
            EquationType::Unknown => "unknown",
        }
    }
}

/// Analysis of one mathematical span. Immutable once computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathematicalContent {
    /// Markup exactly as it appeared in the source.
    pub raw_markup: String,
    /// Notation-invariant rewriting used for comparison and tokenisation.
    pub normalized_form: String,
    pub tokens: Vec<String>,
    /// Contiguous token windows, space-joined, for fuzzy matching.
    pub k_grams: Vec<String>,
    pub variables: BTreeSet<String>,
    pub operators: BTreeSet<String>,
    /// Structural/token complexity in [0.0, 10.0].
    pub complexity_score: f64,
    pub equation_type: EquationType,
}

impl MathematicalContent {
    /// Result for input that could not be analysed: original markup retained,
    /// everything else empty, type unknown. Never an error.
    pub fn unparsed(raw_markup: &str) -> Self {
        Self {
            raw_markup: raw_markup.to_string(),
            normalized_form: raw_markup.to_string(),
            tokens: Vec::new(),
            k_grams: Vec::new(),
            variables: BTreeSet::new(),
            operators: BTreeSet::new(),
            complexity_score: 0.0,
            equation_type: EquationType::Unknown,
        }
    }
}

/// Reference to a figure or table asset, extracted from its markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRef {
    /// "figure" or "table".
    pub kind: String,
    pub caption: Option<String>,
    pub label: Option<String>,
    pub path: Option<String>,
}

/// Reference to a glossary term. Never produced internally; external
/// collaborators performing term extraction may attach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryRef {
    pub term: String,
    pub definition: String,
}

/// Content-type specific metadata attached to a chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum TypeMetadata {
    Math(MathematicalContent),
    Asset(AssetRef),
    Glossary(GlossaryRef),
}

/// A final emitted retrieval unit. Immutable after emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedChunk {
    pub id: String,
    pub source_id: String,
    /// 0-based, increasing by 1 per chunk per source document.
    pub position_index: usize,
    pub text: String,
    pub content_type: ContentType,
    pub confidence: f64,
    /// Number of leading bytes duplicated from the previous chunk.
    pub overlap_with_previous: usize,
    pub type_metadata: Option<TypeMetadata>,
}

impl EnhancedChunk {
    /// The portion of this chunk not duplicated from its predecessor.
    /// Concatenating this over all chunks in position order reconstructs
    /// the source document exactly.
    pub fn unique_text(&self) -> &str {
        &self.text[self.overlap_with_previous..]
    }
}
