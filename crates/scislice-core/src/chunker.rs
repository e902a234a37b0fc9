//! Content-aware chunking.
//!
//! Structural spans (equations, figures, tables, definitions, algorithms)
//! are emitted as exactly one chunk each, never split, whatever their size.
//! Runs of consecutive free-form spans are merged and cut into overlapping
//! windows of roughly `chunk_size` characters, with boundaries snapped to
//! sentence or word breaks where one is near.
//!
//! Reconstruction invariant: concatenating `unique_text()` over all chunks
//! in position order yields the concatenation of the input spans exactly.
//! Overlap is pure duplication and is recorded per chunk, so no byte of the
//! source is lost or invented.

use scislice_common::{confidence, ContentType};
use scislice_config::ProcessingConfig;
use tracing::debug;

use crate::assets::AssetExtractor;
use crate::math::MathProcessor;
use crate::models::{ContentSpan, EnhancedChunk, TypeMetadata};

pub struct ContentChunker {
    config: ProcessingConfig,
    math: MathProcessor,
    assets: AssetExtractor,
}

/// A merged run of consecutive same-type free-form spans, with enough
/// bookkeeping to give each window the confidence of its weakest
/// contributing span.
struct FreeFormRun {
    text: String,
    content_type: ContentType,
    /// (end offset within `text`, confidence) per source span.
    parts: Vec<(usize, f64)>,
}

impl FreeFormRun {
    fn new() -> Self {
        Self {
            text: String::new(),
            content_type: ContentType::Prose,
            parts: Vec::new(),
        }
    }

    fn accepts(&self, content_type: ContentType) -> bool {
        self.is_empty() || self.content_type == content_type
    }

    fn push(&mut self, span: &ContentSpan) {
        if self.is_empty() {
            self.content_type = span.content_type;
        }
        self.text.push_str(&span.text);
        self.parts.push((self.text.len(), span.confidence));
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Minimum confidence over the spans intersecting window `[start, end)`.
    fn window_confidence(&self, start: usize, end: usize) -> f64 {
        let mut part_start = 0;
        let mut scores = Vec::new();
        for &(part_end, score) in &self.parts {
            if part_start < end && part_end > start {
                scores.push(score);
            }
            part_start = part_end;
        }
        confidence::merged_confidence(&scores)
    }
}

impl ContentChunker {
    pub fn new(config: ProcessingConfig) -> Self {
        let math = MathProcessor::new(&config);
        Self {
            config,
            math,
            assets: AssetExtractor::new(),
        }
    }

    /// Turn classified spans into retrieval chunks. Spans must be in
    /// document order; the output preserves that order with position
    /// indices increasing from 0.
    pub fn chunk(&self, spans: &[ContentSpan], source_id: &str) -> Vec<EnhancedChunk> {
        let mut chunks: Vec<EnhancedChunk> = Vec::new();
        let mut run = FreeFormRun::new();

        for span in spans {
            if span.is_empty() {
                continue;
            }
            if span.content_type.is_structural() {
                self.flush_run(&mut run, source_id, &mut chunks);
                self.emit_structural(span, source_id, &mut chunks);
            } else {
                // Only same-type neighbours merge into one windowed run.
                if !run.accepts(span.content_type) {
                    self.flush_run(&mut run, source_id, &mut chunks);
                }
                run.push(span);
            }
        }
        self.flush_run(&mut run, source_id, &mut chunks);

        debug!(source_id, chunks = chunks.len(), "chunking complete");
        chunks
    }

    fn emit_structural(
        &self,
        span: &ContentSpan,
        source_id: &str,
        chunks: &mut Vec<EnhancedChunk>,
    ) {
        let type_metadata = match span.content_type {
            ContentType::Equation => Some(TypeMetadata::Math(self.math.analyze(&span.text))),
            ContentType::Figure | ContentType::Table => self
                .assets
                .extract(span.content_type, &span.text)
                .map(TypeMetadata::Asset),
            _ => None,
        };

        // Prepend a slice of the preceding free-form chunk as context; the
        // duplicated bytes are declared as overlap so reconstruction holds.
        let mut text = span.text.clone();
        let mut overlap = 0;
        if self.config.context_window() > 0 {
            if let Some(prev) = chunks.last() {
                if prev.content_type.is_free_form() {
                    let tail_start = floor_char_boundary(
                        &prev.text,
                        prev.text.len().saturating_sub(self.config.context_window()),
                    );
                    let tail = &prev.text[tail_start..];
                    overlap = tail.len();
                    text = format!("{tail}{}", span.text);
                }
            }
        }

        let position_index = chunks.len();
        chunks.push(EnhancedChunk {
            id: chunk_id(source_id, position_index),
            source_id: source_id.to_string(),
            position_index,
            text,
            content_type: span.content_type,
            confidence: span.confidence,
            overlap_with_previous: overlap,
            type_metadata,
        });
    }

    fn flush_run(
        &self,
        run: &mut FreeFormRun,
        source_id: &str,
        chunks: &mut Vec<EnhancedChunk>,
    ) {
        if run.is_empty() {
            return;
        }
        let run = std::mem::replace(run, FreeFormRun::new());
        let text = &run.text;
        let content_type = run.content_type;

        let chunk_size = self.config.chunk_size();
        let overlap_chars = self.config.overlap_chars();

        let mut start = 0;
        let mut prev_end = 0;
        while start < text.len() {
            let mut end = if text.len() - start <= chunk_size {
                text.len()
            } else {
                self.snap_boundary(text, start, start + chunk_size)
            };
            if end <= start {
                // Tiny chunk sizes on multibyte text can snap to no advance;
                // take the next whole character instead.
                end = ceil_char_boundary(text, start + 1);
            }

            let position_index = chunks.len();
            chunks.push(EnhancedChunk {
                id: chunk_id(source_id, position_index),
                source_id: source_id.to_string(),
                position_index,
                text: text[start..end].to_string(),
                content_type,
                confidence: run.window_confidence(start, end),
                overlap_with_previous: prev_end - start,
                type_metadata: None,
            });

            if end == text.len() {
                break;
            }
            prev_end = end;
            start = floor_char_boundary(text, end - overlap_chars.min(end - start - 1));
        }
    }

    /// Pick a cut point near `target`, preferring a sentence break, then a
    /// word break, within a tolerance band. The result always lies on a char
    /// boundary and always advances past the overlap region.
    fn snap_boundary(&self, text: &str, start: usize, target: usize) -> usize {
        let chunk_size = self.config.chunk_size();
        let stride = self.config.stride();
        let tolerance = (chunk_size / 8).max(16).min(stride.saturating_sub(1));

        let lo = target.saturating_sub(tolerance).max(start + 1);
        let hi = (target + tolerance).min(text.len());
        let window = &text[floor_char_boundary(text, lo)..floor_char_boundary(text, hi)];
        let window_base = floor_char_boundary(text, lo);

        for sep in [". ", "! ", "? ", "\n"] {
            if let Some(pos) = window.rfind(sep) {
                return window_base + pos + sep.len();
            }
        }
        if let Some(pos) = window.rfind(' ') {
            return window_base + pos + 1;
        }
        floor_char_boundary(text, target)
    }
}

fn chunk_id(source_id: &str, position_index: usize) -> String {
    format!("{source_id}-{position_index:04}")
}

/// Smallest char boundary not below `index`.
fn ceil_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Largest char boundary not exceeding `index`.
fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, content_type: ContentType, confidence: f64) -> ContentSpan {
        ContentSpan {
            source_id: "doc".into(),
            start_offset: 0,
            end_offset: text.len(),
            text: text.into(),
            content_type,
            confidence,
        }
    }

    fn chunker() -> ContentChunker {
        ContentChunker::new(ProcessingConfig::default())
    }

    fn assert_reconstructs(spans: &[ContentSpan], chunks: &[EnhancedChunk]) {
        let original: String = spans.iter().map(|s| s.text.as_str()).collect();
        let rebuilt: String = chunks.iter().map(|c| c.unique_text()).collect();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_empty_spans_yield_no_chunks() {
        assert!(chunker().chunk(&[], "doc").is_empty());
    }

    #[test]
    fn test_structural_span_never_split() {
        let big_table = format!(
            "\\begin{{table}}{}\\end{{table}}",
            "row & row \\\\ ".repeat(500)
        );
        let spans = [span(&big_table, ContentType::Table, 0.9)];
        let chunks = chunker().chunk(&spans, "doc");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, big_table);
        assert_reconstructs(&spans, &chunks);
    }

    #[test]
    fn test_prose_windows_share_boundary_text() {
        let config = ProcessingConfig::builder()
            .chunk_size(1000)
            .overlap_ratio(0.2)
            .build()
            .unwrap();
        let sentence = "The quick brown fox jumps over the lazy dog again. ";
        let text = sentence.repeat(60); // ~3000 chars
        let spans = [span(&text, ContentType::Prose, 0.7)];
        let chunks = ContentChunker::new(config).chunk(&spans, "doc");
        assert!(chunks.len() >= 3);
        for pair in chunks.windows(2) {
            let overlap = pair[1].overlap_with_previous;
            assert!(overlap > 0);
            // Overlap is close to 200 chars, modulo boundary snapping.
            assert!((100..=330).contains(&overlap), "overlap was {overlap}");
            let prev_tail = &pair[0].text[pair[0].text.len() - overlap..];
            assert_eq!(prev_tail, &pair[1].text[..overlap]);
        }
        assert_reconstructs(&spans, &chunks);
    }

    #[test]
    fn test_boundaries_prefer_sentence_breaks() {
        let sentence = "Here is a complete sentence that carries some meaning. ";
        let text = sentence.repeat(60);
        let spans = [span(&text, ContentType::Prose, 0.7)];
        let chunks = chunker().chunk(&spans, "doc");
        assert!(chunks.len() > 1);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(
                chunk.text.ends_with(". "),
                "chunk did not end at a sentence break: {:?}",
                &chunk.text[chunk.text.len().saturating_sub(20)..]
            );
        }
    }

    #[test]
    fn test_consecutive_free_form_spans_merge() {
        let spans = [
            span("First paragraph. ", ContentType::Prose, 0.8),
            span("Second paragraph. ", ContentType::Prose, 0.6),
        ];
        let chunks = chunker().chunk(&spans, "doc");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "First paragraph. Second paragraph. ");
        // The weakest contributing span bounds the merged confidence.
        assert_eq!(chunks[0].confidence, 0.6);
        assert_reconstructs(&spans, &chunks);
    }

    #[test]
    fn test_structural_span_interrupts_merge() {
        let spans = [
            span("Before. ", ContentType::Prose, 0.8),
            span("$$a = b$$", ContentType::Equation, 0.9),
            span("After. ", ContentType::Prose, 0.8),
        ];
        let chunks = chunker().chunk(&spans, "doc");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].content_type, ContentType::Equation);
        assert!(matches!(
            chunks[1].type_metadata,
            Some(TypeMetadata::Math(_))
        ));
        assert_reconstructs(&spans, &chunks);
    }

    #[test]
    fn test_different_free_form_types_do_not_merge() {
        let spans = [
            span("Some prose. ", ContentType::Prose, 0.8),
            span("`code()` bit. ", ContentType::Code, 0.6),
        ];
        let chunks = chunker().chunk(&spans, "doc");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content_type, ContentType::Prose);
        assert_eq!(chunks[1].content_type, ContentType::Code);
        assert_eq!(chunks[1].overlap_with_previous, 0);
        assert_reconstructs(&spans, &chunks);
    }

    #[test]
    fn test_zero_length_spans_are_skipped() {
        let spans = [
            span("", ContentType::Prose, 0.8),
            span("Real text. ", ContentType::Prose, 0.8),
        ];
        let chunks = chunker().chunk(&spans, "doc");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Real text. ");
    }

    #[test]
    fn test_ids_and_positions_are_deterministic() {
        let spans = [
            span("One. ", ContentType::Prose, 0.8),
            span("$$x$$", ContentType::Equation, 0.9),
        ];
        let a = chunker().chunk(&spans, "doc");
        let b = chunker().chunk(&spans, "doc");
        assert_eq!(a.len(), b.len());
        for (left, right) in a.iter().zip(&b) {
            assert_eq!(left.id, right.id);
            assert_eq!(left.text, right.text);
        }
        assert_eq!(a[0].id, "doc-0000");
        assert_eq!(a[1].id, "doc-0001");
        assert_eq!(a[1].position_index, 1);
    }

    #[test]
    fn test_figure_gets_asset_metadata() {
        let spans = [span(
            "\\begin{figure}\\includegraphics{a.png}\\caption{A}\\end{figure}",
            ContentType::Figure,
            0.9,
        )];
        let chunks = chunker().chunk(&spans, "doc");
        match &chunks[0].type_metadata {
            Some(TypeMetadata::Asset(asset)) => {
                assert_eq!(asset.kind, "figure");
                assert_eq!(asset.path.as_deref(), Some("a.png"));
            }
            other => panic!("expected asset metadata, got {other:?}"),
        }
    }

    #[test]
    fn test_context_window_prepends_prose_tail() {
        let config = ProcessingConfig::builder().context_window(10).build().unwrap();
        let spans = [
            span("Leading prose context. ", ContentType::Prose, 0.8),
            span("$$a = b$$", ContentType::Equation, 0.9),
        ];
        let chunks = ContentChunker::new(config).chunk(&spans, "doc");
        assert_eq!(chunks.len(), 2);
        let eq = &chunks[1];
        assert_eq!(eq.overlap_with_previous, 10);
        assert!(eq.text.starts_with(" context. "));
        assert_eq!(eq.unique_text(), "$$a = b$$");
        assert_reconstructs(&spans, &chunks);
    }

    #[test]
    fn test_multibyte_text_cuts_on_char_boundaries() {
        let config = ProcessingConfig::builder()
            .chunk_size(50)
            .overlap_ratio(0.2)
            .build()
            .unwrap();
        let text = "αβγδε ζηθικ λμνξο πρστυ φχψω. ".repeat(20);
        let spans = [span(&text, ContentType::Prose, 0.7)];
        let chunks = ContentChunker::new(config).chunk(&spans, "doc");
        assert!(chunks.len() > 1);
        assert_reconstructs(&spans, &chunks);
    }
}
