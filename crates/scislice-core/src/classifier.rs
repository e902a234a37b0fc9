//! Ordered-rule content classification.
//!
//! The classifier is a data-driven dispatcher: an ordered list of
//! (predicate, content type, confidence function) rules evaluated in fixed
//! priority order. First matching rule wins. Structural markup outranks
//! mathematical delimiters, which outrank lexical patterns, which outrank
//! code markers; anything else falls through to a prose/other heuristic.
//! Blocks flagged as degraded by the parser skip the structural tier
//! entirely and, if nothing weaker matches, recover as low-confidence prose.

use regex::Regex;
use scislice_common::{confidence, ContentType};
use scislice_config::ProcessingConfig;

use crate::models::ContentSpan;
use crate::parser::{DocumentParser, FormatHint, ParseIssue};

/// Confidence assigned to prose recovered from unparseable markup.
pub const DEGRADED_CONFIDENCE: f64 = 0.3;
/// Confidence assigned when no rule matches or a match fails its threshold.
pub const DEFAULT_PROSE_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleTier {
    Structural,
    Math,
    Lexical,
    Code,
}

struct ClassificationRule {
    tier: RuleTier,
    content_type: ContentType,
    pattern: Regex,
    /// Extra predicate for rules a regex alone cannot express.
    guard: Option<fn(&str) -> bool>,
    confidence: fn(&str) -> f64,
}

pub struct ContentClassifier {
    config: ProcessingConfig,
    parser: DocumentParser,
    rules: Vec<ClassificationRule>,
}

impl ContentClassifier {
    pub fn new(config: ProcessingConfig) -> Self {
        Self {
            config,
            parser: DocumentParser::new(),
            rules: build_rules(),
        }
    }

    /// Classify a whole document into covering, non-overlapping spans.
    /// Deterministic for identical input and configuration.
    pub fn classify(&self, text: &str, source_id: &str) -> Vec<ContentSpan> {
        self.classify_with_hint(text, FormatHint::StructuredMarkup, source_id)
            .0
    }

    /// Classify with an explicit format hint, also returning the parse
    /// issues recovered along the way (for the orchestrator's error count).
    pub fn classify_with_hint(
        &self,
        text: &str,
        hint: FormatHint,
        source_id: &str,
    ) -> (Vec<ContentSpan>, Vec<ParseIssue>) {
        let parsed = self.parser.parse(text, hint);
        let spans = parsed
            .blocks
            .iter()
            .map(|block| {
                let block_text = &text[block.start..block.end];
                let (content_type, score) = self.classify_block_inner(block_text, block.degraded);
                ContentSpan {
                    source_id: source_id.to_string(),
                    start_offset: block.start,
                    end_offset: block.end,
                    text: block_text.to_string(),
                    content_type,
                    confidence: score,
                }
            })
            .collect();
        (spans, parsed.issues)
    }

    /// Classify a single block of well-formed text.
    pub fn classify_block(&self, text: &str) -> (ContentType, f64) {
        self.classify_block_inner(text, false)
    }

    fn classify_block_inner(&self, text: &str, degraded: bool) -> (ContentType, f64) {
        for rule in &self.rules {
            if degraded && rule.tier == RuleTier::Structural {
                continue;
            }
            if !self.config.type_enabled(rule.content_type) {
                continue;
            }
            if !rule.pattern.is_match(text) {
                continue;
            }
            if let Some(guard) = rule.guard {
                if !guard(text) {
                    continue;
                }
            }
            let score = (rule.confidence)(text);
            if !confidence::meets_threshold(score, self.config.threshold_for(rule.content_type)) {
                // Below-threshold spans degrade to prose, never dropped.
                return (ContentType::Prose, DEFAULT_PROSE_CONFIDENCE);
            }
            return (rule.content_type, score);
        }

        if degraded {
            // Parse-phase recovery: the failing range survives as prose.
            return (ContentType::Prose, DEGRADED_CONFIDENCE);
        }
        fallback_heuristic(text)
    }
}

// ── Rule table ────────────────────────────────────────────────────────────────

fn fixed<const MILLI: u32>(_: &str) -> f64 {
    MILLI as f64 / 1000.0
}

fn rule(
    tier: RuleTier,
    content_type: ContentType,
    pattern: &str,
    confidence: fn(&str) -> f64,
) -> ClassificationRule {
    ClassificationRule {
        tier,
        content_type,
        pattern: Regex::new(pattern).expect("classification rule pattern is valid"),
        guard: None,
        confidence,
    }
}

fn guarded(
    tier: RuleTier,
    content_type: ContentType,
    pattern: &str,
    guard: fn(&str) -> bool,
    confidence: fn(&str) -> f64,
) -> ClassificationRule {
    ClassificationRule {
        guard: Some(guard),
        ..rule(tier, content_type, pattern, confidence)
    }
}

fn build_rules() -> Vec<ClassificationRule> {
    use ContentType::*;
    use RuleTier::*;

    vec![
        // 1. Explicit structural markup. Balanced environments and complete
        //    markdown constructs score as exact structural matches.
        rule(Structural, Figure, r"(?s)\\begin\{figure\*?\}.*\\end\{figure\*?\}", fixed::<900>),
        rule(Structural, Figure, r"\\includegraphics", fixed::<850>),
        rule(Structural, Figure, r"(?m)^\s*!\[[^\]]*\]\([^)]*\)\s*$", fixed::<850>),
        rule(Structural, Figure, r"(?im)^\s*(?:figure|fig\.)\s*\d+\s*[:.]", fixed::<700>),
        rule(
            Structural,
            Table,
            r"(?s)\\begin\{(?:table|tabular|longtable)\*?\}.*\\end\{(?:table|tabular|longtable)\*?\}",
            fixed::<900>,
        ),
        rule(Structural, Table, r"(?m)^\s*\|.+\|\s*$\n^\s*\|[-: |]+\|\s*$", fixed::<850>),
        rule(Structural, Table, r"(?im)^\s*table\s*\d+\s*[:.]", fixed::<700>),
        rule(
            Structural,
            Algorithm,
            r"(?s)\\begin\{algorithm(?:ic)?\*?\}.*\\end\{algorithm(?:ic)?\*?\}",
            fixed::<900>,
        ),
        rule(Structural, Algorithm, r"(?im)^\s*algorithm\s*\d+\s*[:.]", fixed::<700>),
        // 2. Mathematical delimiters.
        rule(Math, Equation, r"(?s)\$\$.+\$\$", fixed::<900>),
        rule(
            Math,
            Equation,
            r"(?s)\\begin\{(?:equation|align|aligned|eqnarray|gather|multline)\*?\}.*\\end\{(?:equation|align|aligned|eqnarray|gather|multline)\*?\}",
            fixed::<900>,
        ),
        rule(Math, Equation, r"(?s)\\\[.+\\\]", fixed::<850>),
        rule(Math, Equation, r"(?s)\\\(.+\\\)", fixed::<700>),
        guarded(Math, Equation, r"\$[^$\n]+\$", math_dominant, fixed::<700>),
        guarded(Math, Equation, r"[=<>^]|\\frac|\\sum|\\int", bare_equation, fixed::<600>),
        // 3. Definition/theorem and example lexical patterns.
        rule(
            Lexical,
            Definition,
            r"(?s)\\begin\{(?:definition|theorem|lemma|corollary|proposition)\*?\}.*\\end\{(?:definition|theorem|lemma|corollary|proposition)\*?\}",
            fixed::<900>,
        ),
        rule(
            Lexical,
            Definition,
            r"(?im)^\s*(?:definition|theorem|lemma|corollary|proposition|axiom)\b[^\n]{0,24}?[:.]",
            fixed::<800>,
        ),
        rule(Lexical, Definition, r"(?m)^\s*\\textbf\{[^}]+\}\s*:", fixed::<750>),
        rule(Lexical, Definition, r"(?m)^\s*\*\*[^*]+\*\*\s*:", fixed::<700>),
        rule(Lexical, Definition, r"(?i)\bis defined as\b", fixed::<600>),
        rule(Lexical, Example, r"(?im)^\s*example\s*\d*\s*[:.]", fixed::<750>),
        // 4. Code markers.
        rule(RuleTier::Code, ContentType::Code, r"(?s)^\s*```.*```\s*$", fixed::<900>),
        guarded(
            RuleTier::Code,
            ContentType::Code,
            r"(?m)^(?:    |\t)\S",
            mostly_indented,
            fixed::<600>,
        ),
        rule(RuleTier::Code, ContentType::Code, r"`[^`\n]*\(\)[^`\n]*`", fixed::<600>),
    ]
}

// ── Guards and heuristics ─────────────────────────────────────────────────────

/// True when inline math delimiters account for most of the block.
fn math_dominant(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    let mut math_chars = 0usize;
    for (i, segment) in trimmed.split('$').enumerate() {
        // Odd segments sit between a pair of `$` delimiters.
        if i % 2 == 1 && !segment.is_empty() && !segment.contains('\n') {
            math_chars += segment.len() + 2;
        }
    }
    math_chars * 2 >= trimmed.len()
}

/// True for a short bare expression like `E = mc^2`: few short tokens,
/// symbolic content, no sentence structure.
fn bare_equation(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() > 120 || trimmed.contains('\n') {
        return false;
    }
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.is_empty() || words.len() > 8 {
        return false;
    }
    if words.iter().any(|w| w.len() > 16) {
        return false;
    }
    // Sentence-looking text is prose even when it mentions an equation.
    if trimmed.ends_with('.') || trimmed.ends_with('?') || trimmed.ends_with('!') {
        return false;
    }
    let has_relation = trimmed.contains('=')
        || trimmed.contains('<')
        || trimmed.contains('>')
        || trimmed.contains('^')
        || trimmed.contains('\\');
    let prose_words = words
        .iter()
        .filter(|w| w.len() > 3 && w.chars().all(|c| c.is_ascii_lowercase()))
        .count();
    has_relation && prose_words < 2
}

/// True when the majority of non-blank lines carry code-style indentation.
fn mostly_indented(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return false;
    }
    let indented = lines
        .iter()
        .filter(|l| l.starts_with("    ") || l.starts_with('\t'))
        .count();
    indented * 2 > lines.len()
}

/// Distinguish prose from other content by punctuation density,
/// capitalization, and sentence structure. Confidence follows the strength
/// of the matched features and is never exactly 0 or 1.
fn fallback_heuristic(text: &str) -> (ContentType, f64) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return (ContentType::Other, confidence::clamp_heuristic(0.1));
    }

    let words = trimmed.split_whitespace().count();
    let non_ws: usize = trimmed.chars().filter(|c| !c.is_whitespace()).count();
    let alpha = trimmed.chars().filter(|c| c.is_alphabetic()).count();
    let alpha_ratio = alpha as f64 / non_ws.max(1) as f64;
    let has_sentence_punct = trimmed.contains(". ")
        || trimmed.ends_with('.')
        || trimmed.ends_with('!')
        || trimmed.ends_with('?');
    let starts_capitalized = trimmed
        .chars()
        .next()
        .map(|c| c.is_uppercase())
        .unwrap_or(false);

    if words >= 3 && alpha_ratio > 0.6 {
        let mut score = 0.5;
        if has_sentence_punct {
            score += 0.15;
        }
        if starts_capitalized {
            score += 0.1;
        }
        return (ContentType::Prose, confidence::clamp_heuristic(score));
    }
    if alpha_ratio < 0.4 && non_ws >= 3 {
        // Symbol-heavy content with no recognized structure.
        let score = 0.3 + 0.3 * (1.0 - alpha_ratio);
        return (ContentType::Other, confidence::clamp_heuristic(score));
    }
    (ContentType::Prose, DEFAULT_PROSE_CONFIDENCE)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
