//! scislice-config — Immutable processing configuration.
//!
//! All parameter validation happens once, at construction, via
//! [`ProcessingConfig::builder`]. A successfully built config is read-only
//! for the lifetime of every processing call, so the components never have
//! to re-validate or report configuration errors at call time.

use std::collections::BTreeMap;

use scislice_common::{ContentType, Result, ScisliceError};
use serde::{Deserialize, Serialize};

/// Default target chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
/// Default fraction of a chunk duplicated into the next chunk.
pub const DEFAULT_OVERLAP_RATIO: f64 = 0.12;
/// Default k-gram window width for mathematical token windows.
pub const DEFAULT_KGRAM_WIDTH: usize = 3;

/// Immutable configuration for one processing invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    chunk_size: usize,
    overlap_ratio: f64,
    context_window: usize,
    kgram_width: usize,
    confidence_thresholds: BTreeMap<ContentType, f64>,
    disabled_types: Vec<ContentType>,
    enable_symbolic_canonicalization: bool,
}

impl ProcessingConfig {
    pub fn builder() -> ProcessingConfigBuilder {
        ProcessingConfigBuilder::new()
    }

    /// Target chunk size in characters. Always positive.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Fraction of `chunk_size` duplicated at window boundaries. In [0, 1).
    pub fn overlap_ratio(&self) -> f64 {
        self.overlap_ratio
    }

    /// Number of characters the window start advances per chunk.
    pub fn stride(&self) -> usize {
        let stride = (self.chunk_size as f64 * (1.0 - self.overlap_ratio)) as usize;
        stride.max(1)
    }

    /// Number of characters duplicated into the next window.
    pub fn overlap_chars(&self) -> usize {
        (self.chunk_size as f64 * self.overlap_ratio) as usize
    }

    /// Maximum characters of adjacent prose context prepended to a
    /// structural chunk. Zero disables context extension.
    pub fn context_window(&self) -> usize {
        self.context_window
    }

    pub fn kgram_width(&self) -> usize {
        self.kgram_width
    }

    /// Acceptance threshold for a content type. Spans classified below the
    /// threshold degrade to prose rather than being dropped.
    pub fn threshold_for(&self, content_type: ContentType) -> f64 {
        self.confidence_thresholds
            .get(&content_type)
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether classification rules for a content type are active.
    pub fn type_enabled(&self, content_type: ContentType) -> bool {
        !self.disabled_types.contains(&content_type)
    }

    pub fn symbolic_canonicalization_enabled(&self) -> bool {
        self.enable_symbolic_canonicalization
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        // Field-level invariants hold by construction here, so no builder
        // round trip is needed.
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap_ratio: DEFAULT_OVERLAP_RATIO,
            context_window: 0,
            kgram_width: DEFAULT_KGRAM_WIDTH,
            confidence_thresholds: BTreeMap::new(),
            disabled_types: Vec::new(),
            enable_symbolic_canonicalization: false,
        }
    }
}

/// Builder for [`ProcessingConfig`]; `build` is the single validation point.
#[derive(Debug, Clone)]
pub struct ProcessingConfigBuilder {
    chunk_size: usize,
    overlap_ratio: f64,
    context_window: usize,
    kgram_width: usize,
    confidence_thresholds: BTreeMap<ContentType, f64>,
    disabled_types: Vec<ContentType>,
    enable_symbolic_canonicalization: bool,
}

impl ProcessingConfigBuilder {
    fn new() -> Self {
        let defaults = ProcessingConfig::default();
        Self {
            chunk_size: defaults.chunk_size,
            overlap_ratio: defaults.overlap_ratio,
            context_window: defaults.context_window,
            kgram_width: defaults.kgram_width,
            confidence_thresholds: defaults.confidence_thresholds,
            disabled_types: defaults.disabled_types,
            enable_symbolic_canonicalization: defaults.enable_symbolic_canonicalization,
        }
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn overlap_ratio(mut self, overlap_ratio: f64) -> Self {
        self.overlap_ratio = overlap_ratio;
        self
    }

    pub fn context_window(mut self, context_window: usize) -> Self {
        self.context_window = context_window;
        self
    }

    pub fn kgram_width(mut self, kgram_width: usize) -> Self {
        self.kgram_width = kgram_width;
        self
    }

    pub fn confidence_threshold(mut self, content_type: ContentType, threshold: f64) -> Self {
        self.confidence_thresholds.insert(content_type, threshold);
        self
    }

    pub fn disable_type(mut self, content_type: ContentType) -> Self {
        if !self.disabled_types.contains(&content_type) {
            self.disabled_types.push(content_type);
        }
        self
    }

    pub fn enable_symbolic_canonicalization(mut self, enabled: bool) -> Self {
        self.enable_symbolic_canonicalization = enabled;
        self
    }

    pub fn build(self) -> Result<ProcessingConfig> {
        if self.chunk_size == 0 {
            return Err(ScisliceError::Configuration(
                "chunk_size must be a positive integer".into(),
            ));
        }
        if !self.overlap_ratio.is_finite() || !(0.0..1.0).contains(&self.overlap_ratio) {
            return Err(ScisliceError::Configuration(format!(
                "overlap_ratio must be in [0.0, 1.0), got {}",
                self.overlap_ratio
            )));
        }
        if self.kgram_width == 0 {
            return Err(ScisliceError::Configuration(
                "kgram_width must be a positive integer".into(),
            ));
        }
        for (content_type, threshold) in &self.confidence_thresholds {
            if !threshold.is_finite() || !(0.0..=1.0).contains(threshold) {
                return Err(ScisliceError::Configuration(format!(
                    "confidence threshold for {} must be in [0.0, 1.0], got {}",
                    content_type.as_str(),
                    threshold
                )));
            }
        }

        Ok(ProcessingConfig {
            chunk_size: self.chunk_size,
            overlap_ratio: self.overlap_ratio,
            context_window: self.context_window,
            kgram_width: self.kgram_width,
            confidence_thresholds: self.confidence_thresholds,
            disabled_types: self.disabled_types,
            enable_symbolic_canonicalization: self.enable_symbolic_canonicalization,
        })
    }
}
