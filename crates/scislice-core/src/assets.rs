//! Caption, label, and path extraction for figure and table spans.

use regex::Regex;
use scislice_common::ContentType;

use crate::models::AssetRef;

pub struct AssetExtractor {
    re_caption: Regex,
    re_label: Regex,
    re_graphics: Regex,
    re_md_image: Regex,
    re_caption_line: Regex,
}

impl AssetExtractor {
    pub fn new() -> Self {
        Self {
            re_caption: Regex::new(r"\\caption\{([^{}]*)\}").expect("caption pattern is valid"),
            re_label: Regex::new(r"\\label\{([^{}]*)\}").expect("label pattern is valid"),
            re_graphics: Regex::new(r"\\includegraphics(?:\[[^\]]*\])?\{([^{}]*)\}")
                .expect("graphics pattern is valid"),
            re_md_image: Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)")
                .expect("markdown image pattern is valid"),
            re_caption_line: Regex::new(r"(?im)^\s*(?:figure|fig\.|table|algorithm)\s*\d+\s*[:.]\s*(.+)$")
                .expect("caption line pattern is valid"),
        }
    }

    /// Extract asset metadata from a figure or table span. Returns `None`
    /// for other content types; missing fields stay `None` rather than
    /// failing the span.
    pub fn extract(&self, content_type: ContentType, text: &str) -> Option<AssetRef> {
        let kind = match content_type {
            ContentType::Figure => "figure",
            ContentType::Table => "table",
            _ => return None,
        };

        let mut caption = self
            .re_caption
            .captures(text)
            .map(|c| c[1].trim().to_string());
        let label = self.re_label.captures(text).map(|c| c[1].trim().to_string());
        let mut path = self
            .re_graphics
            .captures(text)
            .map(|c| c[1].trim().to_string());

        if let Some(md) = self.re_md_image.captures(text) {
            if caption.is_none() && !md[1].trim().is_empty() {
                caption = Some(md[1].trim().to_string());
            }
            if path.is_none() && !md[2].trim().is_empty() {
                path = Some(md[2].trim().to_string());
            }
        }
        if caption.is_none() {
            caption = self
                .re_caption_line
                .captures(text)
                .map(|c| c[1].trim().to_string());
        }

        Some(AssetRef {
            kind: kind.to_string(),
            caption,
            label,
            path,
        })
    }
}

impl Default for AssetExtractor {
    fn default() -> Self {
        Self::new()
    }
}
