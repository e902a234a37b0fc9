//! Content categories assigned to document spans and chunks.

use serde::{Deserialize, Serialize};

/// Content type of a classified span or emitted chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Prose,
    Equation,
    Figure,
    Table,
    Definition,
    Algorithm,
    Example,
    Code,
    Other,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Prose => "prose",
            ContentType::Equation => "equation",
            ContentType::Figure => "figure",
            ContentType::Table => "table",
            ContentType::Definition => "definition",
            ContentType::Algorithm => "algorithm",
            ContentType::Example => "example",
            ContentType::Code => "code",
            ContentType::Other => "other",
        }
    }

    /// Structural units are emitted as exactly one chunk and never split,
    /// regardless of their length relative to the chunk size.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ContentType::Equation
                | ContentType::Figure
                | ContentType::Table
                | ContentType::Definition
                | ContentType::Algorithm
        )
    }

    /// Free-form content is windowed and may merge with adjacent spans
    /// of the same type.
    pub fn is_free_form(&self) -> bool {
        !self.is_structural()
    }

    pub fn all() -> &'static [ContentType] {
        &[
            ContentType::Prose,
            ContentType::Equation,
            ContentType::Figure,
            ContentType::Table,
            ContentType::Definition,
            ContentType::Algorithm,
            ContentType::Example,
            ContentType::Code,
            ContentType::Other,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_split() {
        assert!(ContentType::Figure.is_structural());
        assert!(ContentType::Equation.is_structural());
        assert!(ContentType::Prose.is_free_form());
        assert!(ContentType::Code.is_free_form());
        assert!(ContentType::Other.is_free_form());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ContentType::Definition).unwrap();
        assert_eq!(json, "\"definition\"");
        let back: ContentType = serde_json::from_str("\"equation\"").unwrap();
        assert_eq!(back, ContentType::Equation);
    }

    #[test]
    fn test_as_str_matches_serde() {
        for ct in ContentType::all() {
            let json = serde_json::to_string(ct).unwrap();
            assert_eq!(json, format!("\"{}\"", ct.as_str()));
        }
    }
}
