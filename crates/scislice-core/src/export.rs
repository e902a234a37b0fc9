//! Chunk export to interchange formats.

use scislice_common::{Result, ScisliceError};

use crate::models::EnhancedChunk;

const CSV_HEADER: [&str; 5] = ["id", "text", "content_type", "confidence", "source_id"];

/// Serialise chunks to the named format ("json" or "csv", case-insensitive).
/// An empty chunk list is valid: JSON yields an empty array, CSV yields the
/// header row alone.
pub fn export_chunks(chunks: &[EnhancedChunk], format: &str) -> Result<String> {
    match format.to_ascii_lowercase().as_str() {
        "json" => Ok(serde_json::to_string_pretty(chunks)?),
        "csv" => export_csv(chunks),
        other => Err(ScisliceError::ExportFormat(other.to_string())),
    }
}

fn export_csv(chunks: &[EnhancedChunk]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for chunk in chunks {
        writer.write_record([
            chunk.id.as_str(),
            chunk.text.as_str(),
            chunk.content_type.as_str(),
            &chunk.confidence.to_string(),
            chunk.source_id.as_str(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| ScisliceError::Other(anyhow::anyhow!("csv finalise: {err}")))?;
    String::from_utf8(bytes)
        .map_err(|err| ScisliceError::Other(anyhow::anyhow!("csv encoding: {err}")))
}
