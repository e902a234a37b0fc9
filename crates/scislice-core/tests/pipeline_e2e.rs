//! End-to-end pipeline tests: raw document in, validated chunks and
//! exports out.

use std::sync::Arc;

use scislice_common::ContentType;
use scislice_config::ProcessingConfig;
use scislice_core::{
    export_chunks, validate_chunks, DocumentProcessor, EquationType, ProcessRequest,
    TypeMetadata,
};

const MIXED_DOC: &str = "Introductory prose that explains the physical setting in plain sentences.\n\n$$E = mc^2$$\n\n\\begin{figure}\n\\includegraphics{plots/energy.png}\n\\caption{Energy against mass}\n\\end{figure}\n\nDefinition: Rest mass is the mass measured in the object's rest frame.\n\n```\nfn main() {}\n```\n\nClosing prose paragraph that wraps up the discussion neatly.";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn processor() -> DocumentProcessor {
    init_logging();
    DocumentProcessor::new(ProcessingConfig::default())
}

#[test]
fn mixed_document_produces_typed_chunks_in_order() {
    let outcome = processor().process(&ProcessRequest::new("paper", MIXED_DOC));

    let types: Vec<ContentType> = outcome.chunks.iter().map(|c| c.content_type).collect();
    assert_eq!(
        types,
        vec![
            ContentType::Prose,
            ContentType::Equation,
            ContentType::Figure,
            ContentType::Definition,
            ContentType::Code,
            ContentType::Prose,
        ]
    );
    for (i, chunk) in outcome.chunks.iter().enumerate() {
        assert_eq!(chunk.position_index, i);
        assert_eq!(chunk.id, format!("paper-{i:04}"));
        assert_eq!(chunk.source_id, "paper");
    }

    match &outcome.chunks[1].type_metadata {
        Some(TypeMetadata::Math(math)) => {
            assert_eq!(math.equation_type, EquationType::Display);
            assert!(math.variables.contains("E"));
            assert!(math.variables.contains("m"));
            assert!(math.variables.contains("c"));
        }
        other => panic!("expected math metadata, got {other:?}"),
    }
    match &outcome.chunks[2].type_metadata {
        Some(TypeMetadata::Asset(asset)) => {
            assert_eq!(asset.kind, "figure");
            assert_eq!(asset.caption.as_deref(), Some("Energy against mass"));
            assert_eq!(asset.path.as_deref(), Some("plots/energy.png"));
        }
        other => panic!("expected asset metadata, got {other:?}"),
    }

    assert_eq!(outcome.stats.error_count, 0);
    assert_eq!(outcome.stats.chunk_count, outcome.chunks.len());
}

#[test]
fn chunks_reconstruct_the_source_exactly() {
    let outcome = processor().process(&ProcessRequest::new("paper", MIXED_DOC));
    let rebuilt: String = outcome.chunks.iter().map(|c| c.unique_text()).collect();
    assert_eq!(rebuilt, MIXED_DOC);
}

#[test]
fn processing_is_deterministic_apart_from_job_id() {
    let p = processor();
    let a = p.process(&ProcessRequest::new("paper", MIXED_DOC));
    let b = p.process(&ProcessRequest::new("paper", MIXED_DOC));
    assert_ne!(a.job_id, b.job_id);
    assert_eq!(a.chunks.len(), b.chunks.len());
    for (left, right) in a.chunks.iter().zip(&b.chunks) {
        assert_eq!(left.id, right.id);
        assert_eq!(left.text, right.text);
        assert_eq!(left.content_type, right.content_type);
        assert_eq!(left.confidence, right.confidence);
    }
}

#[test]
fn long_prose_windows_overlap_by_the_configured_ratio() {
    init_logging();
    let config = ProcessingConfig::builder()
        .chunk_size(1000)
        .overlap_ratio(0.2)
        .build()
        .unwrap();
    let sentence = "Energy and mass are related through a constant factor. ";
    let text = sentence.repeat(54); // ~3000 characters
    let outcome = DocumentProcessor::new(config).process(&ProcessRequest::new("doc", &text));

    assert!(outcome.chunks.len() >= 3);
    for pair in outcome.chunks.windows(2) {
        let overlap = pair[1].overlap_with_previous;
        assert_eq!(overlap, 200);
        let prev_tail = &pair[0].text[pair[0].text.len() - overlap..];
        assert_eq!(prev_tail, &pair[1].text[..overlap]);
    }
    let rebuilt: String = outcome.chunks.iter().map(|c| c.unique_text()).collect();
    assert_eq!(rebuilt, text);
}

#[test]
fn oversized_figure_is_never_split() {
    let body = "\\includegraphics{plot.png}\n".repeat(200);
    let doc = format!("\\begin{{figure}}\n{body}\\caption{{Huge}}\n\\end{{figure}}");
    let outcome = processor().process(&ProcessRequest::new("doc", &doc));
    assert_eq!(outcome.chunks.len(), 1);
    assert_eq!(outcome.chunks[0].content_type, ContentType::Figure);
    assert!(outcome.chunks[0].text.len() > 1024);
}

#[test]
fn bare_equation_classifies_as_inline_math() {
    let outcome = processor().process(&ProcessRequest::new("doc", "E = mc^2"));
    assert_eq!(outcome.chunks.len(), 1);
    assert_eq!(outcome.chunks[0].content_type, ContentType::Equation);
    match &outcome.chunks[0].type_metadata {
        Some(TypeMetadata::Math(math)) => {
            assert_eq!(math.equation_type, EquationType::Inline);
            let vars: Vec<&str> = math.variables.iter().map(String::as_str).collect();
            assert_eq!(vars, vec!["E", "c", "m"]);
        }
        other => panic!("expected math metadata, got {other:?}"),
    }
}

#[test]
fn malformed_markup_degrades_instead_of_failing() {
    let doc = "A sound paragraph before the damage.\n\nstray \\end{figure} marker\n\nAnother sound paragraph after it.";
    let outcome = processor().process(&ProcessRequest::new("doc", doc));
    assert!(outcome.stats.error_count > 0);
    assert!(!outcome.chunks.is_empty());
    let rebuilt: String = outcome.chunks.iter().map(|c| c.unique_text()).collect();
    assert_eq!(rebuilt, doc);
    let report = validate_chunks(&outcome.chunks);
    assert_eq!(report.invalid_chunks, 0);
}

#[test]
fn empty_document_contracts() {
    let outcome = processor().process(&ProcessRequest::new("doc", ""));
    assert!(outcome.chunks.is_empty());
    assert_eq!(outcome.stats.error_count, 0);

    assert_eq!(export_chunks(&outcome.chunks, "json").unwrap(), "[]");
    assert_eq!(
        export_chunks(&outcome.chunks, "csv").unwrap(),
        "id,text,content_type,confidence,source_id\n"
    );
    let report = validate_chunks(&outcome.chunks);
    assert_eq!(report.total_chunks, 0);
    assert_eq!(report.valid_chunks, 0);
    assert_eq!(report.invalid_chunks, 0);
    assert!(report.content_type_distribution.is_empty());
}

#[test]
fn pipeline_output_validates_and_exports() {
    let outcome = processor().process(&ProcessRequest::new("paper", MIXED_DOC));

    let report = validate_chunks(&outcome.chunks);
    assert_eq!(report.total_chunks, outcome.chunks.len());
    assert_eq!(report.invalid_chunks, 0);
    assert_eq!(
        report.content_type_distribution[&ContentType::Equation],
        1
    );

    let json = export_chunks(&outcome.chunks, "json").unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), outcome.chunks.len());

    let csv = export_chunks(&outcome.chunks, "csv").unwrap();
    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    assert_eq!(reader.records().count(), outcome.chunks.len());
}

#[tokio::test]
async fn documents_process_concurrently_in_request_order() {
    let processor = Arc::new(processor());
    let requests: Vec<ProcessRequest> = (0..8)
        .map(|i| {
            ProcessRequest::new(
                format!("doc-{i}"),
                format!("Paragraph number {i} with enough words to classify as prose."),
            )
        })
        .collect();
    let outcomes = processor.process_documents(requests).await;
    assert_eq!(outcomes.len(), 8);
    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.source_id, format!("doc-{i}"));
        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(outcome.chunks[0].content_type, ContentType::Prose);
    }
}
