//! End-to-end flows through `DocumentPipeline` against a scripted client.

use std::sync::Arc;

use super::inference::{InferenceError, MockInferenceClient};
use super::normalize::parse_json_object;
use super::orchestrator::DocumentPipeline;
use super::PipelineError;
use crate::models::enums::{PrimaryCategory, SecondaryCategory};

const SMC_TEXT: &str = "SAFETY MANAGEMENT CERTIFICATE\n\
    Issued under the provisions of the International Convention for the Safety of Life at Sea\n\
    Name of ship: MV NORTHERN STAR\n\
    IMO Number: 9123456\n\
    Date of issue: 2023-01-15\n\
    Valid until: 2028-01-14";

const SMC_CLASSIFICATION: &str = r#"{
  "primaryCategory": "Vessel Certificate",
  "secondaryCategory": "Safety Certificate",
  "specificDocumentType": "Safety Management Certificate",
  "confidence": "High",
  "explanation": "ISM Code certificate issued to the ship."
}"#;

const SMC_EXTRACTION: &str = r#"{
  "fullText": "SAFETY MANAGEMENT CERTIFICATE\nName of ship: MV NORTHERN STAR",
  "metadata": {
    "documentTitle": "Safety Management Certificate",
    "documentType": "Safety Management Certificate",
    "documentNumber": null,
    "vesselName": "MV NORTHERN STAR",
    "imoNumber": "IMO 9123456",
    "issuer": null,
    "issueDate": "2023-01-15",
    "expiryDate": "2028-01-14"
  },
  "keyValuePairs": [
    {"key": "Name of ship", "value": "MV NORTHERN STAR"},
    {"key": "Date of issue", "value": "2023-01-15"},
    {"key": "Valid until", "value": "2028-01-14"}
  ]
}"#;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

#[tokio::test]
async fn safety_management_certificate_classify_then_extract() {
    let mock = Arc::new(MockInferenceClient::with_responses(&[
        SMC_CLASSIFICATION,
        SMC_EXTRACTION,
    ]));
    let pipeline = DocumentPipeline::new(mock.clone());

    let classification = pipeline.classify(SMC_TEXT, Some("pdf")).await.unwrap();
    assert_eq!(classification.primary_category, PrimaryCategory::VesselCertificate);
    assert_eq!(
        classification.secondary_category,
        Some(SecondaryCategory::SafetyCertificate)
    );

    let extraction = pipeline
        .extract(PNG, classification.specific_document_type.as_deref())
        .await
        .unwrap();
    assert_eq!(extraction.metadata.issue_date.as_deref(), Some("15/01/2023"));
    assert_eq!(extraction.metadata.expiry_date.as_deref(), Some("14/01/2028"));
    assert_eq!(extraction.metadata.imo_number.as_deref(), Some("9123456"));
    assert_eq!(extraction.value_for("Date of issue"), Some("15/01/2023"));
    assert_eq!(extraction.value_for("Name of ship"), Some("MV NORTHERN STAR"));

    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn empty_string_is_rejected_without_outbound_call() {
    let mock = Arc::new(MockInferenceClient::new(SMC_CLASSIFICATION));
    let pipeline = DocumentPipeline::new(mock.clone());

    let err = pipeline.classify("", None).await.unwrap_err();

    assert!(matches!(err, PipelineError::InvalidInput(_)));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn unparsable_extraction_returns_raw_text() {
    let raw = "The image is too blurry to read. Possibly a crew list?";
    let mock = Arc::new(MockInferenceClient::new(raw));
    let pipeline = DocumentPipeline::new(mock);

    let extraction = pipeline.extract(PNG, None).await.unwrap();

    assert_eq!(extraction.full_text, raw);
    assert!(extraction.metadata.is_empty());
    assert!(extraction.key_value_pairs.is_empty());
}

#[test]
fn fenced_json_parses_like_bare_json() {
    let fenced = format!("Here is the result:\n```json\n{SMC_CLASSIFICATION}\n```\nDone.");
    assert_eq!(
        parse_json_object(&fenced).unwrap(),
        parse_json_object(SMC_CLASSIFICATION).unwrap()
    );
}

#[tokio::test]
async fn secondary_only_survives_under_vessel_certificate() {
    let replies = [
        r#"{"primaryCategory":"Crew Document","secondaryCategory":"Safety Certificate","confidence":"High","explanation":"x"}"#,
        r#"{"primaryCategory":"Survey Report","secondaryCategory":"Classification Certificate","confidence":"Medium","explanation":"x"}"#,
        r#"{"primaryCategory":"Something Else","secondaryCategory":"Registration Certificate","confidence":"Low","explanation":"x"}"#,
        "not json at all",
        SMC_CLASSIFICATION,
    ];
    let mock = Arc::new(MockInferenceClient::with_responses(&replies));
    let pipeline = DocumentPipeline::new(mock);

    for _ in 0..replies.len() {
        let result = pipeline.classify("Some document", None).await.unwrap();
        if result.primary_category != PrimaryCategory::VesselCertificate {
            assert_eq!(result.secondary_category, None, "{result:?}");
        }
        assert!(
            PrimaryCategory::all().contains(&result.primary_category),
            "{result:?}"
        );
    }
}

#[tokio::test]
async fn authentication_failure_surfaces_to_caller() {
    let mock = Arc::new(MockInferenceClient::failing(InferenceError::Authentication(
        "invalid api key".into(),
    )));
    let pipeline = DocumentPipeline::new(mock);

    let err = pipeline.extract(PNG, None).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Inference(InferenceError::Authentication(_))
    ));
    assert!(!err.is_retryable());
}
