//! Integration tests for scoring reply normalization.

use phishguard_analysis_contract::{normalize, parse_prediction_reply};
use phishguard_core::{Assessment, FailureKind, Label, ScanResult};
use serde_json::json;

#[test]
fn response_normalization_tests_reads_probability_field() {
    let raw = json!({
        "probability": 0.93,
        "label": "phishing",
        "explanation": ["urgent language"]
    });

    assert_eq!(
        normalize(&raw),
        ScanResult::Assessed(Assessment {
            label: Label::Phishing,
            probability: 0.93,
            explanation: vec!["urgent language".to_string()],
        })
    );
}

#[test]
fn response_normalization_tests_reads_legacy_probability_field() {
    let raw = json!({"phishing_probability": 0.1, "label": "legitimate"});

    assert_eq!(
        normalize(&raw),
        ScanResult::Assessed(Assessment {
            label: Label::Legitimate,
            probability: 0.1,
            explanation: Vec::new(),
        })
    );
}

#[test]
fn response_normalization_tests_never_substitutes_zero() {
    let raw = json!({"label": "legitimate", "explanation": []});

    let result = normalize(&raw);
    assert!(result.assessment().is_none());
    assert_eq!(
        result.failure().map(|failure| failure.kind),
        Some(FailureKind::DataShape)
    );
}

#[test]
fn response_normalization_tests_rejects_out_of_range_probability() {
    let result = normalize(&json!({"probability": 1.4, "label": "phishing"}));
    assert_eq!(
        result.failure().map(|failure| failure.kind),
        Some(FailureKind::DataShape)
    );
}

#[test]
fn response_normalization_tests_skips_non_string_explanations() {
    let raw = json!({"probability": 0.55, "explanation": ["a", 3, null, "b"]});
    let assessment = normalize(&raw).assessment().cloned().expect("reply should normalize");
    assert_eq!(assessment.explanation, vec!["a", "b"]);
}

#[test]
fn response_normalization_tests_rejects_non_object_bodies() {
    assert!(parse_prediction_reply("not json").is_err());
    assert!(parse_prediction_reply("[1, 2]").is_err());
    assert!(parse_prediction_reply(r#"{"probability": 0.2}"#).is_ok());
}
