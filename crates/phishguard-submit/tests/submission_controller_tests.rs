//! Integration tests for the scan submission state machine.

mod common;

use std::sync::Arc;

use common::RecordingTransport;
use phishguard_core::{FailureKind, Identity, Label, ScanInput, ScanResult};
use phishguard_submit::{
    ScanSubmissionController, SubmissionState, SubmitError, SubmitOutcome,
    TRANSPORT_FAILURE_MESSAGE, TransportError,
};
use serde_json::json;
use tokio::sync::Notify;

fn phishing_reply() -> serde_json::Value {
    json!({"probability": 0.93, "label": "phishing", "explanation": ["urgent language"]})
}

#[tokio::test]
async fn submission_controller_tests_rejects_blank_input_without_request() {
    let transport = Arc::new(RecordingTransport::replying(Ok(phishing_reply())));
    let controller = ScanSubmissionController::new(transport.clone());

    let error = controller
        .submit(&ScanInput::new("", "  ", "\n"), None)
        .await
        .expect_err("blank input should be rejected");

    assert_eq!(error, SubmitError::EmptySubmission);
    assert!(transport.requests().is_empty());
    assert_eq!(controller.state(), SubmissionState::Idle);
}

#[tokio::test]
async fn submission_controller_tests_sends_one_trimmed_request() {
    let transport = Arc::new(RecordingTransport::replying(Ok(phishing_reply())));
    let controller = ScanSubmissionController::new(transport.clone());

    controller
        .submit(&ScanInput::new(" a ", "", ""), None)
        .await
        .expect("submission should run");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].subject, "a");
    assert_eq!(requests[0].body, "");
    assert_eq!(requests[0].url, "");
    assert_eq!(requests[0].user_id, None);
}

#[tokio::test]
async fn submission_controller_tests_attaches_identity_and_stores_result() {
    let transport = Arc::new(RecordingTransport::replying(Ok(phishing_reply())));
    let controller = ScanSubmissionController::new(transport.clone());
    let identity = Identity {
        id: "user-7".to_string(),
        email: "u@example.com".to_string(),
    };

    let outcome = controller
        .submit(&ScanInput::new("Verify account", "", ""), Some(&identity))
        .await
        .expect("submission should run");

    assert_eq!(transport.requests()[0].user_id.as_deref(), Some("user-7"));
    let SubmitOutcome::Completed(ScanResult::Assessed(assessment)) = outcome else {
        panic!("expected assessed outcome");
    };
    assert_eq!(assessment.label, Label::Phishing);
    assert_eq!(
        controller.state(),
        SubmissionState::Succeeded(assessment.clone())
    );
    assert_eq!(controller.result(), Some(ScanResult::Assessed(assessment)));
}

#[tokio::test]
async fn submission_controller_tests_hides_transport_details() {
    let transport = Arc::new(RecordingTransport::replying(Err(
        TransportError::Unreachable("connection refused (os error 111)".to_string()),
    )));
    let controller = ScanSubmissionController::new(transport);

    controller
        .submit(&ScanInput::new("", "body", ""), None)
        .await
        .expect("submission should run");

    let SubmissionState::Failed(failure) = controller.state() else {
        panic!("expected failed state");
    };
    assert_eq!(failure.kind, FailureKind::Transport);
    assert_eq!(failure.message, TRANSPORT_FAILURE_MESSAGE);
    assert!(!failure.message.contains("os error"));
}

#[tokio::test]
async fn submission_controller_tests_reports_data_shape_distinctly() {
    let transport = Arc::new(RecordingTransport::replying(Ok(json!({"label": "phishing"}))));
    let controller = ScanSubmissionController::new(transport);

    controller
        .submit(&ScanInput::new("", "", "https://x.test"), None)
        .await
        .expect("submission should run");

    let SubmissionState::Failed(failure) = controller.state() else {
        panic!("expected failed state");
    };
    assert_eq!(failure.kind, FailureKind::DataShape);
}

#[tokio::test]
async fn submission_controller_tests_blocks_reentrant_submission() {
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(RecordingTransport::gated(
        Ok(phishing_reply()),
        Arc::clone(&gate),
    ));
    let controller = ScanSubmissionController::new(transport.clone());
    let input = ScanInput::new("first", "", "");

    let first = controller.submit(&input, None);
    let second = async {
        assert!(controller.is_submitting());
        let outcome = controller
            .submit(&ScanInput::new("second", "", ""), None)
            .await
            .expect("second call should not error");
        gate.notify_one();
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert!(matches!(first, Ok(SubmitOutcome::Completed(_))));
    assert_eq!(second, SubmitOutcome::Busy);
    assert_eq!(transport.requests().len(), 1);
    assert!(!controller.is_submitting());
}

#[tokio::test]
async fn submission_controller_tests_reset_discards_in_flight_result() {
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(RecordingTransport::gated(
        Ok(phishing_reply()),
        Arc::clone(&gate),
    ));
    let controller = ScanSubmissionController::new(transport);

    let input = ScanInput::new("s", "", "");
    let pending = controller.submit(&input, None);
    let interrupt = async {
        controller.reset();
        gate.notify_one();
    };
    let (outcome, ()) = tokio::join!(pending, interrupt);

    assert_eq!(outcome, Ok(SubmitOutcome::Superseded));
    assert_eq!(controller.state(), SubmissionState::Idle);
    assert!(!controller.is_submitting());
}

#[tokio::test]
async fn submission_controller_tests_next_submit_clears_previous_outcome() {
    let transport = Arc::new(RecordingTransport::replying(Ok(phishing_reply())));
    let controller = ScanSubmissionController::new(transport);

    controller
        .submit(&ScanInput::new("s", "", ""), None)
        .await
        .expect("submission should run");
    assert!(controller.result().is_some());

    let _ = controller.submit(&ScanInput::default(), None).await;
    assert_eq!(controller.state(), SubmissionState::Idle);
    assert!(controller.result().is_none());
}
