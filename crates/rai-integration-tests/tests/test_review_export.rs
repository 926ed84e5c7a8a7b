//! Review stage: override history, scoped re-analysis and the delimited
//! export, checked against what the server holds.

use std::sync::Arc;

use rai_analysis::{AnalysisStreamCoordinator, NoopObserver, SessionController, StreamConfig};
use rai_client::{ComplianceBackend, UploadDocument, UploadRequest};
use rai_compliance::{FinancialCoverageValidator, EXPORT_COLUMNS};
use rai_core::{
    DeterminationStatus, NewSession, OverrideRequest, QuestionId, ReanalyzeRequest, ResultsQuery,
    SessionPatch, Stage,
};
use rai_stub::{sample_catalog, MemoryBackend};

const STATEMENTS: &str = "Statement of financial position. Comparative information is presented. \
    Significant accounting policies are disclosed. Inventories are measured at cost; \
    the carrying amount of inventories is 4,200.";

async fn analyzed(standards: &[&str]) -> (MemoryBackend, SessionController) {
    let backend = MemoryBackend::with_catalog(sample_catalog());
    let session = backend
        .create_session(&NewSession {
            client_name: "Northwind \"Group\" plc".to_string(),
            framework: Default::default(),
        })
        .await
        .unwrap();
    backend
        .upload_documents(
            session.id,
            &UploadRequest {
                financial_statements: Some(UploadDocument::new(
                    "fs.txt",
                    STATEMENTS.as_bytes().to_vec(),
                )),
                notes: None,
            },
        )
        .await
        .unwrap();
    backend
        .patch_session(
            session.id,
            &SessionPatch {
                selected_standards: Some(standards.iter().map(|s| s.to_string()).collect()),
                ..SessionPatch::enter(Stage::ContextPreview)
            },
        )
        .await
        .unwrap();

    let dyn_backend: Arc<dyn ComplianceBackend> = Arc::new(backend.clone());
    let mut controller = SessionController::load(
        AnalysisStreamCoordinator::new(dyn_backend.clone(), StreamConfig::default()),
        FinancialCoverageValidator::default(),
        dyn_backend,
        session.id,
    )
    .await
    .unwrap();
    assert!(controller.analyze(&mut NoopObserver).await.unwrap().is_completed());
    (backend, controller)
}

fn request(question: &str, status: DeterminationStatus, reason: &str) -> OverrideRequest {
    OverrideRequest {
        question_id: QuestionId::new(question),
        new_status: status,
        reason: reason.to_string(),
        actor: Some("a.reviewer".to_string()),
    }
}

// ── overrides ────────────────────────────────────────────────────────

#[tokio::test]
async fn override_history_chains_previous_status() {
    let (backend, mut controller) = analyzed(&["IAS_1"]).await;
    let original = controller.results().get("IAS_1_q2").unwrap().status.clone();

    controller
        .apply_override(request("IAS_1_q2", DeterminationStatus::NotApplicable, "dormant"))
        .await
        .unwrap();
    controller
        .apply_override(request("IAS_1_q2", DeterminationStatus::Yes, "found in note 3"))
        .await
        .unwrap();

    let id = QuestionId::new("IAS_1_q2");
    let history: Vec<_> = controller.ledger().history(&id).collect();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].previous_status, original);
    assert_eq!(history[1].previous_status, DeterminationStatus::NotApplicable);
    assert_eq!(history[1].new_status, DeterminationStatus::Yes);

    let item = controller.results().get("IAS_1_q2").unwrap();
    assert!(item.overridden);
    assert_eq!(item.confidence, 1.0);

    let server = backend.list_overrides(controller.session_id()).await.unwrap();
    assert_eq!(server.len(), 2);
    assert_eq!(server[1].actor, "a.reviewer");
}

#[tokio::test]
async fn override_of_unknown_question_changes_nothing() {
    let (backend, mut controller) = analyzed(&["IAS_1"]).await;
    assert!(controller
        .apply_override(request("IAS_9_q1", DeterminationStatus::No, "typo"))
        .await
        .is_err());
    assert!(controller.ledger().is_empty());
    assert!(backend
        .list_overrides(controller.session_id())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn overrides_move_the_score() {
    let (_, mut controller) = analyzed(&["IAS_1", "IAS_2"]).await;
    let ids: Vec<String> = controller
        .results()
        .iter()
        .map(|r| r.question_id.as_str().to_string())
        .collect();
    for id in &ids {
        controller
            .apply_override(request(id, DeterminationStatus::Yes, "verified manually"))
            .await
            .unwrap();
    }
    assert_eq!(controller.summary().compliance_score(), 100);

    controller
        .apply_override(request(&ids[0], DeterminationStatus::No, "actually missing"))
        .await
        .unwrap();
    assert!(controller.summary().compliance_score() < 100);
}

// ── re-analysis ──────────────────────────────────────────────────────

#[tokio::test]
async fn reanalysis_touches_only_requested_questions() {
    let (backend, mut controller) = analyzed(&["IAS_1", "IAS_7"]).await;
    let before: Vec<_> = controller.results().iter().cloned().collect();

    let report = controller
        .reanalyze(&ReanalyzeRequest {
            question_ids: vec![QuestionId::new("IAS_7_q2")],
            instructions: Some("look at note 12".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(report.requested, 1);
    assert_eq!(report.replaced, 1);
    assert_eq!(report.inserted, 0);
    assert_eq!(controller.results().len(), before.len());

    for old in before.iter().filter(|r| r.question_id.as_str() != "IAS_7_q2") {
        assert_eq!(controller.results().get(old.question_id.as_str()), Some(old));
    }
    let redone = controller.results().get("IAS_7_q2").unwrap();
    assert!(redone.explanation.contains("look at note 12"));

    let page = backend
        .list_results(controller.session_id(), &ResultsQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total_results, before.len() as u32);
}

#[tokio::test]
async fn reanalysis_replaces_an_override() {
    let (_, mut controller) = analyzed(&["IAS_2"]).await;
    controller
        .apply_override(request("IAS_2_q1", DeterminationStatus::NotApplicable, "n/a"))
        .await
        .unwrap();
    controller
        .reanalyze(&ReanalyzeRequest {
            question_ids: vec![QuestionId::new("IAS_2_q1")],
            instructions: None,
        })
        .await
        .unwrap();
    assert!(!controller.results().get("IAS_2_q1").unwrap().overridden);
    assert_eq!(controller.ledger().len(), 1);
}

// ── export ───────────────────────────────────────────────────────────

fn parse_csv(text: &str) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(text.as_bytes())
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn export_round_trips_through_a_csv_reader() {
    let (_, mut controller) = analyzed(&["IAS_1", "IAS_2"]).await;
    controller
        .apply_override(request(
            "IAS_1_q1",
            DeterminationStatus::No,
            "statement titled \"balance sheet\", not compliant",
        ))
        .await
        .unwrap();

    let csv = controller.export().unwrap();
    let rows = parse_csv(&csv);
    assert_eq!(rows.len(), 1 + 9);
    assert_eq!(rows[0], EXPORT_COLUMNS.map(String::from).to_vec());
    for (row, item) in rows[1..].iter().zip(controller.results().iter()) {
        assert_eq!(row.len(), EXPORT_COLUMNS.len());
        assert_eq!(row[3], item.question);
        assert_eq!(row[4], item.status.as_str());
        assert_eq!(row[5], format!("{:.2}", item.confidence));
        assert_eq!(row[7], item.evidence);
    }
    assert_eq!(rows[1][4], "NO");
}

#[tokio::test]
async fn export_to_file_matches_in_memory_export() {
    let (_, controller) = analyzed(&["IAS_7"]).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");
    assert!(controller.export_to(&path).unwrap());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), controller.export().unwrap());
}
