//! # Keyword Analyzer
//!
//! Deterministic stand-in for the model-backed analyzer. A question is
//! answered `YES` when at least half of its key terms occur in the session's
//! documents, `NO` otherwise. Identical inputs always give identical
//! results, which keeps end-to-end tests stable.
//!
//! [`plan_run`] lays out the event sequence of a run: a `status`, a
//! starting `progress`, then a `result` and a `progress` per question, and
//! a closing `complete`, optionally cut short by a [`Fault`].

use rai_catalog::CatalogItem;
use rai_core::{
    AnalysisProgress, ChunkPreviewItem, CompletePayload, ComplianceResultItem,
    DeterminationStatus, StatusPayload, StreamEvent,
};

use crate::store::Fault;

const MIN_TERM_CHARS: usize = 6;
const EVIDENCE_CHARS: usize = 240;

const STOP_TERMS: &[&str] = &[
    "disclose", "discloses", "entity", "entity's", "present", "presents", "statement",
    "statements", "period", "whether", "information",
];

/// One step of a planned run.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Emit(StreamEvent),
    /// End the stream here.
    Disconnect,
    /// Go silent without closing.
    Stall,
}

fn key_terms(question: &str) -> Vec<String> {
    let mut terms: Vec<String> = question
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= MIN_TERM_CHARS && !STOP_TERMS.contains(&w.as_str()))
        .collect();
    terms.dedup();
    terms
}

/// Assess one question against the documents.
pub fn assess(
    standard: &str,
    sequence: u32,
    item: &CatalogItem,
    document_lower: &str,
    chunks: &[ChunkPreviewItem],
) -> ComplianceResultItem {
    let terms = key_terms(&item.question);
    let found: Vec<&String> = terms
        .iter()
        .filter(|t| document_lower.contains(t.as_str()))
        .collect();
    let ratio = if terms.is_empty() {
        0.0
    } else {
        found.len() as f64 / terms.len() as f64
    };
    let status = if !terms.is_empty() && found.len() * 2 >= terms.len() {
        DeterminationStatus::Yes
    } else {
        DeterminationStatus::No
    };

    let mut result = ComplianceResultItem::new(item.id.as_str(), standard, status.clone());
    result.section = standard.to_string();
    result.reference = item.reference.clone();
    result.question = item.question.clone();
    result.confidence = ((0.5 + ratio / 2.0) * 100.0).round() / 100.0;
    result.explanation = format!(
        "{} of {} key terms found in the documents",
        found.len(),
        terms.len()
    );
    result.evidence = found
        .first()
        .and_then(|term| {
            chunks
                .iter()
                .find(|c| c.content.to_lowercase().contains(term.as_str()))
        })
        .map(|c| c.content.chars().take(EVIDENCE_CHARS).collect())
        .unwrap_or_default();
    if status == DeterminationStatus::No {
        result.suggested_disclosure =
            format!("Add a disclosure addressing {} ({}).", standard, item.reference);
    }
    result.decision_tree_path = vec![item.id.clone()];
    result.sequence = sequence;
    result
}

/// Event sequence for a run over `results`, in order.
pub fn plan_run(
    results: &[ComplianceResultItem],
    cache_hit: bool,
    fault: Option<Fault>,
) -> Vec<Step> {
    let total = u32::try_from(results.len()).unwrap_or(u32::MAX);
    let mut steps = vec![
        Step::Emit(StreamEvent::Status(StatusPayload {
            status: "analyzing".to_string(),
            message: format!("Analyzing {total} questions"),
            job_id: None,
        })),
        Step::Emit(StreamEvent::Progress(AnalysisProgress::starting(total))),
    ];
    let mut summary = CompletePayload {
        total,
        cache_hit,
        ..CompletePayload::default()
    };

    for (i, result) in results.iter().enumerate() {
        if let Some(step) = fault.and_then(|f| fault_step(f, i)) {
            steps.push(step);
            return steps;
        }
        match result.status {
            DeterminationStatus::Yes => summary.compliant += 1,
            DeterminationStatus::No => summary.non_compliant += 1,
            DeterminationStatus::NotApplicable => summary.not_applicable += 1,
            _ => summary.errors += 1,
        }
        steps.push(Step::Emit(StreamEvent::Result(result.clone())));
        let mut progress = AnalysisProgress {
            total_questions: total,
            completed_questions: u32::try_from(i + 1).unwrap_or(u32::MAX),
            phase: "analyzing".to_string(),
            current_standard: Some(result.standard.clone()),
            current_question: Some(result.question_id.to_string()),
            ..AnalysisProgress::default()
        };
        progress.percentage = progress.computed_percentage();
        steps.push(Step::Emit(StreamEvent::Progress(progress)));
    }
    if let Some(step) = fault.and_then(|f| fault_step(f, results.len())) {
        steps.push(step);
        return steps;
    }
    steps.push(Step::Emit(StreamEvent::Complete(summary)));
    steps
}

fn fault_step(fault: Fault, emitted: usize) -> Option<Step> {
    match fault {
        Fault::ErrorAfter(n) if n == emitted => Some(Step::Emit(StreamEvent::error(
            "analysis interrupted: model endpoint unavailable",
        ))),
        Fault::DisconnectAfter(n) if n == emitted => Some(Step::Disconnect),
        Fault::StallAfter(n) if n == emitted => Some(Step::Stall),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, question: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            question: question.to_string(),
            reference: "1.10".to_string(),
            original_question: None,
        }
    }

    fn results(n: usize) -> Vec<ComplianceResultItem> {
        (0..n)
            .map(|i| {
                ComplianceResultItem::new(format!("IAS_1_q{i}"), "IAS 1", DeterminationStatus::Yes)
            })
            .collect()
    }

    #[test]
    fn key_terms_skip_short_and_stop_words() {
        assert_eq!(
            key_terms("Does the entity disclose its going concern assessment?"),
            vec!["concern", "assessment"]
        );
    }

    #[test]
    fn assess_answers_yes_on_majority_of_terms() {
        let doc = "management concluded the going concern assessment is appropriate";
        let q3 = item("IAS_1_q3", "Has management assessed the going concern assessment?");
        let r = assess("IAS 1", 3, &q3, doc, &[]);
        assert_eq!(r.status, DeterminationStatus::Yes);
        assert_eq!(r.sequence, 3);
        assert!(r.suggested_disclosure.is_empty());

        let q4 = item("IAS_1_q4", "Does the entity present comparative information?");
        let r = assess("IAS 1", 4, &q4, doc, &[]);
        assert_eq!(r.status, DeterminationStatus::No);
        assert_eq!(r.confidence, 0.5);
        assert!(r.suggested_disclosure.contains("1.10"));
    }

    #[test]
    fn evidence_quotes_matching_chunk() {
        let chunk =
            ChunkPreviewItem::from_text("c0", 0, "Inventories are measured at cost", "notes", false);
        let r = assess(
            "IAS 2",
            1,
            &item("IAS_2_q1", "Are inventories measured consistently?"),
            "inventories are measured at cost",
            &[chunk],
        );
        assert_eq!(r.evidence, "Inventories are measured at cost");
    }

    #[test]
    fn clean_plan_ends_with_complete() {
        let steps = plan_run(&results(3), false, None);
        assert_eq!(steps.len(), 2 + 3 * 2 + 1);
        match steps.last() {
            Some(Step::Emit(StreamEvent::Complete(c))) => {
                assert_eq!(c.total, 3);
                assert_eq!(c.compliant, 3);
            }
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[test]
    fn faults_cut_the_plan() {
        let steps = plan_run(&results(3), false, Some(Fault::ErrorAfter(1)));
        assert_eq!(steps.len(), 2 + 2 + 1);
        assert!(matches!(steps.last(), Some(Step::Emit(StreamEvent::Error(_)))));

        let steps = plan_run(&results(3), false, Some(Fault::DisconnectAfter(3)));
        assert_eq!(steps.last(), Some(&Step::Disconnect));

        let steps = plan_run(&results(3), false, Some(Fault::StallAfter(0)));
        assert_eq!(steps.len(), 3);
        assert_eq!(steps.last(), Some(&Step::Stall));
    }
}
