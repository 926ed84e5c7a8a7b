//! # Review Subcommands
//!
//! - `override`: replace one determination, with a mandatory reason.
//! - `results`: filtered, paged listing with the summary.
//! - `export`: comma-separated export to a file or stdout.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use rai_core::{DeterminationStatus, OverrideRequest, QuestionId, ResultsQuery, SessionId};

use crate::CliContext;

// ─── Override ────────────────────────────────────────────────────────

/// Arguments for `rai override`.
#[derive(Args, Debug)]
pub struct OverrideArgs {
    pub session_id: SessionId,

    pub question_id: String,

    /// New status (YES, NO, N/A, or any other label).
    pub status: String,

    /// Why the automated determination is wrong.
    #[arg(long)]
    pub reason: String,

    /// Reviewer recorded in the audit trail.
    #[arg(long, env = "RAI_ACTOR")]
    pub actor: Option<String>,
}

pub async fn run_override(args: &OverrideArgs, ctx: &CliContext) -> Result<u8> {
    let mut controller = ctx.controller(args.session_id).await?;
    let record = controller
        .apply_override(OverrideRequest {
            question_id: QuestionId::new(args.question_id.as_str()),
            new_status: DeterminationStatus::parse(&args.status),
            reason: args.reason.clone(),
            actor: args.actor.clone(),
        })
        .await?;
    println!(
        "OK: {} {} → {} by {}",
        record.question_id, record.previous_status, record.new_status, record.actor
    );
    println!("  Compliance score: {}%", controller.summary().compliance_score());
    Ok(0)
}

// ─── Results ─────────────────────────────────────────────────────────

/// Arguments for `rai results`.
#[derive(Args, Debug)]
pub struct ResultsArgs {
    pub session_id: SessionId,

    /// Only this standard (`IAS 1` and `IAS_1` both match).
    #[arg(long)]
    pub standard: Option<String>,

    /// Only this status.
    #[arg(long)]
    pub status: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// 0 lists everything.
    #[arg(long, default_value_t = 0)]
    pub page_size: u32,

    /// Print the override history too.
    #[arg(long)]
    pub history: bool,
}

pub async fn run_results(args: &ResultsArgs, ctx: &CliContext) -> Result<u8> {
    let controller = ctx.controller(args.session_id).await?;
    let page = controller.results_page(&ResultsQuery {
        standard: args.standard.clone(),
        status: args.status.as_deref().map(DeterminationStatus::parse),
        page: args.page,
        page_size: args.page_size,
    });

    for r in &page.results {
        println!(
            "{:<14} {:<10} {:<6} {:.2}{}  {}",
            r.question_id.as_str(),
            r.standard,
            r.status.as_str(),
            r.confidence,
            if r.overridden { "*" } else { " " },
            r.question
        );
    }
    println!(
        "{} of {} results (page {}/{})",
        page.total_filtered,
        page.total_results,
        page.page,
        page.total_pages.max(1)
    );

    let summary = controller.summary();
    for (standard, s) in &summary.by_standard {
        println!(
            "  {standard:<10} {:>3} yes {:>3} no {:>3} n/a  score {}%",
            s.compliant, s.non_compliant, s.not_applicable, s.compliance_score
        );
    }
    println!(
        "Compliance score: {}%",
        page.compliance_score.unwrap_or_else(|| summary.compliance_score())
    );

    if args.history {
        for rec in controller.ledger().records() {
            println!(
                "  {} {} {} → {} by {}: {}",
                rec.timestamp, rec.question_id, rec.previous_status, rec.new_status, rec.actor, rec.reason
            );
        }
    }
    Ok(0)
}

// ─── Export ──────────────────────────────────────────────────────────

/// Arguments for `rai export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    pub session_id: SessionId,

    /// Write to this file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Exit code 1 when there is nothing to export.
pub async fn run_export(args: &ExportArgs, ctx: &CliContext) -> Result<u8> {
    let controller = ctx.controller(args.session_id).await?;
    match &args.out {
        Some(path) => {
            if controller.export_to(path)? {
                println!("OK: wrote {} results to {}", controller.results().len(), path.display());
                Ok(0)
            } else {
                eprintln!("No results to export");
                Ok(1)
            }
        }
        None => match controller.export() {
            Some(csv) => {
                print!("{csv}");
                Ok(0)
            }
            None => {
                eprintln!("No results to export");
                Ok(1)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rai_client::ComplianceBackend;

    use crate::analysis::{run_analyze, AnalyzeArgs};
    use crate::testing::{context, prepared_session};

    async fn analyzed(standards: &[&str]) -> (rai_stub::MemoryBackend, CliContext, SessionId) {
        let (backend, ctx) = context();
        let session = prepared_session(&backend, standards).await;
        let args = AnalyzeArgs {
            session_id: session.id,
            results: false,
        };
        assert_eq!(run_analyze(&args, &ctx).await.unwrap(), 0);
        (backend, ctx, session.id)
    }

    #[tokio::test]
    async fn override_is_recorded_on_server() {
        let (backend, ctx, id) = analyzed(&["IAS_1"]).await;
        let args = OverrideArgs {
            session_id: id,
            question_id: "IAS_1_q1".to_string(),
            status: "n/a".to_string(),
            reason: "Not applicable to a dormant entity".to_string(),
            actor: Some("j.doe".to_string()),
        };
        assert_eq!(run_override(&args, &ctx).await.unwrap(), 0);
        let history = backend.list_overrides(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].new_status, DeterminationStatus::NotApplicable);
        assert_eq!(history[0].actor, "j.doe");
    }

    #[tokio::test]
    async fn override_without_reason_is_refused_locally() {
        let (backend, ctx, id) = analyzed(&["IAS_1"]).await;
        let args = OverrideArgs {
            session_id: id,
            question_id: "IAS_1_q1".to_string(),
            status: "YES".to_string(),
            reason: "  ".to_string(),
            actor: None,
        };
        assert!(run_override(&args, &ctx).await.is_err());
        assert!(backend.list_overrides(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn results_listing_with_filters() {
        let (_, ctx, id) = analyzed(&["IAS_1", "IAS_7"]).await;
        let args = ResultsArgs {
            session_id: id,
            standard: Some("IAS_7".to_string()),
            status: None,
            page: 1,
            page_size: 2,
            history: true,
        };
        assert_eq!(run_results(&args, &ctx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn export_to_file_and_empty_session() {
        let (_, ctx, id) = analyzed(&["IAS_7"]).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let args = ExportArgs {
            session_id: id,
            out: Some(path.clone()),
        };
        assert_eq!(run_export(&args, &ctx).await.unwrap(), 0);
        let csv = std::fs::read_to_string(&path).unwrap();
        assert_eq!(csv.lines().count(), 4);

        let (backend, ctx) = context();
        let fresh = prepared_session(&backend, &["IAS_1"]).await;
        let args = ExportArgs {
            session_id: fresh.id,
            out: Some(dir.path().join("empty.csv")),
        };
        assert_eq!(run_export(&args, &ctx).await.unwrap(), 1);
        assert!(!dir.path().join("empty.csv").exists());
    }
}
