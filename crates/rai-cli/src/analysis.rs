//! # Analysis Subcommands
//!
//! `rai analyze` runs a full streaming analysis and prints progress as it
//! arrives. A failed run is not a CLI error: the session has already been
//! moved back to the context preview, so the command reports the failure
//! and exits with code 2.
//!
//! `rai reanalyze` re-runs a chosen set of questions synchronously.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use rai_analysis::{RunObserver, RunOutcome};
use rai_compliance::UpsertOutcome;
use rai_core::{
    AnalysisProgress, ComplianceResultItem, QuestionId, ReanalyzeRequest, SessionId,
    StatusPayload,
};

use crate::CliContext;

// ─── Analyze ─────────────────────────────────────────────────────────

/// Arguments for `rai analyze`.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    pub session_id: SessionId,

    /// Print each result as it arrives.
    #[arg(long)]
    pub results: bool,
}

/// Prints run progress to stderr.
#[derive(Debug, Default)]
pub struct ProgressPrinter {
    show_results: bool,
    last_completed: Option<u32>,
}

impl ProgressPrinter {
    pub fn new(show_results: bool) -> Self {
        Self {
            show_results,
            last_completed: None,
        }
    }
}

impl RunObserver for ProgressPrinter {
    fn on_progress(&mut self, progress: &AnalysisProgress) {
        if self.last_completed == Some(progress.completed_questions) {
            return;
        }
        self.last_completed = Some(progress.completed_questions);
        let mut err = std::io::stderr().lock();
        let _ = writeln!(
            err,
            "[{}/{}] {:>5.1}%  {}",
            progress.completed_questions,
            progress.total_questions,
            progress.percentage,
            progress.current_standard.as_deref().unwrap_or("")
        );
    }

    fn on_status(&mut self, status: &StatusPayload) {
        eprintln!("status: {} {}", status.status, status.message);
    }

    fn on_result(&mut self, result: &ComplianceResultItem, outcome: UpsertOutcome) {
        if self.show_results {
            let marker = match outcome {
                UpsertOutcome::Inserted => "",
                UpsertOutcome::Replaced => " (replaced)",
            };
            println!(
                "{:<14} {:<5} {:.2}{marker}",
                result.question_id.as_str(),
                result.status.as_str(),
                result.confidence
            );
        }
    }
}

pub async fn run_analyze(args: &AnalyzeArgs, ctx: &CliContext) -> Result<u8> {
    let mut controller = ctx.controller(args.session_id).await?;
    let mut printer = ProgressPrinter::new(args.results);
    let report = controller.analyze(&mut printer).await?;

    if report.dropped_lines > 0 {
        eprintln!("warning: {} malformed stream line(s) skipped", report.dropped_lines);
    }
    match &report.outcome {
        RunOutcome::Completed(complete) => {
            let summary = controller.summary();
            println!(
                "OK: analysis complete: {} results ({} compliant, {} non-compliant, {} n/a)",
                report.results_held,
                summary.overall.compliant,
                summary.overall.non_compliant,
                summary.overall.not_applicable
            );
            if complete.cache_hit {
                println!("  (served from cache)");
            }
            println!("  Compliance score: {}%", summary.compliance_score());
            Ok(0)
        }
        RunOutcome::Failed(failure) => {
            eprintln!("FAILED: {failure}");
            eprintln!(
                "  {} partial result(s) kept; session is back at {}",
                report.results_held, report.final_stage
            );
            Ok(2)
        }
    }
}

// ─── Reanalyze ───────────────────────────────────────────────────────

/// Arguments for `rai reanalyze`.
#[derive(Args, Debug)]
pub struct ReanalyzeArgs {
    pub session_id: SessionId,

    /// Question ids to re-run.
    #[arg(required = true)]
    pub questions: Vec<String>,

    /// Extra guidance for the analyzer.
    #[arg(long)]
    pub instructions: Option<String>,
}

pub async fn run_reanalyze(args: &ReanalyzeArgs, ctx: &CliContext) -> Result<u8> {
    let mut controller = ctx.controller(args.session_id).await?;
    let request = ReanalyzeRequest {
        question_ids: args.questions.iter().map(QuestionId::new).collect(),
        instructions: args.instructions.clone(),
    };
    let report = controller.reanalyze(&request).await?;
    println!(
        "OK: {} requested, {} replaced, {} added",
        report.requested, report.replaced, report.inserted
    );
    if report.ignored > 0 {
        eprintln!("warning: {} unrequested result(s) ignored", report.ignored);
    }
    println!("  Compliance score: {}%", report.compliance_score);
    Ok(0)
}
