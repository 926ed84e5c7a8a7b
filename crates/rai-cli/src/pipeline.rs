//! # Pipeline Subcommands
//!
//! Stage navigation up to the context preview: `upload`, `advance`,
//! `select`, plus the read-only `preview` and `validate`. Stage rules are
//! enforced locally before anything is sent.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use rai_client::{UploadDocument, UploadRequest};
use rai_compliance::FinancialValidationResult;
use rai_core::{ChunkQuery, Framework, SessionId, Stage};

use crate::CliContext;

// ─── Upload ──────────────────────────────────────────────────────────

/// Arguments for `rai upload`.
#[derive(Args, Debug)]
pub struct UploadArgs {
    pub session_id: SessionId,

    /// Financial statements document (pdf, docx, xlsx, csv, txt).
    #[arg(long)]
    pub statements: PathBuf,

    /// Notes to the financial statements.
    #[arg(long)]
    pub notes: Option<PathBuf>,

    /// Stay at the upload stage instead of moving on to metadata review.
    #[arg(long)]
    pub stay: bool,
}

pub async fn run_upload(args: &UploadArgs, ctx: &CliContext) -> Result<u8> {
    let request = UploadRequest {
        financial_statements: Some(UploadDocument::from_path(&args.statements)?),
        notes: args
            .notes
            .as_deref()
            .map(UploadDocument::from_path)
            .transpose()?,
    };
    let mut controller = ctx.controller(args.session_id).await?;
    let receipt = controller.upload(&request).await?;
    println!("OK: {}", receipt.message);
    println!("  Financial statements: {}", receipt.financial_statements_uploaded);
    println!("  Notes: {}", receipt.notes_uploaded);

    if !args.stay && controller.stage() == Stage::Upload {
        controller.advance(Stage::MetadataReview).await?;
        println!("  Stage: {}", controller.stage());
    }
    Ok(0)
}

// ─── Advance ─────────────────────────────────────────────────────────

/// Arguments for `rai advance`.
#[derive(Args, Debug)]
pub struct AdvanceArgs {
    pub session_id: SessionId,

    /// Target stage number (1-7).
    #[arg(value_parser = clap::value_parser!(u8).range(1..=7))]
    pub stage: u8,
}

pub async fn run_advance(args: &AdvanceArgs, ctx: &CliContext) -> Result<u8> {
    let target = Stage::from_index(args.stage)?;
    let mut controller = ctx.controller(args.session_id).await?;
    let from = controller.stage();
    controller.advance(target).await?;
    println!("OK: session {} moved {from} → {}", args.session_id, controller.stage());
    Ok(0)
}

// ─── Select ──────────────────────────────────────────────────────────

/// Arguments for `rai select`.
#[derive(Args, Debug)]
pub struct SelectArgs {
    pub session_id: SessionId,

    /// Standard keys to select (e.g. IAS_1 IAS_2).
    #[arg(required_unless_present = "all")]
    pub standards: Vec<String>,

    /// Select every standard in the catalog.
    #[arg(long, conflicts_with = "standards")]
    pub all: bool,

    /// Set the reporting framework and move on to standards selection
    /// first. The session must be at framework selection.
    #[arg(long)]
    pub framework: Option<String>,

    /// Move on to the context preview after confirming.
    #[arg(long)]
    pub advance: bool,
}

pub async fn run_select(args: &SelectArgs, ctx: &CliContext) -> Result<u8> {
    let mut controller = ctx.controller(args.session_id).await?;
    if let Some(framework) = &args.framework {
        controller.select_framework(Framework::parse(framework)).await?;
        controller.advance(Stage::StandardsSelection).await?;
    }

    let selection = controller.selection_mut();
    selection.clear_all();
    if args.all {
        let listing = ctx.backend().list_standards().await?;
        for standard in &listing.standards {
            selection.toggle(&standard.key);
        }
    } else {
        for key in &args.standards {
            if !selection.is_selected(key) {
                selection.toggle(key);
            }
        }
    }

    let snapshot = controller.confirm_standards_listed().await?;
    println!(
        "OK: {} standards, {} questions: {}",
        snapshot.total_standards,
        snapshot.total_questions,
        snapshot.selected_standards.join(", ")
    );
    if args.advance {
        controller.advance(Stage::ContextPreview).await?;
        println!("  Stage: {}", controller.stage());
    }
    Ok(0)
}

// ─── Preview ─────────────────────────────────────────────────────────

/// Arguments for `rai preview`.
#[derive(Args, Debug)]
pub struct PreviewArgs {
    pub session_id: SessionId,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = 50)]
    pub page_size: u32,

    /// Only chunks with this taxonomy label.
    #[arg(long)]
    pub taxonomy: Option<String>,
}

pub async fn run_preview(args: &PreviewArgs, ctx: &CliContext) -> Result<u8> {
    let controller = ctx.controller(args.session_id).await?;
    let page = controller
        .preview(&ChunkQuery {
            page: args.page,
            page_size: args.page_size,
            taxonomy: args.taxonomy.clone(),
        })
        .await?;

    println!("Chunks: {} (page {})", page.total_chunks, page.page);
    for (label, count) in page.taxonomy_summary.iter() {
        println!("  {label:<18} {count}");
    }
    for chunk in &page.chunks {
        let excerpt: String = chunk.content.chars().take(72).collect();
        println!(
            "#{:<4} {:<18} {:>6} chars{}  {}",
            chunk.chunk_index,
            chunk.taxonomy,
            chunk.char_count,
            if chunk.has_table { " [table]" } else { "" },
            excerpt.replace('\n', " ")
        );
    }
    if page.has_more() {
        println!("(more: --page {})", page.page + 1);
    }
    Ok(0)
}

// ─── Validate ────────────────────────────────────────────────────────

/// Arguments for `rai validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    pub session_id: SessionId,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Exit code 0 when the coverage check passes, 1 otherwise.
pub async fn run_validate(args: &ValidateArgs, ctx: &CliContext) -> Result<u8> {
    let controller = ctx.controller(args.session_id).await?;
    let report = controller.validate_coverage().await?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing coverage report")?
        );
    } else {
        print_report(&report);
    }
    Ok(if report.is_valid { 0 } else { 1 })
}

fn print_report(report: &FinancialValidationResult) {
    println!(
        "Coverage: {} (confidence {:.2})",
        if report.is_valid { "VALID" } else { "INCOMPLETE" },
        report.confidence
    );
    for e in &report.evidence {
        println!(
            "  {:<28} {:<8} {:>3} chunks {:>7} chars  weight {:.2}",
            e.statement.display_name(),
            if e.detected { "found" } else { "missing" },
            e.chunks,
            e.chars,
            e.weight
        );
    }
    for warning in &report.warnings {
        eprintln!("  warning: {warning}");
    }
}
