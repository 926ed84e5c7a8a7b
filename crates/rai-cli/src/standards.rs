//! # Standards Subcommand
//!
//! Lists the catalog the server currently holds, shows one standard's
//! questions, searches them, or asks the server to reload it from disk. Reloading never changes the
//! totals of sessions that already confirmed a selection.

use anyhow::Result;
use clap::Args;

use rai_catalog::{CatalogSection, StandardsSummary};

use crate::CliContext;

/// Arguments for the `rai standards` subcommand.
#[derive(Args, Debug)]
pub struct StandardsArgs {
    /// Show one standard's questions (`IAS_16` or `IAS 16`).
    #[arg(long, value_name = "KEY", conflicts_with_all = ["search", "reload"])]
    pub show: Option<String>,

    /// Only show questions whose text or reference contains this.
    #[arg(long, conflicts_with = "reload")]
    pub search: Option<String>,

    /// Reload the catalog on the server before listing.
    #[arg(long)]
    pub reload: bool,
}

/// Execute the standards subcommand.
pub async fn run_standards(args: &StandardsArgs, ctx: &CliContext) -> Result<u8> {
    if let Some(key) = &args.show {
        let section = ctx.backend().get_standard(key).await?;
        print_section(&section);
        return Ok(0);
    }

    if let Some(query) = &args.search {
        let hits = ctx.backend().search_standards(query).await?;
        if hits.is_empty() {
            println!("No questions match {query:?}");
            return Ok(1);
        }
        for hit in &hits {
            println!("{:<10} {:<12} {}", hit.standard, hit.item.id, hit.item.question);
        }
        println!("{} question(s)", hits.len());
        return Ok(0);
    }

    let summary = if args.reload {
        let summary = ctx.backend().reload_standards().await?;
        println!("OK: catalog reloaded");
        summary
    } else {
        ctx.backend().list_standards().await?
    };
    print_summary(&summary);
    Ok(0)
}

fn print_section(section: &CatalogSection) {
    println!("{}  {}", section.section, section.title);
    if !section.description.is_empty() {
        println!("{}", section.description);
    }
    for item in &section.items {
        println!("  {:<12} {:<14} {}", item.id, item.reference, item.question);
    }
    println!("{} question(s)", section.items.len());
}

fn print_summary(summary: &StandardsSummary) {
    for s in &summary.standards {
        println!("{:<10} {:>4} questions  {}", s.key, s.item_count, s.title);
    }
    println!(
        "{} standards, {} questions",
        summary.total_standards, summary.total_questions
    );
}
