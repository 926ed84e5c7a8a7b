//! # Session Subcommand
//!
//! - `create`: open a new session at the upload stage.
//! - `list`: sessions on the server, newest first, optionally filtered.
//! - `show`: print the server record, local stage and allowed moves.
//! - `delete`: remove a session and everything it holds.

use anyhow::Result;
use clap::{Args, Subcommand};

use rai_core::{Framework, NewSession, Session, SessionId, SessionQuery, SessionStatus};

use crate::CliContext;

/// Arguments for the `rai session` subcommand.
#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

/// Session subcommands.
#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Create a new session.
    Create {
        /// Client (reporting entity) name.
        #[arg(long)]
        client: String,
        /// Reporting framework (IFRS, US GAAP, Ind AS).
        #[arg(long, default_value = "IFRS")]
        framework: String,
    },

    /// List sessions, newest first.
    List {
        /// Only sessions with this status (e.g. completed, context_preview).
        #[arg(long, value_parser = parse_status)]
        status: Option<SessionStatus>,
        /// Only sessions assessed against this framework.
        #[arg(long)]
        framework: Option<String>,
        /// Print the raw JSON records.
        #[arg(long)]
        json: bool,
    },

    /// Show a session.
    Show {
        session_id: SessionId,
        /// Print the raw JSON record.
        #[arg(long)]
        json: bool,
    },

    /// Delete a session.
    Delete { session_id: SessionId },
}

/// Execute the session subcommand.
pub async fn run_session(args: &SessionArgs, ctx: &CliContext) -> Result<u8> {
    match &args.command {
        SessionCommand::Create { client, framework } => {
            let session = ctx
                .backend()
                .create_session(&NewSession {
                    client_name: client.clone(),
                    framework: Framework::parse(framework),
                })
                .await?;
            println!("OK: created session {} ({})", session.session_code, session.id);
            print_session(&session);
            Ok(0)
        }
        SessionCommand::List {
            status,
            framework,
            json,
        } => {
            let query = SessionQuery {
                status: *status,
                framework: framework.as_deref().map(Framework::parse),
            };
            let sessions = ctx.backend().list_sessions(&query).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
                return Ok(0);
            }
            for s in &sessions {
                println!(
                    "{}  {:<24} {:<8} stage {} ({})  {}",
                    s.id,
                    s.session_code,
                    s.framework,
                    s.current_stage.index(),
                    s.status,
                    s.client_name
                );
            }
            println!("{} session(s)", sessions.len());
            Ok(0)
        }
        SessionCommand::Show { session_id, json } => {
            let controller = ctx.controller(*session_id).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(controller.session())?);
                return Ok(0);
            }
            print_session(controller.session());
            let targets: Vec<String> = controller
                .machine()
                .allowed_targets()
                .into_iter()
                .map(|s| s.to_string())
                .collect();
            println!("  Results: {}", controller.results().len());
            println!("  Overrides: {}", controller.ledger().len());
            if targets.is_empty() {
                println!("  Next: (none)");
            } else {
                println!("  Next: {}", targets.join(", "));
            }
            Ok(0)
        }
        SessionCommand::Delete { session_id } => {
            ctx.backend().delete_session(*session_id).await?;
            println!("OK: deleted session {session_id}");
            Ok(0)
        }
    }
}

fn parse_status(raw: &str) -> Result<SessionStatus, String> {
    SessionStatus::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = SessionStatus::ALL.iter().map(|s| s.as_str()).collect();
        format!("unknown status {raw:?}; expected one of {}", known.join(", "))
    })
}

pub(crate) fn print_session(session: &Session) {
    println!("Session: {}", session.session_code);
    println!("  Id: {}", session.id);
    println!("  Client: {}", session.client_name);
    println!("  Framework: {}", session.framework);
    println!("  Stage: {}", session.current_stage);
    println!("  Status: {}", session.status);
    if let Some(fs) = &session.financial_statements_filename {
        println!("  Financial statements: {fs}");
    }
    if let Some(notes) = &session.notes_filename {
        println!("  Notes: {notes}");
    }
    if !session.selected_standards.is_empty() {
        println!(
            "  Standards: {} ({} standards, {} questions)",
            session.selected_standards.join(", "),
            session.total_standards,
            session.total_questions
        );
    }
    if let Some(score) = session.compliance_score {
        println!("  Compliance score: {score}%");
    }
}
