//! `signet checklist` -- viewing and completing evidence checklists.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use signet_engine::EngineError;
use signet_evidence::{ChecklistItem, EvidenceKind};

use crate::{CliContext, ExitCode};

use super::document::parse_control;
use super::ActorArgs;

#[derive(Debug, Args)]
pub struct ChecklistArgs {
    #[command(subcommand)]
    command: ChecklistCommand,
}

#[derive(Debug, Subcommand)]
enum ChecklistCommand {
    /// Show a control's checklist (materializing it on first view).
    Show {
        /// Control id.
        control: String,
    },
    /// Upload file evidence for one requirement.
    AttachFile {
        /// Control id.
        control: String,
        /// Requirement slot id.
        requirement: u32,
        /// File to upload.
        file: PathBuf,
        /// Optional uploader notes.
        #[arg(long)]
        notes: Option<String>,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Link an evidence form to one requirement.
    LinkForm {
        /// Control id.
        control: String,
        /// Requirement slot id.
        requirement: u32,
        /// Form id to link (must evidence the same control).
        form: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Remove all evidence from one requirement.
    Remove {
        /// Control id.
        control: String,
        /// Requirement slot id.
        requirement: u32,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Show a control's completion ratios.
    Progress {
        /// Control id.
        control: String,
    },
}

pub fn execute(args: &ChecklistArgs, ctx: &mut CliContext) -> ExitCode {
    match &args.command {
        ChecklistCommand::Show { control } => {
            let result = parse_control(control).and_then(|c| ctx.engine.checklist(&c));
            ctx.finish(result, |items: &Vec<ChecklistItem>| {
                for item in items {
                    println!("{}", render_item_line(item));
                }
                if items.is_empty() {
                    println!("no requirements (template-only or unlisted control)");
                }
            })
        }
        ChecklistCommand::AttachFile {
            control,
            requirement,
            file,
            notes,
            actor,
        } => {
            let result = parse_control(control).and_then(|c| {
                let bytes = std::fs::read(file)
                    .map_err(|e| EngineError::from(signet_core::CoreError::Io(e)))?;
                let file_name = file.file_name().map_or_else(
                    || "evidence".to_string(),
                    |n| n.to_string_lossy().to_string(),
                );
                ctx.engine.attach_file(
                    &c,
                    *requirement,
                    &file_name,
                    &bytes,
                    notes.clone(),
                    &actor.to_actor(),
                )
            });
            ctx.finish(result, |item| println!("{}", render_item_line(item)))
        }
        ChecklistCommand::LinkForm {
            control,
            requirement,
            form,
            actor,
        } => {
            let result = parse_control(control)
                .and_then(|c| ctx.engine.link_form(&c, *requirement, form, &actor.to_actor()));
            ctx.finish(result, |item| println!("{}", render_item_line(item)))
        }
        ChecklistCommand::Remove {
            control,
            requirement,
            actor,
        } => {
            let result = parse_control(control)
                .and_then(|c| ctx.engine.remove_evidence(&c, *requirement, &actor.to_actor()));
            ctx.finish(result, |item| println!("{}", render_item_line(item)))
        }
        ChecklistCommand::Progress { control } => {
            let result = parse_control(control).and_then(|c| ctx.engine.progress(&c));
            ctx.finish(result, |p| {
                println!("items: {}/{} complete ({}%)", p.completed, p.total, p.percentage);
                println!(
                    "required: {}/{} complete ({}%)",
                    p.required_completed, p.required, p.required_percentage
                );
            })
        }
    }
}

fn render_item_line(item: &ChecklistItem) -> String {
    let marker = if item.is_complete { "x" } else { " " };
    let required = if item.is_required { " (required)" } else { "" };
    let evidence = match item.evidence_type {
        Some(EvidenceKind::File) => item
            .file
            .as_ref()
            .map_or_else(String::new, |f| format!("  <- file {}", f.file_name)),
        Some(EvidenceKind::Form) => item
            .form
            .as_ref()
            .map_or_else(String::new, |f| format!("  <- form {}", f.form_id)),
        None => String::new(),
    };
    format!(
        "[{marker}] {}#{} {}{required}{evidence}",
        item.control_id, item.requirement_id, item.requirement_name
    )
}
