//! `signet form` -- operational evidence forms.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use signet_core::{ControlId, FormRole, FormType};
use signet_engine::EngineError;
use signet_workflow::EvidenceForm;

use crate::{CliContext, ExitCode};

use super::document::parse_control;
use super::ActorArgs;

#[derive(Debug, Args)]
pub struct FormArgs {
    #[command(subcommand)]
    command: FormCommand,
}

#[derive(Debug, Subcommand)]
enum FormCommand {
    /// Open a draft evidence form for a control.
    Create {
        /// Form type (snake_case, e.g. `incident_report`).
        form_type: String,
        /// Control id the form evidences.
        control: String,
        /// Inline JSON payload for the form body.
        #[arg(long, value_name = "JSON", default_value = "{}")]
        data: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Sign one of the form's three roles.
    Sign {
        /// Form id (e.g. `IR-00001`).
        id: String,
        /// Role to sign.
        #[arg(value_enum)]
        role: FormRoleArg,
        /// Optional signing comment.
        #[arg(long)]
        comment: Option<String>,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Terminally reject a form.
    Reject {
        /// Form id.
        id: String,
        /// Role rejecting (must be the awaited signer).
        #[arg(value_enum)]
        role: FormRoleArg,
        /// Why the form is rejected.
        #[arg(long)]
        reason: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Attach a supporting file to a form.
    Attach {
        /// Form id.
        id: String,
        /// File to attach.
        file: PathBuf,
        /// Attachment category label.
        #[arg(long, default_value = "supporting")]
        category: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Show one form.
    Show {
        /// Form id.
        id: String,
    },
    /// List forms, optionally for one control.
    List {
        /// Restrict to one control id.
        #[arg(long)]
        control: Option<String>,
    },
}

/// CLI spelling of [`FormRole`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormRoleArg {
    Requester,
    Reviewer,
    Approver,
}

impl From<FormRoleArg> for FormRole {
    fn from(role: FormRoleArg) -> Self {
        match role {
            FormRoleArg::Requester => Self::Requester,
            FormRoleArg::Reviewer => Self::Reviewer,
            FormRoleArg::Approver => Self::Approver,
        }
    }
}

pub fn execute(args: &FormArgs, ctx: &mut CliContext) -> ExitCode {
    match &args.command {
        FormCommand::Create {
            form_type,
            control,
            data,
            actor,
        } => {
            let result = create(ctx, form_type, control, data, actor);
            ctx.finish(result, |form| {
                println!("created {} ({})", form.id, form.status);
            })
        }
        FormCommand::Sign {
            id,
            role,
            comment,
            actor,
        } => {
            let result =
                ctx.engine
                    .sign_form(id, (*role).into(), &actor.to_actor(), comment.clone());
            ctx.finish(result, render_form)
        }
        FormCommand::Reject {
            id,
            role,
            reason,
            actor,
        } => {
            let result = ctx
                .engine
                .reject_form(id, (*role).into(), &actor.to_actor(), reason);
            ctx.finish(result, render_form)
        }
        FormCommand::Attach {
            id,
            file,
            category,
            actor,
        } => {
            let result = attach(ctx, id, file, category, actor);
            ctx.finish(result, render_form)
        }
        FormCommand::Show { id } => {
            let result = ctx.engine.form(id);
            ctx.finish(result, render_form)
        }
        FormCommand::List { control } => {
            let result = match control {
                Some(raw) => parse_control(raw).and_then(|c| ctx.engine.forms(Some(&c))),
                None => ctx.engine.forms(None),
            };
            ctx.finish(result, |forms: &Vec<EvidenceForm>| {
                for form in forms {
                    println!(
                        "{}  {}  control={}  status={}",
                        form.id, form.form_type, form.control_id, form.status
                    );
                }
                if forms.is_empty() {
                    println!("no forms");
                }
            })
        }
    }
}

fn create(
    ctx: &mut CliContext,
    form_type: &str,
    control: &str,
    data: &str,
    actor: &ActorArgs,
) -> Result<EvidenceForm, EngineError> {
    let form_type: FormType = form_type.parse().map_err(EngineError::from)?;
    let control: ControlId = parse_control(control)?;
    let payload: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| EngineError::from(signet_core::CoreError::Serialization(e)))?;
    ctx.engine
        .create_form(form_type, &control, payload, &actor.to_actor())
}

fn attach(
    ctx: &mut CliContext,
    id: &str,
    file: &std::path::Path,
    category: &str,
    actor: &ActorArgs,
) -> Result<EvidenceForm, EngineError> {
    let bytes = std::fs::read(file).map_err(|e| EngineError::from(signet_core::CoreError::Io(e)))?;
    let file_name = file
        .file_name()
        .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().to_string());
    ctx.engine
        .attach_form_file(id, &file_name, category, &bytes, &actor.to_actor())
}

fn render_form(form: &EvidenceForm) {
    println!(
        "{}  {}  control={}",
        form.id,
        form.form_type.title(),
        form.control_id
    );
    println!("status: {}", form.status);
    for role in FormRole::all() {
        match form.signature(*role) {
            Some(sig) => println!("  {role}: {} at {}", sig.user_name, sig.signed_at),
            None => println!("  {role}: -"),
        }
    }
    if let Some(rejection) = &form.rejection {
        println!(
            "rejected by {} ({}): {}",
            rejection.rejected_by, rejection.role, rejection.reason
        );
    }
    if !form.attachments.is_empty() {
        println!("attachments:");
        for att in &form.attachments {
            println!("  {} ({})", att.file_name, att.category);
        }
    }
}
