//! `signet document` -- control documents and their approval signatures.

use clap::{Args, Subcommand, ValueEnum};

use signet_core::{ControlId, DocumentRole};
use signet_engine::EngineError;
use signet_workflow::Document;

use crate::{CliContext, ExitCode};

use super::ActorArgs;

#[derive(Debug, Args)]
pub struct DocumentArgs {
    #[command(subcommand)]
    command: DocumentCommand,
}

#[derive(Debug, Subcommand)]
enum DocumentCommand {
    /// Generate the next document version for a control.
    Create {
        /// Control id (e.g. `4.2.3`).
        control: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Sign one of the document's three roles.
    Sign {
        /// Document id (e.g. `4.2.3-v1`).
        id: String,
        /// Role to sign.
        #[arg(value_enum)]
        role: RoleArg,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Revoke a signature (and every signature after it).
    Revoke {
        /// Document id.
        id: String,
        /// Role to revoke.
        #[arg(value_enum)]
        role: RoleArg,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Show one document.
    Show {
        /// Document id.
        id: String,
    },
    /// List all versions of a control's document.
    List {
        /// Control id.
        control: String,
    },
    /// Delete a document.
    Delete {
        /// Document id.
        id: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
}

/// CLI spelling of [`DocumentRole`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Prepared,
    Reviewed,
    Approved,
}

impl From<RoleArg> for DocumentRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Prepared => Self::Prepared,
            RoleArg::Reviewed => Self::Reviewed,
            RoleArg::Approved => Self::Approved,
        }
    }
}

pub fn execute(args: &DocumentArgs, ctx: &mut CliContext) -> ExitCode {
    match &args.command {
        DocumentCommand::Create { control, actor } => {
            let result = parse_control(control)
                .and_then(|c| ctx.engine.create_document(&c, &actor.to_actor()));
            ctx.finish(result, |doc| {
                println!("created {} ({})", doc.id, doc.status);
            })
        }
        DocumentCommand::Sign { id, role, actor } => {
            let result = ctx
                .engine
                .sign_document(id, (*role).into(), &actor.to_actor());
            ctx.finish(result, render_document)
        }
        DocumentCommand::Revoke { id, role, actor } => {
            let result = ctx
                .engine
                .revoke_document(id, (*role).into(), &actor.to_actor());
            ctx.finish(result, render_document)
        }
        DocumentCommand::Show { id } => {
            let result = ctx.engine.document(id);
            ctx.finish(result, render_document)
        }
        DocumentCommand::List { control } => {
            let result = parse_control(control).and_then(|c| ctx.engine.documents(&c));
            ctx.finish(result, |docs: &Vec<Document>| {
                for doc in docs {
                    println!(
                        "{}  status={}  stamped={}",
                        doc.id, doc.status, doc.stamped
                    );
                }
                if docs.is_empty() {
                    println!("no documents");
                }
            })
        }
        DocumentCommand::Delete { id, actor } => {
            let result = ctx.engine.delete_document(id, &actor.to_actor());
            ctx.finish(result, |_: &()| {
                println!("deleted {id}");
            })
        }
    }
}

pub(super) fn parse_control(raw: &str) -> Result<ControlId, EngineError> {
    ControlId::parse(raw).map_err(EngineError::from)
}

fn render_document(doc: &Document) {
    println!("{}  control={}  version={}", doc.id, doc.control_id, doc.version);
    println!("status: {}  stamped: {}", doc.status, doc.stamped);
    for role in DocumentRole::all() {
        match doc.signature(*role) {
            Some(sig) => println!("  {role}: {} ({}) at {}", sig.user_name, sig.position, sig.signed_at),
            None => println!("  {role}: -"),
        }
    }
}
