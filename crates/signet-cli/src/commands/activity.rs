//! `signet activity` -- the audit trail.

use clap::{Args, Subcommand};

use signet_audit::ActivityRecord;

use crate::{CliContext, ExitCode};

#[derive(Debug, Args)]
pub struct ActivityArgs {
    #[command(subcommand)]
    command: ActivityCommand,
}

#[derive(Debug, Subcommand)]
enum ActivityCommand {
    /// List trail records, oldest first.
    List {
        /// Only the most recent N records.
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Verify the trail's hash chain end to end.
    Verify,
}

pub fn execute(args: &ActivityArgs, ctx: &CliContext) -> ExitCode {
    match &args.command {
        ActivityCommand::List { limit } => {
            let result = ctx.engine.activity(*limit);
            ctx.finish(result, |records: &Vec<ActivityRecord>| {
                for r in records {
                    println!(
                        "#{} {} {} {} '{}' by {} -- {}",
                        r.sequence, r.timestamp, r.action, r.entity_type, r.entity_id,
                        r.actor_name, r.description
                    );
                }
                if records.is_empty() {
                    println!("no activity");
                }
            })
        }
        ActivityCommand::Verify => {
            let result = ctx.engine.verify_activity();
            ctx.finish(result, |count| {
                println!("activity chain intact ({count} records)");
            })
        }
    }
}
