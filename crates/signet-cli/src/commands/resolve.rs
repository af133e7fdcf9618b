//! `signet resolve` -- which evidence modality applies to a control.

use clap::Args;

use signet_core::EvidenceModality;

use crate::{CliContext, ExitCode};

use super::document::parse_control;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Control id (e.g. `4.9.3`).
    control: String,
}

pub fn execute(args: &ResolveArgs, ctx: &CliContext) -> ExitCode {
    let result = parse_control(&args.control).and_then(|c| ctx.engine.resolve(&c));
    ctx.finish(result, |res| {
        if !res.needs_evidence {
            println!("{}: no evidence needed", res.control_id);
            if let Some(reason) = &res.template_only_reason {
                println!("  reason: {reason}");
            }
            return;
        }
        println!("{}: modality {}", res.control_id, res.modality);
        if matches!(res.modality, EvidenceModality::Operational | EvidenceModality::Both) {
            println!("  applicable forms:");
            for ty in &res.applicable_form_types {
                println!("    {} ({})", ty, ty.title());
            }
        }
        if let Some(desc) = &res.static_description {
            println!("  static upload: {desc}");
        }
    })
}
