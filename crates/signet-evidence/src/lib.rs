//! Signet Evidence -- what each control must prove, and how.
//!
//! Three pieces:
//!
//! - the [`catalog`]: the externally maintained, read-only description of
//!   requirement slots, form-type applicability, static-evidence categories,
//!   and template-only controls;
//! - the resolver ([`EvidenceCatalog::resolve`](catalog::EvidenceCatalog::resolve)):
//!   a pure function from a control id to its evidence modality;
//! - the [`checklist`]: per-requirement completion tracking with mutually
//!   exclusive file/form evidence and progress aggregation.

pub mod catalog;
pub mod checklist;

pub use catalog::{EvidenceCatalog, RequirementDef, Resolution};
pub use checklist::{
    progress, ChecklistItem, ChecklistProgress, EvidenceKind, FileEvidence, FormLink,
};

// ---------------------------------------------------------------------------
// EvidenceError
// ---------------------------------------------------------------------------

/// Error type for catalog loading and modality resolution.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    /// An I/O error occurred while reading the catalog.
    #[error("I/O error: {0}")]
    Io(String),

    /// The catalog file is malformed or semantically invalid.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// A control resolves to no evidence modality and is not template-only.
    /// This indicates a missing catalog entry, never "no evidence needed".
    #[error(
        "control '{control}' is not template-only but maps to no evidence \
         modality; the catalog is missing an entry for category '{prefix}'"
    )]
    ConfigurationGap { control: String, prefix: String },
}
