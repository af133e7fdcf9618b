//! Signet Core -- shared types for the Signet compliance-documentation manager.
//!
//! This crate defines the vocabulary used throughout Signet: control
//! identifiers, signer identity, document and evidence-form statuses,
//! signature roles, evidence modalities, and operational form types, plus
//! configuration loading and tracing initialization.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub mod control;
pub mod forms;

pub use control::ControlId;
pub use forms::FormType;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Top-level error type for the signet-core crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A control identifier that is not of the `category.subcategory.control`
    /// dotted-numeric form.
    #[error("invalid control id: {0}")]
    InvalidControlId(String),

    /// Tracing/logging initialization failed.
    #[error("tracing initialization error: {0}")]
    TracingInit(String),
}

/// Convenience alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

// ---------------------------------------------------------------------------
// Tracing / Logging
// ---------------------------------------------------------------------------

/// Initialize structured tracing with the given verbosity level.
///
/// # Behaviour
///
/// | `verbose` | `quiet` | `json_output` | Effect                                  |
/// |-----------|---------|---------------|-----------------------------------------|
/// | `true`    | _       | _             | TRACE level (most verbose)              |
/// | _         | `true`  | _             | ERROR level only                        |
/// | `false`   | `false` | _             | INFO level (default)                    |
/// | _         | _       | `true`        | JSON-formatted log lines (CI/CD)        |
/// | _         | _       | `false`       | Human-readable, compact log lines       |
///
/// The `RUST_LOG` environment variable, when set, takes precedence over the
/// programmatic level selection so that operators can fine-tune per-module
/// verbosity without recompiling.
///
/// # Errors
///
/// Returns [`CoreError::TracingInit`] if the global subscriber has already
/// been set (i.e. this function was called more than once in the same
/// process).
pub fn init_tracing(verbose: bool, quiet: bool, json_output: bool) -> Result<(), CoreError> {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose {
        "trace"
    } else if quiet {
        "error"
    } else {
        "info"
    };

    // Allow RUST_LOG to override the programmatic default.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_output {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .try_init()
            .map_err(|e| CoreError::TracingInit(e.to_string()))
    } else {
        fmt()
            .compact()
            .with_env_filter(env_filter)
            .with_target(true)
            .try_init()
            .map_err(|e| CoreError::TracingInit(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Identity of the person performing an operation.
///
/// Supplied by the embedding application (session layer, CLI flags, ...);
/// Signet trusts it as given and performs no authentication itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable user identifier.
    pub user_id: String,
    /// Display name.
    pub user_name: String,
    /// Job title or organizational position.
    pub position: String,
    /// Reference to a stored signature image, if the user has one on file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_image: Option<String>,
}

impl Actor {
    /// Creates an actor without a signature image.
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        position: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            position: position.into(),
            signature_image: None,
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentStatus
// ---------------------------------------------------------------------------

/// Approval status of a control document, derived from its signature slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// No signatures present.
    Pending,
    /// One or two signatures present.
    InProgress,
    /// All three signatures present; the document is stamped.
    Completed,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// FormStatus
// ---------------------------------------------------------------------------

/// Approval status of an evidence form.
///
/// Advanced monotonically by signing (`Draft` through `Approved`);
/// `Rejected` is terminal and reachable only via an explicit reject action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    /// Created, not yet signed by the requester.
    Draft,
    /// Requester has signed; awaiting the reviewer.
    PendingReview,
    /// Reviewer has signed; awaiting the approver.
    PendingApproval,
    /// All three roles have signed.
    Approved,
    /// Rejected by the reviewer or approver. Terminal.
    Rejected,
}

impl FormStatus {
    /// Returns `true` for the terminal states (`Approved`, `Rejected`).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Draft => "draft",
            Self::PendingReview => "pending_review",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// DocumentRole
// ---------------------------------------------------------------------------

/// The three fixed, ordered signature roles on a control document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRole {
    /// Role 1 -- the author attests the document is ready for review.
    Prepared,
    /// Role 2 -- the reviewer attests the content is correct.
    Reviewed,
    /// Role 3 -- the approver releases the document.
    Approved,
}

impl DocumentRole {
    /// Zero-based position of this role in the fixed signing order.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        match self {
            Self::Prepared => 0,
            Self::Reviewed => 1,
            Self::Approved => 2,
        }
    }

    /// Returns all roles in signing order.
    #[must_use]
    pub const fn all() -> &'static [DocumentRole] {
        &[Self::Prepared, Self::Reviewed, Self::Approved]
    }
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Prepared => "prepared",
            Self::Reviewed => "reviewed",
            Self::Approved => "approved",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// FormRole
// ---------------------------------------------------------------------------

/// The three fixed, ordered signature roles on an evidence form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormRole {
    /// Role 1 -- the person raising the record.
    Requester,
    /// Role 2 -- the reviewer.
    Reviewer,
    /// Role 3 -- the approver.
    Approver,
}

impl FormRole {
    /// Zero-based position of this role in the fixed signing order.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        match self {
            Self::Requester => 0,
            Self::Reviewer => 1,
            Self::Approver => 2,
        }
    }

    /// Returns all roles in signing order.
    #[must_use]
    pub const fn all() -> &'static [FormRole] {
        &[Self::Requester, Self::Reviewer, Self::Approver]
    }
}

impl fmt::Display for FormRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Requester => "requester",
            Self::Reviewer => "reviewer",
            Self::Approver => "approver",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// EvidenceModality
// ---------------------------------------------------------------------------

/// The evidence-collection method applicable to a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceModality {
    /// No evidence needed (template-only control).
    None,
    /// One or more structured operational evidence forms apply.
    Operational,
    /// A static file/photo upload applies.
    Static,
    /// Both operational forms and a static upload apply.
    Both,
}

impl fmt::Display for EvidenceModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Operational => "operational",
            Self::Static => "static",
            Self::Both => "both",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// The kind of entity an activity-trail record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A versioned control document.
    Document,
    /// A structured operational evidence form.
    EvidenceForm,
    /// One evidence-checklist slot of a control.
    ChecklistItem,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Document => "document",
            Self::EvidenceForm => "evidence_form",
            Self::ChecklistItem => "checklist_item",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_status_display() {
        assert_eq!(DocumentStatus::Pending.to_string(), "pending");
        assert_eq!(DocumentStatus::InProgress.to_string(), "in_progress");
        assert_eq!(DocumentStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn document_status_serde_roundtrip() {
        let json = serde_json::to_string(&DocumentStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let back: DocumentStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DocumentStatus::InProgress);
    }

    #[test]
    fn form_status_display() {
        assert_eq!(FormStatus::Draft.to_string(), "draft");
        assert_eq!(FormStatus::PendingReview.to_string(), "pending_review");
        assert_eq!(FormStatus::PendingApproval.to_string(), "pending_approval");
        assert_eq!(FormStatus::Approved.to_string(), "approved");
        assert_eq!(FormStatus::Rejected.to_string(), "rejected");
    }

    #[test]
    fn form_status_terminal() {
        assert!(FormStatus::Approved.is_terminal());
        assert!(FormStatus::Rejected.is_terminal());
        assert!(!FormStatus::Draft.is_terminal());
        assert!(!FormStatus::PendingReview.is_terminal());
        assert!(!FormStatus::PendingApproval.is_terminal());
    }

    #[test]
    fn form_status_ordering_follows_flow() {
        // Derived Ord follows variant declaration order, which matches the
        // forward signing flow.
        assert!(FormStatus::Draft < FormStatus::PendingReview);
        assert!(FormStatus::PendingReview < FormStatus::PendingApproval);
        assert!(FormStatus::PendingApproval < FormStatus::Approved);
    }

    #[test]
    fn document_role_ordinals() {
        assert_eq!(DocumentRole::Prepared.ordinal(), 0);
        assert_eq!(DocumentRole::Reviewed.ordinal(), 1);
        assert_eq!(DocumentRole::Approved.ordinal(), 2);
    }

    #[test]
    fn form_role_ordinals() {
        assert_eq!(FormRole::Requester.ordinal(), 0);
        assert_eq!(FormRole::Reviewer.ordinal(), 1);
        assert_eq!(FormRole::Approver.ordinal(), 2);
    }

    #[test]
    fn roles_in_signing_order() {
        for (i, role) in DocumentRole::all().iter().enumerate() {
            assert_eq!(role.ordinal(), i);
        }
        for (i, role) in FormRole::all().iter().enumerate() {
            assert_eq!(role.ordinal(), i);
        }
    }

    #[test]
    fn role_serde_snake_case() {
        let json = serde_json::to_string(&DocumentRole::Prepared).unwrap();
        assert_eq!(json, "\"prepared\"");
        let json = serde_json::to_string(&FormRole::Approver).unwrap();
        assert_eq!(json, "\"approver\"");
    }

    #[test]
    fn modality_display() {
        assert_eq!(EvidenceModality::None.to_string(), "none");
        assert_eq!(EvidenceModality::Operational.to_string(), "operational");
        assert_eq!(EvidenceModality::Static.to_string(), "static");
        assert_eq!(EvidenceModality::Both.to_string(), "both");
    }

    #[test]
    fn entity_kind_display() {
        assert_eq!(EntityKind::Document.to_string(), "document");
        assert_eq!(EntityKind::EvidenceForm.to_string(), "evidence_form");
        assert_eq!(EntityKind::ChecklistItem.to_string(), "checklist_item");
    }

    #[test]
    fn actor_without_image_skips_field() {
        let actor = Actor::new("u-100", "Lin Wei", "Security Officer");
        let json = serde_json::to_string(&actor).unwrap();
        assert!(!json.contains("signature_image"));

        let back: Actor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, actor);
    }

    #[test]
    fn invalid_control_id_error_display() {
        let err = CoreError::InvalidControlId("4.2".to_string());
        assert!(err.to_string().contains("invalid control id"));
        assert!(err.to_string().contains("4.2"));
    }
}
