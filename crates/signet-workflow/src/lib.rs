//! Signet Workflow -- the ordered, revocable multi-party signature machine.
//!
//! Two entity kinds share one state machine: a [`Document`](document::Document)
//! (roles: prepared, reviewed, approved) and an
//! [`EvidenceForm`](form::EvidenceForm) (roles: requester, reviewer,
//! approver). Roles sign in a fixed order, a revocation cascades to every
//! downstream role, and the entity's overall status is always recomputed from
//! the signature slots -- never patched independently.

use serde::{Deserialize, Serialize};
use std::fmt;

use signet_core::{Actor, DocumentRole, FormRole};

pub mod chain;
pub mod document;
pub mod form;

pub use chain::SignatureChain;
pub use document::Document;
pub use form::{Attachment, EvidenceForm, HistoryEntry, Rejection};

// ---------------------------------------------------------------------------
// WorkflowError
// ---------------------------------------------------------------------------

/// Error type for signature-workflow operations.
///
/// Every variant is a synchronous precondition failure: the operation is
/// rejected and the entity is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Sign attempted on a role whose slot is already occupied.
    #[error("role '{role}' has already signed")]
    AlreadySigned { role: String },

    /// Sign attempted on a role whose prerequisite role has not signed.
    #[error("cannot sign as '{role}': '{missing}' has not signed yet")]
    OrderingViolation { role: String, missing: String },

    /// Revoke attempted on a role whose slot is empty.
    #[error("role '{role}' has no signature to revoke")]
    NotSigned { role: String },

    /// Sign or reject attempted on an entity in a terminal state.
    #[error("no further action possible: status is '{status}'")]
    Terminal { status: String },

    /// Reject attempted by a role whose turn it is not.
    #[error("role '{role}' cannot reject now; awaiting '{expected}'")]
    RejectOutOfTurn { role: String, expected: String },

    /// Reject attempted on a draft (nothing has been submitted for review).
    #[error("a draft cannot be rejected")]
    NothingToReject,

    /// The signed-role set is not a prefix of the role order. Sign-time
    /// ordering makes this unreachable; seeing it means the stored entity
    /// was corrupted outside the workflow.
    #[error("signature slots are non-contiguous: {0}")]
    InvariantViolation(String),
}

// ---------------------------------------------------------------------------
// SignatureRole
// ---------------------------------------------------------------------------

/// A role in a fixed signing order.
///
/// Implemented by [`DocumentRole`] and [`FormRole`]; the shared
/// [`SignatureChain`] logic only needs a role's position and its roster.
pub trait SignatureRole: Copy + Eq + fmt::Display {
    /// Zero-based position in the signing order.
    fn ordinal(self) -> usize;

    /// All roles, in signing order.
    fn roster() -> &'static [Self];
}

impl SignatureRole for DocumentRole {
    fn ordinal(self) -> usize {
        DocumentRole::ordinal(self)
    }

    fn roster() -> &'static [Self] {
        DocumentRole::all()
    }
}

impl SignatureRole for FormRole {
    fn ordinal(self) -> usize {
        FormRole::ordinal(self)
    }

    fn roster() -> &'static [Self] {
        FormRole::all()
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// One populated signature slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Stable identifier of the signer.
    pub user_id: String,
    /// Display name of the signer.
    pub user_name: String,
    /// Signer's organizational position at signing time.
    pub position: String,
    /// ISO-8601 timestamp of the signature.
    pub signed_at: String,
    /// Reference to the signer's stored signature image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_image: Option<String>,
    /// Optional free-text comment (evidence forms only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Signature {
    /// Captures a signature for `actor` at the current instant.
    #[must_use]
    pub fn of(actor: &Actor, comment: Option<String>) -> Self {
        Self {
            user_id: actor.user_id.clone(),
            user_name: actor.user_name.clone(),
            position: actor.position.clone(),
            signed_at: chrono::Utc::now().to_rfc3339(),
            signature_image: actor.signature_image.clone(),
            comment,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_rosters_match_core_order() {
        assert_eq!(<DocumentRole as SignatureRole>::roster().len(), 3);
        assert_eq!(<FormRole as SignatureRole>::roster().len(), 3);
        for (i, r) in <DocumentRole as SignatureRole>::roster().iter().enumerate() {
            assert_eq!(SignatureRole::ordinal(*r), i);
        }
    }

    #[test]
    fn signature_captures_actor_fields() {
        let mut actor = Actor::new("u-7", "Chen Yi", "Auditor");
        actor.signature_image = Some("sig/u-7.png".to_string());

        let sig = Signature::of(&actor, Some("looks good".to_string()));
        assert_eq!(sig.user_id, "u-7");
        assert_eq!(sig.user_name, "Chen Yi");
        assert_eq!(sig.position, "Auditor");
        assert_eq!(sig.signature_image.as_deref(), Some("sig/u-7.png"));
        assert_eq!(sig.comment.as_deref(), Some("looks good"));
        assert!(!sig.signed_at.is_empty());
    }

    #[test]
    fn signature_serde_skips_empty_options() {
        let actor = Actor::new("u-1", "A", "B");
        let sig = Signature::of(&actor, None);
        let json = serde_json::to_string(&sig).unwrap();
        assert!(!json.contains("comment"));
        assert!(!json.contains("signature_image"));
    }
}
