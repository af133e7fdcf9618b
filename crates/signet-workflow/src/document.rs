//! Versioned control documents and their approval lifecycle.

use serde::{Deserialize, Serialize};
use tracing::debug;

use signet_core::{Actor, ControlId, DocumentRole, DocumentStatus};

use crate::{Signature, SignatureChain, WorkflowError};

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// One versioned instance of a policy/procedure document for a control.
///
/// `status` and `stamped` are stored for query convenience but are pure
/// functions of the signature slots; every mutation recomputes them, so they
/// can never drift from the signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Deterministic id: `"<control>-v<version>"`.
    pub id: String,
    /// The control this document belongs to.
    pub control_id: ControlId,
    /// Monotonic version within the control, assigned at creation.
    pub version: u32,
    /// Derived approval status.
    pub status: DocumentStatus,
    /// `true` iff all three signature slots are occupied.
    pub stamped: bool,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// Who requested this document generation.
    pub created_by: String,
    /// The ordered signature slots (prepared, reviewed, approved).
    pub signatures: SignatureChain,
}

impl Document {
    /// Creates a fresh, unsigned document for `control_id` at `version`.
    #[must_use]
    pub fn new(control_id: ControlId, version: u32, actor: &Actor) -> Self {
        Self {
            id: format!("{control_id}-v{version}"),
            control_id,
            version,
            status: DocumentStatus::Pending,
            stamped: false,
            created_at: chrono::Utc::now().to_rfc3339(),
            created_by: actor.user_id.clone(),
            signatures: SignatureChain::with_slots(DocumentRole::all().len()),
        }
    }

    /// Signs `role`'s slot on behalf of `actor`.
    ///
    /// Ordering is enforced: a role can sign only when every earlier role
    /// has signed. On success the derived status and the stamp are
    /// recomputed.
    ///
    /// # Errors
    ///
    /// Propagates [`WorkflowError`] from the chain; the document is left
    /// untouched on rejection.
    pub fn sign(&mut self, role: DocumentRole, actor: &Actor) -> Result<(), WorkflowError> {
        self.signatures.sign(role, Signature::of(actor, None))?;
        self.refresh();
        debug!(document = %self.id, role = %role, status = %self.status, "document signed");
        Ok(())
    }

    /// Revokes `role`'s signature and, cascading, every signature after it.
    ///
    /// Returns the roles that were cleared. If the result is not fully
    /// signed, the stamp is removed.
    ///
    /// # Errors
    ///
    /// Propagates [`WorkflowError`] from the chain.
    pub fn revoke(&mut self, role: DocumentRole) -> Result<Vec<DocumentRole>, WorkflowError> {
        let cleared = self.signatures.revoke(role)?;
        self.refresh();
        debug!(
            document = %self.id,
            role = %role,
            cleared = cleared.len(),
            status = %self.status,
            "document signatures revoked"
        );
        Ok(cleared)
    }

    /// The signature in `role`'s slot, if present.
    #[must_use]
    pub fn signature(&self, role: DocumentRole) -> Option<&Signature> {
        self.signatures.get(role)
    }

    /// Recomputes `status` and `stamped` from the signature slots.
    fn refresh(&mut self) {
        self.status = derive_status(self.signatures.signed_count());
        self.stamped = self.signatures.fully_signed();
    }
}

/// Maps the contiguous signed count onto the surfaced document status.
#[must_use]
pub fn derive_status(signed_count: usize) -> DocumentStatus {
    match signed_count {
        0 => DocumentStatus::Pending,
        3 => DocumentStatus::Completed,
        _ => DocumentStatus::InProgress,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: &str) -> Actor {
        Actor::new(id, format!("User {id}"), "Officer")
    }

    fn doc() -> Document {
        Document::new(ControlId::parse("4.2.3").unwrap(), 1, &actor("u-creator"))
    }

    #[test]
    fn new_document_is_pending_and_unstamped() {
        let d = doc();
        assert_eq!(d.id, "4.2.3-v1");
        assert_eq!(d.version, 1);
        assert_eq!(d.status, DocumentStatus::Pending);
        assert!(!d.stamped);
        assert_eq!(d.created_by, "u-creator");
    }

    #[test]
    fn status_tracks_signature_progress() {
        let mut d = doc();

        d.sign(DocumentRole::Prepared, &actor("u-1")).unwrap();
        assert_eq!(d.status, DocumentStatus::InProgress);
        assert!(!d.stamped);

        d.sign(DocumentRole::Reviewed, &actor("u-2")).unwrap();
        assert_eq!(d.status, DocumentStatus::InProgress);
        assert!(!d.stamped);

        d.sign(DocumentRole::Approved, &actor("u-3")).unwrap();
        assert_eq!(d.status, DocumentStatus::Completed);
        assert!(d.stamped, "all three signatures must stamp the document");
    }

    #[test]
    fn out_of_order_sign_leaves_document_untouched() {
        let mut d = doc();
        let err = d.sign(DocumentRole::Approved, &actor("u-3")).unwrap_err();
        assert!(matches!(err, WorkflowError::OrderingViolation { .. }));
        assert_eq!(d.status, DocumentStatus::Pending);
        assert!(d.signature(DocumentRole::Approved).is_none());
    }

    #[test]
    fn revoking_first_role_resets_fully_signed_document() {
        let mut d = doc();
        d.sign(DocumentRole::Prepared, &actor("u-1")).unwrap();
        d.sign(DocumentRole::Reviewed, &actor("u-2")).unwrap();
        d.sign(DocumentRole::Approved, &actor("u-3")).unwrap();
        assert!(d.stamped);

        let cleared = d.revoke(DocumentRole::Prepared).unwrap();
        assert_eq!(
            cleared,
            vec![
                DocumentRole::Prepared,
                DocumentRole::Reviewed,
                DocumentRole::Approved
            ]
        );
        assert_eq!(d.status, DocumentStatus::Pending);
        assert!(!d.stamped);
        for role in DocumentRole::all() {
            assert!(d.signature(*role).is_none());
        }
    }

    #[test]
    fn revoking_middle_role_keeps_upstream_signature() {
        let mut d = doc();
        d.sign(DocumentRole::Prepared, &actor("u-1")).unwrap();
        d.sign(DocumentRole::Reviewed, &actor("u-2")).unwrap();
        d.sign(DocumentRole::Approved, &actor("u-3")).unwrap();

        d.revoke(DocumentRole::Reviewed).unwrap();
        assert_eq!(d.status, DocumentStatus::InProgress);
        assert!(!d.stamped);
        assert!(d.signature(DocumentRole::Prepared).is_some());

        // The same role can sign again after the revocation.
        d.sign(DocumentRole::Reviewed, &actor("u-4")).unwrap();
        assert_eq!(
            d.signature(DocumentRole::Reviewed).unwrap().user_id,
            "u-4"
        );
    }

    #[test]
    fn derive_status_is_total_over_reachable_counts() {
        assert_eq!(derive_status(0), DocumentStatus::Pending);
        assert_eq!(derive_status(1), DocumentStatus::InProgress);
        assert_eq!(derive_status(2), DocumentStatus::InProgress);
        assert_eq!(derive_status(3), DocumentStatus::Completed);
    }

    #[test]
    fn serde_roundtrip_preserves_state() {
        let mut d = doc();
        d.sign(DocumentRole::Prepared, &actor("u-1")).unwrap();

        let json = serde_json::to_string(&d).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
        assert_eq!(back.status, DocumentStatus::InProgress);
    }
}
