//! Operational evidence forms: signing, rejection, attachments, history.

use serde::{Deserialize, Serialize};
use tracing::debug;

use signet_core::{Actor, ControlId, FormRole, FormStatus, FormType};

use crate::{Signature, SignatureChain, WorkflowError};

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// Supporting material appended to a form (distinct from checklist evidence).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name as uploaded.
    pub file_name: String,
    /// Vault path of the stored file.
    pub file_path: String,
    /// Free-form grouping label (e.g. `"screenshot"`, `"approval_email"`).
    pub category: String,
    /// User id of the uploader.
    pub uploaded_by: String,
    /// ISO-8601 upload timestamp.
    pub uploaded_at: String,
}

// ---------------------------------------------------------------------------
// Rejection
// ---------------------------------------------------------------------------

/// Terminal rejection of a form by its reviewer or approver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// The role that rejected.
    pub role: FormRole,
    /// Why the form was rejected.
    pub reason: String,
    /// User id of the rejecting actor.
    pub rejected_by: String,
    /// ISO-8601 rejection timestamp.
    pub rejected_at: String,
}

// ---------------------------------------------------------------------------
// HistoryEntry
// ---------------------------------------------------------------------------

/// One entry in a form's append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// What happened (`"created"`, `"signed:reviewer"`, ...).
    pub action: String,
    /// User id of the acting party.
    pub performed_by: String,
    /// ISO-8601 timestamp.
    pub performed_at: String,
    /// Optional detail text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ---------------------------------------------------------------------------
// EvidenceForm
// ---------------------------------------------------------------------------

/// One operational-evidence record (change request, incident report, ...)
/// tied to a control.
///
/// The status advances monotonically through signing (`draft` →
/// `pending_review` → `pending_approval` → `approved`); the only other exit
/// is an explicit [`reject`](Self::reject), which is terminal. As with
/// documents, `status` is stored but recomputed on every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceForm {
    /// Human-readable id (`"IR-00001"`), assigned at creation.
    pub id: String,
    /// The kind of form.
    pub form_type: FormType,
    /// The control this form evidences.
    pub control_id: ControlId,
    /// Free-form payload; its interior shape is owned by the form template
    /// layer and is opaque here.
    pub form_data: serde_json::Value,
    /// Derived approval status.
    pub status: FormStatus,
    /// The ordered signature slots (requester, reviewer, approver).
    pub signatures: SignatureChain,
    /// Supporting attachments.
    pub attachments: Vec<Attachment>,
    /// Present iff the form was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    /// Append-only action history.
    pub history: Vec<HistoryEntry>,
}

impl EvidenceForm {
    /// Creates a draft form with the given pre-allocated id.
    #[must_use]
    pub fn new(
        id: String,
        form_type: FormType,
        control_id: ControlId,
        form_data: serde_json::Value,
        actor: &Actor,
    ) -> Self {
        let mut form = Self {
            id,
            form_type,
            control_id,
            form_data,
            status: FormStatus::Draft,
            signatures: SignatureChain::with_slots(FormRole::all().len()),
            attachments: Vec::new(),
            rejection: None,
            history: Vec::new(),
        };
        form.push_history("created", actor, None);
        form
    }

    /// Signs `role`'s slot on behalf of `actor`, advancing the status.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::Terminal`] if the form is approved or rejected.
    /// - Chain errors ([`WorkflowError::AlreadySigned`],
    ///   [`WorkflowError::OrderingViolation`]) otherwise.
    pub fn sign(
        &mut self,
        role: FormRole,
        actor: &Actor,
        comment: Option<String>,
    ) -> Result<(), WorkflowError> {
        self.check_open()?;
        self.signatures.sign(role, Signature::of(actor, comment))?;
        self.refresh();
        self.push_history(&format!("signed:{role}"), actor, None);
        debug!(form = %self.id, role = %role, status = %self.status, "form signed");
        Ok(())
    }

    /// Rejects the form, terminally.
    ///
    /// Only the role whose turn it is to sign may reject, and only once the
    /// form has left `draft` (a draft has nothing submitted to reject).
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::Terminal`] if already approved or rejected.
    /// - [`WorkflowError::NothingToReject`] on a draft.
    /// - [`WorkflowError::RejectOutOfTurn`] if `role` is not the awaited
    ///   signer.
    pub fn reject(
        &mut self,
        role: FormRole,
        actor: &Actor,
        reason: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        self.check_open()?;
        self.signatures.check_contiguous()?;

        let signed = self.signatures.signed_count();
        if signed == 0 {
            return Err(WorkflowError::NothingToReject);
        }
        let expected = FormRole::all()[signed];
        if role != expected {
            return Err(WorkflowError::RejectOutOfTurn {
                role: role.to_string(),
                expected: expected.to_string(),
            });
        }

        let reason = reason.into();
        self.rejection = Some(Rejection {
            role,
            reason: reason.clone(),
            rejected_by: actor.user_id.clone(),
            rejected_at: chrono::Utc::now().to_rfc3339(),
        });
        self.refresh();
        self.push_history(&format!("rejected:{role}"), actor, Some(reason));
        debug!(form = %self.id, role = %role, "form rejected");
        Ok(())
    }

    /// Appends a supporting attachment.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Terminal`] if the form is approved or
    /// rejected.
    pub fn attach(&mut self, attachment: Attachment, actor: &Actor) -> Result<(), WorkflowError> {
        self.check_open()?;
        let name = attachment.file_name.clone();
        self.attachments.push(attachment);
        self.push_history("attachment_added", actor, Some(name));
        Ok(())
    }

    /// The signature in `role`'s slot, if present.
    #[must_use]
    pub fn signature(&self, role: FormRole) -> Option<&Signature> {
        self.signatures.get(role)
    }

    fn check_open(&self) -> Result<(), WorkflowError> {
        if self.status.is_terminal() {
            return Err(WorkflowError::Terminal {
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Recomputes `status` from the signature slots and the rejection flag.
    fn refresh(&mut self) {
        self.status = derive_status(self.signatures.signed_count(), self.rejection.is_some());
    }

    fn push_history(&mut self, action: &str, actor: &Actor, details: Option<String>) {
        self.history.push(HistoryEntry {
            action: action.to_string(),
            performed_by: actor.user_id.clone(),
            performed_at: chrono::Utc::now().to_rfc3339(),
            details,
        });
    }
}

/// Maps the contiguous signed count (and the rejection flag) onto the
/// surfaced form status.
#[must_use]
pub fn derive_status(signed_count: usize, rejected: bool) -> FormStatus {
    if rejected {
        return FormStatus::Rejected;
    }
    match signed_count {
        0 => FormStatus::Draft,
        1 => FormStatus::PendingReview,
        2 => FormStatus::PendingApproval,
        _ => FormStatus::Approved,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
