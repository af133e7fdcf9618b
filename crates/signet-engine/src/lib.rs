//! Signet Engine -- the operations the rest of the world calls.
//!
//! The [`ComplianceEngine`] owns the store, the evidence vault, and the
//! catalog, and exposes every state-changing operation: document
//! create/sign/revoke/delete, evidence-form create/sign/reject/attach,
//! checklist initialize/attach-file/link-form/remove/progress, modality
//! resolution, and the activity trail.
//!
//! Every mutation follows the same shape: validate preconditions, apply the
//! transition in memory (derived status recomputed by the entity), persist,
//! then append one activity-trail record. Vaulted files displaced by a
//! mutation are deleted only after the new state is committed; a failed
//! delete is logged and reported, never a rollback.

pub mod engine;

pub use engine::ComplianceEngine;

use signet_core::EntityKind;

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A referenced entity does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    /// A form was linked to a checklist item of a different control.
    #[error("form '{form_id}' evidences control '{form_control}', not '{control}'")]
    ControlMismatch {
        form_id: String,
        form_control: String,
        control: String,
    },

    /// A form was created for a control its type does not apply to.
    #[error("form type '{form_type}' is not applicable to control '{control}'")]
    FormTypeNotApplicable { form_type: String, control: String },

    /// A signature-workflow precondition failed.
    #[error(transparent)]
    Workflow(#[from] signet_workflow::WorkflowError),

    /// A catalog/resolver failure (including configuration gaps).
    #[error(transparent)]
    Evidence(#[from] signet_evidence::EvidenceError),

    /// A persistence failure.
    #[error(transparent)]
    Store(#[from] signet_store::StoreError),

    /// An audit-trail failure.
    #[error(transparent)]
    Audit(#[from] signet_audit::AuditError),

    /// A core-level failure (config, control-id parsing).
    #[error(transparent)]
    Core(#[from] signet_core::CoreError),
}

/// Convenience alias for `Result<T, EngineError>`.
pub type EngineResult<T> = Result<T, EngineError>;
