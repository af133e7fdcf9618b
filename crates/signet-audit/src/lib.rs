//! Signet Audit -- the append-only, hash-chained activity trail.
//!
//! Every state-changing operation produces one [`ActivityRecord`]. Each
//! record commits to its predecessor via `prev_hash`, so modifying any
//! stored record -- or removing one from the middle -- invalidates every
//! subsequent `prev_hash`, which [`verify_chain`] detects. The trail is a
//! passive observer: it never drives decisions in the other components.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use signet_core::EntityKind;

// ---------------------------------------------------------------------------
// AuditError
// ---------------------------------------------------------------------------

/// Error type for audit-trail operations.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("integrity violation: {0}")]
    IntegrityViolation(String),
}

// ---------------------------------------------------------------------------
// ActivityAction
// ---------------------------------------------------------------------------

/// What a trail record describes. A closed set: new actions are added here,
/// not smuggled in as free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// An entity was created.
    Created,
    /// A signature role was signed.
    Signed,
    /// Document signatures were revoked (cascading).
    Revoked,
    /// An evidence form was terminally rejected.
    Rejected,
    /// File evidence was attached to a checklist item.
    FileAttached,
    /// A form was linked to a checklist item.
    FormLinked,
    /// Checklist evidence was removed.
    EvidenceRemoved,
    /// A supporting attachment was appended to a form.
    AttachmentAdded,
    /// An entity was deleted.
    Deleted,
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Signed => "signed",
            Self::Revoked => "revoked",
            Self::Rejected => "rejected",
            Self::FileAttached => "file_attached",
            Self::FormLinked => "form_linked",
            Self::EvidenceRemoved => "evidence_removed",
            Self::AttachmentAdded => "attachment_added",
            Self::Deleted => "deleted",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// ActivityRecord
// ---------------------------------------------------------------------------

/// The sentinel `prev_hash` of the first record in the chain.
///
/// 64 hex zeros -- a value that can never be the SHA-256 of real content,
/// making genesis detection unambiguous.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// One entry in the activity trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Monotonically increasing position in the chain, starting at 0.
    pub sequence: u64,
    /// Stable id of the acting user.
    pub actor_id: String,
    /// Display name of the acting user.
    pub actor_name: String,
    /// What happened.
    pub action: ActivityAction,
    /// The kind of entity acted on.
    pub entity_type: EntityKind,
    /// Id of the entity acted on.
    pub entity_id: String,
    /// Human-readable name of the entity.
    pub entity_name: String,
    /// Free-text description of the change.
    pub description: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    /// `this_hash` of the previous record, or [`GENESIS_HASH`].
    pub prev_hash: String,
    /// SHA-256 (hex) over this record's canonical content.
    pub this_hash: String,
}

/// The unhashed content of a record about to be appended.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub actor_id: String,
    pub actor_name: String,
    pub action: ActivityAction,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub entity_name: String,
    pub description: String,
}

impl ActivityRecord {
    /// Builds the record that extends the chain after `prev` (or starts the
    /// chain when `prev` is `None`), stamping the current time and
    /// computing the content hash.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Serialization`] if the canonical content
    /// cannot be serialized.
    pub fn chained(
        activity: NewActivity,
        prev: Option<&ActivityRecord>,
    ) -> Result<Self, AuditError> {
        let sequence = prev.map_or(0, |p| p.sequence + 1);
        let prev_hash = prev.map_or_else(|| GENESIS_HASH.to_string(), |p| p.this_hash.clone());

        let mut record = Self {
            sequence,
            actor_id: activity.actor_id,
            actor_name: activity.actor_name,
            action: activity.action,
            entity_type: activity.entity_type,
            entity_id: activity.entity_id,
            entity_name: activity.entity_name,
            description: activity.description,
            timestamp: chrono::Utc::now().to_rfc3339(),
            prev_hash,
            this_hash: String::new(),
        };
        record.this_hash = record.content_hash()?;
        Ok(record)
    }

    /// SHA-256 (hex) over the record's canonical content: every field
    /// except `this_hash` itself, serialized in declaration order.
    pub fn content_hash(&self) -> Result<String, AuditError> {
        // Canonical bytes come from a copy with the hash field blanked, so
        // the digest covers everything else including the chain linkage.
        let mut unhashed = self.clone();
        unhashed.this_hash = String::new();
        let bytes =
            serde_json::to_vec(&unhashed).map_err(|e| AuditError::Serialization(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

// ---------------------------------------------------------------------------
// Chain verification
// ---------------------------------------------------------------------------

/// Verifies an entire trail: sequence numbering, chain linkage, and every
/// record's content hash.
///
/// # Errors
///
/// Returns [`AuditError::IntegrityViolation`] naming the first offending
/// record.
pub fn verify_chain(records: &[ActivityRecord]) -> Result<(), AuditError> {
    let mut prev: Option<&ActivityRecord> = None;

    for record in records {
        let expected_seq = prev.map_or(0, |p| p.sequence + 1);
        if record.sequence != expected_seq {
            return Err(AuditError::IntegrityViolation(format!(
                "record {}: expected sequence {expected_seq}",
                record.sequence
            )));
        }

        let expected_prev = prev.map_or(GENESIS_HASH, |p| p.this_hash.as_str());
        if record.prev_hash != expected_prev {
            return Err(AuditError::IntegrityViolation(format!(
                "record {}: prev_hash does not match the preceding record",
                record.sequence
            )));
        }

        let actual = record.content_hash()?;
        if actual != record.this_hash {
            return Err(AuditError::IntegrityViolation(format!(
                "record {}: content hash mismatch",
                record.sequence
            )));
        }

        prev = Some(record);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
