//! Per-requirement evidence checklist items and progress aggregation.
//!
//! One item exists per `(control, requirement)` pair. An item is complete
//! when exactly one of its two evidence payloads -- an uploaded file or a
//! linked form -- is populated; attaching one always displaces the other.
//! Displaced file paths are returned to the caller, which deletes them from
//! the vault only after the new state is durably committed.

use serde::{Deserialize, Serialize};

use signet_core::{Actor, ControlId, FormType};

use crate::catalog::RequirementDef;

// ---------------------------------------------------------------------------
// EvidenceKind
// ---------------------------------------------------------------------------

/// Which of the two evidence payloads satisfies an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// A static uploaded file.
    File,
    /// A linked operational evidence form.
    Form,
}

// ---------------------------------------------------------------------------
// FileEvidence
// ---------------------------------------------------------------------------

/// Metadata of an uploaded evidence file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvidence {
    /// Original file name as uploaded.
    pub file_name: String,
    /// Vault path of the stored file.
    pub file_path: String,
    /// Size of the stored file in bytes.
    pub size_bytes: u64,
    /// Optional uploader notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// User id of the uploader.
    pub uploaded_by: String,
    /// ISO-8601 upload timestamp.
    pub uploaded_at: String,
}

// ---------------------------------------------------------------------------
// FormLink
// ---------------------------------------------------------------------------

/// Reference to an evidence form satisfying a checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormLink {
    /// The linked form's id (`"IR-00001"`).
    pub form_id: String,
    /// The linked form's kind.
    pub form_type: FormType,
    /// Human-readable title of the form kind.
    pub form_title: String,
}

// ---------------------------------------------------------------------------
// ChecklistItem
// ---------------------------------------------------------------------------

/// One evidence slot of one control.
///
/// `is_complete` is `true` iff exactly one of `file` / `form` is populated,
/// and `evidence_type` names which. The transition methods below maintain
/// that invariant; there is no way to populate both through this API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// The control this slot belongs to.
    pub control_id: ControlId,
    /// Requirement slot id, unique within the control.
    pub requirement_id: u32,
    /// Requirement name, copied from the catalog at initialization.
    pub requirement_name: String,
    /// Whether this slot counts toward the required-evidence ratio.
    pub is_required: bool,
    /// Completion flag (derived; see type docs).
    pub is_complete: bool,
    /// Which payload satisfies the slot, when complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_type: Option<EvidenceKind>,
    /// Uploaded file evidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileEvidence>,
    /// Linked form evidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<FormLink>,
    /// ISO-8601 completion timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    /// User id of whoever completed the slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,
}

impl ChecklistItem {
    /// Creates an incomplete item from a catalog requirement definition.
    #[must_use]
    pub fn new(control_id: ControlId, def: &RequirementDef) -> Self {
        Self {
            control_id,
            requirement_id: def.id,
            requirement_name: def.name.clone(),
            is_required: def.required,
            is_complete: false,
            evidence_type: None,
            file: None,
            form: None,
            completed_at: None,
            completed_by: None,
        }
    }

    /// Attaches file evidence, displacing any linked form and any previous
    /// file.
    ///
    /// Returns the vault path of the displaced file, if there was one; the
    /// caller deletes it after committing the new state.
    pub fn attach_file(&mut self, file: FileEvidence, actor: &Actor) -> Option<String> {
        let displaced = self.file.take().map(|old| old.file_path);
        self.form = None;
        self.file = Some(file);
        self.evidence_type = Some(EvidenceKind::File);
        self.complete(actor);
        displaced
    }

    /// Links form evidence, displacing any uploaded file.
    ///
    /// Returns the vault path of the displaced file, if there was one.
    pub fn link_form(&mut self, link: FormLink, actor: &Actor) -> Option<String> {
        let displaced = self.file.take().map(|old| old.file_path);
        self.form = Some(link);
        self.evidence_type = Some(EvidenceKind::Form);
        self.complete(actor);
        displaced
    }

    /// Clears all evidence and completion state, keeping the row.
    ///
    /// Returns the vault path of the removed file, if there was one.
    pub fn remove_evidence(&mut self) -> Option<String> {
        let displaced = self.file.take().map(|old| old.file_path);
        self.form = None;
        self.evidence_type = None;
        self.is_complete = false;
        self.completed_at = None;
        self.completed_by = None;
        displaced
    }

    fn complete(&mut self, actor: &Actor) {
        self.is_complete = true;
        self.completed_at = Some(chrono::Utc::now().to_rfc3339());
        self.completed_by = Some(actor.user_id.clone());
    }
}

// ---------------------------------------------------------------------------
// ChecklistProgress
// ---------------------------------------------------------------------------

/// Aggregate completion state of one control's checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistProgress {
    /// Number of checklist items.
    pub total: u32,
    /// Number of complete items.
    pub completed: u32,
    /// Number of required items.
    pub required: u32,
    /// Number of complete required items.
    pub required_completed: u32,
    /// `round(100 * completed / total)`; `0` when there are no items.
    pub percentage: u32,
    /// `round(100 * required_completed / required)`; `0` when nothing is
    /// required.
    pub required_percentage: u32,
}

/// Computes the progress aggregate over the given items.
///
/// Pure over current item state; callers recompute on every query rather
/// than caching across mutations.
#[must_use]
pub fn progress(items: &[ChecklistItem]) -> ChecklistProgress {
    let total = items.len() as u32;
    let completed = items.iter().filter(|i| i.is_complete).count() as u32;
    let required = items.iter().filter(|i| i.is_required).count() as u32;
    let required_completed = items
        .iter()
        .filter(|i| i.is_required && i.is_complete)
        .count() as u32;

    ChecklistProgress {
        total,
        completed,
        required,
        required_completed,
        percentage: ratio_percent(completed, total),
        required_percentage: ratio_percent(required_completed, required),
    }
}

/// `round(100 * part / whole)`, with `0` for an empty denominator.
fn ratio_percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((f64::from(part) / f64::from(whole)) * 100.0).round() as u32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
