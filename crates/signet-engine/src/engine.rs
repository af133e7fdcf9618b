//! The [`ComplianceEngine`] orchestrator.

use tracing::{info, warn};

use signet_audit::{ActivityAction, ActivityRecord, NewActivity};
use signet_core::config::SignetConfig;
use signet_core::{Actor, ControlId, DocumentRole, EntityKind, FormRole, FormType};
use signet_evidence::{
    progress, ChecklistItem, ChecklistProgress, EvidenceCatalog, FileEvidence, FormLink,
    Resolution,
};
use signet_store::{EvidenceVault, LocalEvidenceVault, SignetStore};
use signet_workflow::{Attachment, Document, EvidenceForm};

use crate::{EngineError, EngineResult};

// ---------------------------------------------------------------------------
// ComplianceEngine
// ---------------------------------------------------------------------------

/// Owns the persistence layer, the evidence vault, and the immutable
/// catalog, and exposes the compliance operations.
///
/// All mutations take `&mut self`, so one engine serializes its
/// read-modify-write cycles by construction; a multi-threaded embedder wraps
/// the engine in a `Mutex` and gets per-entity serialization for free.
pub struct ComplianceEngine {
    store: SignetStore,
    vault: Box<dyn EvidenceVault>,
    catalog: EvidenceCatalog,
}

impl ComplianceEngine {
    /// Assembles an engine from already-constructed parts.
    #[must_use]
    pub fn new(store: SignetStore, vault: Box<dyn EvidenceVault>, catalog: EvidenceCatalog) -> Self {
        Self {
            store,
            vault,
            catalog,
        }
    }

    /// Opens the store, vault, and catalog named by `config`.
    ///
    /// # Errors
    ///
    /// Propagates store and catalog failures.
    pub fn open(config: &SignetConfig) -> EngineResult<Self> {
        let store = SignetStore::open(&config.database_path())?;
        let vault = LocalEvidenceVault::open(&config.evidence_root())?;
        let catalog = EvidenceCatalog::load(&config.catalog_path())?;
        Ok(Self::new(store, Box::new(vault), catalog))
    }

    /// The loaded evidence catalog.
    #[must_use]
    pub fn catalog(&self) -> &EvidenceCatalog {
        &self.catalog
    }

    // -- Documents ----------------------------------------------------------

    /// Creates the next version of `control`'s document.
    ///
    /// The version is `max(existing versions) + 1`, computed against the
    /// store at call time.
    pub fn create_document(
        &mut self,
        control: &ControlId,
        actor: &Actor,
    ) -> EngineResult<Document> {
        let version = self.store.next_document_version(control)?;
        let document = Document::new(control.clone(), version, actor);
        self.store.upsert_document(&document)?;
        self.record(
            actor,
            ActivityAction::Created,
            EntityKind::Document,
            &document.id,
            &document_name(&document),
            format!("generated document v{version} for control {control}"),
        )?;
        info!(id = %document.id, "document created");
        Ok(document)
    }

    /// Fetches a document.
    pub fn document(&self, id: &str) -> EngineResult<Document> {
        self.store
            .get_document(id)?
            .ok_or_else(|| not_found(EntityKind::Document, id))
    }

    /// All versions of `control`'s document, oldest first.
    pub fn documents(&self, control: &ControlId) -> EngineResult<Vec<Document>> {
        Ok(self.store.documents_for_control(control)?)
    }

    /// Signs `role` on a document.
    pub fn sign_document(
        &mut self,
        id: &str,
        role: DocumentRole,
        actor: &Actor,
    ) -> EngineResult<Document> {
        let mut document = self.document(id)?;
        document.sign(role, actor)?;
        self.store.upsert_document(&document)?;
        self.record(
            actor,
            ActivityAction::Signed,
            EntityKind::Document,
            &document.id,
            &document_name(&document),
            format!("signed as {role}; status is now {}", document.status),
        )?;
        Ok(document)
    }

    /// Revokes `role`'s signature on a document, cascading to every role
    /// after it.
    pub fn revoke_document(
        &mut self,
        id: &str,
        role: DocumentRole,
        actor: &Actor,
    ) -> EngineResult<Document> {
        let mut document = self.document(id)?;
        let cleared = document.revoke(role)?;
        self.store.upsert_document(&document)?;

        let cleared_labels: Vec<String> = cleared.iter().map(ToString::to_string).collect();
        self.record(
            actor,
            ActivityAction::Revoked,
            EntityKind::Document,
            &document.id,
            &document_name(&document),
            format!(
                "revoked {}; status is now {}",
                cleared_labels.join(", "),
                document.status
            ),
        )?;
        Ok(document)
    }

    /// Deletes a document outright.
    pub fn delete_document(&mut self, id: &str, actor: &Actor) -> EngineResult<()> {
        let document = self.document(id)?;
        self.store.delete_document(id)?;
        self.record(
            actor,
            ActivityAction::Deleted,
            EntityKind::Document,
            id,
            &document_name(&document),
            format!("deleted document v{}", document.version),
        )?;
        Ok(())
    }

    // -- Evidence forms -----------------------------------------------------

    /// Creates a draft evidence form for `control`.
    ///
    /// The form type must be applicable to the control per the catalog;
    /// creating evidence the catalog does not call for is rejected rather
    /// than silently stored.
    pub fn create_form(
        &mut self,
        form_type: FormType,
        control: &ControlId,
        form_data: serde_json::Value,
        actor: &Actor,
    ) -> EngineResult<EvidenceForm> {
        let resolution = self.catalog.resolve(control)?;
        if !resolution.applicable_form_types.contains(&form_type) {
            return Err(EngineError::FormTypeNotApplicable {
                form_type: form_type.to_string(),
                control: control.to_string(),
            });
        }

        let seq = self.store.next_form_sequence(form_type)?;
        let id = format!("{}-{seq:05}", form_type.code());
        let form = EvidenceForm::new(id, form_type, control.clone(), form_data, actor);
        self.store.upsert_form(&form)?;
        self.record(
            actor,
            ActivityAction::Created,
            EntityKind::EvidenceForm,
            &form.id,
            form_type.title(),
            format!("opened {} for control {control}", form_type.title()),
        )?;
        info!(id = %form.id, "evidence form created");
        Ok(form)
    }

    /// Fetches an evidence form.
    pub fn form(&self, id: &str) -> EngineResult<EvidenceForm> {
        self.store
            .get_form(id)?
            .ok_or_else(|| not_found(EntityKind::EvidenceForm, id))
    }

    /// All evidence forms, optionally restricted to one control.
    pub fn forms(&self, control: Option<&ControlId>) -> EngineResult<Vec<EvidenceForm>> {
        Ok(self.store.list_forms(control)?)
    }

    /// Signs `role` on an evidence form.
    pub fn sign_form(
        &mut self,
        id: &str,
        role: FormRole,
        actor: &Actor,
        comment: Option<String>,
    ) -> EngineResult<EvidenceForm> {
        let mut form = self.form(id)?;
        form.sign(role, actor, comment)?;
        self.store.upsert_form(&form)?;
        self.record(
            actor,
            ActivityAction::Signed,
            EntityKind::EvidenceForm,
            &form.id,
            form.form_type.title(),
            format!("signed as {role}; status is now {}", form.status),
        )?;
        Ok(form)
    }

    /// Terminally rejects an evidence form.
    pub fn reject_form(
        &mut self,
        id: &str,
        role: FormRole,
        actor: &Actor,
        reason: &str,
    ) -> EngineResult<EvidenceForm> {
        let mut form = self.form(id)?;
        form.reject(role, actor, reason)?;
        self.store.upsert_form(&form)?;
        self.record(
            actor,
            ActivityAction::Rejected,
            EntityKind::EvidenceForm,
            &form.id,
            form.form_type.title(),
            format!("rejected as {role}: {reason}"),
        )?;
        Ok(form)
    }

    /// Stores a supporting attachment in the vault and appends it to a
    /// form.
    pub fn attach_form_file(
        &mut self,
        id: &str,
        file_name: &str,
        category: &str,
        bytes: &[u8],
        actor: &Actor,
    ) -> EngineResult<EvidenceForm> {
        let mut form = self.form(id)?;
        // Checked before the bytes land in the vault, so a rejected call
        // cannot leave an orphaned upload behind.
        if form.status.is_terminal() {
            return Err(signet_workflow::WorkflowError::Terminal {
                status: form.status.to_string(),
            }
            .into());
        }
        let stored = self.vault.store(&format!("forms/{id}"), file_name, bytes)?;
        form.attach(
            Attachment {
                file_name: file_name.to_string(),
                file_path: stored.path,
                category: category.to_string(),
                uploaded_by: actor.user_id.clone(),
                uploaded_at: chrono::Utc::now().to_rfc3339(),
            },
            actor,
        )?;
        self.store.upsert_form(&form)?;
        self.record(
            actor,
            ActivityAction::AttachmentAdded,
            EntityKind::EvidenceForm,
            &form.id,
            form.form_type.title(),
            format!("attached '{file_name}' ({category})"),
        )?;
        Ok(form)
    }

    // -- Checklist ----------------------------------------------------------

    /// Materializes and returns `control`'s checklist.
    ///
    /// One item is upserted-if-absent per catalog requirement slot, so the
    /// call is idempotent and safe on every view; existing items keep their
    /// completion state.
    pub fn checklist(&mut self, control: &ControlId) -> EngineResult<Vec<ChecklistItem>> {
        self.initialize_checklist(control)?;
        Ok(self.store.items_for_control(control)?)
    }

    /// Current progress aggregate for `control`'s checklist, recomputed
    /// from item state on every call.
    pub fn progress(&mut self, control: &ControlId) -> EngineResult<ChecklistProgress> {
        let items = self.checklist(control)?;
        Ok(progress(&items))
    }

    /// Resolves which evidence modality applies to `control`.
    pub fn resolve(&self, control: &ControlId) -> EngineResult<Resolution> {
        Ok(self.catalog.resolve(control)?)
    }

    /// Uploads file evidence for one checklist item.
    ///
    /// Any previously linked form is detached and any previous file is
    /// deleted from the vault -- the delete happens strictly after the new
    /// state is committed, so a crash can orphan a file but never leave the
    /// item referencing nothing.
    pub fn attach_file(
        &mut self,
        control: &ControlId,
        requirement_id: u32,
        file_name: &str,
        bytes: &[u8],
        notes: Option<String>,
        actor: &Actor,
    ) -> EngineResult<ChecklistItem> {
        let mut item = self.checklist_item(control, requirement_id)?;

        let dir = format!("controls/{control}/req-{requirement_id}");
        let stored = self.vault.store(&dir, file_name, bytes)?;
        let stored_path = stored.path.clone();

        let displaced = item.attach_file(
            FileEvidence {
                file_name: file_name.to_string(),
                file_path: stored.path,
                size_bytes: stored.size_bytes,
                notes,
                uploaded_by: actor.user_id.clone(),
                uploaded_at: chrono::Utc::now().to_rfc3339(),
            },
            actor,
        );
        self.store.update_item(&item)?;

        // Same-named re-upload lands on the same vault path; deleting it
        // now would destroy the file just stored.
        if let Some(old) = displaced {
            if old != stored_path {
                self.cleanup(&old);
            }
        }

        self.record(
            actor,
            ActivityAction::FileAttached,
            EntityKind::ChecklistItem,
            &item_key(control, requirement_id),
            &item.requirement_name,
            format!("uploaded '{file_name}' as evidence"),
        )?;
        Ok(item)
    }

    /// Links an evidence form to one checklist item.
    ///
    /// The form must exist and must evidence the same control. Any uploaded
    /// file is displaced and deleted from the vault after commit.
    pub fn link_form(
        &mut self,
        control: &ControlId,
        requirement_id: u32,
        form_id: &str,
        actor: &Actor,
    ) -> EngineResult<ChecklistItem> {
        let mut item = self.checklist_item(control, requirement_id)?;
        let form = self.form(form_id)?;
        if form.control_id != *control {
            return Err(EngineError::ControlMismatch {
                form_id: form.id,
                form_control: form.control_id.to_string(),
                control: control.to_string(),
            });
        }

        let displaced = item.link_form(
            FormLink {
                form_id: form.id.clone(),
                form_type: form.form_type,
                form_title: form.form_type.title().to_string(),
            },
            actor,
        );
        self.store.update_item(&item)?;
        if let Some(old) = displaced {
            self.cleanup(&old);
        }

        self.record(
            actor,
            ActivityAction::FormLinked,
            EntityKind::ChecklistItem,
            &item_key(control, requirement_id),
            &item.requirement_name,
            format!("linked form {} as evidence", form.id),
        )?;
        Ok(item)
    }

    /// Removes all evidence from one checklist item, resetting it to
    /// incomplete. The row itself remains.
    pub fn remove_evidence(
        &mut self,
        control: &ControlId,
        requirement_id: u32,
        actor: &Actor,
    ) -> EngineResult<ChecklistItem> {
        let mut item = self.checklist_item(control, requirement_id)?;
        let displaced = item.remove_evidence();
        self.store.update_item(&item)?;
        if let Some(old) = displaced {
            self.cleanup(&old);
        }

        self.record(
            actor,
            ActivityAction::EvidenceRemoved,
            EntityKind::ChecklistItem,
            &item_key(control, requirement_id),
            &item.requirement_name,
            "cleared evidence; item reset to incomplete".to_string(),
        )?;
        Ok(item)
    }

    // -- Activity trail -----------------------------------------------------

    /// The activity trail in chain order, optionally capped to the most
    /// recent `limit` records.
    pub fn activity(&self, limit: Option<u32>) -> EngineResult<Vec<ActivityRecord>> {
        Ok(self.store.list_activity(limit)?)
    }

    /// Verifies the stored trail's hash chain end to end.
    pub fn verify_activity(&self) -> EngineResult<u64> {
        let records = self.store.list_activity(None)?;
        signet_audit::verify_chain(&records)?;
        Ok(records.len() as u64)
    }

    // -- Internals ----------------------------------------------------------

    /// Upserts-if-absent one checklist item per catalog requirement slot.
    fn initialize_checklist(&mut self, control: &ControlId) -> EngineResult<()> {
        for def in self.catalog.requirements(control) {
            let item = ChecklistItem::new(control.clone(), def);
            self.store.insert_item_if_absent(&item)?;
        }
        Ok(())
    }

    /// Fetches one checklist item, materializing the control's checklist
    /// first so the catalog is the source of row existence.
    fn checklist_item(
        &mut self,
        control: &ControlId,
        requirement_id: u32,
    ) -> EngineResult<ChecklistItem> {
        self.initialize_checklist(control)?;
        self.store
            .get_item(control, requirement_id)?
            .ok_or_else(|| not_found(EntityKind::ChecklistItem, &item_key(control, requirement_id)))
    }

    /// Deletes a displaced vault file. Failure is reported, not propagated:
    /// the committed state is the source of truth and an orphaned file must
    /// not block the transition.
    fn cleanup(&self, path: &str) {
        if let Err(e) = self.vault.delete(path) {
            warn!(path = %path, error = %e, "evidence file cleanup failed; orphaned file remains");
        }
    }

    /// Appends one activity record, chained onto the stored trail.
    fn record(
        &mut self,
        actor: &Actor,
        action: ActivityAction,
        entity_type: EntityKind,
        entity_id: &str,
        entity_name: &str,
        description: String,
    ) -> EngineResult<()> {
        let prev = self.store.last_activity()?;
        let record = ActivityRecord::chained(
            NewActivity {
                actor_id: actor.user_id.clone(),
                actor_name: actor.user_name.clone(),
                action,
                entity_type,
                entity_id: entity_id.to_string(),
                entity_name: entity_name.to_string(),
                description,
            },
            prev.as_ref(),
        )?;
        self.store.append_activity(&record)?;
        Ok(())
    }
}

/// Audit display name of a document.
fn document_name(document: &Document) -> String {
    format!("Control {} document v{}", document.control_id, document.version)
}

/// Stable checklist-item id for audit records and errors.
fn item_key(control: &ControlId, requirement_id: u32) -> String {
    format!("{control}#{requirement_id}")
}

fn not_found(kind: EntityKind, id: &str) -> EngineError {
    EngineError::NotFound {
        kind,
        id: id.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use signet_core::{DocumentStatus, FormStatus};
    use signet_evidence::catalog::CatalogBuilder;
    use signet_store::StoreError;
    use signet_store::StoredFile;

    fn actor(id: &str) -> Actor {
        Actor::new(id, format!("User {id}"), "Compliance Officer")
    }

    fn control(raw: &str) -> ControlId {
        ControlId::parse(raw).unwrap()
    }

    fn catalog() -> EvidenceCatalog {
        CatalogBuilder::new()
            .requirement("4.9.3", 1, "Incident handling records", true)
            .requirement("4.9.3", 2, "Post-incident review minutes", false)
            .form_type(FormType::IncidentReport, "4.9")
            .static_evidence("4.9", "Incident response console screenshots")
            .build()
            .unwrap()
    }

    fn engine_with(vault: Box<dyn EvidenceVault>) -> ComplianceEngine {
        ComplianceEngine::new(SignetStore::in_memory().unwrap(), vault, catalog())
    }

    fn engine() -> (tempfile::TempDir, ComplianceEngine) {
        let dir = tempfile::tempdir().unwrap();
        let vault = LocalEvidenceVault::open(&dir.path().join("vault")).unwrap();
        (dir, engine_with(Box::new(vault)))
    }

    // -- Documents ----------------------------------------------------------

    #[test]
    fn document_versions_are_monotonic_per_control() {
        let (_dir, mut eng) = engine();
        let a = actor("u-1");

        let v1 = eng.create_document(&control("4.9.3"), &a).unwrap();
        let v2 = eng.create_document(&control("4.9.3"), &a).unwrap();
        let other = eng.create_document(&control("4.9.4"), &a).unwrap();

        assert_eq!(v1.id, "4.9.3-v1");
        assert_eq!(v2.id, "4.9.3-v2");
        assert_eq!(other.id, "4.9.4-v1");
    }

    #[test]
    fn document_sign_and_revoke_through_the_engine() {
        let (_dir, mut eng) = engine();
        let a = actor("u-1");
        let doc = eng.create_document(&control("4.9.3"), &a).unwrap();

        eng.sign_document(&doc.id, DocumentRole::Prepared, &a).unwrap();
        eng.sign_document(&doc.id, DocumentRole::Reviewed, &actor("u-2"))
            .unwrap();
        let signed = eng
            .sign_document(&doc.id, DocumentRole::Approved, &actor("u-3"))
            .unwrap();
        assert_eq!(signed.status, DocumentStatus::Completed);
        assert!(signed.stamped);

        // Persisted, not just returned.
        assert!(eng.document(&doc.id).unwrap().stamped);

        let revoked = eng
            .revoke_document(&doc.id, DocumentRole::Prepared, &a)
            .unwrap();
        assert_eq!(revoked.status, DocumentStatus::Pending);
        assert!(!revoked.stamped);
    }

    #[test]
    fn out_of_order_sign_is_rejected_and_unpersisted() {
        let (_dir, mut eng) = engine();
        let a = actor("u-1");
        let doc = eng.create_document(&control("4.9.3"), &a).unwrap();

        let err = eng
            .sign_document(&doc.id, DocumentRole::Approved, &a)
            .unwrap_err();
        assert!(matches!(err, EngineError::Workflow(_)));
        assert_eq!(eng.document(&doc.id).unwrap().status, DocumentStatus::Pending);
    }

    #[test]
    fn missing_document_is_not_found() {
        let (_dir, mut eng) = engine();
        let err = eng
            .sign_document("4.9.3-v9", DocumentRole::Prepared, &actor("u-1"))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                kind: EntityKind::Document,
                ..
            }
        ));
    }

    #[test]
    fn delete_document_removes_and_audits() {
        let (_dir, mut eng) = engine();
        let a = actor("u-1");
        let doc = eng.create_document(&control("4.9.3"), &a).unwrap();

        eng.delete_document(&doc.id, &a).unwrap();
        assert!(matches!(
            eng.document(&doc.id),
            Err(EngineError::NotFound { .. })
        ));

        let trail = eng.activity(None).unwrap();
        assert_eq!(trail.last().unwrap().action, ActivityAction::Deleted);
    }

    // -- Forms --------------------------------------------------------------

    #[test]
    fn form_ids_are_human_readable_and_sequential() {
        let (_dir, mut eng) = engine();
        let a = actor("u-1");

        let f1 = eng
            .create_form(
                FormType::IncidentReport,
                &control("4.9.3"),
                serde_json::json!({"summary": "x"}),
                &a,
            )
            .unwrap();
        let f2 = eng
            .create_form(
                FormType::IncidentReport,
                &control("4.9.4"),
                serde_json::Value::Null,
                &a,
            )
            .unwrap();

        assert_eq!(f1.id, "IR-00001");
        assert_eq!(f2.id, "IR-00002");
        assert_eq!(f1.status, FormStatus::Draft);
    }

    #[test]
    fn inapplicable_form_type_is_rejected() {
        let (_dir, mut eng) = engine();
        let err = eng
            .create_form(
                FormType::KeyRotation,
                &control("4.9.3"),
                serde_json::Value::Null,
                &actor("u-1"),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::FormTypeNotApplicable { .. }));
    }

    #[test]
    fn form_full_approval_flow() {
        let (_dir, mut eng) = engine();
        let f = eng
            .create_form(
                FormType::IncidentReport,
                &control("4.9.3"),
                serde_json::Value::Null,
                &actor("u-1"),
            )
            .unwrap();

        eng.sign_form(&f.id, FormRole::Requester, &actor("u-1"), None)
            .unwrap();
        eng.sign_form(&f.id, FormRole::Reviewer, &actor("u-2"), None)
            .unwrap();
        let approved = eng
            .sign_form(&f.id, FormRole::Approver, &actor("u-3"), Some("ok".into()))
            .unwrap();

        assert_eq!(approved.status, FormStatus::Approved);
        // created + three signatures in the form's own history.
        assert_eq!(approved.history.len(), 4);
    }

    #[test]
    fn form_rejection_is_terminal_through_the_engine() {
        let (_dir, mut eng) = engine();
        let f = eng
            .create_form(
                FormType::IncidentReport,
                &control("4.9.3"),
                serde_json::Value::Null,
                &actor("u-1"),
            )
            .unwrap();
        eng.sign_form(&f.id, FormRole::Requester, &actor("u-1"), None)
            .unwrap();

        let rejected = eng
            .reject_form(&f.id, FormRole::Reviewer, &actor("u-2"), "incomplete")
            .unwrap();
        assert_eq!(rejected.status, FormStatus::Rejected);

        let err = eng
            .sign_form(&f.id, FormRole::Reviewer, &actor("u-2"), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Workflow(_)));
    }

    #[test]
    fn form_attachment_is_vaulted_and_recorded() {
        let (_dir, mut eng) = engine();
        let f = eng
            .create_form(
                FormType::IncidentReport,
                &control("4.9.3"),
                serde_json::Value::Null,
                &actor("u-1"),
            )
            .unwrap();

        let updated = eng
            .attach_form_file(&f.id, "timeline.txt", "notes", b"14:02 alert", &actor("u-1"))
            .unwrap();
        assert_eq!(updated.attachments.len(), 1);
        assert_eq!(
            updated.attachments[0].file_path,
            format!("forms/{}/timeline.txt", f.id)
        );
    }

    // -- Checklist ----------------------------------------------------------

    #[test]
    fn checklist_initialization_is_idempotent() {
        let (_dir, mut eng) = engine();
        let c = control("4.9.3");

        let first = eng.checklist(&c).unwrap();
        assert_eq!(first.len(), 2);

        // Complete one item, then re-view: no duplicates, progress kept.
        eng.attach_file(&c, 1, "log.txt", b"evidence", None, &actor("u-1"))
            .unwrap();
        let again = eng.checklist(&c).unwrap();
        assert_eq!(again.len(), 2);
        assert!(again[0].is_complete);
    }

    #[test]
    fn unknown_requirement_is_not_found() {
        let (_dir, mut eng) = engine();
        let err = eng
            .attach_file(
                &control("4.9.3"),
                99,
                "x.txt",
                b"x",
                None,
                &actor("u-1"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                kind: EntityKind::ChecklistItem,
                ..
            }
        ));
    }

    #[test]
    fn link_form_requires_matching_control() {
        let (_dir, mut eng) = engine();
        let a = actor("u-1");
        let f = eng
            .create_form(
                FormType::IncidentReport,
                &control("4.9.4"),
                serde_json::Value::Null,
                &a,
            )
            .unwrap();

        let err = eng
            .link_form(&control("4.9.3"), 1, &f.id, &a)
            .unwrap_err();
        assert!(matches!(err, EngineError::ControlMismatch { .. }));
    }

    #[test]
    fn link_form_requires_existing_form() {
        let (_dir, mut eng) = engine();
        let err = eng
            .link_form(&control("4.9.3"), 1, "IR-99999", &actor("u-1"))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                kind: EntityKind::EvidenceForm,
                ..
            }
        ));
    }

    #[test]
    fn file_then_form_leaves_exactly_the_form_and_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let vault = LocalEvidenceVault::open(&dir.path().join("vault")).unwrap();
        let probe = LocalEvidenceVault::open(&dir.path().join("vault")).unwrap();
        let mut eng = engine_with(Box::new(vault));
        let c = control("4.9.3");
        let a = actor("u-1");

        let item = eng
            .attach_file(&c, 1, "scan.pdf", b"pdf", None, &a)
            .unwrap();
        let file_path = item.file.as_ref().unwrap().file_path.clone();
        assert!(probe.contains(&file_path));

        let f = eng
            .create_form(FormType::IncidentReport, &c, serde_json::Value::Null, &a)
            .unwrap();
        let item = eng.link_form(&c, 1, &f.id, &a).unwrap();

        assert!(item.file.is_none());
        assert_eq!(item.form.as_ref().unwrap().form_id, f.id);
        assert!(item.is_complete);
        // The displaced upload is gone from the vault.
        assert!(!probe.contains(&file_path));
    }

    #[test]
    fn reupload_replaces_file_and_cleans_the_old_one() {
        let dir = tempfile::tempdir().unwrap();
        let vault = LocalEvidenceVault::open(&dir.path().join("vault")).unwrap();
        let probe = LocalEvidenceVault::open(&dir.path().join("vault")).unwrap();
        let mut eng = engine_with(Box::new(vault));
        let c = control("4.9.3");
        let a = actor("u-1");

        eng.attach_file(&c, 1, "old.pdf", b"old", None, &a).unwrap();
        let item = eng
            .attach_file(&c, 1, "new.pdf", b"new", None, &a)
            .unwrap();

        assert_eq!(item.file.as_ref().unwrap().file_name, "new.pdf");
        assert!(!probe.contains("controls/4.9.3/req-1/old.pdf"));
        assert!(probe.contains("controls/4.9.3/req-1/new.pdf"));
    }

    #[test]
    fn reupload_under_the_same_name_keeps_the_file() {
        let (_dir, mut eng) = engine();
        let c = control("4.9.3");
        let a = actor("u-1");

        eng.attach_file(&c, 1, "scan.pdf", b"v1", None, &a).unwrap();
        let item = eng.attach_file(&c, 1, "scan.pdf", b"v2", None, &a).unwrap();
        assert_eq!(item.file.as_ref().unwrap().size_bytes, 2);
    }

    #[test]
    fn remove_evidence_resets_item_but_keeps_row() {
        let (_dir, mut eng) = engine();
        let c = control("4.9.3");
        let a = actor("u-1");

        eng.attach_file(&c, 1, "scan.pdf", b"pdf", None, &a).unwrap();
        let item = eng.remove_evidence(&c, 1, &a).unwrap();
        assert!(!item.is_complete);
        assert!(item.file.is_none() && item.form.is_none());

        assert_eq!(eng.checklist(&c).unwrap().len(), 2);
    }

    #[test]
    fn progress_tracks_checklist_state() {
        let (_dir, mut eng) = engine();
        let c = control("4.9.3");
        let a = actor("u-1");

        let p = eng.progress(&c).unwrap();
        assert_eq!((p.total, p.completed, p.percentage), (2, 0, 0));

        eng.attach_file(&c, 1, "scan.pdf", b"pdf", None, &a).unwrap();
        let p = eng.progress(&c).unwrap();
        assert_eq!((p.completed, p.percentage), (1, 50));
        // Item 1 is the only required item.
        assert_eq!((p.required, p.required_completed, p.required_percentage), (1, 1, 100));
    }

    // -- Cleanup failure ----------------------------------------------------

    /// A vault whose deletes always fail, for exercising the
    /// cleanup-failure path.
    struct StickyVault(LocalEvidenceVault);

    impl EvidenceVault for StickyVault {
        fn store(&self, dir: &str, name: &str, bytes: &[u8]) -> Result<StoredFile, StoreError> {
            self.0.store(dir, name, bytes)
        }

        fn delete(&self, _path: &str) -> Result<(), StoreError> {
            Err(StoreError::Io("delete refused".to_string()))
        }

        fn contains(&self, path: &str) -> bool {
            self.0.contains(path)
        }
    }

    #[test]
    fn cleanup_failure_does_not_block_the_transition() {
        let dir = tempfile::tempdir().unwrap();
        let vault = StickyVault(LocalEvidenceVault::open(&dir.path().join("vault")).unwrap());
        let mut eng = engine_with(Box::new(vault));
        let c = control("4.9.3");
        let a = actor("u-1");

        eng.attach_file(&c, 1, "old.pdf", b"old", None, &a).unwrap();
        // The old file cannot be deleted, but the new evidence still lands.
        let item = eng
            .attach_file(&c, 1, "new.pdf", b"new", None, &a)
            .unwrap();
        assert_eq!(item.file.as_ref().unwrap().file_name, "new.pdf");
        assert!(item.is_complete);
    }

    // -- Activity trail -----------------------------------------------------

    #[test]
    fn every_mutation_appends_one_chained_record() {
        let (_dir, mut eng) = engine();
        let c = control("4.9.3");
        let a = actor("u-1");

        let doc = eng.create_document(&c, &a).unwrap();
        eng.sign_document(&doc.id, DocumentRole::Prepared, &a).unwrap();
        let f = eng
            .create_form(FormType::IncidentReport, &c, serde_json::Value::Null, &a)
            .unwrap();
        eng.attach_file(&c, 1, "scan.pdf", b"pdf", None, &a).unwrap();
        eng.link_form(&c, 1, &f.id, &a).unwrap();
        eng.remove_evidence(&c, 1, &a).unwrap();

        let trail = eng.activity(None).unwrap();
        let actions: Vec<ActivityAction> = trail.iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![
                ActivityAction::Created,
                ActivityAction::Signed,
                ActivityAction::Created,
                ActivityAction::FileAttached,
                ActivityAction::FormLinked,
                ActivityAction::EvidenceRemoved,
            ]
        );

        assert_eq!(eng.verify_activity().unwrap(), 6);
    }

    #[test]
    fn rejected_operations_leave_no_trail_record() {
        let (_dir, mut eng) = engine();
        let c = control("4.9.3");
        let a = actor("u-1");
        let doc = eng.create_document(&c, &a).unwrap();

        let before = eng.activity(None).unwrap().len();
        let _ = eng.sign_document(&doc.id, DocumentRole::Approved, &a);
        assert_eq!(eng.activity(None).unwrap().len(), before);
    }
}
