//! Evidence-requirement catalog loading and modality resolution.
//!
//! The catalog is deserialized from YAML, validated once, and treated as
//! immutable for the life of the process. Resolution is a pure function over
//! it: the same control id always yields the same answer.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use signet_core::{ControlId, EvidenceModality, FormType};

use crate::EvidenceError;

// ---------------------------------------------------------------------------
// RequirementDef
// ---------------------------------------------------------------------------

/// One named evidence-requirement slot of a control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementDef {
    /// Slot id, unique within the control.
    pub id: u32,
    /// Human-readable requirement name.
    pub name: String,
    /// Whether the slot counts toward the required-evidence ratio.
    #[serde(default = "default_required")]
    pub required: bool,
}

const fn default_required() -> bool {
    true
}

// ---------------------------------------------------------------------------
// EvidenceCatalog
// ---------------------------------------------------------------------------

/// The static, externally supplied evidence catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceCatalog {
    /// Requirement slots per control id.
    requirements: BTreeMap<String, Vec<RequirementDef>>,
    /// Category prefixes each form type applies to (many-to-many).
    form_types: BTreeMap<FormType, Vec<String>>,
    /// Category prefixes whose controls need a static file upload, with a
    /// description of what to upload.
    static_evidence: BTreeMap<String, String>,
    /// Controls that need no evidence at all, with the reason.
    template_only: BTreeMap<String, String>,
}

impl EvidenceCatalog {
    /// Loads and validates a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// [`EvidenceError::Io`] if the file cannot be read,
    /// [`EvidenceError::Catalog`] if it cannot be parsed or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, EvidenceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EvidenceError::Io(format!("reading '{}': {e}", path.display())))?;
        let catalog = Self::from_yaml(&content)?;
        info!(
            path = %path.display(),
            controls = catalog.requirements.len(),
            form_types = catalog.form_types.len(),
            "evidence catalog loaded"
        );
        Ok(catalog)
    }

    /// Parses and validates a catalog from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::Catalog`] on parse or validation failure.
    pub fn from_yaml(content: &str) -> Result<Self, EvidenceError> {
        let catalog: Self = serde_yml::from_str(content)
            .map_err(|e| EvidenceError::Catalog(format!("parse failure: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Semantic validation: well-formed control ids and category prefixes,
    /// unique requirement ids per control.
    fn validate(&self) -> Result<(), EvidenceError> {
        for (control, slots) in &self.requirements {
            ControlId::parse(control).map_err(|_| {
                EvidenceError::Catalog(format!("requirements: invalid control id '{control}'"))
            })?;
            let mut seen = std::collections::BTreeSet::new();
            for slot in slots {
                if !seen.insert(slot.id) {
                    return Err(EvidenceError::Catalog(format!(
                        "requirements for '{control}': duplicate slot id {}",
                        slot.id
                    )));
                }
            }
        }

        for (form_type, prefixes) in &self.form_types {
            for prefix in prefixes {
                validate_prefix(prefix).map_err(|()| {
                    EvidenceError::Catalog(format!(
                        "form_types.{form_type}: invalid category prefix '{prefix}'"
                    ))
                })?;
            }
        }

        for prefix in self.static_evidence.keys() {
            validate_prefix(prefix).map_err(|()| {
                EvidenceError::Catalog(format!(
                    "static_evidence: invalid category prefix '{prefix}'"
                ))
            })?;
        }

        for control in self.template_only.keys() {
            ControlId::parse(control).map_err(|_| {
                EvidenceError::Catalog(format!("template_only: invalid control id '{control}'"))
            })?;
        }

        Ok(())
    }

    /// The requirement slots of `control` (empty if the catalog has none).
    #[must_use]
    pub fn requirements(&self, control: &ControlId) -> &[RequirementDef] {
        self.requirements
            .get(control.as_str())
            .map_or(&[], Vec::as_slice)
    }

    /// All form types applicable to the given category prefix, in
    /// declaration order of [`FormType`].
    #[must_use]
    pub fn form_types_for(&self, prefix: &str) -> Vec<FormType> {
        FormType::all()
            .iter()
            .copied()
            .filter(|ty| {
                self.form_types
                    .get(ty)
                    .is_some_and(|prefixes| prefixes.iter().any(|p| p == prefix))
            })
            .collect()
    }

    /// The static-evidence description for a category prefix, if any.
    #[must_use]
    pub fn static_description(&self, prefix: &str) -> Option<&str> {
        self.static_evidence.get(prefix).map(String::as_str)
    }

    /// The template-only reason recorded for `control`, if any.
    #[must_use]
    pub fn template_only_reason(&self, control: &ControlId) -> Option<&str> {
        self.template_only.get(control.as_str()).map(String::as_str)
    }

    /// Resolves which evidence modality applies to `control`.
    ///
    /// # Algorithm
    ///
    /// 1. Template-only (listed in the catalog, or a `*.*.1` foundational
    ///    control) → no evidence needed, stop.
    /// 2. Reverse-look-up the form types applicable to the control's
    ///    category prefix.
    /// 3. Check whether the prefix needs a static upload.
    /// 4. Combine into a modality; a control with neither is a catalog gap
    ///    and is surfaced as an error, never as "no evidence needed".
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::ConfigurationGap`] in case 4.
    pub fn resolve(&self, control: &ControlId) -> Result<Resolution, EvidenceError> {
        if let Some(reason) = self.template_only_reason(control) {
            return Ok(Resolution::template_only(control.clone(), reason.to_string()));
        }
        if control.is_foundational() {
            return Ok(Resolution::template_only(
                control.clone(),
                "foundational policy control; the document template itself is the deliverable"
                    .to_string(),
            ));
        }

        let prefix = control.prefix();
        let applicable = self.form_types_for(prefix);
        let static_description = self.static_description(prefix).map(String::from);

        let modality = match (!applicable.is_empty(), static_description.is_some()) {
            (true, true) => EvidenceModality::Both,
            (true, false) => EvidenceModality::Operational,
            (false, true) => EvidenceModality::Static,
            (false, false) => {
                return Err(EvidenceError::ConfigurationGap {
                    control: control.to_string(),
                    prefix: prefix.to_string(),
                });
            }
        };

        Ok(Resolution {
            control_id: control.clone(),
            needs_evidence: true,
            modality,
            applicable_form_types: applicable,
            template_only_reason: None,
            static_description,
        })
    }
}

/// A category prefix is exactly two non-empty all-digit dot-segments.
fn validate_prefix(prefix: &str) -> Result<(), ()> {
    let segments: Vec<&str> = prefix.split('.').collect();
    if segments.len() != 2 {
        return Err(());
    }
    for seg in segments {
        if seg.is_empty() || !seg.bytes().all(|b| b.is_ascii_digit()) {
            return Err(());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CatalogBuilder
// ---------------------------------------------------------------------------

/// Programmatic catalog construction (tests, embedders without YAML).
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: EvidenceCatalog,
}

impl CatalogBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a requirement slot to a control.
    #[must_use]
    pub fn requirement(mut self, control: &str, id: u32, name: &str, required: bool) -> Self {
        self.catalog
            .requirements
            .entry(control.to_string())
            .or_default()
            .push(RequirementDef {
                id,
                name: name.to_string(),
                required,
            });
        self
    }

    /// Declares `form_type` applicable to a category prefix.
    #[must_use]
    pub fn form_type(mut self, form_type: FormType, prefix: &str) -> Self {
        self.catalog
            .form_types
            .entry(form_type)
            .or_default()
            .push(prefix.to_string());
        self
    }

    /// Declares a category prefix as needing a static upload.
    #[must_use]
    pub fn static_evidence(mut self, prefix: &str, description: &str) -> Self {
        self.catalog
            .static_evidence
            .insert(prefix.to_string(), description.to_string());
        self
    }

    /// Declares a control as template-only.
    #[must_use]
    pub fn template_only(mut self, control: &str, reason: &str) -> Self {
        self.catalog
            .template_only
            .insert(control.to_string(), reason.to_string());
        self
    }

    /// Validates and returns the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::Catalog`] if the assembled catalog is
    /// semantically invalid.
    pub fn build(self) -> Result<EvidenceCatalog, EvidenceError> {
        self.catalog.validate()?;
        Ok(self.catalog)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// The answer to "what evidence does this control need?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// The control that was resolved.
    pub control_id: ControlId,
    /// `false` only for template-only controls.
    pub needs_evidence: bool,
    /// Which evidence-collection method applies.
    pub modality: EvidenceModality,
    /// The operational form types that apply (empty unless the modality is
    /// `Operational` or `Both`).
    pub applicable_form_types: Vec<FormType>,
    /// Why no evidence is needed, for template-only controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_only_reason: Option<String>,
    /// What to upload, for static-evidence controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_description: Option<String>,
}

impl Resolution {
    fn template_only(control_id: ControlId, reason: String) -> Self {
        Self {
            control_id,
            needs_evidence: false,
            modality: EvidenceModality::None,
            applicable_form_types: Vec::new(),
            template_only_reason: Some(reason),
            static_description: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> EvidenceCatalog {
        CatalogBuilder::new()
            .requirement("4.9.3", 1, "Incident handling records", true)
            .requirement("4.9.3", 2, "Post-incident review minutes", false)
            .form_type(FormType::IncidentReport, "4.9")
            .form_type(FormType::ChangeRequest, "4.3")
            .form_type(FormType::LogReview, "4.9")
            .static_evidence("5.1", "Photos of physical access controls")
            .template_only("4.2.2", "Covered by the organization-wide policy body")
            .build()
            .unwrap()
    }

    #[test]
    fn foundational_controls_are_template_only() {
        let catalog = sample_catalog();
        let res = catalog
            .resolve(&ControlId::parse("4.2.1").unwrap())
            .unwrap();
        assert!(!res.needs_evidence);
        assert_eq!(res.modality, EvidenceModality::None);
        assert!(res.applicable_form_types.is_empty());
        assert!(res.template_only_reason.is_some());
    }

    #[test]
    fn listed_template_only_controls_carry_their_reason() {
        let catalog = sample_catalog();
        let res = catalog
            .resolve(&ControlId::parse("4.2.2").unwrap())
            .unwrap();
        assert!(!res.needs_evidence);
        assert_eq!(
            res.template_only_reason.as_deref(),
            Some("Covered by the organization-wide policy body")
        );
    }

    #[test]
    fn operational_resolution_lists_applicable_form_types() {
        let catalog = sample_catalog();
        let res = catalog
            .resolve(&ControlId::parse("4.9.3").unwrap())
            .unwrap();
        assert!(res.needs_evidence);
        assert_eq!(res.modality, EvidenceModality::Operational);
        assert_eq!(
            res.applicable_form_types,
            vec![FormType::IncidentReport, FormType::LogReview]
        );
        assert!(res.static_description.is_none());
    }

    #[test]
    fn static_resolution() {
        let catalog = sample_catalog();
        let res = catalog
            .resolve(&ControlId::parse("5.1.2").unwrap())
            .unwrap();
        assert_eq!(res.modality, EvidenceModality::Static);
        assert!(res.applicable_form_types.is_empty());
        assert_eq!(
            res.static_description.as_deref(),
            Some("Photos of physical access controls")
        );
    }

    #[test]
    fn both_modalities() {
        let catalog = CatalogBuilder::new()
            .form_type(FormType::BackupVerification, "6.4")
            .static_evidence("6.4", "Backup job screenshots")
            .build()
            .unwrap();

        let res = catalog
            .resolve(&ControlId::parse("6.4.2").unwrap())
            .unwrap();
        assert_eq!(res.modality, EvidenceModality::Both);
        assert_eq!(
            res.applicable_form_types,
            vec![FormType::BackupVerification]
        );
        assert!(res.static_description.is_some());
    }

    #[test]
    fn unmapped_control_is_a_configuration_gap() {
        let catalog = sample_catalog();
        let err = catalog
            .resolve(&ControlId::parse("9.9.9").unwrap())
            .unwrap_err();
        match err {
            EvidenceError::ConfigurationGap { control, prefix } => {
                assert_eq!(control, "9.9.9");
                assert_eq!(prefix, "9.9");
            }
            other => panic!("expected ConfigurationGap, got {other}"),
        }
    }

    #[test]
    fn resolution_is_stable_across_calls() {
        let catalog = sample_catalog();
        let id = ControlId::parse("4.9.3").unwrap();
        let first = catalog.resolve(&id).unwrap();
        let second = catalog.resolve(&id).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn requirements_lookup() {
        let catalog = sample_catalog();
        let slots = catalog.requirements(&ControlId::parse("4.9.3").unwrap());
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].id, 1);
        assert!(slots[0].required);
        assert!(!slots[1].required);

        // Unknown control: empty slice, not an error.
        assert!(catalog
            .requirements(&ControlId::parse("1.1.9").unwrap())
            .is_empty());
    }

    #[test]
    fn load_from_yaml() {
        let yaml = r#"
requirements:
  "4.9.3":
    - id: 1
      name: Incident handling records
    - id: 2
      name: Post-incident review minutes
      required: false
form_types:
  incident_report: ["4.9"]
  change_request: ["4.3", "6.4"]
static_evidence:
  "5.1": Photos of physical access controls
template_only:
  "4.2.2": Covered by the policy body
"#;
        let catalog = EvidenceCatalog::from_yaml(yaml).unwrap();
        let slots = catalog.requirements(&ControlId::parse("4.9.3").unwrap());
        assert_eq!(slots.len(), 2);
        // `required` defaults to true when omitted.
        assert!(slots[0].required);
        assert_eq!(
            catalog.form_types_for("6.4"),
            vec![FormType::ChangeRequest]
        );
    }

    #[test]
    fn load_rejects_unknown_form_type() {
        let yaml = "form_types:\n  crystal_ball: [\"4.9\"]\n";
        let err = EvidenceCatalog::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, EvidenceError::Catalog(_)));
    }

    #[test]
    fn load_rejects_bad_control_ids_and_prefixes() {
        for yaml in [
            "requirements:\n  \"4.9\":\n    - id: 1\n      name: X\n",
            "form_types:\n  incident_report: [\"4.9.3\"]\n",
            "static_evidence:\n  \"banana\": X\n",
            "template_only:\n  \"4\": X\n",
        ] {
            assert!(
                EvidenceCatalog::from_yaml(yaml).is_err(),
                "expected rejection of: {yaml}"
            );
        }
    }

    #[test]
    fn load_rejects_duplicate_requirement_ids() {
        let yaml = r#"
requirements:
  "4.9.3":
    - id: 1
      name: A
    - id: 1
      name: B
"#;
        let err = EvidenceCatalog::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate slot id"));
    }

    #[test]
    fn load_builtin_catalog() {
        let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let path = manifest_dir
            .parent()
            .unwrap()
            .parent()
            .unwrap()
            .join("catalog/default.yaml");
        let catalog = EvidenceCatalog::load(&path).unwrap();

        // Every form type must be mapped to at least one category, so the
        // closed enum and the shipped data stay in sync.
        for ty in FormType::all() {
            assert!(
                catalog.form_types.contains_key(ty),
                "form type {ty} is unmapped in the builtin catalog"
            );
        }

        // Every control with requirement slots must resolve without a
        // configuration gap.
        for control in catalog.requirements.keys() {
            let id = ControlId::parse(control).unwrap();
            catalog
                .resolve(&id)
                .unwrap_or_else(|e| panic!("control {control} does not resolve: {e}"));
        }

        // Spot checks.
        let res = catalog.resolve(&ControlId::parse("4.9.3").unwrap()).unwrap();
        assert_eq!(res.modality, EvidenceModality::Operational);
        assert!(res
            .applicable_form_types
            .contains(&FormType::IncidentReport));

        let res = catalog.resolve(&ControlId::parse("5.1.2").unwrap()).unwrap();
        assert_eq!(res.modality, EvidenceModality::Static);

        let res = catalog.resolve(&ControlId::parse("6.4.2").unwrap()).unwrap();
        assert_eq!(res.modality, EvidenceModality::Both);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(&path, "form_types:\n  incident_report: [\"4.9\"]\n").unwrap();

        let catalog = EvidenceCatalog::load(&path).unwrap();
        assert_eq!(
            catalog.form_types_for("4.9"),
            vec![FormType::IncidentReport]
        );

        let missing = EvidenceCatalog::load(&dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(EvidenceError::Io(_))));
    }
}
