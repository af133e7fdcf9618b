//! Operational evidence form types.
//!
//! A closed enum of the structured evidence records Signet manages. Adding a
//! kind means adding a variant, which forces every match site (id codes,
//! titles, catalog deserialization) to be extended -- there is no string-keyed
//! fallback path.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FormType
// ---------------------------------------------------------------------------

/// The kinds of operational evidence forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    ChangeRequest,
    IncidentReport,
    AccessRequest,
    AccessReview,
    BackupVerification,
    RestoreTest,
    VulnerabilityScan,
    PenetrationTest,
    RiskAssessment,
    SecurityTraining,
    AssetInventory,
    PatchRecord,
    VendorAssessment,
    DataDisposal,
    KeyRotation,
    FirewallReview,
    LogReview,
    DisasterDrill,
    ExceptionRequest,
    MaintenanceRecord,
}

impl FormType {
    /// Short upper-case code used as the prefix of generated form ids
    /// (`"IR-00001"`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ChangeRequest => "CR",
            Self::IncidentReport => "IR",
            Self::AccessRequest => "AQ",
            Self::AccessReview => "AV",
            Self::BackupVerification => "BV",
            Self::RestoreTest => "RT",
            Self::VulnerabilityScan => "VS",
            Self::PenetrationTest => "PT",
            Self::RiskAssessment => "RA",
            Self::SecurityTraining => "ST",
            Self::AssetInventory => "AI",
            Self::PatchRecord => "PR",
            Self::VendorAssessment => "VA",
            Self::DataDisposal => "DD",
            Self::KeyRotation => "KR",
            Self::FirewallReview => "FW",
            Self::LogReview => "LG",
            Self::DisasterDrill => "DR",
            Self::ExceptionRequest => "EX",
            Self::MaintenanceRecord => "MR",
        }
    }

    /// Human-readable title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::ChangeRequest => "Change Request",
            Self::IncidentReport => "Incident Report",
            Self::AccessRequest => "Access Request",
            Self::AccessReview => "Access Review",
            Self::BackupVerification => "Backup Verification",
            Self::RestoreTest => "Restore Test",
            Self::VulnerabilityScan => "Vulnerability Scan",
            Self::PenetrationTest => "Penetration Test",
            Self::RiskAssessment => "Risk Assessment",
            Self::SecurityTraining => "Security Training",
            Self::AssetInventory => "Asset Inventory",
            Self::PatchRecord => "Patch Record",
            Self::VendorAssessment => "Vendor Assessment",
            Self::DataDisposal => "Data Disposal",
            Self::KeyRotation => "Key Rotation",
            Self::FirewallReview => "Firewall Review",
            Self::LogReview => "Log Review",
            Self::DisasterDrill => "Disaster Recovery Drill",
            Self::ExceptionRequest => "Exception Request",
            Self::MaintenanceRecord => "Maintenance Record",
        }
    }

    /// Stable snake_case name, matching the serde representation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ChangeRequest => "change_request",
            Self::IncidentReport => "incident_report",
            Self::AccessRequest => "access_request",
            Self::AccessReview => "access_review",
            Self::BackupVerification => "backup_verification",
            Self::RestoreTest => "restore_test",
            Self::VulnerabilityScan => "vulnerability_scan",
            Self::PenetrationTest => "penetration_test",
            Self::RiskAssessment => "risk_assessment",
            Self::SecurityTraining => "security_training",
            Self::AssetInventory => "asset_inventory",
            Self::PatchRecord => "patch_record",
            Self::VendorAssessment => "vendor_assessment",
            Self::DataDisposal => "data_disposal",
            Self::KeyRotation => "key_rotation",
            Self::FirewallReview => "firewall_review",
            Self::LogReview => "log_review",
            Self::DisasterDrill => "disaster_drill",
            Self::ExceptionRequest => "exception_request",
            Self::MaintenanceRecord => "maintenance_record",
        }
    }

    /// Returns all form types in declaration order.
    #[must_use]
    pub const fn all() -> &'static [FormType] {
        &[
            Self::ChangeRequest,
            Self::IncidentReport,
            Self::AccessRequest,
            Self::AccessReview,
            Self::BackupVerification,
            Self::RestoreTest,
            Self::VulnerabilityScan,
            Self::PenetrationTest,
            Self::RiskAssessment,
            Self::SecurityTraining,
            Self::AssetInventory,
            Self::PatchRecord,
            Self::VendorAssessment,
            Self::DataDisposal,
            Self::KeyRotation,
            Self::FirewallReview,
            Self::LogReview,
            Self::DisasterDrill,
            Self::ExceptionRequest,
            Self::MaintenanceRecord,
        ]
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for FormType {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormType::all()
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| crate::CoreError::Config(format!("unknown form type: '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn twenty_form_types() {
        assert_eq!(FormType::all().len(), 20);
    }

    #[test]
    fn codes_are_unique() {
        let codes: BTreeSet<&str> = FormType::all().iter().map(|t| t.code()).collect();
        assert_eq!(codes.len(), FormType::all().len());
    }

    #[test]
    fn names_match_serde_representation() {
        for ty in FormType::all() {
            let json = serde_json::to_string(ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.name()));
        }
    }

    #[test]
    fn from_str_roundtrip() {
        for ty in FormType::all() {
            let parsed: FormType = ty.name().parse().unwrap();
            assert_eq!(parsed, *ty);
        }
        assert!("no_such_form".parse::<FormType>().is_err());
    }

    #[test]
    fn display_uses_name() {
        assert_eq!(FormType::IncidentReport.to_string(), "incident_report");
        assert_eq!(FormType::ChangeRequest.to_string(), "change_request");
    }

    #[test]
    fn serde_rejects_unknown_kind() {
        let result: Result<FormType, _> = serde_json::from_str("\"crystal_ball\"");
        assert!(result.is_err());
    }
}
