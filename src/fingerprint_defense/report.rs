//! Installation report and page diagnostics.

use serde::Serialize;

use super::capability::TargetType;
use super::catalog::{CapabilityArea, OverrideSpec};
use crate::error::{ErrorCode, ResistError};

/// Outcome of installing one catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum EntryResult {
    Installed,
    /// Optional target absent on this host.
    Skipped,
    Failed { code: ErrorCode, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryOutcome {
    pub area: CapabilityArea,
    pub target: TargetType,
    pub member: &'static str,
    pub result: EntryResult,
}

impl EntryOutcome {
    pub fn new(spec: &OverrideSpec, result: EntryResult) -> Self {
        Self {
            area: spec.area,
            target: spec.target,
            member: spec.member,
            result,
        }
    }

    pub fn failed(spec: &OverrideSpec, error: &ResistError) -> Self {
        Self::new(
            spec,
            EntryResult::Failed {
                code: error.code(),
                message: error.to_string(),
            },
        )
    }

    pub fn is_installed(&self) -> bool {
        self.result == EntryResult::Installed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InstallStatus {
    /// Every entry installed or skipped.
    Completed,
    /// At least one entry failed; the others stay installed.
    Partial,
    /// A previous run already installed the catalog; nothing was done.
    AlreadyInstalled,
    /// The catalog itself could not be built.
    Aborted,
}

/// Per-entry results of one installation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallReport {
    pub status: InstallStatus,
    pub entries: Vec<EntryOutcome>,
    /// Set when the pass stopped before reaching the entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstallReport {
    pub fn from_entries(entries: Vec<EntryOutcome>) -> Self {
        let status = if entries
            .iter()
            .any(|e| matches!(e.result, EntryResult::Failed { .. }))
        {
            InstallStatus::Partial
        } else {
            InstallStatus::Completed
        };
        Self {
            status,
            entries,
            error: None,
        }
    }

    pub fn already_installed() -> Self {
        Self {
            status: InstallStatus::AlreadyInstalled,
            entries: Vec::new(),
            error: Some(ResistError::AlreadyInstalled.to_string()),
        }
    }

    pub fn aborted(error: &ResistError) -> Self {
        Self {
            status: InstallStatus::Aborted,
            entries: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn installed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_installed()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.entries
            .iter()
            .filter(|e| matches!(e.result, EntryResult::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some() || self.status == InstallStatus::Aborted
    }

    pub fn outcome(&self, target: TargetType, member: &str) -> Option<&EntryOutcome> {
        self.entries
            .iter()
            .find(|e| e.target == target && e.member == member)
    }

    /// Diagnostic text for the failures in this report, if any.
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        if !self.has_failures() {
            return None;
        }

        let failed: Vec<&EntryOutcome> = self.failures().collect();
        let detail = |e: &EntryOutcome| match &e.result {
            EntryResult::Failed { message, .. } => message.clone(),
            _ => String::new(),
        };

        let (message, mut lines) = match failed.as_slice() {
            [] => (self.error.clone().unwrap_or_default(), Vec::new()),
            [only] => (
                format!("{}.{} failed to install", only.target, only.member),
                vec![detail(*only)],
            ),
            many => (
                format!("{} overrides failed to install", many.len()),
                many.iter()
                    .map(|e| format!("{}.{}: {}", e.target, e.member, detail(*e)))
                    .collect(),
            ),
        };
        if let (false, Some(error)) = (failed.is_empty(), &self.error) {
            lines.push(error.clone());
        }
        Some(Diagnostic {
            message,
            stack: lines.join("\n"),
        })
    }
}

/// Error text rendered on the page when the debug flag is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub stack: String,
}

impl Diagnostic {
    /// CSS class of the rendered element.
    pub const CLASS: &'static str = "error_message";

    pub fn text(&self) -> String {
        if self.stack.is_empty() {
            return self.message.clone();
        }
        format!("{} -- {}", self.message, self.stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint_defense::catalog::{Behavior, OverrideKind};
    use crate::fingerprint_defense::value::Literal;

    fn spec(member: &'static str) -> OverrideSpec {
        OverrideSpec::new(
            CapabilityArea::Navigator,
            TargetType::Navigator,
            member,
            OverrideKind::Constant,
            Behavior::Literal(Literal::Null),
        )
    }

    #[test]
    fn test_status_from_entries() {
        let ok = InstallReport::from_entries(vec![
            EntryOutcome::new(&spec("language"), EntryResult::Installed),
            EntryOutcome::new(&spec("buildID"), EntryResult::Skipped),
        ]);
        assert_eq!(ok.status, InstallStatus::Completed);
        assert_eq!(ok.installed_count(), 1);
        assert!(ok.diagnostic().is_none());

        let err = ResistError::Host("boom".into());
        let partial = InstallReport::from_entries(vec![
            EntryOutcome::new(&spec("language"), EntryResult::Installed),
            EntryOutcome::failed(&spec("buildID"), &err),
        ]);
        assert_eq!(partial.status, InstallStatus::Partial);
        assert_eq!(partial.failures().count(), 1);
    }

    #[test]
    fn test_diagnostic_text() {
        let err = ResistError::Host("boom".into());
        let report = InstallReport::from_entries(vec![EntryOutcome::failed(&spec("buildID"), &err)]);
        let diagnostic = report.diagnostic().unwrap();
        assert_eq!(diagnostic.message, "Navigator.buildID failed to install");
        assert_eq!(
            diagnostic.text(),
            "Navigator.buildID failed to install -- Host error: boom"
        );
    }

    #[test]
    fn test_diagnostic_lists_every_failure() {
        let err = ResistError::Host("boom".into());
        let report = InstallReport::from_entries(vec![
            EntryOutcome::failed(&spec("buildID"), &err),
            EntryOutcome::new(&spec("language"), EntryResult::Installed),
            EntryOutcome::failed(&spec("languages"), &err),
        ]);
        let diagnostic = report.diagnostic().unwrap();
        assert_eq!(diagnostic.message, "2 overrides failed to install");
        assert_eq!(
            diagnostic.stack,
            "Navigator.buildID: Host error: boom\nNavigator.languages: Host error: boom"
        );
    }

    #[test]
    fn test_aborted_diagnostic_has_no_stack() {
        let report = InstallReport::aborted(&ResistError::Host("no global".into()));
        let diagnostic = report.diagnostic().unwrap();
        assert_eq!(diagnostic.text(), "Host error: no global");
    }

    #[test]
    fn test_report_serializes() {
        let report = InstallReport::from_entries(vec![EntryOutcome::new(
            &spec("language"),
            EntryResult::Installed,
        )]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["entries"][0]["member"], "language");
        assert_eq!(json["entries"][0]["result"]["status"], "installed");
        assert!(json.get("error").is_none());
    }
}
