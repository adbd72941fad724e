//! Synthesized release record
//!
//! Rendering happens without a cluster, so the `.Release` object a chart
//! sees is built from fixed placeholder values rather than a live install.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Release information exposed to templates as `.Release`
///
/// Field names serialize in PascalCase to match the dotted paths charts
/// use (`.Release.Name`, `.Release.IsInstall`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseInfo {
    /// Release name placeholder
    pub name: String,

    /// Target namespace placeholder
    pub namespace: String,

    /// Legacy constant, always "Tiller"
    pub service: String,

    /// Always false for a preview render
    pub is_upgrade: bool,

    /// Always true for a preview render
    pub is_install: bool,

    /// Always 1 for a preview render
    pub revision: u32,

    /// Render time, epoch seconds
    pub time: i64,
}

impl ReleaseInfo {
    /// Create the placeholder release for a preview render
    pub fn for_preview() -> Self {
        Self {
            name: "RELEASE-NAME".to_string(),
            namespace: "default".to_string(),
            service: "Tiller".to_string(),
            is_upgrade: false,
            is_install: true,
            revision: 1,
            time: chrono::Utc::now().timestamp(),
        }
    }

    /// Convert to a JSON value tree for the evaluation context
    pub fn to_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_placeholders() {
        let release = ReleaseInfo::for_preview();

        assert_eq!(release.name, "RELEASE-NAME");
        assert_eq!(release.namespace, "default");
        assert_eq!(release.service, "Tiller");
        assert!(release.is_install);
        assert!(!release.is_upgrade);
        assert_eq!(release.revision, 1);
        assert!(release.time > 0);
    }

    #[test]
    fn test_release_value_keys_are_pascal_case() {
        let value = ReleaseInfo::for_preview().to_value();

        assert_eq!(value["Service"], "Tiller");
        assert_eq!(value["IsInstall"], true);
        assert_eq!(value["IsUpgrade"], false);
        assert_eq!(value["Revision"], 1);
        assert!(value.get("name").is_none());
    }
}
