//! Chart metadata and the seeded evaluation context

use serde_json::{Map, Value as JsonValue};

use crate::error::{CoreError, Result};
use crate::release::ReleaseInfo;

/// A chart maintainer from Chart.yaml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maintainer {
    pub name: String,
    pub email: String,
}

/// A loaded Helm chart, created once per render and discarded after
///
/// Holds the parsed metadata, the raw values tree, and the synthesized
/// release record. `evaluation_context` combines the three into the
/// read-only tree templates render against.
#[derive(Debug, Clone)]
pub struct HelmChart {
    /// Chart name
    pub name: String,

    /// Chart description
    pub description: String,

    /// Chart version
    pub version: String,

    /// Home URL
    pub home: String,

    /// Maintainers (name, email)
    pub maintainers: Vec<Maintainer>,

    /// Icon URL, if any
    pub icon: Option<String>,

    /// Raw Chart.yaml tree with top-level keys capitalized
    pub metadata: JsonValue,

    /// Raw values.yaml tree, verbatim
    pub values: JsonValue,

    /// Placeholder release record
    pub release: ReleaseInfo,
}

impl HelmChart {
    /// Build a chart from the raw contents of Chart.yaml and values.yaml
    pub fn from_sources(chart_yaml: &str, values_yaml: &str) -> Result<Self> {
        let chart_tree: JsonValue = serde_yaml::from_str(chart_yaml)?;
        let values: JsonValue = serde_yaml::from_str(values_yaml)?;

        let chart_obj = chart_tree.as_object().ok_or_else(|| CoreError::InvalidChart {
            message: "Chart.yaml is not a mapping".to_string(),
        })?;

        let field = |key: &str| -> String {
            chart_obj
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        let maintainers = chart_obj
            .get("maintainers")
            .and_then(|v| v.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .map(|m| Maintainer {
                        name: m.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                        email: m.get("email").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let icon = chart_obj
            .get("icon")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(Self {
            name: field("name"),
            description: field("description"),
            version: field("version"),
            home: field("home"),
            maintainers,
            icon,
            metadata: capitalize_top_level_keys(&chart_tree),
            values,
            release: ReleaseInfo::for_preview(),
        })
    }

    /// The read-only tree templates resolve `.`-references against
    pub fn evaluation_context(&self) -> JsonValue {
        let mut root = Map::new();
        root.insert("Chart".to_string(), self.metadata.clone());
        root.insert("Values".to_string(), self.values.clone());
        root.insert("Release".to_string(), self.release.to_value());
        JsonValue::Object(root)
    }
}

/// Capitalize every top-level key: first letter upper, remainder lower
///
/// Matches the documented chart convention (`name` -> `Name`,
/// `apiVersion` -> `Apiversion`), not a full case-fold of the key.
pub fn capitalize_top_level_keys(tree: &JsonValue) -> JsonValue {
    match tree.as_object() {
        Some(obj) => {
            let mut capitalized = Map::new();
            for (key, value) in obj {
                let mut chars = key.chars();
                let new_key = match chars.next() {
                    Some(first) => {
                        format!("{}{}", first.to_uppercase(), chars.as_str().to_lowercase())
                    }
                    None => String::new(),
                };
                capitalized.insert(new_key, value.clone());
            }
            JsonValue::Object(capitalized)
        }
        None => tree.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART_YAML: &str = r#"
apiVersion: v1
name: redis
description: An in-memory store
version: 1.2.3
home: https://redis.io
icon: https://redis.io/icon.png
maintainers:
  - name: Alex
    email: alex@example.com
"#;

    const VALUES_YAML: &str = r#"
image:
  repository: redis
  tag: "5.0"
replicas: 3
"#;

    #[test]
    fn test_chart_from_sources() {
        let chart = HelmChart::from_sources(CHART_YAML, VALUES_YAML).unwrap();

        assert_eq!(chart.name, "redis");
        assert_eq!(chart.version, "1.2.3");
        assert_eq!(chart.home, "https://redis.io");
        assert_eq!(chart.icon.as_deref(), Some("https://redis.io/icon.png"));
        assert_eq!(chart.maintainers.len(), 1);
        assert_eq!(chart.maintainers[0].name, "Alex");
        assert_eq!(chart.maintainers[0].email, "alex@example.com");
    }

    #[test]
    fn test_chart_missing_maintainers_is_fine() {
        let chart = HelmChart::from_sources("name: tiny\nversion: 0.1.0", "{}").unwrap();
        assert!(chart.maintainers.is_empty());
        assert!(chart.icon.is_none());
    }

    #[test]
    fn test_capitalize_top_level_keys() {
        let tree = serde_json::json!({
            "name": "redis",
            "apiVersion": "v1",
            "KubeVersion": ">=1.10",
        });

        let capitalized = capitalize_top_level_keys(&tree);

        assert_eq!(capitalized["Name"], "redis");
        assert_eq!(capitalized["Apiversion"], "v1");
        assert_eq!(capitalized["Kubeversion"], ">=1.10");
        assert!(capitalized.get("apiVersion").is_none());
    }

    #[test]
    fn test_evaluation_context_roots() {
        let chart = HelmChart::from_sources(CHART_YAML, VALUES_YAML).unwrap();
        let ctx = chart.evaluation_context();

        assert_eq!(ctx["Chart"]["Name"], "redis");
        assert_eq!(ctx["Values"]["image"]["tag"], "5.0");
        assert_eq!(ctx["Release"]["Service"], "Tiller");
    }

    #[test]
    fn test_chart_yaml_must_be_mapping() {
        let err = HelmChart::from_sources("- just\n- a\n- list", "{}").unwrap_err();
        assert!(err.to_string().contains("not a mapping"));
    }
}
