use serde::{Deserialize, Serialize};

/// How the account fold treats two differing non-empty values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Abort the group's merge on any disagreement. No information is lost.
    #[default]
    Strict,
    /// Keep the target's value and drop the source's on disagreement.
    PreferTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeConfig {
    /// Option group holding the reference type labels.
    #[serde(default = "default_reference_type_group")]
    pub reference_type_group: String,
    #[serde(default)]
    pub merge_policy: MergePolicy,
    /// Resolve contact names for each finding after a scan.
    #[serde(default = "default_true")]
    pub enrich_contacts: bool,
    /// Scan again after any successful merge or deletion.
    #[serde(default = "default_true")]
    pub rescan_after_mutation: bool,
}

fn default_reference_type_group() -> String {
    "civicrm_banking.reference_types".into()
}

fn default_true() -> bool {
    true
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            reference_type_group: default_reference_type_group(),
            merge_policy: MergePolicy::Strict,
            enrich_contacts: true,
            rescan_after_mutation: true,
        }
    }
}

impl DedupeConfig {
    /// Load from the data/ directory.
    /// In tests, use DedupeConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/dedupe/dedupe_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DedupeConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(config)
    }

    pub fn default_test() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: DedupeConfig = serde_json::from_str(r#"{"merge_policy":"prefer_target"}"#).unwrap();
        assert_eq!(config.merge_policy, MergePolicy::PreferTarget);
        assert_eq!(config.reference_type_group, "civicrm_banking.reference_types");
        assert!(config.enrich_contacts);
        assert!(config.rescan_after_mutation);
    }

    #[test]
    fn load_reports_missing_file_path() {
        let err = DedupeConfig::load("/nonexistent-dedupe-dir").unwrap_err();
        assert!(err.to_string().contains("dedupe_config.json"), "{err}");
    }
}
