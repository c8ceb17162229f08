//
// cross_file/config.rs
//
// Configuration for workspace scanning, completion, and diagnostics
//

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Workspace configuration
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceConfig {
    /// Maximum link depth followed from a root file
    pub max_scan_depth: usize,
    /// Follow `@use`/`@forward`/`@import` links while scanning
    pub follow_links: bool,
    /// Globs excluded from root-file discovery
    pub exclude: Vec<String>,
    /// Extra directories tried when resolving module targets
    pub load_paths: Vec<String>,
    /// Only offer unqualified symbols reachable through the module system
    pub suggest_from_use_only: bool,
    pub suggest_variables: bool,
    pub suggest_mixins: bool,
    pub suggest_functions: bool,
    pub suggest_placeholders: bool,
    /// Whether deprecation diagnostics are published
    pub deprecation_diagnostics: bool,
    /// Debounce delay for diagnostics publishing in milliseconds
    pub diagnostics_debounce_ms: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            max_scan_depth: 30,
            follow_links: true,
            exclude: vec!["**/.git/**".to_string(), "**/node_modules/**".to_string()],
            load_paths: Vec::new(),
            suggest_from_use_only: false,
            suggest_variables: true,
            suggest_mixins: true,
            suggest_functions: true,
            suggest_placeholders: true,
            deprecation_diagnostics: true,
            diagnostics_debounce_ms: 200,
        }
    }
}

impl WorkspaceConfig {
    /// Check if settings that affect which documents are known changed
    pub fn scan_settings_changed(&self, other: &Self) -> bool {
        self.max_scan_depth != other.max_scan_depth
            || self.follow_links != other.follow_links
            || self.exclude != other.exclude
            || self.load_paths != other.load_paths
    }

    pub fn exclude_matcher(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern).with_context(|| format!("invalid exclude glob '{}'", pattern))?;
            builder.add(glob);
        }
        builder.build().context("building exclude globs")
    }
}

fn string_list(value: &serde_json::Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect()
    })
}

/// Parse settings from `initializationOptions` or a configuration change.
/// Missing or mistyped keys keep their defaults.
pub fn parse_workspace_config(settings: &serde_json::Value) -> WorkspaceConfig {
    let mut config = WorkspaceConfig::default();

    if let Some(workspace) = settings.get("workspace") {
        if let Some(v) = workspace.get("maxScanDepth").and_then(|v| v.as_u64()) {
            config.max_scan_depth = v as usize;
        }
        if let Some(v) = workspace.get("followLinks").and_then(|v| v.as_bool()) {
            config.follow_links = v;
        }
        if let Some(v) = workspace.get("exclude").and_then(string_list) {
            config.exclude = v;
        }
        if let Some(v) = workspace.get("loadPaths").and_then(string_list) {
            config.load_paths = v;
        }
    }

    if let Some(completion) = settings.get("completion") {
        if let Some(v) = completion.get("suggestFromUseOnly").and_then(|v| v.as_bool()) {
            config.suggest_from_use_only = v;
        }
        if let Some(v) = completion.get("suggestVariables").and_then(|v| v.as_bool()) {
            config.suggest_variables = v;
        }
        if let Some(v) = completion.get("suggestMixins").and_then(|v| v.as_bool()) {
            config.suggest_mixins = v;
        }
        if let Some(v) = completion.get("suggestFunctions").and_then(|v| v.as_bool()) {
            config.suggest_functions = v;
        }
        if let Some(v) = completion
            .get("suggestPlaceholders")
            .and_then(|v| v.as_bool())
        {
            config.suggest_placeholders = v;
        }
    }

    if let Some(diagnostics) = settings.get("diagnostics") {
        if let Some(v) = diagnostics.get("deprecation").and_then(|v| v.as_bool()) {
            config.deprecation_diagnostics = v;
        }
        if let Some(v) = diagnostics.get("debounceMs").and_then(|v| v.as_u64()) {
            config.diagnostics_debounce_ms = v;
        }
    }

    log::info!("Workspace configuration:");
    log::info!("  max_scan_depth: {}", config.max_scan_depth);
    log::info!("  follow_links: {}", config.follow_links);
    log::info!("  exclude: {:?}", config.exclude);
    log::info!("  load_paths: {:?}", config.load_paths);
    log::info!("  suggest_from_use_only: {}", config.suggest_from_use_only);
    log::info!("  deprecation_diagnostics: {}", config.deprecation_diagnostics);
    log::info!("  diagnostics_debounce_ms: {}", config.diagnostics_debounce_ms);

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_values() {
        let config = WorkspaceConfig::default();
        assert_eq!(config.max_scan_depth, 30);
        assert!(config.follow_links);
        assert_eq!(config.exclude.len(), 2);
        assert!(config.load_paths.is_empty());
        assert!(!config.suggest_from_use_only);
        assert!(config.suggest_variables && config.suggest_placeholders);
        assert!(config.deprecation_diagnostics);
        assert_eq!(config.diagnostics_debounce_ms, 200);
    }

    #[test]
    fn test_parse_overrides() {
        let settings = json!({
            "workspace": {
                "maxScanDepth": 5,
                "followLinks": false,
                "exclude": ["**/vendor/**"],
                "loadPaths": ["styles", 3]
            },
            "completion": { "suggestFromUseOnly": true, "suggestMixins": false },
            "diagnostics": { "deprecation": false, "debounceMs": 50 }
        });
        let config = parse_workspace_config(&settings);
        assert_eq!(config.max_scan_depth, 5);
        assert!(!config.follow_links);
        assert_eq!(config.exclude, vec!["**/vendor/**"]);
        assert_eq!(config.load_paths, vec!["styles"]);
        assert!(config.suggest_from_use_only);
        assert!(!config.suggest_mixins);
        assert!(config.suggest_functions);
        assert!(!config.deprecation_diagnostics);
        assert_eq!(config.diagnostics_debounce_ms, 50);
    }

    #[test]
    fn test_mistyped_values_keep_defaults() {
        let config = parse_workspace_config(&json!({ "workspace": { "maxScanDepth": "deep" } }));
        assert_eq!(config, WorkspaceConfig::default());
    }

    #[test]
    fn test_scan_settings_changed() {
        let a = WorkspaceConfig::default();
        let mut b = WorkspaceConfig::default();
        b.suggest_mixins = false;
        assert!(!a.scan_settings_changed(&b));
        b.load_paths.push("lib".to_string());
        assert!(a.scan_settings_changed(&b));
    }

    #[test]
    fn test_exclude_matcher() {
        let matcher = WorkspaceConfig::default().exclude_matcher().unwrap();
        assert!(matcher.is_match("/ws/node_modules/pkg/_a.scss"));
        assert!(!matcher.is_match("/ws/src/_a.scss"));

        let mut bad = WorkspaceConfig::default();
        bad.exclude = vec!["[".to_string()];
        assert!(bad.exclude_matcher().is_err());
    }
}
