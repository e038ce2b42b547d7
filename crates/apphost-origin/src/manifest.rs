//! Application manifest model.
//!
//! The origin publishes a JSON array of applications; each entry names one
//! deployable version of a page bundle or a standalone script bundle.

use serde::{Deserialize, Serialize};

/// Kind of deployable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppKind {
    /// HTML pages plus their assets
    #[serde(rename = "html", alias = "page-bundle")]
    PageBundle,
    /// A single script served at a fixed entry-point key
    #[serde(rename = "javascript", alias = "script-bundle")]
    ScriptBundle,
}

/// One deployable application version, as listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    /// Origin directory holding every version of the application
    pub location: String,
    /// Public routing key
    pub name: String,
    pub version: String,
    /// Cache key for script bundles
    #[serde(default)]
    pub entry_point: String,
    #[serde(rename = "type")]
    pub kind: AppKind,
}

impl App {
    pub fn page(name: &str, version: &str, location: &str) -> Self {
        App {
            location: location.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            entry_point: String::new(),
            kind: AppKind::PageBundle,
        }
    }

    pub fn script(name: &str, version: &str, location: &str, entry_point: &str) -> Self {
        App {
            location: location.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            entry_point: entry_point.to_string(),
            kind: AppKind::ScriptBundle,
        }
    }

    /// `(name, version)` identity used for change detection.
    pub fn identity(&self) -> (&str, &str) {
        (&self.name, &self.version)
    }
}

/// Ordered application set from one manifest fetch.
pub type Apps = Vec<App>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_wire_format() {
        let json = r#"[
            {"location": "apps/shop", "name": "shop", "version": "1.0.0", "entryPoint": "index.html", "type": "html"},
            {"location": "widgets/chat", "name": "chat", "version": "2.1.0", "entryPoint": "/widgets/chat.js", "type": "javascript"}
        ]"#;
        let apps: Apps = serde_json::from_str(json).unwrap();

        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].kind, AppKind::PageBundle);
        assert_eq!(apps[0].identity(), ("shop", "1.0.0"));
        assert_eq!(apps[1].kind, AppKind::ScriptBundle);
        assert_eq!(apps[1].entry_point, "/widgets/chat.js");
    }

    #[test]
    fn test_kind_aliases_and_missing_entry_point() {
        let json = r#"{"location": "a", "name": "a", "version": "1", "type": "page-bundle"}"#;
        let app: App = serde_json::from_str(json).unwrap();
        assert_eq!(app.kind, AppKind::PageBundle);
        assert!(app.entry_point.is_empty());

        let json = r#"{"location": "b", "name": "b", "version": "1", "entryPoint": "/b.js", "type": "script-bundle"}"#;
        let app: App = serde_json::from_str(json).unwrap();
        assert_eq!(app.kind, AppKind::ScriptBundle);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let json = r#"{"location": "a", "name": "a", "version": "1", "type": "wasm"}"#;
        assert!(serde_json::from_str::<App>(json).is_err());
    }
}
