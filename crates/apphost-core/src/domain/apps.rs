//! Application index and manifest change detection.

use std::collections::BTreeMap;

use apphost_origin::App;
use serde::Serialize;

/// Application index: `name` → application. Rebuilt wholesale on every
/// manifest fetch; duplicate names resolve to the last entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppsMap(BTreeMap<String, App>);

impl AppsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_apps(apps: &[App]) -> Self {
        let mut map = BTreeMap::new();
        for app in apps {
            map.insert(app.name.clone(), app.clone());
        }
        AppsMap(map)
    }

    pub fn get(&self, name: &str) -> Option<&App> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Application names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn apps(&self) -> impl Iterator<Item = &App> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A version change for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionChange {
    pub name: String,
    pub from: String,
    pub to: String,
}

/// Difference between the active index and a freshly fetched one, by
/// `(name, version)` identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub updated: Vec<VersionChange>,
}

impl ManifestDelta {
    pub fn between(active: &AppsMap, fresh: &AppsMap) -> Self {
        let mut delta = ManifestDelta::default();

        for app in fresh.apps() {
            match active.get(&app.name) {
                None => delta.added.push(app.name.clone()),
                Some(current) if current.version != app.version => {
                    delta.updated.push(VersionChange {
                        name: app.name.clone(),
                        from: current.version.clone(),
                        to: app.version.clone(),
                    })
                }
                Some(_) => {}
            }
        }
        for app in active.apps() {
            if !fresh.contains(&app.name) {
                delta.removed.push(app.name.clone());
            }
        }
        delta
    }

    /// No application was added, removed or moved to another version.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}
