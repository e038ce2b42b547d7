//! Keeps the external authentication gate's route matching in sync with the
//! published application index.

use std::sync::{PoisonError, RwLock};

use regex::Regex;

/// Notified with the application names of every published build.
pub trait AppsListener: Send + Sync {
    fn on_rebuild(&self, app_names: &[String]);
}

/// Route pattern `^/(api|{name}...)` guarded by the authentication gate.
///
/// Matching is by prefix, so `/shop` also covers `/shop/1.0.0/app.js`.
#[derive(Debug)]
pub struct AuthRoutes {
    pattern: RwLock<Regex>,
}

impl Default for AuthRoutes {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthRoutes {
    pub fn new() -> Self {
        AuthRoutes {
            pattern: RwLock::new(
                Self::build(&[]).expect("api-only route pattern is valid"),
            ),
        }
    }

    fn build(app_names: &[String]) -> Result<Regex, regex::Error> {
        let alternatives: Vec<String> = std::iter::once("api".to_string())
            .chain(app_names.iter().map(|name| regex::escape(name)))
            .collect();
        Regex::new(&format!("^/({})", alternatives.join("|")))
    }

    pub fn requires_auth(&self, path: &str) -> bool {
        self.pattern
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_match(path)
    }

    /// Current pattern source.
    pub fn pattern(&self) -> String {
        self.pattern
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_str()
            .to_string()
    }
}

impl AppsListener for AuthRoutes {
    fn on_rebuild(&self, app_names: &[String]) {
        match Self::build(app_names) {
            Ok(pattern) => {
                tracing::debug!(pattern = %pattern.as_str(), "auth routes updated");
                *self.pattern.write().unwrap_or_else(PoisonError::into_inner) = pattern;
            }
            Err(err) => tracing::warn!(error = %err, "auth routes not updated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_only_by_default() {
        let routes = AuthRoutes::new();
        assert_eq!(routes.pattern(), "^/(api)");
        assert!(routes.requires_auth("/api/users"));
        assert!(!routes.requires_auth("/shop"));
    }

    #[test]
    fn test_on_rebuild_replaces_routes() {
        let routes = AuthRoutes::new();
        routes.on_rebuild(&["shop".to_string(), "my.app".to_string()]);

        assert_eq!(routes.pattern(), r"^/(api|shop|my\.app)");
        assert!(routes.requires_auth("/shop/1.0.0/app.js"));
        assert!(routes.requires_auth("/my.app"));
        assert!(!routes.requires_auth("/myxapp"));

        routes.on_rebuild(&["blog".to_string()]);
        assert!(!routes.requires_auth("/shop"));
        assert!(routes.requires_auth("/blog"));
    }
}
