//! Vendor file convention and dependency-namespace canonicalization.
//!
//! Third-party libraries ship as `vendor/{package}[_{semver}].js`. Whatever
//! application bundles them, they are cached once under the shared dependency
//! namespace, and application code referring to its private `@vendor/`
//! directory is rewritten to point there. Files below an `@vendor` directory
//! are stored at `{namespace}/{rest}` so those rewritten references resolve.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{NoExpand, Regex};

use crate::domain::ParseError;
use crate::paths::join_url;

/// Dependency namespace used when none is configured.
pub const DEFAULT_DEPENDENCY_PATH: &str = "/@node_modules";

const VENDOR_FILE_PATTERN: &str = r"(?:^|/)@?vendor/(?P<package>(?:@[a-z-]+)?[a-z-]+)(?P<version>_[0-9]+\.[0-9]+\.[0-9]+(?:-[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?(?:\+[0-9A-Za-z-]+)?)?(?:\.[a-z]+)*\.js$";

fn vendor_file_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VENDOR_FILE_PATTERN).expect("vendor pattern is valid"))
}

fn relative_vendor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\./@vendor/").expect("relative vendor pattern is valid"))
}

/// Result of matching a path against the vendor convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorMatch<'a> {
    /// `version` keeps its leading `_`, or is empty when the file is unversioned.
    Matched { package: &'a str, version: &'a str },
    NoMatch,
}

/// Extract `(package, version)` from a vendor file path.
pub fn vendor_name_version(path: &str) -> VendorMatch<'_> {
    match vendor_file_regex().captures(path) {
        Some(caps) => match caps.name("package") {
            Some(package) => VendorMatch::Matched {
                package: package.as_str(),
                version: caps.name("version").map_or("", |m| m.as_str()),
            },
            None => VendorMatch::NoMatch,
        },
        None => VendorMatch::NoMatch,
    }
}

/// JavaScript file following the vendor convention.
pub fn is_vendor_js(path: &str) -> bool {
    vendor_file_regex().is_match(path)
}

/// JavaScript file living in a `vendor/` or `@vendor/` directory. Such files
/// must follow the vendor convention.
pub fn in_vendor_dir(path: &str) -> bool {
    path.ends_with(".js")
        && path
            .split('/')
            .any(|segment| segment == "vendor" || segment == "@vendor")
}

/// Path below the first `@vendor` segment, or `None` outside one.
///
/// `VendorReplacer` maps `@vendor/{rest}` references onto
/// `{namespace}/{rest}`, so files stored there must use the same key.
pub fn shared_vendor_path(path: &str) -> Option<&str> {
    let rest = match path.strip_prefix("@vendor/") {
        Some(rest) => rest,
        None => {
            let at = path.find("/@vendor/")?;
            &path[at + "/@vendor/".len()..]
        }
    };
    (!rest.is_empty()).then_some(rest)
}

/// Dependency-namespace key for a vendor file:
/// `{namespace}/{package}{version}.js`.
pub fn dependency_key(namespace: &str, path: &str) -> Result<String, ParseError> {
    match vendor_name_version(path) {
        VendorMatch::Matched { package, version } => {
            Ok(join_url(namespace, &[&format!("{package}{version}.js")]))
        }
        VendorMatch::NoMatch => Err(ParseError::VendorPattern {
            path: path.to_string(),
        }),
    }
}

/// Per-application rewrite of `@vendor/` references into the shared
/// dependency namespace.
#[derive(Debug, Clone)]
pub struct VendorReplacer {
    app_vendor: Regex,
    target: String,
}

impl VendorReplacer {
    pub fn new(name: &str, version: &str, namespace: &str) -> Result<Self, ParseError> {
        let app_vendor = Regex::new(&regex::escape(&format!("/{name}/{version}/@vendor/")))?;
        Ok(VendorReplacer {
            app_vendor,
            target: format!("{}/", namespace.trim_end_matches('/')),
        })
    }

    pub fn replace<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self.app_vendor.replace_all(text, NoExpand(&self.target)) {
            Cow::Borrowed(text) => relative_vendor_regex().replace_all(text, NoExpand(&self.target)),
            Cow::Owned(replaced) => Cow::Owned(
                relative_vendor_regex()
                    .replace_all(&replaced, NoExpand(&self.target))
                    .into_owned(),
            ),
        }
    }

    /// Apply `replace` to UTF-8 content; other bytes pass through untouched.
    pub fn replace_bytes(&self, content: Vec<u8>) -> Vec<u8> {
        match std::str::from_utf8(&content) {
            Ok(text) => match self.replace(text) {
                Cow::Borrowed(_) => content,
                Cow::Owned(replaced) => replaced.into_bytes(),
            },
            Err(_) => content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_match_round_trips() {
        let paths = [
            "vendor/lodash_4.17.21.js",
            "assets/vendor/react-dom_18.2.0.js",
            "vendor/@angular-core_16.0.0-rc.1+build.js",
            "vendor/left-pad.js",
        ];
        for path in paths {
            match vendor_name_version(path) {
                VendorMatch::Matched { package, version } => {
                    let rebuilt = format!("vendor/{package}{version}");
                    assert!(path.contains(&rebuilt), "{path} vs {rebuilt}");
                }
                VendorMatch::NoMatch => panic!("{path} should match"),
            }
        }
    }

    #[test]
    fn test_vendor_match_groups() {
        assert_eq!(
            vendor_name_version("vendor/lodash_4.17.21.js"),
            VendorMatch::Matched {
                package: "lodash",
                version: "_4.17.21"
            }
        );
        assert_eq!(
            vendor_name_version("vendor/left-pad.js"),
            VendorMatch::Matched {
                package: "left-pad",
                version: ""
            }
        );
        assert_eq!(vendor_name_version("js/app.js"), VendorMatch::NoMatch);
    }

    #[test]
    fn test_is_vendor_js() {
        assert!(is_vendor_js("vendor/lodash_4.17.21.js"));
        assert!(!is_vendor_js("vendor/lodash_4.17.21.css"));
        assert!(!is_vendor_js("app.js"));

        assert!(in_vendor_dir("@vendor/lodash_4.17.21.js"));
        assert!(in_vendor_dir("vendor/123.js"));
        assert!(!in_vendor_dir("js/devendor/x.js"));
    }

    #[test]
    fn test_vendor_convention_needs_whole_segment() {
        assert!(!is_vendor_js("js/devendor/app.js"));
        assert!(!is_vendor_js("js/myvendor/lodash_4.17.21.js"));
        assert_eq!(vendor_name_version("js/devendor/app.js"), VendorMatch::NoMatch);
        assert!(is_vendor_js("assets/@vendor/react_18.2.0.js"));
    }

    #[test]
    fn test_version_stops_before_extension() {
        assert_eq!(
            vendor_name_version("vendor/lodash_4.17.21-beta.js"),
            VendorMatch::Matched {
                package: "lodash",
                version: "_4.17.21-beta"
            }
        );
        assert_eq!(
            vendor_name_version("vendor/react-dom_18.2.0.min.js"),
            VendorMatch::Matched {
                package: "react-dom",
                version: "_18.2.0"
            }
        );
    }

    #[test]
    fn test_shared_vendor_path() {
        assert_eq!(shared_vendor_path("@vendor/theme_1.0.0.css"), Some("theme_1.0.0.css"));
        assert_eq!(shared_vendor_path("css/@vendor/fonts/a.woff2"), Some("fonts/a.woff2"));
        assert_eq!(shared_vendor_path("vendor/lodash_4.17.21.js"), None);
        assert_eq!(shared_vendor_path("js/my@vendor/x.js"), None);
        assert_eq!(shared_vendor_path("@vendor/"), None);
    }

    #[test]
    fn test_dependency_key() {
        assert_eq!(
            dependency_key(DEFAULT_DEPENDENCY_PATH, "vendor/lodash_4.17.21.js").unwrap(),
            "/@node_modules/lodash_4.17.21.js"
        );
        assert!(matches!(
            dependency_key(DEFAULT_DEPENDENCY_PATH, "vendor/123.js"),
            Err(ParseError::VendorPattern { .. })
        ));
    }

    #[test]
    fn test_replacer_rewrites_both_forms() {
        let replacer = VendorReplacer::new("shop", "1.0.0", DEFAULT_DEPENDENCY_PATH).unwrap();
        let text = r#"import a from "/shop/1.0.0/@vendor/lodash_4.17.21.js"; import b from "./@vendor/react_18.2.0.js";"#;

        assert_eq!(
            replacer.replace(text),
            r#"import a from "/@node_modules/lodash_4.17.21.js"; import b from "/@node_modules/react_18.2.0.js";"#
        );
    }

    #[test]
    fn test_replacer_leaves_other_apps_alone() {
        let replacer = VendorReplacer::new("shop", "1.0.0", DEFAULT_DEPENDENCY_PATH).unwrap();
        let text = "/blog/2.0.0/@vendor/x.js";
        assert!(matches!(replacer.replace(text), Cow::Borrowed(_)));
    }

    #[test]
    fn test_replacer_escapes_version_dots() {
        let replacer = VendorReplacer::new("shop", "1.0.0", DEFAULT_DEPENDENCY_PATH).unwrap();
        assert_eq!(replacer.replace("/shop/1x0x0/@vendor/x.js"), "/shop/1x0x0/@vendor/x.js");
    }

    #[test]
    fn test_replace_bytes_passes_binary_through() {
        let replacer = VendorReplacer::new("shop", "1.0.0", DEFAULT_DEPENDENCY_PATH).unwrap();
        let png = vec![0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe];
        assert_eq!(replacer.replace_bytes(png.clone()), png);
    }
}
