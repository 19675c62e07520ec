//! Binary signature classification.
//!
//! A binary is recognised by raw substring search for marker strings left in
//! it by the runtime it embeds. The marker tables are plain data: to support
//! a new runtime, add a row. Rows are checked in table order and the first
//! row that matches decides the category.

use crate::model::Category;
use regex::bytes::RegexSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// A byte sequence whose presence identifies a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub category: Category,
    pub needle: &'static str,
}

const fn marker(category: Category, needle: &'static str) -> Marker {
    Marker { category, needle }
}

/// Markers used by the general executable scan, in priority order.
///
/// Electron is recognised only by its Node-integration symbols; the generic
/// CEF string conversion symbol comes last so that any more specific runtime
/// wins.
pub const RUNTIME_MARKERS: &[Marker] = &[
    marker(Category::Electron, "third_party/electron_node"),
    marker(Category::Electron, "register_atom_browser_web_contents"),
    marker(Category::NwJs, "url-nwjs"),
    marker(Category::CefSharp, "CefSharp.Internals"),
    marker(Category::Cef, "cef_string_utf8_to_utf16"),
];

/// Markers for lightweight embedders, only checked next to native Node modules.
pub const EMBEDDED_MARKERS: &[Marker] = &[
    marker(Category::MiniElectron, "napi_create_buffer"),
    marker(Category::MiniBlink, "miniblink"),
];

/// Classifies binary content against one marker table.
pub struct Classifier {
    markers: &'static [Marker],
    set: RegexSet,
}

impl Classifier {
    /// Builds a classifier for `markers`.
    pub fn new(markers: &'static [Marker]) -> Result<Self, regex::Error> {
        let set = RegexSet::new(markers.iter().map(|m| regex::escape(m.needle)))?;
        Ok(Self { markers, set })
    }

    /// Classifier over [`RUNTIME_MARKERS`].
    pub fn runtime() -> &'static Classifier {
        static RUNTIME: OnceLock<Classifier> = OnceLock::new();
        RUNTIME.get_or_init(|| {
            Classifier::new(RUNTIME_MARKERS).expect("escaped marker literals always compile")
        })
    }

    /// Classifier over [`EMBEDDED_MARKERS`].
    pub fn embedded() -> &'static Classifier {
        static EMBEDDED: OnceLock<Classifier> = OnceLock::new();
        EMBEDDED.get_or_init(|| {
            Classifier::new(EMBEDDED_MARKERS).expect("escaped marker literals always compile")
        })
    }

    /// Returns the category of the earliest table row found in `bytes`.
    pub fn classify(&self, bytes: &[u8]) -> Option<Category> {
        self.set
            .matches(bytes)
            .iter()
            .next()
            .map(|index| self.markers[index].category)
    }

    /// Reads `path` fully and classifies it. Unreadable files classify as `None`.
    pub fn classify_file(&self, path: &Path) -> Option<Category> {
        match fs::read(path) {
            Ok(bytes) => self.classify(&bytes),
            Err(e) => {
                debug!("Skipping unreadable executable {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(parts: &[&str]) -> Vec<u8> {
        let mut bytes = vec![0x7f, b'E', b'L', b'F', 0, 0, 1];
        for part in parts {
            bytes.extend_from_slice(part.as_bytes());
            bytes.extend_from_slice(&[0, 0xff, 0]);
        }
        bytes
    }

    #[test]
    fn test_each_runtime_marker() {
        let classifier = Classifier::runtime();
        for m in RUNTIME_MARKERS {
            assert_eq!(classifier.classify(&binary(&[m.needle])), Some(m.category));
        }
    }

    #[test]
    fn test_electron_beats_generic_cef() {
        let bytes = binary(&["cef_string_utf8_to_utf16", "register_atom_browser_web_contents"]);
        assert_eq!(Classifier::runtime().classify(&bytes), Some(Category::Electron));
    }

    #[test]
    fn test_priority_follows_table_order() {
        let bytes = binary(&["CefSharp.Internals", "url-nwjs", "cef_string_utf8_to_utf16"]);
        assert_eq!(Classifier::runtime().classify(&bytes), Some(Category::NwJs));

        let bytes = binary(&["cef_string_utf8_to_utf16", "CefSharp.Internals"]);
        assert_eq!(Classifier::runtime().classify(&bytes), Some(Category::CefSharp));
    }

    #[test]
    fn test_no_marker() {
        assert_eq!(Classifier::runtime().classify(&binary(&["hello world"])), None);
        assert_eq!(Classifier::runtime().classify(&[]), None);
        // close but not exact
        assert_eq!(Classifier::runtime().classify(b"url-nw js"), None);
    }

    #[test]
    fn test_embedded_markers_are_separate() {
        let bytes = binary(&["miniblink"]);
        assert_eq!(Classifier::runtime().classify(&bytes), None);
        assert_eq!(Classifier::embedded().classify(&bytes), Some(Category::MiniBlink));

        let bytes = binary(&["miniblink", "napi_create_buffer"]);
        assert_eq!(Classifier::embedded().classify(&bytes), Some(Category::MiniElectron));
    }

    #[test]
    fn test_classify_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app");
        fs::write(&path, binary(&["third_party/electron_node"])).unwrap();

        assert_eq!(Classifier::runtime().classify_file(&path), Some(Category::Electron));
        assert_eq!(Classifier::runtime().classify_file(&dir.path().join("gone")), None);
    }
}
