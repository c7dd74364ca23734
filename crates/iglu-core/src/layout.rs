//! Iglu directory layout resolution.
//!
//! Maps a root directory laid out as `<root>/<vendor>/<name>/<format>/<version>`
//! into [`SchemaIdentifier`]s. The same convention is used for test suites,
//! where the version segment carries a `.json` suffix. The suffix is dropped
//! from the version so the suite resolves to the identity of the schema it
//! exercises; `path` always names the file actually on disk.
//!
//! Identifiers come back sorted by path so reports are stable.

use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{LayoutError, Result};
use crate::identifier::SchemaIdentifier;

/// Suffix recognised on declarative suite files.
pub const SUITE_SUFFIX: &str = ".json";

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d-\d-\d)(?:\.json)?$").expect("static regex"))
}

/// Strip the suite suffix from a version file name, if it matches the
/// `digit-digit-digit` convention at all.
pub fn version_segment(file_name: &str) -> Option<&str> {
    version_pattern()
        .captures(file_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Resolve every schema (or suite) file under `root`.
///
/// Fails fast on the first vendor whose suffix is not an event/entity marker
/// and on version-named files that are not exactly four levels deep.
pub fn resolve_layout(root: &Path) -> Result<Vec<SchemaIdentifier>> {
    if !root.is_dir() {
        return Err(LayoutError::RootNotFound(root.to_path_buf()));
    }

    let mut schemas = Vec::new();
    for file in walkdir(root)? {
        let Some(file_name) = file.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(version) = version_segment(file_name) else {
            continue;
        };

        let relative = file.strip_prefix(root).unwrap_or(&file);
        let parts: Vec<&str> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect();

        let [vendor, name, format, _] = parts.as_slice() else {
            return Err(LayoutError::MalformedPath { path: file.clone() });
        };

        let id = SchemaIdentifier::new(*vendor, *name, *format, version, file.clone())?;
        debug!(schema = %id, file = ?file, "resolved schema from layout");
        schemas.push(id);
    }

    Ok(schemas)
}

/// Recursive directory walker yielding regular files in path order.
///
/// Symlinked directories are not descended into, so link cycles terminate.
fn walkdir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if dir.is_dir() {
        let mut entries = std::fs::read_dir(dir)?
            .map(|entry| entry.and_then(|e| Ok((e.path(), e.file_type()?))))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (path, kind) in entries {
            if kind.is_dir() {
                files.extend(walkdir(&path)?);
            } else if kind.is_symlink() && path.is_dir() {
                debug!(path = ?path, "skipping symlinked directory");
            } else {
                files.push(path);
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::SchemaType;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"{}").unwrap();
    }

    #[test]
    fn test_version_segment() {
        assert_eq!(version_segment("1-0-0"), Some("1-0-0"));
        assert_eq!(version_segment("2-1-3.json"), Some("2-1-3"));
        assert_eq!(version_segment("1-0-0.js"), None);
        assert_eq!(version_segment("10-0-0"), None);
        assert_eq!(version_segment("README.md"), None);
    }

    #[test]
    fn test_resolve_single_schema() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "com.example.entities/example/jsonschema/1-0-0");

        let schemas = resolve_layout(dir.path()).unwrap();
        assert_eq!(schemas.len(), 1);
        let s = &schemas[0];
        assert_eq!(s.vendor, "com.example.entities");
        assert_eq!(s.name, "example");
        assert_eq!(s.format, "jsonschema");
        assert_eq!(s.version, "1-0-0");
        assert_eq!(s.schema_type, SchemaType::Entity);
        assert_eq!(
            s.path,
            dir.path().join("com.example.entities/example/jsonschema/1-0-0")
        );
    }

    #[test]
    fn test_suite_suffix_is_stripped() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "com.example.events/click/jsonschema/1-0-2.json");

        let schemas = resolve_layout(dir.path()).unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].version, "1-0-2");
        assert!(schemas[0].path.ends_with("1-0-2.json"));
    }

    #[test]
    fn test_suffixed_schema_keeps_its_real_path() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "com.example.events/click/jsonschema/1-0-0.json");

        let schemas = resolve_layout(dir.path()).unwrap();
        assert_eq!(schemas[0].to_iglu_path(), "com.example.events/click/jsonschema/1-0-0");
        assert!(schemas[0].path.exists(), "{:?}", schemas[0].path);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_not_followed() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "com.example.events/click/jsonschema/1-0-0");
        std::os::unix::fs::symlink(dir.path(), dir.path().join("com.example.events/loop"))
            .unwrap();

        let schemas = resolve_layout(dir.path()).unwrap();
        assert_eq!(schemas.len(), 1);
    }

    #[test]
    fn test_non_matching_files_are_ignored() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "com.example.events/click/jsonschema/1-0-0");
        touch(dir.path(), "com.example.events/click/jsonschema/notes.txt");
        touch(dir.path(), "README.md");

        let schemas = resolve_layout(dir.path()).unwrap();
        assert_eq!(schemas.len(), 1);
    }

    #[test]
    fn test_one_identifier_per_file_in_path_order() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "com.example.events/click/jsonschema/1-0-0");
        touch(dir.path(), "com.example.events/click/jsonschema/1-0-1");
        touch(dir.path(), "com.example.entities/user/jsonschema/1-0-0");

        let paths: Vec<String> = resolve_layout(dir.path())
            .unwrap()
            .iter()
            .map(|s| s.to_iglu_path())
            .collect();
        assert_eq!(
            paths,
            vec![
                "com.example.entities/user/jsonschema/1-0-0",
                "com.example.events/click/jsonschema/1-0-0",
                "com.example.events/click/jsonschema/1-0-1",
            ]
        );
    }

    #[test]
    fn test_unknown_vendor_type_fails_fast() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "com.example.widgets/thing/jsonschema/1-0-0");

        let err = resolve_layout(dir.path()).unwrap_err();
        assert!(matches!(err, LayoutError::UnrecognizedType { .. }));
    }

    #[test]
    fn test_wrong_depth_is_malformed() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "com.example.events/jsonschema/1-0-0");

        let err = resolve_layout(dir.path()).unwrap_err();
        assert!(matches!(err, LayoutError::MalformedPath { .. }));
    }

    #[test]
    fn test_missing_root() {
        let dir = tempdir().unwrap();
        let err = resolve_layout(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, LayoutError::RootNotFound(_)));
    }
}
