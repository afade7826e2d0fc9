//! Generated artifact naming and ownership
//!
//! Compiled plugins land in `<root>/<kind dir>/<stem>_generated.<dll ext>`.
//! Cleanup only deletes files matching exactly this convention, so changing it
//! silently stops generated libraries from being removed.

use std::env::consts::DLL_EXTENSION;
use std::path::{Component, Path, PathBuf};

/// Marker carried by every file stem the compiler generates
pub const GENERATED_SUFFIX: &str = "_generated";

/// Root of the reserved generated-artifact directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserved directory for one extension kind
    #[must_use]
    pub fn dir(&self, kind_dir: &str) -> PathBuf {
        self.root.join(kind_dir)
    }

    /// Where the compiler writes the library built from `source`.
    ///
    /// Only the sanitized stem is used: `a/List.cpp` and `b/List.cpp` share
    /// one artifact path, and a cache that already loaded it keeps serving
    /// the first library.
    #[must_use]
    pub fn artifact_path(&self, kind_dir: &str, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.dir(kind_dir).join(format!(
            "{}{GENERATED_SUFFIX}.{DLL_EXTENSION}",
            sanitize_stem(&stem)
        ))
    }

    /// Whether cleanup may delete `path`.
    ///
    /// True only for a direct child of the kind's reserved directory whose stem
    /// carries [`GENERATED_SUFFIX`] and whose extension is the platform's
    /// shared-library extension.
    #[must_use]
    pub fn owns(&self, kind_dir: &str, path: &Path) -> bool {
        let in_reserved_dir = path
            .parent()
            .is_some_and(|parent| canonical_path(parent) == canonical_path(&self.dir(kind_dir)));
        let generated_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| stem.contains(GENERATED_SUFFIX));
        let library_ext = path.extension().and_then(|e| e.to_str()) == Some(DLL_EXTENSION);

        in_reserved_dir && generated_name && library_ext
    }
}

/// Replace every character other than ASCII alphanumerics and `_` with `_`
#[must_use]
pub fn sanitize_stem(stem: &str) -> String {
    let sanitized: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        "plugin".to_string()
    } else {
        sanitized
    }
}

/// Absolute, normalized form of `path`, used as the cache key.
///
/// Existing files are canonicalized by the OS (symlinks resolved). Paths that do
/// not exist are made absolute against the working directory and cleaned
/// lexically, so `a/./b` and `a/x/../b` still collapse to one key.
#[must_use]
pub fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn test_artifact_path_convention() {
        let layout = ArtifactLayout::new("build");
        let path = layout.artifact_path("structures", Path::new("/src/my list-v2.cpp"));

        assert_eq!(path.parent(), Some(Path::new("build/structures")));
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(format!("my_list_v2_generated.{DLL_EXTENSION}").as_str())
        );
    }

    #[test]
    fn test_same_stem_shares_artifact_path() {
        let layout = ArtifactLayout::new("build");
        assert_eq!(
            layout.artifact_path("structures", Path::new("/a/List.cpp")),
            layout.artifact_path("structures", Path::new("/b/List.cpp"))
        );
        assert_ne!(
            layout.artifact_path("structures", Path::new("/a/List.cpp")),
            layout.artifact_path("algorithms", Path::new("/a/List.cpp"))
        );
    }

    #[test]
    fn test_owns_generated_artifact() {
        let dir = tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        std::fs::create_dir_all(layout.dir("structures")).unwrap();

        let generated = layout.artifact_path("structures", Path::new("Array.cpp"));
        std::fs::write(&generated, b"").unwrap();

        assert!(layout.owns("structures", &canonical_path(&generated)));
        assert!(!layout.owns("algorithms", &canonical_path(&generated)));
    }

    #[test]
    fn test_rejects_external_and_misnamed_libraries() {
        let dir = tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("build"));
        let reserved = layout.dir("structures");
        std::fs::create_dir_all(&reserved).unwrap();

        let outside = dir.path().join(format!("Array{GENERATED_SUFFIX}.{DLL_EXTENSION}"));
        let no_suffix = reserved.join(format!("Array.{DLL_EXTENSION}"));
        let wrong_ext = reserved.join(format!("Array{GENERATED_SUFFIX}.txt"));
        let nested = reserved
            .join("nested")
            .join(format!("Array{GENERATED_SUFFIX}.{DLL_EXTENSION}"));

        for path in [&outside, &no_suffix, &wrong_ext, &nested] {
            assert!(!layout.owns("structures", path), "{}", path.display());
        }
    }

    #[test]
    fn test_canonical_path_collapses_spellings() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        let file = sub.join("lib.so");
        std::fs::write(&file, b"").unwrap();

        let direct = canonical_path(&file);
        let dotted = canonical_path(&dir.path().join("sub/./../sub/lib.so"));
        assert_eq!(direct, dotted);
    }

    #[test]
    fn test_canonical_path_for_missing_file_is_lexical() {
        let base = std::env::temp_dir().join("raystruct-missing");
        let a = canonical_path(&base.join("x/../y/lib.so"));
        let b = canonical_path(&base.join("./y/lib.so"));
        assert_eq!(a, b);
        assert!(a.is_absolute());
    }

    #[test]
    fn test_sanitize_empty_stem() {
        assert_eq!(sanitize_stem(""), "plugin");
    }

    proptest! {
        #[test]
        fn prop_sanitized_stem_is_identifier_safe(stem in "\\PC{1,24}") {
            let sanitized = sanitize_stem(&stem);
            prop_assert!(sanitized.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            prop_assert_eq!(sanitized.chars().count(), stem.chars().count());
        }
    }
}
