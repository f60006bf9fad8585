use std::path::{Component, Path, PathBuf};

/// Whether an import specifier is local (`./x.sol`, `../lib/y.sol`).
///
/// Library-style specifiers (`@openzeppelin/...`, `lib/x.sol`) are left to the
/// downstream compiler toolchain.
pub fn is_relative_specifier(spec: &str) -> bool {
    spec.starts_with("./") || spec.starts_with("../")
}

/// Resolve a relative import against the importing file's directory.
///
/// Returns `None` for non-relative specifiers.
pub fn resolve_import(importer_dir: &Path, spec: &str) -> Option<PathBuf> {
    if !is_relative_specifier(spec) {
        return None;
    }
    Some(normalize_path(&importer_dir.join(spec)))
}

/// Absolute, lexically normalized form of `path`.
///
/// `.` components are dropped and `..` pops the previous normal component. The
/// filesystem is never consulted, so missing files still get a stable identity.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `/..` stays at the root
                if !matches!(out.components().next_back(), Some(Component::RootDir) | None) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Identity of a file inside one visited set: the canonical path when the
/// file exists, so symlinked directories cannot re-enter a file under a new
/// name, else the lexical form.
pub fn source_identity(path: &Path) -> PathBuf {
    let lexical = normalize_path(path);
    std::fs::canonicalize(&lexical).unwrap_or(lexical)
}
