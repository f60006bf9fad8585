use crate::path::{resolve_import, source_identity};
use crate::types::{FlattenedUnit, ImportEdge, SourceUnit};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Any `import` statement: plain, `{A, B} from`, `* as X from`, or `"x" as X`.
/// Group 1 is the specifier.
static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*import\b\s*(?:[^;"']*?\bfrom\s*)?["']([^"']+)["'](?:\s+as\s+[A-Za-z_$][A-Za-z0-9_$]*)?\s*;"#,
    )
    .expect("import regex")
});

static LICENSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*//[ \t]*SPDX-License-Identifier:.*(?:\r?\n|$)").expect("license regex")
});

static PRAGMA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*pragma[ \t]+solidity\b[^;]*;[ \t]*(?:\r?\n|$)").expect("pragma regex")
});

/// Produces a self-contained text for a unit.
///
/// Implementations must not share state between calls: every unit starts
/// from an empty visited set.
pub trait SourceFlattener {
    fn flatten(&self, unit: &SourceUnit) -> FlattenedUnit;
}

pub fn start_marker(spec: &str) -> String {
    format!("// ==== begin import \"{spec}\" ====")
}

pub fn end_marker(spec: &str) -> String {
    format!("// ==== end import \"{spec}\" ====")
}

/// Inert replacement for an import whose target was already inlined
pub fn skipped_marker(spec: &str) -> String {
    format!("// ==== import \"{spec}\" already inlined ====")
}

/// Remove every import statement. Used once a unit is self-contained and the
/// remaining imports may not resolve outside the original layout.
pub fn strip_imports(text: &str) -> String {
    IMPORT_RE.replace_all(text, "").into_owned()
}

/// Remove SPDX license lines and `pragma solidity` lines.
pub fn strip_unit_metadata(text: &str) -> String {
    let without_license = LICENSE_RE.replace_all(text, "");
    PRAGMA_RE.replace_all(&without_license, "").into_owned()
}

/// Regex-driven flattener for relative Solidity imports.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportFlattener;

impl ImportFlattener {
    pub fn new() -> Self {
        Self
    }

    /// Every import statement in `raw_text`, relative or not
    pub fn imports(&self, raw_text: &str, from_path: &Path) -> Vec<ImportEdge> {
        IMPORT_RE
            .captures_iter(raw_text)
            .map(|caps| ImportEdge {
                from_path: from_path.to_path_buf(),
                import_spec: caps[1].to_string(),
            })
            .collect()
    }

    /// Flatten `raw_text`, read from `file_path`, with a fresh visited set.
    pub fn flatten_source(
        &self,
        origin_id: &str,
        raw_text: &str,
        file_path: &Path,
    ) -> FlattenedUnit {
        let mut visited = HashSet::new();
        visited.insert(source_identity(file_path));

        let flattened_text = self.flatten_into(raw_text, file_path, &mut visited);
        log::debug!(
            "Flattened {} ({} files inlined)",
            file_path.display(),
            visited.len().saturating_sub(1)
        );

        FlattenedUnit {
            origin_id: origin_id.to_string(),
            flattened_text,
            visited,
        }
    }

    fn flatten_into(
        &self,
        raw_text: &str,
        file_path: &Path,
        visited: &mut HashSet<PathBuf>,
    ) -> String {
        let importer_dir = file_path.parent().unwrap_or_else(|| Path::new(""));

        let mut out = String::with_capacity(raw_text.len());
        let mut last = 0;
        for caps in IMPORT_RE.captures_iter(raw_text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let spec = &caps[1];

            out.push_str(&raw_text[last..whole.start()]);
            last = whole.end();

            let statement = whole.as_str();
            let replacement = self.inline_import(statement, spec, importer_dir, visited);
            out.push_str(&replacement);
        }
        out.push_str(&raw_text[last..]);
        out
    }

    fn inline_import(
        &self,
        statement: &str,
        spec: &str,
        importer_dir: &Path,
        visited: &mut HashSet<PathBuf>,
    ) -> String {
        let Some(target) = resolve_import(importer_dir, spec) else {
            return statement.to_string();
        };

        // Keep the statement's indentation in front of the marker
        let indent: String = statement
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();

        let identity = source_identity(&target);
        if visited.contains(&identity) {
            log::debug!("Import cycle or repeat at {}, skipping", identity.display());
            return format!("{indent}{}", skipped_marker(spec));
        }

        let body = match std::fs::read_to_string(&target) {
            Ok(body) => body,
            Err(e) => {
                log::debug!("Cannot read import {} ({e}), leaving as-is", target.display());
                return statement.to_string();
            }
        };
        visited.insert(identity);

        let stripped = strip_unit_metadata(&body);
        let inlined = self.flatten_into(&stripped, &target, visited);
        format!(
            "{indent}{}\n{}\n{indent}{}",
            start_marker(spec),
            inlined.trim_matches(|c| c == '\n' || c == '\r'),
            end_marker(spec)
        )
    }
}

impl SourceFlattener for ImportFlattener {
    fn flatten(&self, unit: &SourceUnit) -> FlattenedUnit {
        self.flatten_source(&unit.origin_id, &unit.raw_text, &unit.file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn import_regex_recognises_all_statement_forms() {
        let src = r#"
import "./A.sol";
import {B, C} from "./B.sol";
import * as D from '../D.sol';
import "./E.sol" as E;
import {
    F,
    G
} from "./FG.sol";
import "@openzeppelin/contracts/access/Ownable.sol";
"#;
        let specs: Vec<String> = ImportFlattener::new()
            .imports(src, Path::new("/x/Main.sol"))
            .into_iter()
            .map(|edge| edge.import_spec)
            .collect();
        assert_eq!(
            specs,
            vec![
                "./A.sol",
                "./B.sol",
                "../D.sol",
                "./E.sol",
                "./FG.sol",
                "@openzeppelin/contracts/access/Ownable.sol",
            ]
        );
    }

    #[test]
    fn strip_removes_license_and_version_pragma_only() {
        let src = "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.0;\npragma abicoder v2;\ncontract A {}\n";
        assert_eq!(strip_unit_metadata(src), "pragma abicoder v2;\ncontract A {}\n");
    }

    #[test]
    fn strip_imports_drops_relative_and_library_imports() {
        let src = "import \"./A.sol\";\nimport {X} from \"@oz/X.sol\";\ncontract A {}\n";
        assert_eq!(strip_imports(src), "\n\ncontract A {}\n");
    }

    #[test]
    fn library_imports_are_left_in_place() {
        let src = "import \"@oz/Ownable.sol\";\ncontract A {}\n";
        let flat = ImportFlattener::new().flatten_source("a", src, Path::new("/nowhere/A.sol"));
        assert_eq!(flat.flattened_text, src);
        assert_eq!(flat.visited.len(), 1);
    }

    #[test]
    fn unreadable_relative_import_is_left_unchanged() {
        let src = "import \"./Missing.sol\";\ncontract A {}\n";
        let flat = ImportFlattener::new().flatten_source(
            "a",
            src,
            Path::new("/definitely/not/here/A.sol"),
        );
        assert_eq!(flat.flattened_text, src);
    }
}
