use crate::error::{FlattenError, Result};
use crate::types::{SizeCategory, SizeThresholds, SourceUnit};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

pub const DEFAULT_SOURCE_EXTENSION: &str = "sol";

/// Scanner for finding source units in a corpus directory
pub struct CorpusScanner {
    root: PathBuf,
    thresholds: SizeThresholds,
    extension: String,
}

impl CorpusScanner {
    pub fn new(root: impl AsRef<Path>, thresholds: SizeThresholds) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            thresholds,
            extension: DEFAULT_SOURCE_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Discover every unit below the root, sorted by path.
    ///
    /// Unreadable files are skipped with a warning; a missing root is fatal.
    pub fn scan(&self) -> Result<Vec<SourceUnit>> {
        if !self.root.is_dir() {
            return Err(FlattenError::InvalidCorpus(format!(
                "Corpus directory does not exist: {}",
                self.root.display()
            )));
        }

        let mut paths = Vec::new();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if file_type.is_file() && self.is_source_file(entry.path()) {
                        paths.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }
        paths.sort();

        let mut units = Vec::with_capacity(paths.len());
        for path in paths {
            let raw_text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("Skipping unreadable unit {}: {e}", path.display());
                    continue;
                }
            };
            let Some(origin_id) = path.file_stem().and_then(|s| s.to_str()) else {
                log::warn!("Skipping unit with non UTF-8 name {}", path.display());
                continue;
            };
            let size = self.category_for(&path, &raw_text);
            units.push(SourceUnit::new(origin_id, path.clone(), raw_text, size));
        }

        log::info!("Found {} source units", units.len());
        Ok(units)
    }

    fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }

    /// A `small`/`medium`/`large` directory below the root wins over line counting
    fn category_for(&self, path: &Path, raw_text: &str) -> SizeCategory {
        if raw_text.trim().is_empty() {
            return SizeCategory::Empty;
        }
        if let Ok(relative) = path.strip_prefix(&self.root) {
            let parent_dirs = relative.parent().map(Path::components).into_iter().flatten();
            for component in parent_dirs {
                if let std::path::Component::Normal(name) = component {
                    match name.to_str().and_then(SizeCategory::parse) {
                        Some(SizeCategory::Empty) | None => {}
                        Some(category) => return category,
                    }
                }
            }
        }
        self.thresholds.classify(raw_text)
    }
}
