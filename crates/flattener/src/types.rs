use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// One source file of the corpus. Immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Origin identifier (file stem, typically a deployment address)
    pub origin_id: String,
    pub file_path: PathBuf,
    pub raw_text: String,
    pub size: SizeCategory,
}

impl SourceUnit {
    pub fn new(
        origin_id: impl Into<String>,
        file_path: impl Into<PathBuf>,
        raw_text: impl Into<String>,
        size: SizeCategory,
    ) -> Self {
        Self {
            origin_id: origin_id.into(),
            file_path: file_path.into(),
            raw_text: raw_text.into(),
            size,
        }
    }
}

/// A single `import` statement found while flattening. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEdge {
    pub from_path: PathBuf,
    pub import_spec: String,
}

/// Result of one top-level flatten call.
#[derive(Debug, Clone)]
pub struct FlattenedUnit {
    pub origin_id: String,
    pub flattened_text: String,
    /// Absolute identities entered during this call, the unit itself included
    pub visited: HashSet<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeCategory {
    Empty,
    Small,
    Medium,
    Large,
}

impl SizeCategory {
    /// Categories that produce jobs
    pub const GENERATED: [SizeCategory; 3] =
        [SizeCategory::Small, SizeCategory::Medium, SizeCategory::Large];

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeCategory::Empty => "empty",
            SizeCategory::Small => "small",
            SizeCategory::Medium => "medium",
            SizeCategory::Large => "large",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "empty" => Some(SizeCategory::Empty),
            "small" => Some(SizeCategory::Small),
            "medium" => Some(SizeCategory::Medium),
            "large" => Some(SizeCategory::Large),
            _ => None,
        }
    }
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line-count thresholds used when a unit's directory does not name its category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeThresholds {
    /// Units with fewer lines than this are small
    pub small_max_lines: usize,
    /// Units with at most this many lines are medium; above is large
    pub medium_max_lines: usize,
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self {
            small_max_lines: 70,
            medium_max_lines: 200,
        }
    }
}

impl SizeThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if self.small_max_lines > self.medium_max_lines {
            return Err(format!(
                "small_max_lines ({}) cannot exceed medium_max_lines ({})",
                self.small_max_lines, self.medium_max_lines
            ));
        }
        Ok(())
    }

    pub fn classify(&self, text: &str) -> SizeCategory {
        if text.trim().is_empty() {
            return SizeCategory::Empty;
        }
        let lines = text.split('\n').count();
        if lines < self.small_max_lines {
            SizeCategory::Small
        } else if lines <= self.medium_max_lines {
            SizeCategory::Medium
        } else {
            SizeCategory::Large
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_uses_line_thresholds() {
        let thresholds = SizeThresholds {
            small_max_lines: 3,
            medium_max_lines: 5,
        };
        assert_eq!(thresholds.classify("  \n\t\n"), SizeCategory::Empty);
        assert_eq!(thresholds.classify("a\nb"), SizeCategory::Small);
        assert_eq!(thresholds.classify("a\nb\nc"), SizeCategory::Medium);
        assert_eq!(thresholds.classify("a\nb\nc\nd\ne"), SizeCategory::Medium);
        assert_eq!(thresholds.classify("a\nb\nc\nd\ne\nf"), SizeCategory::Large);
    }

    #[test]
    fn thresholds_reject_inverted_bounds() {
        let thresholds = SizeThresholds {
            small_max_lines: 300,
            medium_max_lines: 200,
        };
        assert!(thresholds.validate().is_err());
        assert!(SizeThresholds::default().validate().is_ok());
    }

    #[test]
    fn category_names_round_trip_through_parse() {
        for category in [
            SizeCategory::Empty,
            SizeCategory::Small,
            SizeCategory::Medium,
            SizeCategory::Large,
        ] {
            assert_eq!(SizeCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(SizeCategory::parse(" Large "), Some(SizeCategory::Large));
        assert_eq!(SizeCategory::parse("other"), None);
    }
}
