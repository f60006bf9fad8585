//! # Specgen Flattener
//!
//! Turns a corpus of smart-contract sources into self-contained units.
//!
//! ## Pipeline
//!
//! ```text
//! Corpus directory
//!     │
//!     ├──> CorpusScanner (size-category aware)
//!     │      └─> SourceUnit[]
//!     │
//!     └──> ImportFlattener
//!            ├─ resolve `./` and `../` imports (PathResolver)
//!            ├─ inline each target once per top-level call
//!            └─> FlattenedUnit
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use specgen_flattener::{CorpusScanner, ImportFlattener, SizeThresholds, SourceFlattener};
//!
//! fn main() -> specgen_flattener::Result<()> {
//!     let units = CorpusScanner::new("contracts", SizeThresholds::default()).scan()?;
//!     let flattener = ImportFlattener::new();
//!     for unit in &units {
//!         let flat = flattener.flatten(unit);
//!         println!("{}: {} bytes", flat.origin_id, flat.flattened_text.len());
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod flatten;
mod path;
mod scanner;
mod types;

pub use error::{FlattenError, Result};
pub use flatten::{
    end_marker, skipped_marker, start_marker, strip_imports, strip_unit_metadata,
    ImportFlattener, SourceFlattener,
};
pub use path::{is_relative_specifier, normalize_path, resolve_import, source_identity};
pub use scanner::{CorpusScanner, DEFAULT_SOURCE_EXTENSION};
pub use types::{FlattenedUnit, ImportEdge, SizeCategory, SizeThresholds, SourceUnit};
