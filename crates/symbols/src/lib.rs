//! # Specgen Symbols
//!
//! Decides which declared symbol a flattened unit exposes and derives the
//! collision-resistant name its generation job is filed under.
//!
//! ```text
//! FlattenedUnit
//!     │
//!     ├──> CompilerService (solc --standard-json)
//!     │      └─ first contract name, or nothing
//!     │
//!     ├──> fallback regex over the original text
//!     │
//!     └──> UnitNamer: <Symbol>__<originId>
//! ```

mod compiler;
mod error;
mod namer;
mod resolver;

pub use compiler::{CompilerService, SolcCompiler, COMPILER_UNIT_NAME};
pub use error::{CompilerError, NameCollision};
pub use namer::{sanitize_symbol, unique_name, NameRegistry};
pub use resolver::{fallback_symbol, SymbolResolver, SymbolResult, SymbolStrategy};
