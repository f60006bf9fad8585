use std::time::Duration;
use thiserror::Error;

/// Failure of one compiler invocation. Never escapes the resolver.
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("Failed to spawn compiler: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Compiler timed out after {0:?}")]
    Timeout(Duration),

    #[error("Compiler exited with {code:?}: {stderr}")]
    Rejected { code: Option<i32>, stderr: String },

    #[error("Malformed compiler output: {0}")]
    MalformedOutput(#[from] serde_json::Error),
}

impl CompilerError {
    /// Failures of the toolchain itself rather than of the submitted source
    pub fn is_infrastructure(&self) -> bool {
        !matches!(self, CompilerError::Rejected { .. })
    }

    /// Level a resolver logs this failure at, per unit. Spawn failures are
    /// warned about once by the compiler itself.
    pub fn log_level(&self) -> log::Level {
        match self {
            CompilerError::Timeout(_) | CompilerError::MalformedOutput(_) => log::Level::Warn,
            CompilerError::Spawn(_) | CompilerError::Rejected { .. } => log::Level::Debug,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unit name '{name}' claimed by '{first}' is also produced by '{second}'")]
pub struct NameCollision {
    pub name: String,
    pub first: String,
    pub second: String,
}
