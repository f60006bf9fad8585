use crate::compiler::CompilerService;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use specgen_flattener::strip_imports;

/// `contract|interface|library <Name>`, optionally `abstract`
static DECLARATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:abstract\s+)?(?:contract|interface|library)\s+([A-Za-z_$][A-Za-z0-9_$]*)")
        .expect("declaration regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolStrategy {
    Compiler,
    Fallback,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolResult {
    pub unit_id: String,
    /// `None` drops the unit from job generation
    pub symbol_name: Option<String>,
    pub strategy: SymbolStrategy,
}

/// First declared contract, interface, or library in `text`
pub fn fallback_symbol(text: &str) -> Option<String> {
    DECLARATION_RE.captures(text).map(|caps| caps[1].to_string())
}

/// Two-tier resolution: compiler first, declaration regex over the original
/// text second.
pub struct SymbolResolver<C> {
    compiler: C,
}

impl<C: CompilerService> SymbolResolver<C> {
    pub fn new(compiler: C) -> Self {
        Self { compiler }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Resolve the primary symbol of a unit. Never fails: compiler errors of any
    /// kind only switch to the fallback.
    pub async fn resolve(
        &self,
        unit_id: &str,
        flattened_text: &str,
        raw_text: &str,
    ) -> SymbolResult {
        if let Some(name) = self.from_compiler(unit_id, flattened_text).await {
            return SymbolResult {
                unit_id: unit_id.to_string(),
                symbol_name: Some(name),
                strategy: SymbolStrategy::Compiler,
            };
        }

        match fallback_symbol(raw_text) {
            Some(name) => SymbolResult {
                unit_id: unit_id.to_string(),
                symbol_name: Some(name),
                strategy: SymbolStrategy::Fallback,
            },
            None => {
                log::debug!("No declared symbol in {unit_id}");
                SymbolResult {
                    unit_id: unit_id.to_string(),
                    symbol_name: None,
                    strategy: SymbolStrategy::None,
                }
            }
        }
    }

    async fn from_compiler(&self, unit_id: &str, flattened_text: &str) -> Option<String> {
        let source = strip_imports(flattened_text);
        match self.compiler.declared_symbols(&source).await {
            Ok(names) => {
                if names.is_empty() {
                    log::debug!("Compiler found no declarations in {unit_id}");
                }
                names.into_iter().next()
            }
            Err(err) => {
                let verb = if err.is_infrastructure() { "failed on" } else { "rejected" };
                log::log!(err.log_level(), "Compiler {verb} {unit_id}: {err}");
                None
            }
        }
    }
}
